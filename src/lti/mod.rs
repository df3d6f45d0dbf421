// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # LTI Launch Module
//!
//! Verifies LTI 1.x launches and keeps the launch context in a client cookie,
//! so no server-side session store is needed.
//!
//! ## Launch Flow
//!
//! 1. The LMS POSTs a signed launch form to the tool
//! 2. The tool:
//!    - parses the body and resolves the signed scheme (`normalize`)
//!    - checks the OAuth 1.0 signature for the consumer key (`provider`)
//!    - stores the body, or the rejection, in the context cookie (`cookie`)
//! 3. Later page loads (any non-POST) read the context back from the cookie
//!
//! ## Cookie Format
//!
//! `base64(base64(json))` under a single 16-character name. This is an
//! encoding, not encryption: the client can read and edit the value.

pub mod codec;
pub mod context;
pub mod cookie;
pub mod error;
pub mod nonce;
pub mod normalize;
pub mod oauth;
pub mod provider;
pub mod resolver;
pub mod roles;

pub use context::LaunchContext;
pub use cookie::{
    ContextCookie, CookieName, CookieOptions, UnencodedCookies, DEFAULT_COOKIE_NAME,
};
pub use error::{LaunchError, ProviderError};
pub use normalize::{normalize, NormalizedLaunch, Scheme, Transport};
pub use provider::{LaunchValidator, OAuth1Validator, Verdict};
pub use resolver::{LaunchContextResolver, PersistenceConfig};
pub use roles::LtiRole;
