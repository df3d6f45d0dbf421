// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LTI Launch Context - verified LTI launches without a session store
//!
//! This crate verifies signed LTI 1.x launch requests and keeps the launch
//! body in an encoded client cookie so later page loads can read it back.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `config` - Environment configuration for the server binary
//! - `lti` - Launch normalization, verification, cookie codec and persistence

pub mod api;
pub mod config;
pub mod error;
pub mod lti;
pub mod state;
