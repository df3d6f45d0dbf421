// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::lti::{LaunchContextResolver, LaunchValidator, OAuth1Validator, PersistenceConfig};

#[derive(Clone)]
pub struct AppState {
    pub lti: Arc<PersistenceConfig>,
    pub resolver: LaunchContextResolver,
}

impl AppState {
    pub fn new(lti: PersistenceConfig, validator: Arc<dyn LaunchValidator>) -> Self {
        Self {
            lti: Arc::new(lti),
            resolver: LaunchContextResolver::new(validator),
        }
    }

    /// State backed by the OAuth 1.0 validator.
    pub fn with_oauth1(lti: PersistenceConfig, nonce_capacity: usize) -> Self {
        Self::new(lti, Arc::new(OAuth1Validator::new(nonce_capacity)))
    }
}
