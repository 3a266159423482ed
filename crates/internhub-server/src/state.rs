// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared router state.

use std::sync::Arc;

use internhub_core::HandlerState;

use crate::auth::TokenVerifier;

/// State handed to every route.
#[derive(Clone)]
pub struct AppState {
    /// Core handler state (stores, config, notifier).
    pub handlers: Arc<HandlerState>,
    /// Verifies bearer tokens.
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(handlers: HandlerState, verifier: TokenVerifier) -> Self {
        Self {
            handlers: Arc::new(handlers),
            verifier: Arc::new(verifier),
        }
    }
}
