// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! InternHub Core - internship marketplace backend
//!
//! Students browse and apply to internships, companies post internships and
//! manage applicants, admins and superadmins moderate. This crate holds the
//! domain model, both datastores, the reconciliation layer between them,
//! permission checks, status lifecycles and the request handlers. The HTTP
//! surface lives in `internhub-server`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 handlers (users, companies, ...)             │
//! │        permissions · transitions · notifier · pagination     │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   DualStore (reconcile + repo)               │
//! │   lookup_one · lookup_many · insert · update · delete        │
//! └──────────────────────────────────────────────────────────────┘
//!            │                                     │
//!            ▼                                     ▼
//! ┌───────────────────────┐            ┌───────────────────────────┐
//! │     PrimaryStore      │            │      DocumentStore        │
//! │  typed SQLite tables  │            │  JSON documents, `_id`    │
//! └───────────────────────┘            └───────────────────────────┘
//! ```
//!
//! # Reconciliation
//!
//! | Operation | Behaviour |
//! |-----------|-----------|
//! | Single lookup | Primary first; on miss or store failure, the document store |
//! | List (`merge`) | Both stores, merged by normalized key, primary wins |
//! | List (`fallback`) | Document store only when the primary is empty or failing |
//! | Insert | Primary; document store when the primary fails |
//! | Update | Wherever the record lives |
//! | Delete | Both stores; succeeds if either removed the record |
//!
//! # Identifiers
//!
//! Generated keys are 12-byte document ids rendered as 24 lower-case hex
//! characters, so the primary's string keys and the document store's native
//! ids name the same records. Documents written by other clients may hold
//! keys in either form and in either case; every comparison goes through
//! [`ids::normalize_key`].
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `INTERNHUB_DATABASE_URL` | Yes | - | Primary store SQLite URL |
//! | `INTERNHUB_DOCUMENT_URL` | No | `memory` | Document store: `memory` or a SQLite URL |
//! | `INTERNHUB_RECONCILE_MODE` | No | `merge` | `merge` or `fallback` |
//! | `INTERNHUB_SUPERADMIN_EMAILS` | No | - | Comma-separated bootstrap superadmins |
//! | `INTERNHUB_MAX_PAGE_SIZE` | No | `100` | Upper bound for page sizes |

/// Configuration loaded from environment variables.
pub mod config;

/// Extended-JSON documents: filters, normalization, record encoding.
pub mod document;

/// Error types with machine-readable codes.
pub mod error;

/// Request handlers for every API operation.
pub mod handlers;

/// Document ids and key coercion.
pub mod ids;

/// Domain records and status enums.
pub mod models;

/// Caller resolution and permission checks.
pub mod permissions;

/// Primary and document store interfaces and backends.
pub mod persistence;

/// The dual-store reconciler.
pub mod reconcile;

/// Typed record access over the reconciler.
mod repo;

/// Status lifecycles.
pub mod transitions;

pub use config::Config;
pub use error::{CoreError, Result};
pub use handlers::HandlerState;
pub use reconcile::{DualStore, ReconcileMode};
