//! DebtBomb - technical debt with an expiry date
//!
//! Finds `@debtbomb` markers in a codebase, works out which have expired and
//! keeps issue-tracker tickets and chat notifications in step with them.
//!
//! # Features
//!
//! - Parallel extraction of parenthetical and free-form markers in any
//!   comment syntax (`//`, `#`, `--`, `/*`)
//! - Stable identities for items, so tickets survive line moves
//! - Level-triggered reconciliation: open, keep, warn and close
//! - Jira tickets plus Slack, Discord and Teams webhooks
//! - Reports in terminal, markdown and JSON formats
//!
//! # Example
//!
//! ```rust,no_run
//! use debtbomb::*;
//! use std::path::Path;
//!
//! let today = chrono::Local::now().date_naive();
//! let items = engine::run(Path::new("."), today).unwrap();
//! let report = models::DebtReport::new(&items, Path::new(".").to_path_buf(), today);
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod git;
pub mod jira;
pub mod models;
pub mod notify;
pub mod parser;
pub mod reconcile;
pub mod reporter;
pub mod scanner;
pub mod state;

pub use models::{Config, DebtItem, DebtReport};
pub use reconcile::{ReconcileOptions, ReconcileSummary, Reconciler};
pub use state::TicketStateStore;
