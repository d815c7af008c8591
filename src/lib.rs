//! CRM Logger - Customer Interactions and Ticket Sales
//!
//! A Rust library for keeping a small business's customer log and ticket sales
//! in a row-oriented store (CSV files or SQLite) and querying them.
//!
//! # Features
//!
//! - Upsert customer interactions by name, counting repeat visits
//! - Append-only ticket sales with per-event summaries
//! - Follow-up tracking with a completed marker
//! - Search, filter and sort over loaded snapshots
//! - Export to CSV and JSON

/// Table storage backends
pub mod backend;
/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Snapshot export
pub mod export;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Pure query helpers over snapshots
pub mod query;
/// Table schema definitions
pub mod schema;
/// Application service
pub mod service;
/// Login session
pub mod session;
/// Record stores
pub mod store;
/// In-memory table snapshots
pub mod table;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use error::{CrmError, Result};
pub use models::{InteractionRecord, NewInteraction, TicketSaleRecord};
pub use service::CrmService;
pub use session::{Credentials, Session};
pub use store::{InteractionStore, TicketStore, UpsertOutcome, UpsertPolicy};
pub use table::Table;
