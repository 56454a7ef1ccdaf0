//! Lendura Library Lending System
//!
//! REST JSON API for a book catalog backed by a permanent loan ledger.
//! Availability and overdue status are derived from the ledger on read;
//! identity is handled by an external token-issuing service.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
