//! HTTP server for huginnd.
//!
//! This module provides:
//! - The axum router and handlers (`routes`)
//! - HTTP error mapping (`error`)
//! - Configuration and secrets loading (`config`)

pub mod config;
pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{AppState, router};
