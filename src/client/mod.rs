//! Client library for connecting to huginnd.
//!
//! Provides [`ServiceClient`], which forwards classification calls to a
//! remote huginnd instance over its HTTP API.

mod service_client;

pub use service_client::{DEFAULT_ADDRESS, ServiceClient};
