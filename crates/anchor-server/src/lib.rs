//! HTTP front end for the lot anchoring service.
//!
//! Accepts lot status updates, serves stored records, and reports whether
//! a stored record still matches its ledger anchor.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HealthResponse, UpdateBody};
pub use server::AnchorServer;
