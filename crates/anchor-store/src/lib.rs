//! Document store boundary for the lot anchoring service.
//!
//! The anchoring core treats the database holding status records as an
//! external collaborator. It only needs to insert a record and get back its
//! identifier, and to find a record by identifier. Updates and listings
//! exist for the reconciliation sweep and for exercising tamper detection.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`InMemoryDocumentStore`] -- `HashMap`-based store for tests and embedding

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDocumentStore;
pub use traits::DocumentStore;
