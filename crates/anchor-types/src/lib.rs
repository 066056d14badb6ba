//! Foundation types for the lot anchoring service.
//!
//! Every other anchor crate depends on `anchor-types`. The types here are
//! shared between the side that writes fingerprints to the ledger and the
//! side that later verifies them, so their wire shapes are fixed.
//!
//! # Key Types
//!
//! - [`Record`]: A mutable status record as held by the document store
//! - [`AnchorRequest`]: Queue message asking for one record version to be anchored
//! - [`Fingerprint`]: 256-bit digest of a record's content fields
//! - [`AnchorEntry`]: Ledger-resident `(identifier, fingerprint)` registration
//! - [`SubmitterId`]: Address of the identity that signs ledger writes
//! - [`VerificationStatus`]: Outcome of verifying a stored record

pub mod anchor;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod record;
pub mod request;
pub mod verification;

pub use anchor::{AnchorEntry, TxHash};
pub use error::TypeError;
pub use fingerprint::Fingerprint;
pub use identity::SubmitterId;
pub use record::{Record, RecordFields, RecordId};
pub use request::{AnchorRequest, RequestError};
pub use verification::VerificationStatus;
