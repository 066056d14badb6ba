//! Cryptographic primitives for the lot anchoring service.
//!
//! - [`fingerprint`]: the one shared definition of how a record version is
//!   turned into a SHA-256 fingerprint. The anchor worker and the verifier
//!   both call it; there is no second implementation.
//! - [`signer`]: Ed25519 keys identifying the ledger submitter.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod fingerprint;
pub mod signer;

pub use fingerprint::{canonical_string, fingerprint, fingerprint_fields, FINGERPRINT_TEMPLATE};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
