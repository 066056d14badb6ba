//! Record fingerprints.
//!
//! The canonical string of a record version is
//!
//! ```text
//! Item: {lot_number}, Status: {status}, Data: {update_timestamp}
//! ```
//!
//! with the three values inserted verbatim (no trimming, escaping, or case
//! folding). Its UTF-8 bytes are hashed with SHA-256 and the fingerprint is
//! the lower-case hex form of the digest.
//!
//! Every fingerprint already on the ledger was produced with this exact
//! template. Changing a single character here (label text, punctuation,
//! spacing, field order) makes every earlier anchor fail verification.

use sha2::{Digest, Sha256};

use anchor_types::{Fingerprint, RecordFields};

/// Human-readable form of the canonical template, for docs and CLI output.
pub const FINGERPRINT_TEMPLATE: &str = "Item: {lot_number}, Status: {status}, Data: {update_timestamp}";

/// Build the canonical string for one record version.
pub fn canonical_string(lot_number: &str, status: &str, update_timestamp: &str) -> String {
    format!("Item: {lot_number}, Status: {status}, Data: {update_timestamp}")
}

/// Fingerprint of one record version.
pub fn fingerprint(lot_number: &str, status: &str, update_timestamp: &str) -> Fingerprint {
    let canonical = canonical_string(lot_number, status, update_timestamp);
    let digest = Sha256::digest(canonical.as_bytes());
    Fingerprint::from_digest(digest.into())
}

/// Fingerprint of a record's content fields.
pub fn fingerprint_fields(fields: &RecordFields) -> Fingerprint {
    fingerprint(&fields.lot_number, &fields.status, &fields.updated_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_string_layout() {
        assert_eq!(
            canonical_string("L100", "received", "2024-01-01T00:00:00"),
            "Item: L100, Status: received, Data: 2024-01-01T00:00:00"
        );
    }

    #[test]
    fn template_constant_describes_canonical_string() {
        let rendered = FINGERPRINT_TEMPLATE
            .replace("{lot_number}", "L1")
            .replace("{status}", "S")
            .replace("{update_timestamp}", "T");
        assert_eq!(rendered, canonical_string("L1", "S", "T"));
    }

    #[test]
    fn known_vector() {
        let fp = fingerprint("L100", "received", "2024-01-01T00:00:00");
        assert_eq!(
            fp.to_hex(),
            "24b5d98f0912941558241644b81226b54e4df5fa65b7ea70fcc99bf21edb5561"
        );
    }

    #[test]
    fn status_change_changes_fingerprint() {
        let fp = fingerprint("L100", "shipped", "2024-01-01T00:00:00");
        assert_eq!(
            fp.to_hex(),
            "f690bd44576b2a7edf1ea30486a1148fa8f0cd168f81566dffb2a3892abca4c8"
        );
    }

    #[test]
    fn fields_helper_matches_free_function() {
        let fields = RecordFields::new("L7", "packed", "2024-05-05T10:00:00.000001");
        assert_eq!(
            fingerprint_fields(&fields),
            fingerprint("L7", "packed", "2024-05-05T10:00:00.000001")
        );
    }

    proptest! {
        #[test]
        fn deterministic(lot in ".*", status in ".*", ts in ".*") {
            prop_assert_eq!(fingerprint(&lot, &status, &ts), fingerprint(&lot, &status, &ts));
        }

        #[test]
        fn sensitive_to_lot_number(lot in "[A-Z0-9]{1,12}", status in "[a-z]{1,12}", ts in "[0-9T:-]{1,26}", suffix in "[a-z0-9]") {
            let changed = format!("{lot}{suffix}");
            prop_assert_ne!(fingerprint(&lot, &status, &ts), fingerprint(&changed, &status, &ts));
        }

        #[test]
        fn sensitive_to_status(lot in "[A-Z0-9]{1,12}", status in "[a-z]{1,12}", ts in "[0-9T:-]{1,26}", suffix in "[a-z0-9]") {
            let changed = format!("{status}{suffix}");
            prop_assert_ne!(fingerprint(&lot, &status, &ts), fingerprint(&lot, &changed, &ts));
        }

        #[test]
        fn sensitive_to_timestamp(lot in "[A-Z0-9]{1,12}", status in "[a-z]{1,12}", ts in "[0-9T:-]{1,26}", suffix in "[0-9]") {
            let changed = format!("{ts}{suffix}");
            prop_assert_ne!(fingerprint(&lot, &status, &ts), fingerprint(&lot, &status, &changed));
        }
    }
}
