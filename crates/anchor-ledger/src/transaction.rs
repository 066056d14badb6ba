use serde::{Deserialize, Serialize};

use anchor_crypto::{Signature, SigningKey, VerifyingKey};
use anchor_types::{AnchorEntry, Fingerprint, RecordId, SubmitterId, TxHash};

use crate::error::{ClientError, ClientResult};

/// Name of the event emitted for every new registration.
pub const ITEM_REGISTERED: &str = "ItemRegistered";

/// State-changing contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "camelCase")]
pub enum LedgerCall {
    /// `registerItem(itemId, hash)`.
    #[serde(rename_all = "camelCase")]
    RegisterItem { item_id: RecordId, hash: Fingerprint },
}

impl LedgerCall {
    /// Calldata size used for gas accounting.
    pub fn calldata_len(&self) -> usize {
        match self {
            Self::RegisterItem { item_id, .. } => item_id.as_str().len() + 64,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::RegisterItem { item_id, hash } => {
                out.extend_from_slice(b"registerItem:");
                out.extend_from_slice(item_id.as_str().len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(item_id.as_str().as_bytes());
                out.push(b':');
                out.extend_from_slice(hash.to_hex().as_bytes());
            }
        }
    }
}

/// Read-only contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "camelCase")]
pub enum ViewCall {
    /// `verifyItem(itemId, hash) -> bool`.
    #[serde(rename_all = "camelCase")]
    VerifyItem { item_id: RecordId, hash: Fingerprint },
    /// `items(itemId) -> (hash, timestamp, registeredBy)`.
    #[serde(rename_all = "camelCase")]
    Items { item_id: RecordId },
}

/// Value returned by a [`ViewCall`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewValue {
    Bool(bool),
    Entry(Option<AnchorEntry>),
}

/// Unsigned transaction content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub chain_id: u64,
    /// Sender's sequence number.
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub call: LedgerCall,
}

impl TransactionBody {
    /// Canonical bytes covered by the signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        out.extend_from_slice(b"anchor-tx-v1|");
        for field in [self.chain_id, self.nonce, self.gas_limit, self.gas_price] {
            out.extend_from_slice(&field.to_be_bytes());
        }
        out.push(b'|');
        self.call.encode_into(&mut out);
        out
    }
}

/// A transaction signed by its submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub body: TransactionBody,
    pub public_key: [u8; 32],
    pub signature: Signature,
}

impl SignedTransaction {
    pub fn sign(body: TransactionBody, key: &SigningKey) -> Self {
        let signature = key.sign(&body.signing_bytes());
        Self {
            body,
            public_key: key.verifying_key().as_bytes(),
            signature,
        }
    }

    /// Check the signature and return the sender's address.
    pub fn recover_sender(&self) -> ClientResult<SubmitterId> {
        let key = VerifyingKey::from_bytes(self.public_key)
            .map_err(|_| ClientError::Rejected("invalid sender public key".into()))?;
        key.verify(&self.body.signing_bytes(), &self.signature)
            .map_err(|_| ClientError::Rejected("invalid signature".into()))?;
        Ok(key.to_submitter_id())
    }

    /// BLAKE3 hash of the signed transaction.
    pub fn hash(&self) -> TxHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"anchor-signed-tx-v1:");
        hasher.update(&self.body.signing_bytes());
        hasher.update(&self.public_key);
        hasher.update(&self.signature.to_bytes());
        TxHash::from_hash(*hasher.finalize().as_bytes())
    }
}

/// Execution status of an included transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Success,
    Reverted { reason: String },
}

/// Proof that a transaction was included in a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub status: ReceiptStatus,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// `ItemRegistered(itemId, hash, timestamp, registeredBy)` as observed on
/// the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub name: String,
    pub entry: AnchorEntry,
    pub block_number: u64,
    pub tx_hash: TxHash,
}
