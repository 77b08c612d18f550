//! Development signer
//!
//! Deterministic stand-in for real key custody, used by dry runs and
//! tests. It derives a stable pseudo-signature from the transaction
//! fields alone. There is no private key anywhere in this process and
//! nothing produced here is accepted by a real network.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::providers::{RawTransaction, SignedTransaction, TransactionSigner};

pub struct DevSigner {
    /// Label mixed into the digest so distinct environments produce
    /// distinct artifacts
    environment: String,
}

impl DevSigner {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }
}

impl Default for DevSigner {
    fn default() -> Self {
        Self::new("dev")
    }
}

#[async_trait]
impl TransactionSigner for DevSigner {
    async fn sign(&self, tx: &RawTransaction) -> Result<SignedTransaction> {
        let mut hasher = Sha256::new();
        hasher.update(self.environment.as_bytes());
        hasher.update(tx.from.as_bytes());
        hasher.update(tx.to.as_bytes());
        hasher.update(tx.value_wei.as_bytes());
        hasher.update(tx.data.as_bytes());
        hasher.update(tx.gas_limit.to_be_bytes());
        hasher.update(tx.gas_price.to_be_bytes());
        let digest = hasher.finalize();

        let raw_hex = format!("0x{}", hex_encode(&digest));
        let hash = {
            let mut hasher = Sha256::new();
            hasher.update(digest);
            format!("0x{}", hex_encode(&hasher.finalize()))
        };

        Ok(SignedTransaction { raw_hex, hash })
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    fn tx() -> RawTransaction {
        RawTransaction {
            from: "0xfrom".to_string(),
            to: "0xrouter".to_string(),
            value_wei: "0".to_string(),
            data: "0xabcd".to_string(),
            gas_limit: 180_000,
            gas_price: 25_000_000_000,
        }
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = DevSigner::default();
        let a = block_on(signer.sign(&tx())).unwrap();
        let b = block_on(signer.sign(&tx())).unwrap();
        assert_eq!(a.raw_hex, b.raw_hex);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_distinct_payloads_distinct_signatures() {
        let signer = DevSigner::default();
        let a = block_on(signer.sign(&tx())).unwrap();
        let mut other = tx();
        other.gas_price += 1;
        let b = block_on(signer.sign(&other)).unwrap();
        assert_ne!(a.raw_hex, b.raw_hex);
    }

    #[test]
    fn test_environment_label_scopes_artifacts() {
        let a = block_on(DevSigner::new("dev").sign(&tx())).unwrap();
        let b = block_on(DevSigner::new("staging").sign(&tx())).unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_artifact_shape() {
        let signed = block_on(DevSigner::default().sign(&tx())).unwrap();
        assert!(signed.raw_hex.starts_with("0x"));
        assert_eq!(signed.raw_hex.len(), 2 + 64);
        assert_eq!(signed.hash.len(), 2 + 64);
    }
}
