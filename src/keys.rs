//! Deployment key handle
//!
//! The key is passed explicitly to each signing call; nothing holds it
//! globally. `Debug` never prints key material.

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use std::fmt;

use crate::error::{DeployerError, Result};
use crate::redact::Redacted;

pub struct PrivateKey {
    signer: PrivateKeySigner,
}

impl PrivateKey {
    /// Parse a 32-byte hex key, with or without `0x` prefix
    pub fn from_hex(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(digits)
            .map_err(|e| DeployerError::Signing(format!("private key is not hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(DeployerError::Signing(format!(
                "private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }

        let signer = PrivateKeySigner::from_bytes(&B256::from_slice(&bytes))
            .map_err(|e| DeployerError::Signing(format!("invalid private key: {}", e)))?;
        Ok(Self { signer })
    }

    /// Address derived from the key
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address())
            .field("key", &Redacted(()))
            .finish()
    }
}

/// Address for a hex private key
pub fn private_key_to_address(raw: &str) -> Result<Address> {
    Ok(PrivateKey::from_hex(raw)?.address())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TEST_ADDRESS, TEST_PRIVATE_KEY};
    use std::str::FromStr;

    #[test]
    fn test_address_with_and_without_prefix() {
        let expected = Address::from_str(TEST_ADDRESS).unwrap();
        assert_eq!(private_key_to_address(TEST_PRIVATE_KEY).unwrap(), expected);
        assert_eq!(
            private_key_to_address(TEST_PRIVATE_KEY.trim_start_matches("0x")).unwrap(),
            expected
        );
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(PrivateKey::from_hex("0x1234").is_err());
        assert!(PrivateKey::from_hex("not-hex").is_err());
        assert!(PrivateKey::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("ac0974bec39a17e3"));
    }
}
