//! Types shared between the hashing service, the registry, the claim store and the verifier.

use crate::constants::{MAX_FIELD_BYTES, MAX_SALT_LEN, MIN_SALT_LEN, SALT_LEN};
use crate::error::CredentialError;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Token identifier, assigned densely from [`crate::constants::FIRST_TOKEN_ID`].
pub type TokenId = u64;

/// Decode a hex string with an optional `0x` prefix.
fn decode_hex(s: &str) -> Result<Vec<u8>, CredentialError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    hex::decode(s).map_err(|e| CredentialError::InvalidInput(format!("invalid hex: {e}")))
}

/// A 32-byte SHA-256 commitment.
///
/// Rendered as `0x`-prefixed lowercase hex, the same shape as a `bytes32` on-chain value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Commitment([u8; 32]);

impl Commitment {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl FromStr for Commitment {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            CredentialError::InvalidInput(format!("commitment must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-claim random salt.
///
/// Generated from the OS CSPRNG at claim-creation time and handed to verifiers out of band.
/// It must never be derived from the token ID or any other public field.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Draw a fresh 256-bit salt from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap caller-supplied salt bytes (at least 128 bits).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CredentialError> {
        if bytes.len() < MIN_SALT_LEN || bytes.len() > MAX_SALT_LEN {
            return Err(CredentialError::InvalidInput(format!(
                "salt must be between {MIN_SALT_LEN} and {MAX_SALT_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn from_hex(s: &str) -> Result<Self, CredentialError> {
        Self::from_bytes(&decode_hex(s)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

// Salts are secrets between issuer, holder and verifier; keep them out of logs.
impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt(<{} bytes>)", self.0.len())
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Salt::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Opaque holder identity (typically a wallet address).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HolderId(String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Result<Self, CredentialError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CredentialError::InvalidInput("holder identity must not be empty".to_string()));
        }
        if id.len() > MAX_FIELD_BYTES {
            return Err(CredentialError::InvalidInput(format!(
                "holder identity exceeds the {MAX_FIELD_BYTES} byte limit"
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(CredentialError::InvalidInput(
                "holder identity must not contain control characters".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HolderId {
    type Error = CredentialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HolderId> for String {
    fn from(value: HolderId) -> Self {
        value.0
    }
}

/// The attribute tuple committed into a degree credential.
///
/// Field order is part of the commitment: `[name, degree, year]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttributes {
    pub name: String,
    pub degree: String,
    /// Graduation year, four ASCII digits.
    pub year: String,
}

impl CredentialAttributes {
    pub fn new(name: impl Into<String>, degree: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            degree: degree.into(),
            year: year.into(),
        }
    }

    pub fn fields(&self) -> [&str; 3] {
        [self.name.as_str(), self.degree.as_str(), self.year.as_str()]
    }
}

/// One issued credential.
///
/// Records are created exactly once by a mint and never mutated or removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub token_id: TokenId,
    pub holder: HolderId,
    pub commitment: Commitment,
    /// Ledger sequence number of the mint event.
    pub issued_at: u64,
    /// Opaque metadata pointer fixed at mint time (e.g. an `ipfs://` URI).
    pub metadata_uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_hex_roundtrip_accepts_prefix() {
        let c = Commitment::from_bytes([0xab; 32]);
        let hex = c.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.parse::<Commitment>().unwrap(), c);
        assert_eq!(hex.trim_start_matches("0x").parse::<Commitment>().unwrap(), c);
    }

    #[test]
    fn commitment_rejects_wrong_length() {
        let err = "0xabcd".parse::<Commitment>().unwrap_err();
        assert!(matches!(err, CredentialError::InvalidInput(_)));
    }

    #[test]
    fn generated_salts_are_distinct() {
        let a = Salt::generate();
        let b = Salt::generate();
        assert_eq!(a.as_bytes().len(), SALT_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn short_salt_is_rejected() {
        assert!(Salt::from_bytes(&[1u8; 15]).is_err());
        assert!(Salt::from_bytes(&[1u8; 16]).is_ok());
        assert!(Salt::from_bytes(&[1u8; 65]).is_err());
    }

    #[test]
    fn salt_debug_does_not_leak_bytes() {
        let salt = Salt::from_bytes(&[0x42; 16]).unwrap();
        assert_eq!(format!("{salt:?}"), "Salt(<16 bytes>)");
    }

    #[test]
    fn holder_must_not_be_blank() {
        assert!(HolderId::new("   ").is_err());
        assert!(HolderId::new("0x71C7656EC7ab88b098defB751B7401B5f6d8976F").is_ok());
        let parsed: Result<HolderId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn holder_length_is_bounded() {
        assert!(HolderId::new("h".repeat(MAX_FIELD_BYTES)).is_ok());
        assert!(matches!(
            HolderId::new("h".repeat(MAX_FIELD_BYTES + 1)),
            Err(CredentialError::InvalidInput(_))
        ));
    }
}
