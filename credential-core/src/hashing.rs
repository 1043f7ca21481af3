//! Commitment hashing.
//!
//! All commitments are SHA-256 over a canonical, length-prefixed encoding:
//!
//! ```text
//! domain_tag || u32_be(field_count) || { u32_be(len(field)) || field_bytes }*
//! ```
//!
//! Length prefixing (rather than a delimiter) makes the encoding injective, so
//! `["a", "b|c"]` and `["a|b", "c"]` commit to different digests.
//!
//! Every function here is pure: no I/O, identical output across processes and runs.

use crate::constants::{CLAIM_DOMAIN, CREDENTIAL_DOMAIN, MAX_FIELD_BYTES};
use crate::error::{CredentialError, CredentialResult};
use crate::types::{Commitment, CredentialAttributes, Salt};
use sha2::{Digest, Sha256};

/// Check that a field can be carried through the canonical encoding.
fn check_encodable(field: &str) -> CredentialResult<()> {
    if field.len() > MAX_FIELD_BYTES {
        return Err(CredentialError::EncodingError(format!(
            "field of {} bytes exceeds the {MAX_FIELD_BYTES} byte limit",
            field.len()
        )));
    }
    if field.chars().any(char::is_control) {
        return Err(CredentialError::EncodingError(
            "field contains a control character".to_string(),
        ));
    }
    Ok(())
}

fn absorb_field(hasher: &mut Sha256, bytes: &[u8]) {
    // MAX_FIELD_BYTES keeps every length well inside u32.
    hasher.update((bytes.len() as u32).to_be_bytes());
    hasher.update(bytes);
}

fn finish(hasher: Sha256) -> Commitment {
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Commitment::from_bytes(out)
}

/// Commit to an ordered sequence of non-empty fields.
pub fn commit(fields: &[&str]) -> CredentialResult<Commitment> {
    if fields.is_empty() {
        return Err(CredentialError::InvalidInput("at least one field is required".to_string()));
    }

    for (i, field) in fields.iter().enumerate() {
        if field.is_empty() {
            return Err(CredentialError::InvalidInput(format!("field {i} must not be empty")));
        }
        check_encodable(field)?;
    }

    let mut hasher = Sha256::new();
    hasher.update(CREDENTIAL_DOMAIN);
    hasher.update((fields.len() as u32).to_be_bytes());
    for field in fields {
        absorb_field(&mut hasher, field.as_bytes());
    }
    Ok(finish(hasher))
}

/// Commit to a degree credential's `[name, degree, year]` tuple.
///
/// On top of [`commit`], the year must be exactly four ASCII digits.
pub fn commit_credential(attrs: &CredentialAttributes) -> CredentialResult<Commitment> {
    if attrs.name.trim().is_empty() {
        return Err(CredentialError::InvalidInput("name must not be empty".to_string()));
    }
    if attrs.degree.trim().is_empty() {
        return Err(CredentialError::InvalidInput("degree must not be empty".to_string()));
    }
    if attrs.year.len() != 4 || !attrs.year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CredentialError::InvalidInput(format!(
            "year must be four digits, got {:?}",
            attrs.year
        )));
    }

    commit(&attrs.fields())
}

/// Commit to a named predicate claim under a salt.
pub fn commit_claim(label: &str, salt: &Salt) -> CredentialResult<Commitment> {
    if label.trim().is_empty() {
        return Err(CredentialError::InvalidInput("claim label must not be empty".to_string()));
    }
    check_encodable(label)?;

    let mut hasher = Sha256::new();
    hasher.update(CLAIM_DOMAIN);
    absorb_field(&mut hasher, label.as_bytes());
    absorb_field(&mut hasher, salt.as_bytes());
    Ok(finish(hasher))
}
