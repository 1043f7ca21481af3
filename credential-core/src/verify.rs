//! Verifier-side protocols.
//!
//! Both protocols recompute a commitment from what the verifier was told and compare it
//! against the ledger. The verifier only ever learns a yes/no answer (or that the token
//! does not exist); stored attributes are never returned.

use crate::error::{CredentialError, CredentialResult};
use crate::hashing::{commit_claim, commit_credential};
use crate::ledger::Ledger;
use crate::types::{CredentialAttributes, Salt, TokenId};
use serde::{Deserialize, Serialize};

/// Result of an exact credential check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The claimed attributes hash to the stored commitment.
    Authentic,
    /// The token exists but the claimed attributes do not match it.
    Mismatch,
    /// No token with this ID was ever minted.
    NotFound,
}

/// Exact verification: recompute the credential commitment and compare.
///
/// A missing token is reported as `NotFound` whatever was claimed. For an existing
/// token, malformed claimed attributes are an error, not a mismatch.
pub fn verify_credential(
    ledger: &Ledger,
    token_id: TokenId,
    claimed: &CredentialAttributes,
) -> CredentialResult<VerificationOutcome> {
    if !ledger.exists(token_id)? {
        return Ok(VerificationOutcome::NotFound);
    }
    let candidate = commit_credential(claimed)?;

    match ledger.verify(token_id, &candidate) {
        Ok(true) => Ok(VerificationOutcome::Authentic),
        Ok(false) => Ok(VerificationOutcome::Mismatch),
        Err(CredentialError::NotFound(_)) => Ok(VerificationOutcome::NotFound),
        Err(e) => Err(e),
    }
}

/// Attribute verification: recompute the salted claim commitment and check membership.
///
/// The token's existence is checked first, before the label is looked at, so a missing
/// token surfaces as `NotFound` rather than as a predicate that does not hold.
pub fn verify_claim(ledger: &Ledger, token_id: TokenId, label: &str, salt: &Salt) -> CredentialResult<bool> {
    if !ledger.exists(token_id)? {
        return Err(CredentialError::NotFound(token_id));
    }

    let candidate = commit_claim(label, salt)?;
    ledger.has_claim(token_id, &candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::commit;
    use crate::types::HolderId;

    fn rahul() -> CredentialAttributes {
        CredentialAttributes::new("Rahul Verma", "B.Tech CS", "2024")
    }

    fn issued_ledger() -> Ledger {
        let ledger = Ledger::new();
        let c = commit_credential(&rahul()).unwrap();
        let receipt = ledger.mint(HolderId::new("H1").unwrap(), c, None).unwrap();
        assert_eq!(receipt.token_id, 0);
        ledger
    }

    #[test]
    fn degree_scenario() {
        let ledger = issued_ledger();
        let c = commit(&["Rahul Verma", "B.Tech CS", "2024"]).unwrap();
        assert_eq!(ledger.get_commitment(0).unwrap(), c);

        assert_eq!(verify_credential(&ledger, 0, &rahul()).unwrap(), VerificationOutcome::Authentic);

        let wrong_year = CredentialAttributes::new("Rahul Verma", "B.Tech CS", "2023");
        assert_eq!(
            verify_credential(&ledger, 0, &wrong_year).unwrap(),
            VerificationOutcome::Mismatch
        );

        assert_eq!(verify_credential(&ledger, 99, &rahul()).unwrap(), VerificationOutcome::NotFound);
    }

    #[test]
    fn malformed_claimed_attributes_are_errors() {
        let ledger = issued_ledger();
        let empty = CredentialAttributes::new("", "B.Tech CS", "2024");
        assert!(matches!(
            verify_credential(&ledger, 0, &empty),
            Err(CredentialError::InvalidInput(_))
        ));
    }

    #[test]
    fn gpa_claim_scenario() {
        let ledger = issued_ledger();
        let s = Salt::generate();
        ledger
            .add_claim(0, commit_claim("GPA_ABOVE_7.5", &s).unwrap())
            .unwrap();

        assert!(verify_claim(&ledger, 0, "GPA_ABOVE_7.5", &s).unwrap());

        let s_prime = Salt::generate();
        assert!(!verify_claim(&ledger, 0, "GPA_ABOVE_7.5", &s_prime).unwrap());
    }

    #[test]
    fn guessing_labels_without_salt_fails() {
        let ledger = issued_ledger();
        let s = Salt::generate();
        ledger
            .add_claim(0, commit_claim("GPA_ABOVE_7.5", &s).unwrap())
            .unwrap();

        // An adversarial verifier with the right label but no salt gets nowhere.
        for guess in 0u8..64 {
            let salt = Salt::from_bytes(&[guess; 16]).unwrap();
            assert!(!verify_claim(&ledger, 0, "GPA_ABOVE_7.5", &salt).unwrap());
        }
        // Right salt, wrong label also fails.
        assert!(!verify_claim(&ledger, 0, "GPA_ABOVE_9.0", &s).unwrap());
    }

    #[test]
    fn claim_on_missing_token_is_not_found() {
        let ledger = issued_ledger();
        let s = Salt::generate();
        assert_eq!(
            verify_claim(&ledger, 42, "GPA_ABOVE_7.5", &s),
            Err(CredentialError::NotFound(42))
        );
    }

    #[test]
    fn missing_token_wins_over_malformed_input() {
        let ledger = issued_ledger();
        let s = Salt::generate();
        assert_eq!(verify_claim(&ledger, 7, "", &s), Err(CredentialError::NotFound(7)));

        let short_year = CredentialAttributes::new("Rahul Verma", "B.Tech CS", "24");
        assert_eq!(
            verify_credential(&ledger, 7, &short_year).unwrap(),
            VerificationOutcome::NotFound
        );
        assert!(matches!(
            verify_credential(&ledger, 0, &short_year),
            Err(CredentialError::InvalidInput(_))
        ));
        assert!(matches!(
            verify_claim(&ledger, 0, "", &s),
            Err(CredentialError::InvalidInput(_))
        ));
    }
}
