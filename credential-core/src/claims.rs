//! Attribute claim store.
//!
//! Per-token, append-only sets of salted claim commitments. A commitment on its own
//! reveals neither the predicate label nor the salt.

use crate::error::{CredentialError, CredentialResult};
use crate::registry::CredentialRegistry;
use crate::types::{Commitment, TokenId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct ClaimStore {
    claims: BTreeMap<TokenId, BTreeSet<Commitment>>,
}

impl ClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a claim commitment against an issued token.
    ///
    /// Re-adding an existing commitment fails with `DuplicateClaim`; it is not a silent no-op.
    pub fn add_claim(
        &mut self,
        registry: &CredentialRegistry,
        token_id: TokenId,
        claim: Commitment,
    ) -> CredentialResult<()> {
        if !registry.exists(token_id) {
            return Err(CredentialError::NotFound(token_id));
        }
        if !self.claims.entry(token_id).or_default().insert(claim) {
            return Err(CredentialError::DuplicateClaim(token_id));
        }
        Ok(())
    }

    /// Membership check. Never fails: unknown tokens simply hold no claims.
    pub fn has_claim(&self, token_id: TokenId, claim: &Commitment) -> bool {
        self.claims.get(&token_id).is_some_and(|set| set.contains(claim))
    }

    pub fn claim_count(&self, token_id: TokenId) -> usize {
        self.claims.get(&token_id).map_or(0, BTreeSet::len)
    }
}
