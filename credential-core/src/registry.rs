//! Soulbound credential registry.
//!
//! The registry is the single owner of issued records. A token moves `UNISSUED -> ISSUED`
//! exactly once (on mint) and `ISSUED` is terminal: records are never updated, deleted or
//! reassigned to another holder.

use crate::constants::{COLLECTION_NAME, COLLECTION_SYMBOL, FIRST_TOKEN_ID};
use crate::error::{CredentialError, CredentialResult};
use crate::types::{Commitment, CredentialRecord, HolderId, TokenId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct CredentialRegistry {
    next_token_id: TokenId,
    records: BTreeMap<TokenId, CredentialRecord>,
    by_holder: BTreeMap<HolderId, BTreeSet<TokenId>>,
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialRegistry {
    pub fn new() -> Self {
        Self {
            next_token_id: FIRST_TOKEN_ID,
            records: BTreeMap::new(),
            by_holder: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        COLLECTION_NAME
    }

    pub fn symbol(&self) -> &'static str {
        COLLECTION_SYMBOL
    }

    /// The ID the next successful mint will receive.
    pub fn next_token_id(&self) -> TokenId {
        self.next_token_id
    }

    /// Issue a new credential.
    ///
    /// Authorization is the caller's job: by the time a call reaches the registry the
    /// issuance authority has already been checked. Allocation and insertion happen
    /// together under `&mut self`, so IDs are dense and no partial record is observable.
    pub fn mint(
        &mut self,
        holder: HolderId,
        commitment: Commitment,
        metadata_uri: Option<String>,
        issued_at: u64,
    ) -> CredentialResult<TokenId> {
        let token_id = self.next_token_id;
        let next = token_id
            .checked_add(1)
            .ok_or_else(|| CredentialError::InvalidInput("token id space exhausted".to_string()))?;

        self.by_holder.entry(holder.clone()).or_default().insert(token_id);
        self.records.insert(
            token_id,
            CredentialRecord {
                token_id,
                holder,
                commitment,
                issued_at,
                metadata_uri,
            },
        );
        self.next_token_id = next;

        Ok(token_id)
    }

    pub fn exists(&self, token_id: TokenId) -> bool {
        self.records.contains_key(&token_id)
    }

    pub fn record(&self, token_id: TokenId) -> CredentialResult<&CredentialRecord> {
        self.records.get(&token_id).ok_or(CredentialError::NotFound(token_id))
    }

    pub fn get_commitment(&self, token_id: TokenId) -> CredentialResult<Commitment> {
        self.record(token_id).map(|r| r.commitment)
    }

    pub fn owner_of(&self, token_id: TokenId) -> CredentialResult<&HolderId> {
        self.record(token_id).map(|r| &r.holder)
    }

    pub fn token_uri(&self, token_id: TokenId) -> CredentialResult<Option<&str>> {
        self.record(token_id).map(|r| r.metadata_uri.as_deref())
    }

    /// Compare a candidate commitment against the stored one.
    ///
    /// A mismatch is `Ok(false)`; only a token that was never minted is an error.
    pub fn verify(&self, token_id: TokenId, candidate: &Commitment) -> CredentialResult<bool> {
        Ok(self.get_commitment(token_id)? == *candidate)
    }

    /// Transfers are always rejected.
    ///
    /// Unknown tokens still report `NotFound` so the rejection cannot be confused with a
    /// missing credential; every issued token reports `SoulboundViolation`.
    pub fn transfer(&self, _from: &HolderId, _to: &HolderId, token_id: TokenId) -> CredentialResult<()> {
        if !self.exists(token_id) {
            return Err(CredentialError::NotFound(token_id));
        }
        Err(CredentialError::SoulboundViolation(token_id))
    }

    pub fn tokens_of(&self, holder: &HolderId) -> Vec<TokenId> {
        self.by_holder
            .get(holder)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn balance_of(&self, holder: &HolderId) -> usize {
        self.by_holder.get(holder).map_or(0, BTreeSet::len)
    }

    pub fn total_supply(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::commit;

    fn holder(s: &str) -> HolderId {
        HolderId::new(s).unwrap()
    }

    #[test]
    fn ids_start_at_zero_and_increase() {
        let mut reg = CredentialRegistry::new();
        let c = commit(&["a"]).unwrap();
        assert_eq!(reg.mint(holder("H1"), c, None, 0).unwrap(), 0);
        assert_eq!(reg.mint(holder("H1"), c, None, 1).unwrap(), 1);
        assert_eq!(reg.mint(holder("H2"), c, None, 2).unwrap(), 2);
        assert_eq!(reg.total_supply(), 3);
        assert_eq!(reg.next_token_id(), 3);
    }

    #[test]
    fn verify_distinguishes_mismatch_from_missing() {
        let mut reg = CredentialRegistry::new();
        let c = commit(&["Rahul Verma", "B.Tech CS", "2024"]).unwrap();
        let other = commit(&["Rahul Verma", "B.Tech CS", "2023"]).unwrap();
        let id = reg.mint(holder("H1"), c, None, 0).unwrap();

        assert_eq!(reg.verify(id, &c), Ok(true));
        assert_eq!(reg.verify(id, &other), Ok(false));
        assert_eq!(reg.verify(99, &c), Err(CredentialError::NotFound(99)));
        assert_eq!(reg.get_commitment(99), Err(CredentialError::NotFound(99)));
    }

    #[test]
    fn transfer_is_always_rejected() {
        let mut reg = CredentialRegistry::new();
        let c = commit(&["a"]).unwrap();
        let id = reg.mint(holder("H1"), c, None, 0).unwrap();

        for to in ["H2", "H1", "0x0000000000000000000000000000000000000000"] {
            assert_eq!(
                reg.transfer(&holder("H1"), &holder(to), id),
                Err(CredentialError::SoulboundViolation(id))
            );
        }
        assert_eq!(reg.owner_of(id).unwrap(), &holder("H1"));
        assert_eq!(reg.tokens_of(&holder("H2")), Vec::<TokenId>::new());
        assert_eq!(
            reg.transfer(&holder("H1"), &holder("H2"), 7),
            Err(CredentialError::NotFound(7))
        );
    }

    #[test]
    fn holder_index_and_metadata() {
        let mut reg = CredentialRegistry::new();
        let c = commit(&["a"]).unwrap();
        reg.mint(holder("H1"), c, Some("ipfs://deg-0".to_string()), 0).unwrap();
        reg.mint(holder("H2"), c, None, 1).unwrap();
        reg.mint(holder("H1"), c, None, 2).unwrap();

        assert_eq!(reg.tokens_of(&holder("H1")), vec![0, 2]);
        assert_eq!(reg.balance_of(&holder("H1")), 2);
        assert_eq!(reg.balance_of(&holder("nobody")), 0);
        assert_eq!(reg.token_uri(0).unwrap(), Some("ipfs://deg-0"));
        assert_eq!(reg.token_uri(1).unwrap(), None);
        assert!(reg.token_uri(5).is_err());
        assert_eq!(reg.name(), "EduVault Degree");
        assert_eq!(reg.symbol(), "EVD");
    }
}
