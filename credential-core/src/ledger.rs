//! The authoritative single-writer ledger.
//!
//! `Ledger` owns the registry, the claim store and the event log behind one lock. Every
//! mutation goes through [`Ledger::apply`] (directly, or via [`Ledger::mint`] /
//! [`Ledger::add_claim`]), which validates an [`EventEntry`] against the current state and
//! then commits it in full, or not at all.
//!
//! Writers that persist events elsewhere use the stage/apply split:
//!
//! 1. `stage_*` builds the next entry from a read snapshot (no state change),
//! 2. the caller stores the entry durably,
//! 3. `apply` commits it in memory.
//!
//! Replaying a stored log through `apply` rebuilds the exact same state.

use crate::claims::ClaimStore;
use crate::constants::{EVENT_CHANNEL_CAPACITY, MAX_FIELD_BYTES};
use crate::error::{CredentialError, CredentialResult};
use crate::events::{EventEntry, EventHash, EventLog, LedgerEvent};
use crate::registry::CredentialRegistry;
use crate::types::{Commitment, CredentialRecord, HolderId, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Default)]
struct LedgerState {
    registry: CredentialRegistry,
    claims: ClaimStore,
    log: EventLog,
}

/// Returned to the issuer after a successful mint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub token_id: TokenId,
    pub commitment: Commitment,
    pub issued_at: u64,
    pub event_hash: EventHash,
}

impl MintReceipt {
    /// Receipt for a mint entry; `None` for any other kind of entry.
    pub fn from_entry(entry: &EventEntry) -> Option<Self> {
        match &entry.event {
            LedgerEvent::Minted {
                token_id,
                commitment,
                issued_at,
                ..
            } => Some(Self {
                token_id: *token_id,
                commitment: *commitment,
                issued_at: *issued_at,
                event_hash: entry.hash,
            }),
            LedgerEvent::ClaimAdded { .. } => None,
        }
    }
}

/// Point-in-time summary of the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub name: String,
    pub symbol: String,
    pub total_supply: usize,
    pub height: u64,
    pub head: EventHash,
}

pub struct Ledger {
    state: RwLock<LedgerState>,
    events: broadcast::Sender<EventEntry>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(LedgerState::default()),
            events,
        }
    }

    /// Rebuild a ledger from a stored event log, in sequence order.
    pub fn replay<I>(entries: I) -> CredentialResult<Self>
    where
        I: IntoIterator<Item = EventEntry>,
    {
        let ledger = Self::new();
        {
            let mut state = ledger.write()?;
            for entry in entries {
                apply_locked(&mut state, entry)?;
            }
        }
        Ok(ledger)
    }

    fn read(&self) -> CredentialResult<RwLockReadGuard<'_, LedgerState>> {
        self.state.read().map_err(|_| CredentialError::LockPoisoned)
    }

    fn write(&self) -> CredentialResult<RwLockWriteGuard<'_, LedgerState>> {
        self.state.write().map_err(|_| CredentialError::LockPoisoned)
    }

    /// Subscribe to entries committed from now on.
    ///
    /// Subscribers observe history; they cannot alter it. Earlier entries are available
    /// from [`Ledger::events`].
    pub fn subscribe(&self) -> broadcast::Receiver<EventEntry> {
        self.events.subscribe()
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Build (but do not commit) the mint entry for `holder`.
    pub fn stage_mint(
        &self,
        holder: HolderId,
        commitment: Commitment,
        metadata_uri: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> CredentialResult<EventEntry> {
        let state = self.read()?;
        stage_mint_locked(&state, holder, commitment, metadata_uri, recorded_at)
    }

    /// Build (but do not commit) the claim entry for `token_id`.
    pub fn stage_claim(
        &self,
        token_id: TokenId,
        claim: Commitment,
        recorded_at: DateTime<Utc>,
    ) -> CredentialResult<EventEntry> {
        let state = self.read()?;
        stage_claim_locked(&state, token_id, claim, recorded_at)
    }

    /// Validate and commit one entry.
    pub fn apply(&self, entry: EventEntry) -> CredentialResult<()> {
        let mut state = self.write()?;
        apply_locked(&mut state, entry.clone())?;
        drop(state);

        let _ = self.events.send(entry);
        Ok(())
    }

    /// Mint in one atomic step: allocation, insertion and event append happen under a
    /// single write lock.
    pub fn mint(
        &self,
        holder: HolderId,
        commitment: Commitment,
        metadata_uri: Option<String>,
    ) -> CredentialResult<MintReceipt> {
        let entry = {
            let mut state = self.write()?;
            let entry = stage_mint_locked(&state, holder, commitment, metadata_uri, Utc::now())?;
            apply_locked(&mut state, entry.clone())?;
            entry
        };

        let receipt = MintReceipt::from_entry(&entry)
            .ok_or_else(|| CredentialError::ReplayError("mint produced a non-mint entry".to_string()))?;
        let _ = self.events.send(entry);
        Ok(receipt)
    }

    /// Record a claim commitment in one atomic step.
    pub fn add_claim(&self, token_id: TokenId, claim: Commitment) -> CredentialResult<EventEntry> {
        let entry = {
            let mut state = self.write()?;
            let entry = stage_claim_locked(&state, token_id, claim, Utc::now())?;
            apply_locked(&mut state, entry.clone())?;
            entry
        };

        let _ = self.events.send(entry.clone());
        Ok(entry)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn get_commitment(&self, token_id: TokenId) -> CredentialResult<Commitment> {
        self.read()?.registry.get_commitment(token_id)
    }

    pub fn verify(&self, token_id: TokenId, candidate: &Commitment) -> CredentialResult<bool> {
        self.read()?.registry.verify(token_id, candidate)
    }

    pub fn exists(&self, token_id: TokenId) -> CredentialResult<bool> {
        Ok(self.read()?.registry.exists(token_id))
    }

    pub fn has_claim(&self, token_id: TokenId, claim: &Commitment) -> CredentialResult<bool> {
        Ok(self.read()?.claims.has_claim(token_id, claim))
    }

    pub fn claim_count(&self, token_id: TokenId) -> CredentialResult<usize> {
        Ok(self.read()?.claims.claim_count(token_id))
    }

    pub fn record(&self, token_id: TokenId) -> CredentialResult<CredentialRecord> {
        self.read()?.registry.record(token_id).cloned()
    }

    pub fn owner_of(&self, token_id: TokenId) -> CredentialResult<HolderId> {
        self.read()?.registry.owner_of(token_id).cloned()
    }

    pub fn token_uri(&self, token_id: TokenId) -> CredentialResult<Option<String>> {
        Ok(self.read()?.registry.token_uri(token_id)?.map(str::to_owned))
    }

    pub fn tokens_of(&self, holder: &HolderId) -> CredentialResult<Vec<TokenId>> {
        Ok(self.read()?.registry.tokens_of(holder))
    }

    pub fn transfer(&self, from: &HolderId, to: &HolderId, token_id: TokenId) -> CredentialResult<()> {
        self.read()?.registry.transfer(from, to, token_id)
    }

    pub fn events(&self, offset: u64, limit: u64) -> CredentialResult<Vec<EventEntry>> {
        Ok(self.read()?.log.page(offset, limit))
    }

    pub fn verify_chain(&self) -> CredentialResult<()> {
        self.read()?.log.verify_chain()
    }

    pub fn summary(&self) -> CredentialResult<LedgerSummary> {
        let state = self.read()?;
        Ok(LedgerSummary {
            name: state.registry.name().to_string(),
            symbol: state.registry.symbol().to_string(),
            total_supply: state.registry.total_supply(),
            height: state.log.height(),
            head: state.log.head(),
        })
    }
}

fn stage_mint_locked(
    state: &LedgerState,
    holder: HolderId,
    commitment: Commitment,
    metadata_uri: Option<String>,
    recorded_at: DateTime<Utc>,
) -> CredentialResult<EventEntry> {
    if let Some(uri) = &metadata_uri {
        if uri.trim().is_empty() || uri.chars().any(char::is_control) {
            return Err(CredentialError::InvalidInput("metadata uri is malformed".to_string()));
        }
        if uri.len() > MAX_FIELD_BYTES {
            return Err(CredentialError::InvalidInput(format!(
                "metadata uri exceeds the {MAX_FIELD_BYTES} byte limit"
            )));
        }
    }

    let event = LedgerEvent::Minted {
        holder,
        token_id: state.registry.next_token_id(),
        commitment,
        issued_at: state.log.height(),
        metadata_uri,
    };
    state.log.prepare(event, recorded_at)
}

fn stage_claim_locked(
    state: &LedgerState,
    token_id: TokenId,
    claim: Commitment,
    recorded_at: DateTime<Utc>,
) -> CredentialResult<EventEntry> {
    if !state.registry.exists(token_id) {
        return Err(CredentialError::NotFound(token_id));
    }
    if state.claims.has_claim(token_id, &claim) {
        return Err(CredentialError::DuplicateClaim(token_id));
    }

    let event = LedgerEvent::ClaimAdded {
        token_id,
        claim_commitment: claim,
    };
    state.log.prepare(event, recorded_at)
}

/// Validate `entry` against `state` and commit it. Nothing changes on error.
fn apply_locked(state: &mut LedgerState, entry: EventEntry) -> CredentialResult<()> {
    state.log.check_next(&entry)?;

    match &entry.event {
        LedgerEvent::Minted {
            holder,
            token_id,
            commitment,
            issued_at,
            metadata_uri,
        } => {
            if *token_id != state.registry.next_token_id() {
                return Err(CredentialError::ReplayError(format!(
                    "mint of token {token_id} out of order, expected {}",
                    state.registry.next_token_id()
                )));
            }
            if *issued_at != entry.sequence {
                return Err(CredentialError::ReplayError(format!(
                    "token {token_id} issued_at {issued_at} does not match sequence {}",
                    entry.sequence
                )));
            }
            state
                .registry
                .mint(holder.clone(), *commitment, metadata_uri.clone(), *issued_at)?;
            debug!(token_id, %holder, %commitment, "credential minted");
        }
        LedgerEvent::ClaimAdded {
            token_id,
            claim_commitment,
        } => {
            state.claims.add_claim(&state.registry, *token_id, *claim_commitment)?;
            debug!(token_id, "attribute claim recorded");
        }
    }

    state.log.push(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::{commit, commit_claim};
    use crate::types::Salt;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn holder(s: &str) -> HolderId {
        HolderId::new(s).unwrap()
    }

    #[test]
    fn mint_emits_receipt_and_event() {
        let ledger = Ledger::new();
        let mut rx = ledger.subscribe();
        let c = commit(&["Rahul Verma", "B.Tech CS", "2024"]).unwrap();

        let receipt = ledger.mint(holder("H1"), c, None).unwrap();
        assert_eq!(receipt.token_id, 0);
        assert_eq!(receipt.commitment, c);
        assert_eq!(receipt.issued_at, 0);

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.hash, receipt.event_hash);
        assert_eq!(
            entry.event,
            LedgerEvent::Minted {
                holder: holder("H1"),
                token_id: 0,
                commitment: c,
                issued_at: 0,
                metadata_uri: None,
            }
        );
    }

    #[test]
    fn failed_claim_leaves_no_trace() {
        let ledger = Ledger::new();
        let claim = commit_claim("GPA_ABOVE_7.5", &Salt::generate()).unwrap();
        assert_eq!(ledger.add_claim(0, claim), Err(CredentialError::NotFound(0)));
        assert_eq!(ledger.summary().unwrap().height, 0);

        ledger.mint(holder("H1"), commit(&["a"]).unwrap(), None).unwrap();
        ledger.add_claim(0, claim).unwrap();
        assert_eq!(ledger.add_claim(0, claim), Err(CredentialError::DuplicateClaim(0)));
        assert_eq!(ledger.summary().unwrap().height, 2);
        assert_eq!(ledger.claim_count(0).unwrap(), 1);
    }

    #[test]
    fn oversized_metadata_uri_is_rejected() {
        let ledger = Ledger::new();
        let c = commit(&["a"]).unwrap();
        let uri = format!("ipfs://{}", "q".repeat(MAX_FIELD_BYTES));
        assert!(matches!(
            ledger.mint(holder("H1"), c, Some(uri)),
            Err(CredentialError::InvalidInput(_))
        ));
        assert_eq!(ledger.summary().unwrap().height, 0);

        let receipt = ledger.mint(holder("H1"), c, Some("ipfs://degree/0".to_string())).unwrap();
        assert_eq!(ledger.token_uri(receipt.token_id).unwrap().as_deref(), Some("ipfs://degree/0"));
    }

    #[test]
    fn issued_at_tracks_ledger_height() {
        let ledger = Ledger::new();
        let c = commit(&["a"]).unwrap();
        ledger.mint(holder("H1"), c, None).unwrap();
        ledger
            .add_claim(0, commit_claim("X", &Salt::generate()).unwrap())
            .unwrap();
        let second = ledger.mint(holder("H2"), c, None).unwrap();
        assert_eq!(second.token_id, 1);
        assert_eq!(second.issued_at, 2);
    }

    #[test]
    fn stage_then_apply_matches_direct_mint() {
        let ledger = Ledger::new();
        let c = commit(&["a"]).unwrap();
        let staged = ledger
            .stage_mint(holder("H1"), c, Some("ipfs://x".to_string()), Utc::now())
            .unwrap();

        // Staging alone changes nothing.
        assert!(!ledger.exists(0).unwrap());

        ledger.apply(staged.clone()).unwrap();
        assert_eq!(ledger.token_uri(0).unwrap().as_deref(), Some("ipfs://x"));

        // A stale staged entry cannot be applied twice.
        assert!(matches!(ledger.apply(staged), Err(CredentialError::ReplayError(_))));
    }

    #[test]
    fn replay_reconstructs_state() {
        let ledger = Ledger::new();
        let salt = Salt::generate();
        let claim = commit_claim("GPA_ABOVE_7.5", &salt).unwrap();
        let c0 = commit(&["Rahul Verma", "B.Tech CS", "2024"]).unwrap();
        let c1 = commit(&["Asha Rao", "M.Sc Physics", "2022"]).unwrap();
        ledger.mint(holder("H1"), c0, None).unwrap();
        ledger.add_claim(0, claim).unwrap();
        ledger.mint(holder("H2"), c1, Some("ipfs://1".to_string())).unwrap();

        let log = ledger.events(0, u64::MAX).unwrap();
        let rebuilt = Ledger::replay(log).unwrap();

        assert_eq!(rebuilt.summary().unwrap(), ledger.summary().unwrap());
        assert_eq!(rebuilt.record(1).unwrap(), ledger.record(1).unwrap());
        assert!(rebuilt.has_claim(0, &claim).unwrap());
        assert!(rebuilt.verify(0, &c0).unwrap());
        rebuilt.verify_chain().unwrap();
    }

    #[test]
    fn replay_rejects_gaps() {
        let ledger = Ledger::new();
        let c = commit(&["a"]).unwrap();
        ledger.mint(holder("H1"), c, None).unwrap();
        ledger.mint(holder("H1"), c, None).unwrap();

        let mut log = ledger.events(0, u64::MAX).unwrap();
        log.remove(0);
        assert!(matches!(Ledger::replay(log), Err(CredentialError::ReplayError(_))));
    }

    #[test]
    fn concurrent_mints_get_distinct_dense_ids() {
        let ledger = Arc::new(Ledger::new());
        let c = commit(&["a"]).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| ledger.mint(holder(&format!("H{t}")), c, None).unwrap().token_id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<TokenId> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(unique, (0..400).collect::<HashSet<_>>());
        ledger.verify_chain().unwrap();
    }

    #[test]
    fn holder_never_changes() {
        let ledger = Ledger::new();
        let receipt = ledger.mint(holder("H1"), commit(&["a"]).unwrap(), None).unwrap();
        let id = receipt.token_id;

        assert_eq!(
            ledger.transfer(&holder("H1"), &holder("H2"), id),
            Err(CredentialError::SoulboundViolation(id))
        );
        ledger.mint(holder("H2"), commit(&["b"]).unwrap(), None).unwrap();
        assert_eq!(ledger.owner_of(id).unwrap(), holder("H1"));
        assert_eq!(ledger.tokens_of(&holder("H2")).unwrap(), vec![1]);
    }
}
