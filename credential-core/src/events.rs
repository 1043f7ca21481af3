//! Append-only, hash-chained event log.
//!
//! Every mutation of the ledger is recorded as one [`EventEntry`]. Each entry commits to
//! its predecessor, so any edit to history breaks [`EventLog::verify_chain`]. Replaying the
//! entries in order reconstructs the registry and claim store exactly.

use crate::constants::{EVENT_DOMAIN, GENESIS_HASH};
use crate::error::{CredentialError, CredentialResult};
use crate::types::{Commitment, HolderId, TokenId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Hash of one log entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHash([u8; 32]);

impl EventHash {
    pub const GENESIS: EventHash = EventHash(GENESIS_HASH);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHash({})", self.to_hex())
    }
}

impl FromStr for EventHash {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CredentialError::ReplayError(format!("invalid event hash: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CredentialError::ReplayError("event hash must be 32 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for EventHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EventHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A state transition recorded on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    Minted {
        holder: HolderId,
        token_id: TokenId,
        commitment: Commitment,
        /// Ledger sequence number at which the token was issued.
        issued_at: u64,
        metadata_uri: Option<String>,
    },
    ClaimAdded {
        token_id: TokenId,
        claim_commitment: Commitment,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::Minted { .. } => "minted",
            LedgerEvent::ClaimAdded { .. } => "claim_added",
        }
    }

    pub fn token_id(&self) -> TokenId {
        match self {
            LedgerEvent::Minted { token_id, .. } | LedgerEvent::ClaimAdded { token_id, .. } => *token_id,
        }
    }
}

/// One immutable log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub prev_hash: EventHash,
    pub hash: EventHash,
    pub event: LedgerEvent,
}

impl EventEntry {
    /// Build the entry that follows `prev_hash` at position `sequence`.
    pub fn seal(
        sequence: u64,
        recorded_at: DateTime<Utc>,
        prev_hash: EventHash,
        event: LedgerEvent,
    ) -> CredentialResult<Self> {
        let hash = compute_hash(sequence, &recorded_at, &prev_hash, &event)?;
        Ok(Self {
            sequence,
            recorded_at,
            prev_hash,
            hash,
            event,
        })
    }

    /// Recompute this entry's hash from its contents.
    pub fn recompute_hash(&self) -> CredentialResult<EventHash> {
        compute_hash(self.sequence, &self.recorded_at, &self.prev_hash, &self.event)
    }
}

fn compute_hash(
    sequence: u64,
    recorded_at: &DateTime<Utc>,
    prev_hash: &EventHash,
    event: &LedgerEvent,
) -> CredentialResult<EventHash> {
    let event_bytes = serde_json::to_vec(event)
        .map_err(|e| CredentialError::EncodingError(format!("event serialization failed: {e}")))?;
    let ts = recorded_at.to_rfc3339_opts(SecondsFormat::Nanos, true);

    let mut hasher = Sha256::new();
    hasher.update(EVENT_DOMAIN);
    hasher.update(prev_hash.0);
    hasher.update(sequence.to_be_bytes());
    hasher.update((ts.len() as u32).to_be_bytes());
    hasher.update(ts.as_bytes());
    hasher.update((event_bytes.len() as u32).to_be_bytes());
    hasher.update(&event_bytes);

    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(EventHash(out))
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<EventEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next entry must carry.
    pub fn height(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn head(&self) -> EventHash {
        self.entries.last().map_or(EventHash::GENESIS, |e| e.hash)
    }

    pub fn entries(&self) -> &[EventEntry] {
        &self.entries
    }

    pub fn page(&self, offset: u64, limit: u64) -> Vec<EventEntry> {
        self.entries
            .iter()
            .skip(offset.min(usize::MAX as u64) as usize)
            .take(limit.min(usize::MAX as u64) as usize)
            .cloned()
            .collect()
    }

    /// Seal `event` as the next entry without appending it.
    pub fn prepare(&self, event: LedgerEvent, recorded_at: DateTime<Utc>) -> CredentialResult<EventEntry> {
        EventEntry::seal(self.height(), recorded_at, self.head(), event)
    }

    /// Check that `entry` is exactly the next link of this chain.
    pub fn check_next(&self, entry: &EventEntry) -> CredentialResult<()> {
        if entry.sequence != self.height() {
            return Err(CredentialError::ReplayError(format!(
                "expected sequence {}, got {}",
                self.height(),
                entry.sequence
            )));
        }
        if entry.prev_hash != self.head() {
            return Err(CredentialError::ReplayError(format!(
                "entry {} does not link to the current head",
                entry.sequence
            )));
        }
        if entry.recompute_hash()? != entry.hash {
            return Err(CredentialError::ReplayError(format!(
                "entry {} hash does not match its contents",
                entry.sequence
            )));
        }
        Ok(())
    }

    /// Append a validated entry.
    pub fn push(&mut self, entry: EventEntry) -> CredentialResult<()> {
        self.check_next(&entry)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Walk the whole chain from genesis and check every link.
    pub fn verify_chain(&self) -> CredentialResult<()> {
        let mut prev = EventHash::GENESIS;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.sequence != i as u64 || entry.prev_hash != prev || entry.recompute_hash()? != entry.hash {
                return Err(CredentialError::ReplayError(format!("chain broken at entry {i}")));
            }
            prev = entry.hash;
        }
        Ok(())
    }
}
