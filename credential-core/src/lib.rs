//! Credential core for the EduVault soulbound degree ledger.
//!
//! This crate contains:
//! - Commitment hashing for credential attributes and salted predicate claims.
//! - The soulbound credential registry and the attribute claim store.
//! - A hash-chained event log and the single-writer `Ledger` that ties them together.
//! - Verifier-side protocols for exact and attribute verification.

pub mod claims;
pub mod constants;
pub mod error;
pub mod events;
pub mod hashing;
pub mod ledger;
pub mod registry;
pub mod types;
pub mod verify;

pub use error::{CredentialError, CredentialResult};
pub use events::{EventEntry, EventHash, LedgerEvent};
pub use ledger::{Ledger, LedgerSummary, MintReceipt};
pub use types::{Commitment, CredentialAttributes, CredentialRecord, HolderId, Salt, TokenId};
pub use verify::VerificationOutcome;
