use thiserror::Error;

use crate::types::TokenId;

/// Errors surfaced by the credential core.
///
/// Every variant is recoverable at the caller's discretion. Note that a commitment
/// mismatch is NOT an error: verification reports it as an outcome, so "forged" and
/// "does not exist" stay distinguishable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("token {0} not found")]
    NotFound(TokenId),

    #[error("claim already recorded for token {0}")]
    DuplicateClaim(TokenId),

    #[error("token {0} is soulbound and cannot be transferred")]
    SoulboundViolation(TokenId),

    #[error("caller lacks issuance authority")]
    Unauthorized,

    #[error("event log replay failed: {0}")]
    ReplayError(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

pub type CredentialResult<T> = Result<T, CredentialError>;
