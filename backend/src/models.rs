use credential_core::{Commitment, EventEntry, EventHash, TokenId, VerificationOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueCredentialRequest {
    /// Holder identity (wallet address).
    pub holder: String,
    pub name: String,
    pub degree: String,
    pub year: String,
    /// Optional metadata pointer stored with the token.
    pub metadata_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueCredentialResponse {
    pub token_id: TokenId,
    pub commitment: Commitment,
    pub issued_at: u64,
    pub event_hash: EventHash,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddClaimRequest {
    /// Human-readable predicate, e.g. `GPA_ABOVE_7.5`.
    pub label: String,

    /// Hex salt. Omit to have the server draw one.
    pub salt_hex: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddClaimResponse {
    pub token_id: TokenId,
    pub claim_commitment: Commitment,

    /// Hand this to the holder out of band; it is not stored by the ledger.
    pub salt_hex: String,
    pub event_hash: EventHash,
}

/// Public view of a token. Never includes the committed attributes.
#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialView {
    pub token_id: TokenId,
    pub holder: String,
    pub commitment: Commitment,
    pub issued_at: u64,
    pub metadata_uri: Option<String>,
    pub claim_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HolderCredentialsResponse {
    pub holder: String,
    pub token_ids: Vec<TokenId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCredentialRequest {
    pub token_id: TokenId,
    pub name: String,
    pub degree: String,
    pub year: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCredentialResponse {
    pub token_id: TokenId,
    pub outcome: VerificationOutcome,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyClaimRequest {
    pub token_id: TokenId,
    pub label: String,
    pub salt_hex: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyClaimResponse {
    pub token_id: TokenId,
    pub holds: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListEventsParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventListResponse {
    pub offset: u64,
    pub limit: u64,
    pub height: u64,
    pub events: Vec<EventEntry>,
}
