use crate::db;
use crate::errors::ApiError;
use crate::state::AppState;
use chrono::Utc;
use credential_core::hashing::{commit_claim, commit_credential};
use credential_core::{Commitment, CredentialAttributes, EventEntry, HolderId, MintReceipt, Salt, TokenId};
use tracing::{error, info};

/// Commit the entry durably, then apply it to the in-memory ledger.
///
/// Must be called with the writer lock held.
async fn persist_and_apply(state: &AppState, entry: EventEntry) -> Result<(), ApiError> {
    db::append_event(&state.db, &entry).await?;

    // Unreachable while the writer lock is held; if it ever happens the store is ahead
    // of memory and a restart replays it.
    if let Err(e) = state.ledger.apply(entry) {
        error!(error = %e, "persisted event could not be applied");
        return Err(ApiError::Internal);
    }
    Ok(())
}

/// Issue a degree credential to `holder`.
///
/// Callers must have passed the issuance authority check.
pub async fn issue_credential(
    state: &AppState,
    holder: HolderId,
    attrs: &CredentialAttributes,
    metadata_uri: Option<String>,
) -> Result<MintReceipt, ApiError> {
    let commitment = commit_credential(attrs)?;

    let _guard = state.writer().await;
    let entry = state
        .ledger
        .stage_mint(holder.clone(), commitment, metadata_uri, Utc::now())?;
    let receipt = MintReceipt::from_entry(&entry).ok_or(ApiError::Internal)?;

    persist_and_apply(state, entry).await?;

    info!(token_id = receipt.token_id, %holder, issued_at = receipt.issued_at, "credential issued");
    Ok(receipt)
}

/// Record a salted predicate claim against an issued token.
///
/// When no salt is supplied a fresh one is drawn; either way the salt is returned so the
/// issuer can hand it to the holder out of band.
pub async fn add_claim(
    state: &AppState,
    token_id: TokenId,
    label: &str,
    salt: Option<Salt>,
) -> Result<(Commitment, Salt, EventEntry), ApiError> {
    let salt = salt.unwrap_or_else(Salt::generate);
    let claim = commit_claim(label, &salt)?;

    let _guard = state.writer().await;
    let entry = state.ledger.stage_claim(token_id, claim, Utc::now())?;
    persist_and_apply(state, entry.clone()).await?;

    info!(token_id, sequence = entry.sequence, "attribute claim recorded");
    Ok((claim, salt, entry))
}

/// Log every committed ledger event.
pub fn spawn_event_logger(state: &AppState) {
    let mut rx = state.ledger.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(entry) => info!(
                    sequence = entry.sequence,
                    kind = entry.event.kind(),
                    token_id = entry.event.token_id(),
                    hash = %entry.hash,
                    "ledger event"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged behind the ledger");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
