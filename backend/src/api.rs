use crate::errors::ApiError;
use crate::issuance;
use crate::models::*;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use credential_core::verify::{verify_claim, verify_credential};
use credential_core::{CredentialAttributes, CredentialError, HolderId, LedgerSummary, Salt, TokenId};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const DEFAULT_PAGE: u64 = 50;
const MAX_PAGE: u64 = 500;

pub fn router(state: AppState) -> Router {
    // Issuance authority surface: minting and claim addition.
    let protected_routes = Router::new()
        .route("/api/v1/credentials", post(create_credential))
        .route("/api/v1/credentials/:id/claims", post(create_claim))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/ledger", get(get_ledger))
        .route("/api/v1/events", get(list_events))
        .route("/api/v1/credentials/:id", get(get_credential))
        .route("/api/v1/credentials/:id/transfer", post(transfer_credential))
        .route("/api/v1/holders/:holder/credentials", get(holder_credentials))
        .route("/api/v1/verify/credential", post(verify_credential_handler))
        .route("/api/v1/verify/claim", post(verify_claim_handler))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(provided_key) = headers.get("X-API-KEY") {
        if provided_key == state.config.api_key.as_str() {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!(path = %request.uri().path(), "rejected call without issuance authority");
    Err(CredentialError::Unauthorized.into())
}

async fn create_credential(
    State(state): State<AppState>,
    Json(req): Json<IssueCredentialRequest>,
) -> Result<Json<IssueCredentialResponse>, ApiError> {
    let holder = HolderId::new(req.holder)?;
    let attrs = CredentialAttributes::new(req.name, req.degree, req.year);

    let receipt = issuance::issue_credential(&state, holder, &attrs, req.metadata_uri).await?;

    Ok(Json(IssueCredentialResponse {
        token_id: receipt.token_id,
        commitment: receipt.commitment,
        issued_at: receipt.issued_at,
        event_hash: receipt.event_hash,
    }))
}

async fn create_claim(
    State(state): State<AppState>,
    Path(id): Path<TokenId>,
    Json(req): Json<AddClaimRequest>,
) -> Result<Json<AddClaimResponse>, ApiError> {
    let salt = req.salt_hex.as_deref().map(Salt::from_hex).transpose()?;

    let (claim_commitment, salt, entry) = issuance::add_claim(&state, id, &req.label, salt).await?;

    Ok(Json(AddClaimResponse {
        token_id: id,
        claim_commitment,
        salt_hex: salt.to_hex(),
        event_hash: entry.hash,
    }))
}

async fn get_ledger(State(state): State<AppState>) -> Result<Json<LedgerSummary>, ApiError> {
    Ok(Json(state.ledger.summary()?))
}

async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<ListEventsParams>,
) -> Result<Json<EventListResponse>, ApiError> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);

    let events = state.ledger.events(offset, limit)?;
    let height = state.ledger.summary()?.height;

    Ok(Json(EventListResponse {
        offset,
        limit,
        height,
        events,
    }))
}

async fn get_credential(
    State(state): State<AppState>,
    Path(id): Path<TokenId>,
) -> Result<Json<CredentialView>, ApiError> {
    let record = state.ledger.record(id)?;
    let claim_count = state.ledger.claim_count(id)?;

    Ok(Json(CredentialView {
        token_id: record.token_id,
        holder: record.holder.to_string(),
        commitment: record.commitment,
        issued_at: record.issued_at,
        metadata_uri: record.metadata_uri,
        claim_count,
    }))
}

async fn holder_credentials(
    State(state): State<AppState>,
    Path(holder): Path<String>,
) -> Result<Json<HolderCredentialsResponse>, ApiError> {
    let holder = HolderId::new(holder)?;
    let token_ids = state.ledger.tokens_of(&holder)?;

    Ok(Json(HolderCredentialsResponse {
        holder: holder.to_string(),
        token_ids,
    }))
}

/// Always rejected: credentials are soulbound.
async fn transfer_credential(
    State(state): State<AppState>,
    Path(id): Path<TokenId>,
    Json(req): Json<TransferRequest>,
) -> Result<StatusCode, ApiError> {
    let from = HolderId::new(req.from)?;
    let to = HolderId::new(req.to)?;

    if let Err(e) = state.ledger.transfer(&from, &to, id) {
        tracing::warn!(token_id = id, %from, %to, "transfer attempt rejected");
        return Err(e.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn verify_credential_handler(
    State(state): State<AppState>,
    Json(req): Json<VerifyCredentialRequest>,
) -> Result<Json<VerifyCredentialResponse>, ApiError> {
    let claimed = CredentialAttributes::new(req.name, req.degree, req.year);
    let outcome = verify_credential(&state.ledger, req.token_id, &claimed)?;

    tracing::info!(token_id = req.token_id, ?outcome, "credential verification");
    Ok(Json(VerifyCredentialResponse {
        token_id: req.token_id,
        outcome,
    }))
}

async fn verify_claim_handler(
    State(state): State<AppState>,
    Json(req): Json<VerifyClaimRequest>,
) -> Result<Json<VerifyClaimResponse>, ApiError> {
    let salt = Salt::from_hex(&req.salt_hex)?;
    let holds = verify_claim(&state.ledger, req.token_id, &req.label, &salt)?;

    Ok(Json(VerifyClaimResponse {
        token_id: req.token_id,
        holds,
    }))
}
