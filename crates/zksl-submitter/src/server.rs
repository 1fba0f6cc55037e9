//! HTTP ingress for the submitter. Handlers are thin shims over `*_impl`
//! functions that take plain headers and bytes, so the whole surface is
//! exercisable without a socket.

use crate::anchor::anchor_artifact;
use crate::artifact_store::ArtifactStore;
use crate::auth::authorize;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::idempotency::{CachedResponse, IdempotencyCache};
use crate::ledger::Ledger;
use crate::rate_limit::RateLimiter;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use zksl_core::artifact::{artifact_id_from_proof_hash, Artifact};
use zksl_core::canonical::Hex32;
use zksl_core::signer::AggregatorSigner;
use zksl_store::Store;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

struct Inner {
    cfg: Config,
    signer: AggregatorSigner,
    ledger: Ledger,
    artifacts: ArtifactStore,
    idempotency: IdempotencyCache,
    rate: RateLimiter,
    store: Mutex<Store>,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    pub fn new(cfg: Config, signer: AggregatorSigner, ledger: Ledger, store: Store) -> ApiResult<Self> {
        let artifacts = ArtifactStore::new(cfg.artifact_dir.clone())?;
        let idempotency = IdempotencyCache::new(cfg.idemp_max_entries);
        let rate = RateLimiter::new(cfg.ratelimit_max, cfg.ratelimit_window);
        Ok(Self {
            inner: Arc::new(Inner {
                cfg,
                signer,
                ledger,
                artifacts,
                idempotency,
                rate,
                store: Mutex::new(store),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    pub fn signer(&self) -> &AggregatorSigner {
        &self.inner.signer
    }

    pub fn ledger(&self) -> &Ledger {
        &self.inner.ledger
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.inner.artifacts
    }

    pub fn idempotency(&self) -> &IdempotencyCache {
        &self.inner.idempotency
    }

    pub fn rate(&self) -> &RateLimiter {
        &self.inner.rate
    }

    pub fn store(&self) -> parking_lot::MutexGuard<'_, Store> {
        self.inner.store.lock()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/prove", post(prove))
        .route("/artifact", post(prove))
        .route("/anchor", post(anchor))
        .route("/proof/{id}", get(proof))
        .route("/validator/{pubkey}", get(validator))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ProveRequest {
    start_slot: u64,
    end_slot: u64,
    state_root_before: String,
    state_root_after: String,
}

#[derive(Debug, Deserialize)]
struct AnchorRequest {
    artifact_id: String,
}

async fn prove(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match prove_impl(&state, addr.ip(), &headers, &body).await {
        Ok(resp) => json_response(resp),
        Err(err) => err.into_response(),
    }
}

async fn anchor(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match anchor_impl(&state, addr.ip(), &headers, &body).await {
        Ok(resp) => json_response(resp),
        Err(err) => err.into_response(),
    }
}

async fn proof(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    match proof_impl(&state, addr.ip(), &headers, &id) {
        Ok(body) => json_response(CachedResponse { status: 200, body }),
        Err(err) => err.into_response(),
    }
}

async fn validator(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(pubkey): Path<String>,
) -> Response {
    match validator_impl(&state, addr.ip(), &headers, &pubkey) {
        Ok(body) => json_response(CachedResponse { status: 200, body }),
        Err(err) => err.into_response(),
    }
}

async fn health() -> Response {
    let body = json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") });
    (StatusCode::OK, axum::Json(body)).into_response()
}

fn json_response(resp: CachedResponse) -> Response {
    (
        StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        resp.body,
    )
        .into_response()
}

fn idempotency_key(headers: &HeaderMap) -> ApiResult<String> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Err(ApiError::MissingIdempotencyKey);
    };
    let key = value
        .to_str()
        .map_err(|_| ApiError::MissingIdempotencyKey)?;
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(ApiError::MissingIdempotencyKey);
    }
    Ok(key.to_string())
}

/// `POST /prove` and `POST /artifact`: canonicalize, mint the identifier,
/// persist the canonical JSON (first write wins), reply with the identity.
pub async fn prove_impl(
    state: &AppState,
    client: IpAddr,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<CachedResponse> {
    state.rate().check(client)?;
    authorize(headers, &state.config().api_keys)?;
    let key = idempotency_key(headers)?;
    let cache_key = format!("artifact:{key}");
    if let Some(cached) = state.idempotency().get(&cache_key) {
        return Ok(cached);
    }

    let req: ProveRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;
    let before = Hex32::parse(&req.state_root_before)
        .map_err(|_| ApiError::BadRequest("state_root_before must be 64 hex characters".into()))?;
    let after = Hex32::parse(&req.state_root_after)
        .map_err(|_| ApiError::BadRequest("state_root_after must be 64 hex characters".into()))?;
    let artifact = Artifact::new(req.start_slot, req.end_slot, before, after)?;

    let canonical = artifact.canonical_bytes()?;
    let proof_hash = artifact.proof_hash()?;
    let artifact_id = artifact_id_from_proof_hash(&proof_hash);
    let created = state.artifacts().write_if_absent(&artifact_id, &canonical)?;
    tracing::info!(
        artifact_id = %artifact_id,
        start_slot = %artifact.start_slot,
        end_slot = %artifact.end_slot,
        created = %created,
        "artifact canonicalized"
    );

    let body = serde_json::to_vec(&json!({
        "artifact_id": artifact_id.to_string(),
        "proof_hash": hex::encode(proof_hash),
    }))
    .map_err(|e| ApiError::AnchorSubmitFailed(e.to_string()))?;
    let response = CachedResponse { status: 200, body };
    state.idempotency().put(&cache_key, response.clone());
    Ok(response)
}

/// `POST /anchor`: run the full C4 pipeline for a previously minted artifact.
pub async fn anchor_impl(
    state: &AppState,
    client: IpAddr,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<CachedResponse> {
    state.rate().check(client)?;
    authorize(headers, &state.config().api_keys)?;
    let key = idempotency_key(headers)?;
    let cache_key = format!("anchor:{key}");
    if let Some(cached) = state.idempotency().get(&cache_key) {
        return Ok(cached);
    }

    let req: AnchorRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;
    let artifact_id = Uuid::parse_str(&req.artifact_id)
        .map_err(|_| ApiError::BadRequest("artifact_id must be a UUID".into()))?;

    let outcome = anchor_artifact(state, &artifact_id).await?;
    let body = serde_json::to_vec(&json!({
        "aggregator_signature": outcome.aggregator_signature,
        "ds_hash": outcome.ds_hash,
        "transaction_id": outcome.transaction_id,
    }))
    .map_err(|e| ApiError::AnchorSubmitFailed(e.to_string()))?;
    let response = CachedResponse { status: 200, body };
    state.idempotency().put(&cache_key, response.clone());
    Ok(response)
}

/// `GET /proof/:id`: the artifact plus its reconciled status, if any.
pub fn proof_impl(
    state: &AppState,
    client: IpAddr,
    headers: &HeaderMap,
    id: &str,
) -> ApiResult<Vec<u8>> {
    state.rate().check(client)?;
    authorize(headers, &state.config().api_keys)?;
    let artifact_id =
        Uuid::parse_str(id).map_err(|_| ApiError::BadRequest("id must be a UUID".into()))?;

    let row = state.store().proof_by_artifact_id(&artifact_id.to_string())?;
    let artifact = match state.artifacts().read(&artifact_id)? {
        Some(bytes) => serde_json::from_slice::<serde_json::Value>(&bytes)
            .map_err(|e| ApiError::AnchorSubmitFailed(format!("stored artifact unreadable: {e}")))?,
        None => match &row {
            Some(row) => json!({
                "start_slot": row.start_slot,
                "end_slot": row.end_slot,
                "state_root_before": hex::encode(row.state_root_before),
                "state_root_after": hex::encode(row.state_root_after),
            }),
            None => return Err(ApiError::NotFound),
        },
    };
    let status = row.map(|r| r.commitment_level.as_str());

    serde_json::to_vec(&json!({ "artifact": artifact, "status": status }))
        .map_err(|e| ApiError::AnchorSubmitFailed(e.to_string()))
}

/// `GET /validator/:pubkey`: the indexed participant record.
pub fn validator_impl(
    state: &AppState,
    client: IpAddr,
    headers: &HeaderMap,
    pubkey: &str,
) -> ApiResult<Vec<u8>> {
    state.rate().check(client)?;
    authorize(headers, &state.config().api_keys)?;

    let Some(row) = state.store().validator_by_pubkey(pubkey)? else {
        return Err(ApiError::NotFound);
    };
    serde_json::to_vec(&json!({
        "validator": {
            "pubkey": row.pubkey,
            "status": row.status,
            "escrow": row.escrow,
            "lock_ts": row.lock_ts,
            "unlock_ts": row.unlock_ts,
            "num_accepts": row.num_accepts,
            "last_seen": row.last_seen,
        }
    }))
    .map_err(|e| ApiError::AnchorSubmitFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn idempotency_key_is_required_and_bounded() {
        assert!(matches!(
            idempotency_key(&HeaderMap::new()),
            Err(ApiError::MissingIdempotencyKey)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static(""));
        assert!(idempotency_key(&headers).is_err());

        let long = "k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1);
        headers.insert(
            IDEMPOTENCY_KEY_HEADER,
            HeaderValue::from_str(&long).expect("header"),
        );
        assert!(idempotency_key(&headers).is_err());

        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("req-1"));
        assert_eq!(idempotency_key(&headers).expect("key"), "req-1");
    }
}
