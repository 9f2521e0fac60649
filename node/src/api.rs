//! # REST + WebSocket API
//!
//! The axum router in front of the [`Ledger`]. Handlers are thin: decode,
//! call one ledger operation, record metrics, publish events, encode.
//!
//! ## Endpoints
//!
//! | Method | Path               | Description                              |
//! |--------|--------------------|------------------------------------------|
//! | GET    | `/health`          | Liveness probe                           |
//! | GET    | `/status`          | Height, pending count, sealer key        |
//! | GET    | `/algorithms`      | Supported signature schemes              |
//! | POST   | `/wallets`         | Register a wallet                        |
//! | GET    | `/wallets/:id`     | Wallet by id                             |
//! | POST   | `/tx/prepare`      | Assign nonce + timestamp, return payload |
//! | POST   | `/tx/submit`       | Submit a signed payload                  |
//! | GET    | `/tx/:id`          | Stored transaction record                |
//! | GET    | `/tx/:id/receipt`  | Receipt of a confirmed transaction       |
//! | POST   | `/verify`          | Offline check of a posted receipt        |
//! | POST   | `/blocks/seal`     | Seal everything pending now              |
//! | GET    | `/blocks/:index`   | Sealed block by index                    |
//! | GET    | `/ws`              | Live `block_sealed` / `transaction_accepted` events |
//!
//! ## Errors
//!
//! Failures return `{"error": "<message>", "kind": "<snake_case>"}` with:
//!
//! ```text
//! unknown_wallet, not_found           → 404
//! nonce_mismatch, not_confirmed       → 409
//! malformed_request                   → 400
//! any other validation kind           → 400
//! internal, storage                   → 500
//! ```

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use qreceipt_protocol::config::DEFAULT_CURRENCY;
use qreceipt_protocol::crypto::{
    default_scheme, supported_algorithms, AlgorithmInfo, PublicKeyBytes, SignatureScheme,
};
use qreceipt_protocol::ledger::{Ledger, LedgerError, LedgerResult, ValidationError, Wallet};
use qreceipt_protocol::receipt::{
    verify, verify_with_sealer, FailureReason, Receipt, Verification,
};
use qreceipt_protocol::storage::Block;
use qreceipt_protocol::transaction::{
    canonical_string, PreparedTransaction, SubmittedTransaction, TransactionRecord,
    TransactionStatus, TxId,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Reported in `/status`.
    pub version: String,
    pub ledger: Arc<Ledger>,
    pub metrics: SharedMetrics,
    /// Fan-out to WebSocket subscribers.
    pub event_tx: broadcast::Sender<LedgerEvent>,
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A block was sealed and its receipts can be fetched.
    BlockSealed {
        index: u64,
        merkle_root: String,
        tx_count: usize,
        sealed_at: u64,
    },
    /// A submission entered the pending pool.
    TransactionAccepted {
        tx_id: TxId,
        from_wallet: String,
        to_wallet: String,
        amount: u64,
        currency: String,
        nonce: u64,
    },
}

impl LedgerEvent {
    fn sealed(block: &Block) -> Self {
        Self::BlockSealed {
            index: block.index(),
            merkle_root: block.header.merkle_root_hex(),
            tx_count: block.tx_count(),
            sealed_at: block.header.sealed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Build the API router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/algorithms", get(algorithms_handler))
        .route("/wallets", post(create_wallet_handler))
        .route("/wallets/:id", get(wallet_handler))
        .route("/tx/prepare", post(prepare_handler))
        .route("/tx/submit", post(submit_handler))
        .route("/tx/:id", get(transaction_handler))
        .route("/tx/:id/receipt", get(receipt_handler))
        .route("/verify", post(verify_handler))
        .route("/blocks/seal", post(seal_handler))
        .route("/blocks/:index", get(block_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// A failure on its way to becoming an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    /// The body never reached the ledger: not JSON, or the wrong shape.
    MalformedRequest(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Ledger(e.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedRequest(rejection.body_text())
    }
}

/// Unwrap a JSON body, turning axum's plaintext rejection into our error body.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(ApiError::from)
}

fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotFound(_) | LedgerError::Validation(ValidationError::UnknownWallet(_)) => {
            StatusCode::NOT_FOUND
        }
        LedgerError::NotConfirmed(_)
        | LedgerError::Validation(ValidationError::NonceMismatch { .. }) => StatusCode::CONFLICT,
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::Internal(_) | LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Ledger(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::error!(kind = err.kind(), error = %err, "request failed");
                }
                let body = ErrorResponse {
                    error: err.to_string(),
                    kind: err.kind().to_string(),
                };
                (status, body)
            }
            Self::MalformedRequest(reason) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: reason,
                    kind: "malformed_request".to_string(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /wallets`.
#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    /// Hex-encoded public key.
    pub public_key: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_algorithm() -> String {
    default_scheme().name().to_string()
}

/// Body of `POST /tx/prepare`.
#[derive(Debug, Deserialize)]
pub struct PrepareRequest {
    pub from_wallet: String,
    pub to_wallet: String,
    /// Minor currency units.
    pub amount: u64,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Response of `POST /tx/prepare`.
///
/// The client signs the UTF-8 bytes of `signing_payload`, then posts
/// `payload`, `payload_hash`, `signature` and `public_key` to
/// `/tx/submit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PrepareResponse {
    #[serde(flatten)]
    pub prepared: PreparedTransaction,
    pub signing_payload: String,
}

/// Response of `POST /tx/submit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub tx_id: TxId,
    pub status: TransactionStatus,
    /// Set when this submission filled the pool and triggered a seal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sealed_block: Option<u64>,
}

/// Response of `POST /blocks/seal`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SealResponse {
    pub sealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
}

/// Query of `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    /// Hex public key of the sealer to pin.
    pub sealer: Option<String>,
}

/// Response of `GET /algorithms`.
#[derive(Debug, Serialize)]
pub struct AlgorithmsResponse {
    pub algorithms: Vec<AlgorithmInfo>,
    /// Scheme used when a request names none.
    pub default: &'static str,
    pub recommended: &'static str,
}

/// Response of `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    /// Number of sealed blocks.
    pub height: u64,
    pub latest_block_index: Option<u64>,
    pub pending: usize,
    pub wallets: usize,
    pub seal_threshold: usize,
    pub sealer_public_key: String,
    pub sealer_algorithm: String,
    /// RFC 3339 time of the response.
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Sealing & events
// ---------------------------------------------------------------------------

/// Publish a sealed block: metrics and a WebSocket event.
pub fn publish_sealed(state: &AppState, block: &Block) {
    state.metrics.blocks_sealed_total.inc();
    let _ = state.event_tx.send(LedgerEvent::sealed(block));
}

/// Run one seal with latency measurement. Shared by `POST /blocks/seal`
/// and the interval task.
pub fn seal_now(state: &AppState) -> LedgerResult<Option<Block>> {
    let started = Instant::now();
    let sealed = state.ledger.seal()?;
    if let Some(block) = &sealed {
        state
            .metrics
            .seal_latency_seconds
            .observe(started.elapsed().as_secs_f64());
        publish_sealed(state, block);
    }
    state.metrics.observe_status(&state.ledger.status());
    Ok(sealed)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: liveness only; subsystem state belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.ledger.status();
    state.metrics.observe_status(&status);
    Json(StatusResponse {
        version: state.version.clone(),
        height: status.height,
        latest_block_index: status.latest_block_index,
        pending: status.pending,
        wallets: status.wallets,
        seal_threshold: state.ledger.config().seal_threshold,
        sealer_public_key: status.sealer_public_key.to_hex(),
        sealer_algorithm: status.sealer_algorithm,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn algorithms_handler() -> Json<AlgorithmsResponse> {
    let default = default_scheme().name();
    Json(AlgorithmsResponse {
        algorithms: supported_algorithms(),
        default,
        recommended: default,
    })
}

async fn create_wallet_handler(
    State(state): State<AppState>,
    body: Result<Json<CreateWalletRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Wallet>)> {
    let req = json_body(body)?;
    let public_key = PublicKeyBytes::from_hex(&req.public_key)
        .map_err(|e| ValidationError::InvalidPublicKey(e.to_string()))?;
    let wallet = state
        .ledger
        .create_wallet(public_key, &req.algorithm, req.user_id)?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

async fn wallet_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(state.ledger.wallet(&id)?))
}

/// `POST /tx/prepare`: assigns the sender's next nonce and a timestamp.
/// Nothing is reserved: two prepares in a row get the same nonce and only
/// the first submit wins.
async fn prepare_handler(
    State(state): State<AppState>,
    body: Result<Json<PrepareRequest>, JsonRejection>,
) -> ApiResult<Json<PrepareResponse>> {
    let req = json_body(body)?;
    let currency = req.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);
    let prepared = state
        .ledger
        .prepare(&req.from_wallet, &req.to_wallet, req.amount, currency)?;
    let signing_payload = canonical_string(&prepared.payload);
    Ok(Json(PrepareResponse {
        prepared,
        signing_payload,
    }))
}

async fn submit_handler(
    State(state): State<AppState>,
    body: Result<Json<SubmittedTransaction>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let submitted = json_body(body)?;
    let payload = submitted.prepared.payload.clone();
    let submission = match state.ledger.submit(submitted) {
        Ok(s) => s,
        Err(e) => {
            if matches!(e, LedgerError::Validation(_)) {
                state.metrics.transactions_rejected_total.inc();
            }
            return Err(e.into());
        }
    };
    state.metrics.transactions_accepted_total.inc();

    let _ = state.event_tx.send(LedgerEvent::TransactionAccepted {
        tx_id: submission.tx_id.clone(),
        from_wallet: payload.from_wallet,
        to_wallet: payload.to_wallet,
        amount: payload.amount,
        currency: payload.currency,
        nonce: payload.nonce,
    });
    if let Some(block) = &submission.sealed {
        publish_sealed(&state, block);
    }
    state.metrics.observe_status(&state.ledger.status());

    let status = if submission.sealed.is_some() {
        TransactionStatus::Confirmed
    } else {
        TransactionStatus::Pending
    };
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            tx_id: submission.tx_id,
            status,
            sealed_block: submission.sealed.map(|b| b.index()),
        }),
    ))
}

async fn transaction_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<TransactionRecord>> {
    Ok(Json(state.ledger.transaction(&id)?))
}

async fn receipt_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Receipt>> {
    let receipt = state.ledger.get_receipt(&id)?;
    state.metrics.receipts_issued_total.inc();
    Ok(Json(receipt))
}

/// `POST /verify`: the body is the receipt JSON itself. Malformed input is
/// a verdict (`malformed_receipt`), not an HTTP error.
async fn verify_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    body: String,
) -> ApiResult<Json<Verification>> {
    let trusted = query
        .sealer
        .as_deref()
        .map(PublicKeyBytes::from_hex)
        .transpose()
        .map_err(|e| ValidationError::InvalidPublicKey(e.to_string()))?;

    let verdict = match (Receipt::from_json(&body), trusted) {
        (Err(_), _) => Verification::fail(FailureReason::MalformedReceipt),
        (Ok(receipt), None) => verify(&receipt),
        (Ok(receipt), Some(sealer)) => verify_with_sealer(&receipt, &sealer),
    };

    if verdict.valid {
        state.metrics.receipts_verified_total.inc();
    } else {
        state.metrics.receipts_rejected_total.inc();
    }
    Ok(Json(verdict))
}

async fn seal_handler(State(state): State<AppState>) -> ApiResult<Json<SealResponse>> {
    let block = seal_now(&state)?;
    Ok(Json(SealResponse {
        sealed: block.is_some(),
        block,
    }))
}

async fn block_handler(
    Path(index): Path<u64>,
    State(state): State<AppState>,
) -> ApiResult<Json<Block>> {
    Ok(Json(state.ledger.block(index)?))
}

/// `GET /ws`: push-only event stream.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to serialize ws event");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "ws subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    // Client messages are ignored.
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
