//! REST API server for powledger
//!
//! JSON endpoints over a shared [`LedgerService`] and [`WalletRegistry`]:
//! chain inspection, wallet management, transaction submission and mining
//! control. Every route lives under `/api`.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::amount::Amount;
use crate::blockchain::Block;
use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::mempool::PendingId;
use crate::node::LedgerService;
use crate::transaction::Transaction;
use crate::wallet::WalletRegistry;

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub service: LedgerService,
    pub wallets: WalletRegistry,
    stats: Arc<RwLock<ApiStats>>,
}

impl ApiState {
    pub fn new(service: LedgerService, wallets: WalletRegistry) -> Self {
        ApiState {
            service,
            wallets,
            stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    /// Ledger refused the request (admission or mining outcome)
    LedgerError(ChainError),
    InvalidInput(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::LedgerError(e) => {
                let status = match &e {
                    ChainError::InvalidSignature(_)
                    | ChainError::InsufficientFunds { .. }
                    | ChainError::InvalidTransaction(_)
                    | ChainError::MempoolFull => StatusCode::UNPROCESSABLE_ENTITY,
                    ChainError::MiningAlreadyRunning
                    | ChainError::MiningCancelled
                    | ChainError::StaleCandidate => StatusCode::CONFLICT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::WalletNotFound(_) => ApiError::NotFound(err.to_string()),
            ChainError::WalletError(_)
            | ChainError::InvalidAmount(_)
            | ChainError::MalformedKeyEncoding(_)
            | ChainError::IdentityMismatch { .. } => ApiError::InvalidInput(err.to_string()),
            other => ApiError::LedgerError(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct CreateWalletRequest {
    pub label: String,
}

#[derive(Deserialize)]
pub struct ImportWalletRequest {
    pub label: String,
    pub private_key: String,
}

#[derive(Deserialize)]
pub struct FaucetRequest {
    /// Wallet label or public key hex
    pub recipient: String,
    pub amount: Amount,
}

#[derive(Deserialize)]
pub struct TransferRequest {
    /// Label of a registered wallet; its key signs the transfer
    pub sender: String,
    /// Wallet label or public key hex
    pub recipient: String,
    pub amount: Amount,
    #[serde(default)]
    pub fee: Option<Amount>,
}

#[derive(Deserialize)]
pub struct MineRequest {
    /// Wallet label or public key hex receiving the reward
    pub miner: String,
}

#[derive(Serialize)]
struct WalletResponse {
    label: String,
    public_key: String,
}

#[derive(Serialize)]
struct WalletSummary {
    label: String,
    public_key: String,
    balance: Amount,
}

#[derive(Serialize)]
struct ExportResponse {
    label: String,
    private_key: String,
}

#[derive(Serialize)]
struct BalanceResponse {
    public_key: String,
    balance: Amount,
}

#[derive(Serialize)]
struct AcceptedResponse {
    accepted: bool,
    id: PendingId,
    transaction: Transaction,
}

#[derive(Serialize)]
struct ApiStatsResponse {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    uptime_seconds: u64,
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    state.stats.write().await.record_request(success);

    response
}

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the API router with all endpoints
pub fn build_api_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        // Chain endpoints
        .route("/chain", get(get_chain))
        .route("/chain/validate", get(validate_chain))
        .route("/balance/:who", get(get_balance))
        // Transaction endpoints
        .route("/transaction", post(submit_transaction))
        .route("/faucet", post(faucet))
        .route("/mempool", get(get_mempool))
        // Mining endpoints
        .route("/mine", post(mine))
        .route("/mining/stop", post(stop_mining))
        .route("/mining/status", get(get_mining_status))
        // Wallet endpoints
        .route("/wallets", get(list_wallets))
        .route("/wallet/create", post(create_wallet))
        .route("/wallet/import", post(import_wallet))
        .route("/wallet/:label/export", get(export_wallet))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), stats_middleware))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors_layer())
}

pub async fn run_api_server(state: ApiState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "height": state.service.height().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_chain(State(state): State<ApiState>) -> impl IntoResponse {
    let chain: Vec<Block> = state.service.dump_chain().await;
    Json(serde_json::json!({
        "height": chain.len(),
        "chain": chain
    }))
}

async fn validate_chain(State(state): State<ApiState>) -> impl IntoResponse {
    match state.service.validate().await {
        Ok(()) => Json(serde_json::json!({ "valid": true })),
        Err(ChainError::ChainIntegrity(violation)) => Json(serde_json::json!({
            "valid": false,
            "error": violation.to_string(),
            "violation": violation
        })),
        Err(e) => Json(serde_json::json!({
            "valid": false,
            "error": e.to_string()
        })),
    }
}

async fn get_balance(
    State(state): State<ApiState>,
    Path(who): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let key = state.wallets.resolve(&who)?;
    Ok(Json(BalanceResponse {
        public_key: key.to_string(),
        balance: state.service.balance(&key).await,
    }))
}

async fn get_mempool(State(state): State<ApiState>) -> impl IntoResponse {
    let pending = state.service.pending().await;
    Json(serde_json::json!({
        "count": pending.len(),
        "transactions": pending
    }))
}

async fn submit_transaction(
    State(state): State<ApiState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    let sender = state.wallets.get(&req.sender)?;
    let recipient = state.wallets.resolve(&req.recipient)?;

    let mut tx = Transaction::new(
        sender.public_key(),
        recipient,
        req.amount,
        req.fee.unwrap_or(Amount::ZERO),
    );
    tx.sign(&sender.keypair)?;

    let id = state.service.submit(tx.clone()).await?;
    state.stats.write().await.transactions_submitted += 1;

    Ok(Json(AcceptedResponse {
        accepted: true,
        id,
        transaction: tx,
    }))
}

async fn faucet(
    State(state): State<ApiState>,
    Json(req): Json<FaucetRequest>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    let recipient = state.wallets.resolve(&req.recipient)?;
    let tx = Transaction::issuance(recipient, req.amount);
    let id = state.service.submit(tx.clone()).await?;
    state.stats.write().await.transactions_submitted += 1;

    Ok(Json(AcceptedResponse {
        accepted: true,
        id,
        transaction: tx,
    }))
}

async fn mine(
    State(state): State<ApiState>,
    Json(req): Json<MineRequest>,
) -> Result<Json<Block>, ApiError> {
    let miner = state.wallets.resolve(&req.miner)?;
    let block = state.service.mine(miner).await?;
    Ok(Json(block))
}

async fn stop_mining(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({ "stopped": state.service.stop_mining() }))
}

async fn get_mining_status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "is_mining": state.service.is_mining(),
        "blocks_mined": state.service.blocks_mined()
    }))
}

async fn list_wallets(State(state): State<ApiState>) -> impl IntoResponse {
    let balances = state.service.balances().await;
    let wallets: Vec<WalletSummary> = state
        .wallets
        .list()
        .into_iter()
        .map(|wallet| WalletSummary {
            balance: balances
                .get(&wallet.public_key())
                .copied()
                .unwrap_or(Amount::ZERO),
            public_key: wallet.public_key_hex(),
            label: wallet.label,
        })
        .collect();
    Json(serde_json::json!({ "wallets": wallets }))
}

async fn create_wallet(
    State(state): State<ApiState>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state.wallets.create(&req.label)?;
    Ok(Json(WalletResponse {
        public_key: wallet.public_key_hex(),
        label: wallet.label,
    }))
}

async fn import_wallet(
    State(state): State<ApiState>,
    Json(req): Json<ImportWalletRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    let keypair = KeyPair::from_secret_hex(req.private_key.trim())?;
    let wallet = state.wallets.insert(&req.label, keypair)?;
    Ok(Json(WalletResponse {
        public_key: wallet.public_key_hex(),
        label: wallet.label,
    }))
}

async fn export_wallet(
    State(state): State<ApiState>,
    Path(label): Path<String>,
) -> Result<Json<ExportResponse>, ApiError> {
    let wallet = state.wallets.get(&label)?;
    Ok(Json(ExportResponse {
        private_key: wallet.export_secret_hex(),
        label: wallet.label,
    }))
}

async fn get_api_stats(State(state): State<ApiState>) -> impl IntoResponse {
    let stats = state.stats.read().await;
    let uptime = stats
        .start_time
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);
    Json(ApiStatsResponse {
        total_requests: stats.total_requests,
        successful_requests: stats.successful_requests,
        failed_requests: stats.failed_requests,
        transactions_submitted: stats.transactions_submitted,
        uptime_seconds: uptime,
    })
}
