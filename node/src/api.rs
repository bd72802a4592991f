//! # REST API
//!
//! Builds the axum router that exposes the vault over HTTP. All endpoints
//! share application state through axum's `State` extractor. Mutating
//! endpoints identify the caller by the `x-caller` header.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                         |
//! |--------|-------------------------------|-------------------------------------|
//! | GET    | `/health`                     | Liveness probe                      |
//! | GET    | `/vault`                      | Vault state summary                 |
//! | GET    | `/destinations`               | Every registered destination        |
//! | POST   | `/destinations`               | Register a destination (owner)      |
//! | POST   | `/destinations/:index/status` | Activate / deactivate (owner)       |
//! | POST   | `/swap-destination`           | Select the reward swap route (owner)|
//! | POST   | `/deposit`                    | Deposit on behalf of the caller     |
//! | POST   | `/withdraw`                   | Withdraw every caller position      |
//! | POST   | `/fees/collect`               | Sweep accrued fees                  |
//! | POST   | `/fees/recipient`             | Change the fee recipient (owner)    |
//! | POST   | `/ownership`                  | Transfer ownership (owner)          |
//! | POST   | `/pause`, `/unpause`          | Suspend / resume user operations    |
//! | GET    | `/positions/:user/:index`     | One user position                   |
//! | GET    | `/rewards/:user`              | Pending rewards for a user          |
//! | POST   | `/clock/advance`              | Advance the simulated clock (owner) |

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pacific_contracts::{
    Allocation, Amount, Destination, DestinationIndex, FeeSweep, NewDestination,
    SimulatedAdapter, Slippage, UserPosition, Vault, VaultError, VaultEvent, VaultState,
    Withdrawal,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::metrics::SharedMetrics;

/// Header carrying the caller's identity.
pub const CALLER_HEADER: &str = "x-caller";

/// The hosted vault, shared between handlers and the clock task.
pub type SharedVault = Arc<RwLock<Vault<SimulatedAdapter>>>;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The vault. Writers serialize every mutating operation.
    pub vault: SharedVault,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/vault", get(vault_handler))
        .route(
            "/destinations",
            get(destinations_handler).post(add_destination_handler),
        )
        .route("/destinations/:index/status", post(destination_status_handler))
        .route("/swap-destination", post(swap_destination_handler))
        .route("/deposit", post(deposit_handler))
        .route("/withdraw", post(withdraw_handler))
        .route("/fees/collect", post(collect_fees_handler))
        .route("/fees/recipient", post(fee_recipient_handler))
        .route("/ownership", post(ownership_handler))
        .route("/pause", post(pause_handler))
        .route("/unpause", post(unpause_handler))
        .route("/positions/:user/:index", get(position_handler))
        .route("/rewards/:user", get(rewards_handler))
        .route("/clock/advance", post(advance_clock_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /deposit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    /// Gross amount in base units.
    pub amount: Amount,
    /// Tolerated shortfall per conversion, parts-per-thousand.
    #[serde(default)]
    pub slippage: Slippage,
}

/// Body of `POST /withdraw`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WithdrawRequest {
    /// Tolerated shortfall per unwind, parts-per-thousand.
    #[serde(default)]
    pub slippage: Slippage,
}

/// Body of `POST /destinations/:index/status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRequest {
    pub active: bool,
}

/// Body of `POST /swap-destination`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SwapDestinationRequest {
    pub index: DestinationIndex,
}

/// Body of `POST /fees/recipient`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeeRecipientRequest {
    pub recipient: String,
}

/// Body of `POST /ownership`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnershipRequest {
    pub new_owner: String,
}

/// Body of `POST /clock/advance`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub ticks: u64,
}

/// Response payload for `POST /destinations`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddedResponse {
    pub index: DestinationIndex,
}

/// Response payload for `POST /pause` and `POST /unpause`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PausedResponse {
    pub paused: bool,
}

/// Response payload for `GET /positions/:user/:index`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionResponse {
    pub user: String,
    pub index: DestinationIndex,
    pub position: UserPosition,
}

/// Response payload for `GET /rewards/:user`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RewardsResponse {
    pub user: String,
    pub earned: Amount,
}

/// Response payload for `POST /clock/advance`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClockResponse {
    pub tick: u64,
}

/// Generic error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A rejected request, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn missing_caller() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorResponse {
                error: format!("missing `{CALLER_HEADER}` header"),
                code: "missing_caller".into(),
            },
        }
    }
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        let status = match e.code() {
            "unauthorized" => StatusCode::FORBIDDEN,
            "invalid_index" => StatusCode::NOT_FOUND,
            "duplicate_router"
            | "no_status_change"
            | "inactive_destination"
            | "no_active_destinations"
            | "nothing_to_withdraw"
            | "nothing_to_sweep"
            | "paused"
            | "pause_unchanged"
            | "slippage_exceeded" => StatusCode::CONFLICT,
            "pool_mismatch" | "zero_amount" | "invalid_config" => StatusCode::BAD_REQUEST,
            "amount_overflow" => StatusCode::UNPROCESSABLE_ENTITY,
            "adapter_failure" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorResponse {
                error: e.to_string(),
                code: e.code().to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn caller(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(ApiError::missing_caller)
}

fn publish(events: &[VaultEvent]) {
    for event in events {
        info!(sequence = event.sequence, at = %event.at, kind = ?event.kind, "vault event");
    }
}

/// Runs one mutating operation under the write lock, then publishes the
/// drained events and refreshes the gauges.
fn mutate<T, F>(state: &AppState, operation: &'static str, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Vault<SimulatedAdapter>) -> Result<T, VaultError>,
{
    let timer = state.metrics.operation_latency_seconds.start_timer();
    let (result, events) = {
        let mut vault = state.vault.write();
        let result = f(&mut vault);
        state.metrics.observe_vault(&vault);
        (result, vault.drain_events())
    };
    timer.observe_duration();
    publish(&events);

    result.map_err(|e| {
        state.metrics.rejected_operations_total.inc();
        warn!(operation, code = e.code(), error = %e, "operation rejected");
        ApiError::from(e)
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `GET /vault` — process-wide vault state.
async fn vault_handler(State(state): State<AppState>) -> Json<VaultState> {
    Json(state.vault.read().state())
}

/// `GET /destinations` — every destination ever registered, in index order.
async fn destinations_handler(State(state): State<AppState>) -> Json<Vec<Destination>> {
    Json(state.vault.read().destinations().to_vec())
}

/// `POST /destinations` — registers a destination after pool validation.
async fn add_destination_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewDestination>,
) -> Result<(StatusCode, Json<AddedResponse>), ApiError> {
    let caller = caller(&headers)?;
    let index = mutate(&state, "add_destination", |v| {
        v.add_destination(&caller, request)
    })?;
    Ok((StatusCode::CREATED, Json(AddedResponse { index })))
}

/// `POST /destinations/:index/status` — activates or deactivates.
async fn destination_status_handler(
    State(state): State<AppState>,
    Path(index): Path<DestinationIndex>,
    headers: HeaderMap,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Destination> {
    let caller = caller(&headers)?;
    let destination = mutate(&state, "set_destination_active", |v| {
        v.set_destination_active(&caller, index, request.active)?;
        v.destination(index).cloned()
    })?;
    Ok(Json(destination))
}

/// `POST /swap-destination` — selects the reward swap route.
async fn swap_destination_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SwapDestinationRequest>,
) -> ApiResult<SwapDestinationRequest> {
    let caller = caller(&headers)?;
    let index = mutate(&state, "set_swap_destination", |v| {
        v.set_swap_destination(&caller, request.index)?;
        Ok(v.swap_destination())
    })?;
    Ok(Json(SwapDestinationRequest { index }))
}

/// `POST /deposit` — deposits on behalf of the caller.
async fn deposit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DepositRequest>,
) -> ApiResult<Allocation> {
    let caller = caller(&headers)?;
    let allocation = mutate(&state, "deposit", |v| {
        v.deposit(&caller, request.amount, request.slippage)
    })?;
    state.metrics.record_deposit(allocation.gross);
    Ok(Json(allocation))
}

/// `POST /withdraw` — unwinds every caller position.
async fn withdraw_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<WithdrawRequest>,
) -> ApiResult<Withdrawal> {
    let caller = caller(&headers)?;
    let withdrawal = mutate(&state, "withdraw", |v| {
        v.withdraw(&caller, request.slippage)
    })?;
    state.metrics.withdrawals_total.inc();
    Ok(Json(withdrawal))
}

/// `POST /fees/collect` — sweeps accrued fees to the recipient.
async fn collect_fees_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<FeeSweep> {
    let caller = caller(&headers)?;
    Ok(Json(mutate(&state, "collect_fees", |v| {
        v.collect_fees(&caller)
    })?))
}

/// `POST /fees/recipient` — changes the fee recipient.
async fn fee_recipient_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<FeeRecipientRequest>,
) -> ApiResult<FeeRecipientRequest> {
    let caller = caller(&headers)?;
    mutate(&state, "set_fee_recipient", |v| {
        v.set_fee_recipient(&caller, &request.recipient)
    })?;
    Ok(Json(request))
}

/// `POST /ownership` — hands admin rights to a new owner.
async fn ownership_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<OwnershipRequest>,
) -> ApiResult<OwnershipRequest> {
    let caller = caller(&headers)?;
    mutate(&state, "transfer_ownership", |v| {
        v.transfer_ownership(&caller, &request.new_owner)
    })?;
    Ok(Json(request))
}

/// `POST /pause` — suspends deposits and withdrawals.
async fn pause_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<PausedResponse> {
    let caller = caller(&headers)?;
    mutate(&state, "pause", |v| v.pause(&caller))?;
    Ok(Json(PausedResponse { paused: true }))
}

/// `POST /unpause` — resumes deposits and withdrawals.
async fn unpause_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<PausedResponse> {
    let caller = caller(&headers)?;
    mutate(&state, "unpause", |v| v.unpause(&caller))?;
    Ok(Json(PausedResponse { paused: false }))
}

/// `GET /positions/:user/:index` — one user's position at one destination.
///
/// Returns 404 if no destination exists at `index`; a registered
/// destination the user never entered yields a zero-valued position.
async fn position_handler(
    State(state): State<AppState>,
    Path((user, index)): Path<(String, DestinationIndex)>,
) -> ApiResult<PositionResponse> {
    let vault = state.vault.read();
    vault.destination(index)?;
    let position = vault.position_of(&user, index);
    Ok(Json(PositionResponse {
        user,
        index,
        position,
    }))
}

/// `GET /rewards/:user` — rewards pending across the user's positions.
async fn rewards_handler(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<RewardsResponse> {
    let earned = state.vault.read().earned_rewards(&user)?;
    Ok(Json(RewardsResponse { user, earned }))
}

/// `POST /clock/advance` — moves the simulated clock forward. Owner only,
/// since every tick accrues farm rewards.
async fn advance_clock_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AdvanceRequest>,
) -> ApiResult<ClockResponse> {
    let caller = caller(&headers)?;
    let tick = mutate(&state, "advance_clock", |v| {
        if caller != v.owner() {
            return Err(VaultError::Unauthorized {
                caller: caller.clone(),
                operation: "advance_clock",
            });
        }
        let adapter = v.adapter_mut();
        adapter.advance(request.ticks);
        Ok(adapter.now())
    })?;
    Ok(Json(ClockResponse { tick }))
}
