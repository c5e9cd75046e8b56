//! HTTP API for photorank
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /session/new - Create and start a verification session
//! - GET /session/{id} - Current decision
//! - POST /session/{id}/frame - Offer one frame of detector signals
//! - POST /session/{id}/capture - Capture trigger
//! - POST /session/{id}/authenticate - Begin biometric authentication
//! - POST /session/{id}/biometric - Biometric result
//! - POST /session/{id}/selfie - Selfie frames
//! - POST /session/{id}/selfie/cancel - User backed out of the selfie
//! - POST /session/{id}/process - Liveness + final check
//! - DELETE /session/{id} - Cancel and discard
//! - POST /photos - Register a photo
//! - PUT /photos/{id}/pool - Pool membership
//! - GET /pair?user= - Comparison pair for a user
//! - POST /ratings - Record a comparison outcome

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::config::Config;
use crate::core::{CommitOutcome, InMemoryRatingStore, RatingEngine, RatingStore, VerificationEvent, VerificationSession};
use crate::error::RatingError;
use crate::types::{
    CommittedRating, ComparisonPair, FrameSignals, LivenessResult, PhotoRecord, RatingEvent, VerificationDecision,
    VerificationStatus,
};

/// App state
///
/// Each session sits behind its own lock; the map lock is only held to
/// look a session up.
pub struct AppState {
    pub sessions: RwLock<HashMap<String, Arc<Mutex<VerificationSession>>>>,
    pub rating: RatingEngine<InMemoryRatingStore>,
    pub config: Config,
    session_seq: AtomicU64,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(InMemoryRatingStore::new(config.rating.initial_elo));
        Self {
            sessions: RwLock::new(HashMap::new()),
            rating: RatingEngine::from_config(store, &config.rating),
            config,
            session_seq: AtomicU64::new(0),
        }
    }

    /// Generate session ID
    fn next_session_id(&self) -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let seq = self.session_seq.fetch_add(1, Ordering::Relaxed);
        format!("session_{:x}_{}", nanos, seq)
    }
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            error: error.into(),
        }),
    )
}

fn rating_error(err: RatingError) -> ApiError {
    let (status, code) = match &err {
        RatingError::InsufficientPoolSize { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_POOL_SIZE"),
        RatingError::SelfComparison(_) => (StatusCode::UNPROCESSABLE_ENTITY, "SELF_COMPARISON"),
        RatingError::EmptyIdempotencyKey => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_IDEMPOTENCY_KEY"),
        RatingError::UnknownPhoto(_) => (StatusCode::NOT_FOUND, "UNKNOWN_PHOTO"),
        RatingError::NotInPool(_) => (StatusCode::UNPROCESSABLE_ENTITY, "NOT_IN_POOL"),
        RatingError::IdempotencyConflict { .. } => (StatusCode::CONFLICT, "IDEMPOTENCY_CONFLICT"),
        RatingError::DuplicatePhoto(_) => (StatusCode::CONFLICT, "DUPLICATE_PHOTO"),
    };
    api_error(status, code, err.to_string())
}

fn session_not_found(id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "UNKNOWN_SESSION", format!("no session {}", id))
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
    pub pool_size: usize,
}

/// Create new session response
#[derive(Debug, Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub decision: VerificationDecision,
}

/// Session status response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub decision: VerificationDecision,
    pub dropped_frames: u64,
    pub liveness: Option<LivenessResult>,
}

/// Frame response; `analyzed` is false when the frame was throttled
#[derive(Debug, Serialize, Deserialize)]
pub struct FrameResponse {
    pub analyzed: bool,
    pub decision: VerificationDecision,
}

#[derive(Debug, Deserialize)]
pub struct BiometricRequest {
    pub passed: bool,
}

#[derive(Debug, Deserialize)]
pub struct SelfieRequest {
    pub frames: Vec<FrameSignals>,
}

/// Register photo request
#[derive(Debug, Deserialize)]
pub struct RegisterPhotoRequest {
    pub photo_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub verification_status: Option<VerificationStatus>,
    #[serde(default)]
    pub in_pool: bool,
}

#[derive(Debug, Deserialize)]
pub struct PoolMembershipRequest {
    pub in_pool: bool,
}

#[derive(Debug, Deserialize)]
pub struct PairQuery {
    pub user: String,
}

/// Submit rating request
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub winner_photo_id: String,
    pub loser_photo_id: String,
    pub idempotency_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingResponse {
    pub duplicate: bool,
    pub committed: CommittedRating,
}

/// Create the API router
pub fn create_router(config: Config) -> Router {
    router_with_state(Arc::new(AppState::new(config)))
}

/// Router over caller-owned state
pub fn router_with_state(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(delete_session))
        .route("/session/:id/frame", post(offer_frame))
        .route("/session/:id/capture", post(capture))
        .route("/session/:id/authenticate", post(authenticate))
        .route("/session/:id/biometric", post(biometric))
        .route("/session/:id/selfie", post(selfie))
        .route("/session/:id/selfie/cancel", post(selfie_cancel))
        .route("/session/:id/process", post(process))
        .route("/photos", post(register_photo))
        .route("/photos/:id/pool", put(set_pool))
        .route("/pair", get(pair))
        .route("/ratings", post(submit_rating))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
        pool_size: state.rating.store().pool_snapshot().len(),
    })
}

/// Create new session
async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<NewSessionResponse>) {
    let session_id = state.next_session_id();
    let mut session = VerificationSession::new(session_id.clone(), &state.config);
    let decision = session.start();

    let mut sessions = state.sessions.write().await;
    sessions.insert(session_id.clone(), Arc::new(Mutex::new(session)));
    info!(session = %session_id, active = sessions.len(), "session created");

    (StatusCode::CREATED, Json(NewSessionResponse { session_id, decision }))
}

async fn lookup(state: &AppState, id: &str) -> Result<Arc<Mutex<VerificationSession>>, ApiError> {
    let sessions = state.sessions.read().await;
    sessions.get(id).cloned().ok_or_else(|| session_not_found(id))
}

/// Apply one event to a session
async fn apply(state: &AppState, id: &str, event: VerificationEvent) -> ApiResult<VerificationDecision> {
    let handle = lookup(state, id).await?;
    let mut session = handle.lock().await;
    Ok(Json(session.handle(event)))
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionStatusResponse> {
    let handle = lookup(&state, &id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionStatusResponse {
        session_id: id,
        decision: session.current_decision().clone(),
        dropped_frames: session.dropped_frames(),
        liveness: session.engine().last_liveness().cloned(),
    }))
}

async fn offer_frame(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(frame): Json<FrameSignals>,
) -> ApiResult<FrameResponse> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle.lock().await;
    let response = match session.offer_frame(frame) {
        Some(decision) => FrameResponse { analyzed: true, decision },
        None => FrameResponse {
            analyzed: false,
            decision: session.current_decision().clone(),
        },
    };
    Ok(Json(response))
}

async fn capture(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<VerificationDecision> {
    apply(&state, &id, VerificationEvent::CaptureTriggered).await
}

async fn authenticate(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<VerificationDecision> {
    apply(&state, &id, VerificationEvent::BeginAuthentication).await
}

async fn biometric(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<BiometricRequest>,
) -> ApiResult<VerificationDecision> {
    apply(&state, &id, VerificationEvent::BiometricCompleted { passed: req.passed }).await
}

async fn selfie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SelfieRequest>,
) -> ApiResult<VerificationDecision> {
    apply(&state, &id, VerificationEvent::SelfieCaptured(req.frames)).await
}

async fn selfie_cancel(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<VerificationDecision> {
    apply(&state, &id, VerificationEvent::SelfieCancelled).await
}

async fn process(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<VerificationDecision> {
    apply(&state, &id, VerificationEvent::Process).await
}

/// Cancel and discard a session
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<VerificationDecision> {
    let handle = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&id).ok_or_else(|| session_not_found(&id))?
    };
    let mut session = handle.lock().await;
    let decision = session.cancel();
    info!(session = %id, "session discarded");
    Ok(Json(decision))
}

async fn register_photo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterPhotoRequest>,
) -> Result<(StatusCode, Json<PhotoRecord>), ApiError> {
    let status = req.verification_status.unwrap_or(VerificationStatus::Pending);
    if req.in_pool {
        require_verified(&req.photo_id, status)?;
    }
    let store = state.rating.store();
    let mut photo = store
        .register_photo(&req.photo_id, &req.owner_id, status)
        .map_err(rating_error)?;
    if req.in_pool {
        photo = store.set_pool_membership(&req.photo_id, true).map_err(rating_error)?;
    }
    info!(photo = %photo.id, owner = %photo.owner_id, in_pool = photo.in_pool, "photo registered");
    Ok((StatusCode::CREATED, Json(photo)))
}

async fn set_pool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PoolMembershipRequest>,
) -> ApiResult<PhotoRecord> {
    let store = state.rating.store();
    if req.in_pool {
        let photo = store.photo(&id).ok_or_else(|| rating_error(RatingError::UnknownPhoto(id.clone())))?;
        require_verified(&id, photo.verification_status)?;
    }
    let photo = store.set_pool_membership(&id, req.in_pool).map_err(rating_error)?;
    Ok(Json(photo))
}

/// Only verified photos may enter the pool
fn require_verified(id: &str, status: VerificationStatus) -> Result<(), ApiError> {
    match status {
        VerificationStatus::Accepted | VerificationStatus::AcceptedLowConfidence => Ok(()),
        VerificationStatus::Pending | VerificationStatus::Rejected => Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "PHOTO_NOT_VERIFIED",
            format!("photo {} has status {:?}", id, status),
        )),
    }
}

async fn pair(State(state): State<Arc<AppState>>, Query(query): Query<PairQuery>) -> ApiResult<ComparisonPair> {
    let pair = {
        let mut rng = rand::thread_rng();
        state.rating.select_pair_for(&query.user, &mut rng)
    };
    pair.map(Json).map_err(rating_error)
}

async fn submit_rating(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RatingRequest>,
) -> Result<(StatusCode, Json<RatingResponse>), ApiError> {
    let event = RatingEvent::new(req.winner_photo_id, req.loser_photo_id, req.idempotency_key);
    let outcome = state.rating.record_outcome(&event).map_err(rating_error)?;
    let status = match outcome {
        CommitOutcome::Applied(_) => StatusCode::CREATED,
        CommitOutcome::Duplicate(_) => StatusCode::OK,
    };
    let duplicate = outcome.is_duplicate();
    Ok((
        status,
        Json(RatingResponse {
            duplicate,
            committed: outcome.into_committed(),
        }),
    ))
}

/// Run the API server
pub async fn run_server(addr: &str, config: Config) -> crate::Result<()> {
    let router = create_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, version = crate::VERSION, "photorank API listening");
    axum::serve(listener, router).await?;
    Ok(())
}
