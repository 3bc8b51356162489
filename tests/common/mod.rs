//! In-process mock of the platform backend for integration tests.
//! Started on an ephemeral localhost port; the server task is aborted when
//! the harness is dropped. Knobs on [`BackendState`] let individual tests
//! simulate expiry, refresh failure and logout failure.

#![allow(dead_code)] // each test binary uses a subset of the harness

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

pub struct BackendState {
    pub valid_tokens: RwLock<HashSet<String>>,
    /// Value the next refresh mints.
    pub mint: RwLock<String>,
    /// When set, minted tokens are NOT registered as valid (the server
    /// persistently rejects whatever refresh hands out).
    pub reject_minted: AtomicBool,
    pub fail_refresh: AtomicBool,
    pub fail_logout: AtomicBool,
    /// Extra latency inside the refresh handler, to hold a refresh in
    /// flight while other calls hit expiry.
    pub refresh_delay_ms: AtomicU64,

    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub protected_calls: AtomicUsize,
    /// Bearer value of every /protected request, in arrival order.
    pub protected_bearers: RwLock<Vec<String>>,
    /// Count of Authorization headers per /protected request.
    pub protected_header_counts: RwLock<Vec<usize>>,
    /// Whether any refresh request carried an Authorization header.
    pub refresh_saw_bearer: AtomicBool,

    pub enrollments: RwLock<Vec<Value>>,
    pub certificate_payments: RwLock<Vec<String>>,
    pub certificates_issued: RwLock<Vec<String>>,
}

impl BackendState {
    fn new() -> Self {
        Self {
            valid_tokens: RwLock::new(HashSet::new()),
            mint: RwLock::new("minted-1".to_string()),
            reject_minted: AtomicBool::new(false),
            fail_refresh: AtomicBool::new(false),
            fail_logout: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            protected_calls: AtomicUsize::new(0),
            protected_bearers: RwLock::new(Vec::new()),
            protected_header_counts: RwLock::new(Vec::new()),
            refresh_saw_bearer: AtomicBool::new(false),
            enrollments: RwLock::new(Vec::new()),
            certificate_payments: RwLock::new(Vec::new()),
            certificates_issued: RwLock::new(Vec::new()),
        }
    }

    /// Invalidate every outstanding access token (simulated expiry).
    pub fn expire_all(&self) {
        self.valid_tokens.write().clear();
    }

    pub fn set_mint(&self, token: &str) {
        *self.mint.write() = token.to_string();
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn protected_count(&self) -> usize {
        self.protected_calls.load(Ordering::SeqCst)
    }
}

struct Guard(JoinHandle<()>);
impl Drop for Guard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct MockAcademy {
    pub base_url: String,
    pub state: Arc<BackendState>,
    _guard: Guard,
}

impl MockAcademy {
    /// Start the mock backend on an ephemeral localhost port.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::new());
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind 127.0.0.1:0");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("mock backend task error: {e:?}");
            }
        });
        Self {
            base_url: format!("http://{}", addr),
            state,
            _guard: Guard(handle),
        }
    }
}

pub fn sample_user() -> Value {
    json!({
        "_id": "u1",
        "username": "amina",
        "email": "amina@example.org",
        "role": "student",
        "verified": true
    })
}

fn sample_teacher() -> Value {
    json!({ "_id": "t1", "name": "Kofi", "email": "kofi@example.org", "subjects": ["Physics"] })
}

fn sample_room() -> Value {
    json!({
        "_id": "r1",
        "teacher": sample_teacher(),
        "roomName": "Kofi-Physics",
        "subject": "Physics"
    })
}

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/me", get(me))
        .route("/auth/register", post(register))
        .route("/auth/request-code", post(accept))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/resend-otp", post(accept))
        .route("/auth/reset-password", post(accept))
        .route("/auth/update-profile", put(update_profile))
        .route("/auth/update-password", put(authed_accept))
        .route("/auth/profiles", get(profiles))
        .route("/auth/delete", delete(authed_accept_no_body))
        .route("/auth/request-teacher", post(authed_accept))
        .route("/auth/teacher-requests", get(teacher_requests))
        .route("/auth/approve-teacher/{id}", put(authed_accept_with_path))
        .route("/auth/approved-teachers", get(approved_teachers))
        .route("/teacher-rooms", get(rooms))
        .route("/teacher-rooms/create-room", post(authed_accept))
        .route("/enrollments", post(create_enrollment))
        .route("/enrollments/student/{id}", get(student_enrollments))
        .route("/progress/student/{id}", get(student_progress))
        .route("/progress/{id}/payment", put(progress_payment))
        .route("/progress/{id}/certificate", put(progress_certificate))
        .route("/payment/create", post(authed_accept))
        .route("/subscription/create", post(authed_accept))
        .route("/zoom/token", post(zoom_token))
        .route("/protected", get(protected))
        .route("/slow", get(slow))
        .with_state(state)
}

fn bearer_of(headers: &HeaderMap) -> Option<String> {
    let v = headers.get(AUTHORIZATION)?.to_str().ok()?;
    v.strip_prefix("Bearer ").map(|s| s.to_string())
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "jwt expired" })))
}

// Validate the bearer; Err is the ready-to-send 401.
fn check_auth(state: &BackendState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    match bearer_of(headers) {
        Some(tok) if state.valid_tokens.read().contains(&tok) => Ok(()),
        _ => Err(unauthorized()),
    }
}

async fn login(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    let password = body.get("password").and_then(|v| v.as_str()).unwrap_or("");
    if password != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Json(json!({ "message": "Invalid credentials" })),
        );
    }
    let token = "abc123".to_string();
    state.valid_tokens.write().insert(token.clone());
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_static("refresh=r1; HttpOnly; Path=/"),
    );
    (
        StatusCode::OK,
        headers,
        Json(json!({ "user": sample_user(), "accessToken": token })),
    )
}

async fn refresh_token(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if headers.get(AUTHORIZATION).is_some() {
        state.refresh_saw_bearer.store(true, Ordering::SeqCst);
    }
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    }
    if state.fail_refresh.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "refresh token expired" })));
    }
    // The refresh credential travels as a cookie, never as a bearer.
    let cookie_ok = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .map(|c| c.contains("refresh=r1"))
        .unwrap_or(false);
    if !cookie_ok {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "missing refresh cookie" })));
    }
    let token = state.mint.read().clone();
    if !state.reject_minted.load(Ordering::SeqCst) {
        state.valid_tokens.write().insert(token.clone());
    }
    (StatusCode::OK, Json(json!({ "accessToken": token })))
}

async fn logout(State(state): State<Arc<BackendState>>) -> impl IntoResponse {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_logout.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "logout unavailable" })));
    }
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> impl IntoResponse {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    match check_auth(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(json!({ "user": sample_user() }))),
        Err(e) => e,
    }
}

async fn register(Json(body): Json<Value>) -> impl IntoResponse {
    for field in ["username", "email", "password", "country", "city", "gender", "tel"] {
        if body.get(field).and_then(|v| v.as_str()).map(str::is_empty).unwrap_or(true) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": format!("{} is required", field) })),
            );
        }
    }
    (StatusCode::CREATED, Json(json!({ "status": "ok" })))
}

async fn verify_otp(Json(body): Json<Value>) -> impl IntoResponse {
    let code = body.get("otpCode").and_then(|v| v.as_str()).unwrap_or("");
    if code == "1234" {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": "invalid OTP" })))
    }
}

// Unauthenticated 200 for notification-style endpoints.
async fn accept() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn authed_accept(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => e,
    }
}

async fn authed_accept_no_body(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => e,
    }
}

async fn authed_accept_with_path(
    State(state): State<Arc<BackendState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => e,
    }
}

async fn update_profile(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => {
            let mut user = sample_user();
            if let Some(name) = body.get("username") {
                user["username"] = name.clone();
            }
            (StatusCode::OK, Json(json!({ "user": user })))
        }
        Err(e) => e,
    }
}

async fn profiles(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(json!({ "users": [sample_user()] }))),
        Err(e) => e,
    }
}

async fn teacher_requests(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!([{
                "_id": "u9",
                "username": "ade",
                "email": "ade@example.org",
                "subjects": ["Biology", { "name": "Chemistry", "approved": false }]
            }])),
        ),
        Err(e) => e,
    }
}

async fn approved_teachers(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(json!([sample_teacher()]))),
        Err(e) => e,
    }
}

async fn rooms(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!([
                sample_room(),
                { "_id": "r2", "teacher": null, "roomName": "orphan", "subject": "English" }
            ])),
        ),
        Err(e) => e,
    }
}

async fn create_enrollment(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => {
            let record = json!({
                "_id": format!("e{}", state.enrollments.read().len() + 1),
                "teacher": sample_teacher(),
                "room": sample_room(),
                "studentId": body.get("studentId").cloned().unwrap_or(Value::Null)
            });
            state.enrollments.write().push(record);
            (StatusCode::CREATED, Json(json!({ "status": "ok" })))
        }
        Err(e) => e,
    }
}

async fn student_enrollments(
    State(state): State<Arc<BackendState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (StatusCode::OK, Json(Value::Array(state.enrollments.read().clone()))),
        Err(e) => e,
    }
}

async fn student_progress(
    State(state): State<Arc<BackendState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => {
            let paid = state.certificate_payments.read().contains(&"p1".to_string());
            let issued = state.certificates_issued.read().contains(&"p1".to_string());
            (
                StatusCode::OK,
                Json(json!([{
                    "_id": "p1",
                    "course": { "subject": "Physics", "roomName": "Kofi-Physics" },
                    "progressPercent": 100,
                    "completed": true,
                    "certificateIssued": issued,
                    "certificatePaid": paid
                }])),
            )
        }
        Err(e) => e,
    }
}

async fn progress_payment(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => {
            state.certificate_payments.write().push(id);
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        }
        Err(e) => e,
    }
}

async fn progress_certificate(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => {
            if !state.certificate_payments.read().contains(&id) {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": "certificate fee not paid" })));
            }
            state.certificates_issued.write().push(id);
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        }
        Err(e) => e,
    }
}

async fn zoom_token(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "meetingId": 998877,
                "join_url": "https://meet.example.org/j/998877",
                "moderator": false
            })),
        ),
        Err(e) => e,
    }
}

// Generic authenticated probe used by the refresh-protocol tests; records
// every bearer it sees and how many Authorization headers each request had.
async fn protected(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.protected_calls.fetch_add(1, Ordering::SeqCst);
    state
        .protected_header_counts
        .write()
        .push(headers.get_all(AUTHORIZATION).iter().count());
    if let Some(tok) = bearer_of(&headers) {
        state.protected_bearers.write().push(tok.clone());
        if state.valid_tokens.read().contains(&tok) {
            return (StatusCode::OK, Json(json!({ "ok": true })));
        }
    }
    unauthorized()
}

async fn slow(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> impl IntoResponse {
    match check_auth(&state, &headers) {
        Ok(()) => {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            (StatusCode::OK, Json(json!({ "ok": true })))
        }
        Err(e) => e,
    }
}
