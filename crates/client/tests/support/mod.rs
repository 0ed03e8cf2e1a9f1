// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process mock of the rental backend for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{Form, Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use rentdesk::api::auth::RefreshClient;
use rentdesk::api::ApiClient;
use rentdesk::session::storage::{MemoryStorage, SessionStorage};
use rentdesk::session::Session;

pub const TIMEOUT: Duration = Duration::from_secs(5);
pub const PASSWORD: &str = "secret";

/// How the refresh endpoint answers.
#[derive(Debug, Clone)]
pub enum RefreshBehavior {
    /// Issue `access`, optionally rotating the refresh token.
    Issue { access: String, refresh: Option<String> },
    /// Reject the refresh token with `401`.
    Reject,
}

pub struct BackendState {
    /// The only access token protected routes accept.
    pub valid_access: Mutex<String>,
    pub refresh_behavior: Mutex<RefreshBehavior>,
    pub refresh_delay: Mutex<Duration>,
    pub refresh_calls: AtomicU32,
    /// `refreshToken` values received by the refresh endpoint.
    pub refresh_tokens_seen: Mutex<Vec<String>>,
    /// Whether any refresh request carried an `Authorization` header.
    pub refresh_saw_auth: Mutex<bool>,
    /// Bearer tokens presented to protected routes, in arrival order.
    pub bearers_seen: Mutex<Vec<Option<String>>>,
    pub always_unauthorized_hits: AtomicU32,
    pub logout_bodies: Mutex<Vec<Value>>,
    pub created_reservations: Mutex<Vec<Value>>,
    pub registrations: Mutex<Vec<HashMap<String, String>>>,
}

impl BackendState {
    fn new(valid_access: &str) -> Self {
        Self {
            valid_access: Mutex::new(valid_access.to_owned()),
            refresh_behavior: Mutex::new(RefreshBehavior::Reject),
            refresh_delay: Mutex::new(Duration::ZERO),
            refresh_calls: AtomicU32::new(0),
            refresh_tokens_seen: Mutex::new(Vec::new()),
            refresh_saw_auth: Mutex::new(false),
            bearers_seen: Mutex::new(Vec::new()),
            always_unauthorized_hits: AtomicU32::new(0),
            logout_bodies: Mutex::new(Vec::new()),
            created_reservations: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn set_refresh(&self, behavior: RefreshBehavior, delay: Duration) {
        *self.refresh_behavior.lock() = behavior;
        *self.refresh_delay.lock() = delay;
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned);
        self.bearers_seen.lock().push(bearer.clone());
        if bearer.as_deref() == Some(self.valid_access.lock().as_str()) {
            Ok(())
        } else {
            Err(unauthorized())
        }
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    /// Start a backend that accepts `valid_access` on protected routes.
    pub async fn start(valid_access: &str) -> anyhow::Result<Self> {
        let state = Arc::new(BackendState::new(valid_access));
        let app = Router::new()
            .route("/api/auth/login/", post(login))
            .route("/api/auth/logout/", post(logout))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/register/", post(register))
            .route("/api/reservations/", post(create_reservation))
            .route("/api/vehicles/brands", get(list_brands))
            .route("/api/vehicles/types", get(list_types))
            .route("/api/reservations", get(list_reservations))
            .route("/api/reservations/{id}", get(get_reservation))
            .route("/api/vehicles", get(list_vehicles))
            .route("/api/vehicles/{id}", get(get_vehicle))
            .route("/api/always-unauthorized", get(always_unauthorized))
            .route("/api/broken", get(broken))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// A client whose session is backed by `storage` and refreshes against
    /// this backend.
    pub fn client(&self, storage: Arc<MemoryStorage>) -> ApiClient {
        client_with_refresh_url(&self.base_url(), &self.base_url(), storage)
    }
}

/// Build a client talking to `api_url` whose refresh call goes to
/// `refresh_url`.
pub fn client_with_refresh_url(
    api_url: &str,
    refresh_url: &str,
    storage: Arc<MemoryStorage>,
) -> ApiClient {
    rentdesk::ensure_crypto();
    let session = Session::new(storage as Arc<dyn SessionStorage>, Duration::from_secs(60));
    session.register_refresher(Arc::new(RefreshClient::new(refresh_url, TIMEOUT)));
    session.hydrate();
    ApiClient::new(api_url, session, TIMEOUT)
}

/// Base URL of a port nothing listens on.
pub async fn dead_url() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api"))
}

/// Unsigned JWT whose `exp` is `secs` from now.
pub fn jwt_expiring_in(secs: u64) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{},"user_id":1}}"#, now + secs));
    format!("{header}.{payload}.signature")
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_for(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

fn unauthorized() -> Response {
    let body = json!({ "detail": "Given token not valid for any token type" });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

fn admin_user() -> Value {
    json!({
        "id": 1,
        "username": "admin",
        "email": "admin@demo.com",
        "isEmailValidated": true,
        "role": "ADMIN",
        "name": "Demo Admin",
        "isActive": true
    })
}

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return unauthorized();
    }
    let access = state.valid_access.lock().clone();
    Json(json!({ "access": access, "refresh": "R1", "user": admin_user() })).into_response()
}

async fn logout(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.logout_bodies.lock().push(body);
    StatusCode::NO_CONTENT.into_response()
}

async fn refresh(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if headers.contains_key(AUTHORIZATION) {
        *state.refresh_saw_auth.lock() = true;
    }
    if let Some(token) = body["refreshToken"].as_str() {
        state.refresh_tokens_seen.lock().push(token.to_owned());
    }

    let delay = *state.refresh_delay.lock();
    tokio::time::sleep(delay).await;

    let behavior = state.refresh_behavior.lock().clone();
    match behavior {
        RefreshBehavior::Issue { access, refresh } => {
            *state.valid_access.lock() = access.clone();
            Json(json!({ "access": access, "refresh": refresh })).into_response()
        }
        RefreshBehavior::Reject => unauthorized(),
    }
}

async fn list_reservations(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    let status = query.get("status").cloned().unwrap_or_else(|| "pending".to_owned());
    Json(json!([reservation(1, &status), reservation(2, &status)])).into_response()
}

async fn get_reservation(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    Json(reservation(id, "confirmed")).into_response()
}

async fn list_vehicles(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    Json(json!([vehicle(1), vehicle(2), vehicle(3)])).into_response()
}

async fn get_vehicle(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    Json(vehicle(id)).into_response()
}

async fn list_brands(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    Json(json!([{ "id": 1, "name": "Toyota" }, { "id": 2, "name": "Kia" }])).into_response()
}

async fn list_types(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    Json(json!([{ "id": 1, "name": "Sedan" }, { "id": 2, "name": "SUV" }])).into_response()
}

async fn create_reservation(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    let mut created = reservation(42, "pending");
    created["start_at"] = body["start_at"].clone();
    created["end_at"] = body["end_at"].clone();
    state.created_reservations.lock().push(body);
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn register(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    if let Err(rejected) = state.authorize(&headers) {
        return rejected;
    }
    let user = json!({
        "id": 99,
        "username": fields.get("username"),
        "email": fields.get("email"),
        "role": "EMPLOYEE",
        "isActive": true
    });
    state.registrations.lock().push(fields);
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn always_unauthorized(State(state): State<Arc<BackendState>>) -> Response {
    state.always_unauthorized_hits.fetch_add(1, Ordering::SeqCst);
    unauthorized()
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response()
}

fn reservation(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "customer_user_id": 7,
        "start_at": "2026-03-01T10:00:00Z",
        "end_at": "2026-03-04T10:00:00Z",
        "status": status,
        "note": "",
        "total_amount": "450.00",
        "items": [{
            "vehicle_id": 3,
            "line_amount": 450.0,
            "model": "Corolla",
            "brand_name": "Toyota",
            "license_plate": "ABC-123",
            "year": 2022,
            "status": "available",
            "price_per_day": "150.00",
            "price_per_hour": "12.50"
        }],
        "customer_username": "jdoe",
        "customer_email": "jdoe@demo.com",
        "full_name": "J. Doe"
    })
}

fn vehicle(id: u64) -> Value {
    json!({
        "id": id,
        "brand_id": 1,
        "type_id": 2,
        "model": "Corolla",
        "year": 2022,
        "license_plate": format!("ABC-{id:03}"),
        "transmission": "automatic",
        "seats": 5,
        "price_per_hour": 12.5,
        "price_per_day": "150.00",
        "color": null,
        "images": []
    })
}
