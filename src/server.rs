//!
//! crewdash HTTP server
//! --------------------
//! Axum-based HTTP surface over the authorization gate.
//!
//! Responsibilities:
//! - Resolve the caller from a bearer token or the session cookie.
//! - Exchange a long-lived API token for an expiring browser session.
//! - Answer workspace access checks and list workspace members.
//! - Logout of the presented session, or of every session the caller holds.
//! - Periodic sweep of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::gate::AuthorizationGate;
use crate::identity::{Principal, RequestContext, SESSION_COOKIE, SessionIdentityProvider, SessionManager};
use crate::seed::load_seed;
use crate::workspace::{InMemoryMembershipStore, Membership, MembershipStore, Role};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthorizationGate>,
    pub sessions: Arc<SessionManager>,
    pub store: Arc<dyn MembershipStore>,
}

impl AppState {
    /// Session-backed identity over the given store.
    pub fn new(sessions: Arc<SessionManager>, store: Arc<dyn MembershipStore>) -> Self {
        let identity = Arc::new(SessionIdentityProvider::new(sessions.clone()));
        let gate = Arc::new(AuthorizationGate::new(identity, store.clone()));
        Self { gate, sessions, store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "crewdash ok" }))
        .route("/api/me", get(me))
        .route("/api/sessions", post(create_session))
        .route("/api/workspaces/{workspace_id}/access", get(workspace_access))
        .route("/api/workspaces/{workspace_id}/members", get(workspace_members))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Build state from config (seed file included), then serve until the listener fails.
pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    let sessions = Arc::new(SessionManager::with_ttl(config.session_ttl));
    let store = Arc::new(InMemoryMembershipStore::new());
    if let Some(path) = config.seed_file.as_deref() {
        let seed = load_seed(path).with_context(|| format!("loading seed {}", path.display()))?;
        seed.apply(&store, &sessions).with_context(|| format!("applying seed {}", path.display()))?;
    } else {
        tracing::warn!("no seed file configured; membership store starts empty");
    }

    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                tick.tick().await;
                let removed = sessions.sweep_expired();
                if removed > 0 { tracing::debug!(removed = removed, "session_sweep"); }
            }
        });
    }

    if store.is_empty() {
        tracing::warn!("membership store is empty; every workspace check will be denied");
    } else {
        info!(memberships = store.len(), "membership store ready");
    }

    let state = AppState::new(sessions, store);
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    info!("Starting server on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AccessQuery { role: Option<String> }

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessResult {
    pub workspace_id: String,
    pub role: Role,
    pub allowed: bool,
}

fn parse_role(raw: Option<&str>) -> AppResult<Option<Role>> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.parse::<Role>().map(Some).map_err(|e| AppError::user("invalid_role".to_string(), e.to_string())),
    }
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Principal>> {
    let ctx = RequestContext::from_headers(&headers);
    let principal = state.gate.require_authenticated(&ctx)?;
    Ok(Json(principal))
}

async fn workspace_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<String>,
    Query(q): Query<AccessQuery>,
) -> AppResult<Json<AccessResult>> {
    let ctx = RequestContext::from_headers(&headers);
    let required = parse_role(q.role.as_deref())?;
    state.gate.require_workspace_role(&ctx, &workspace_id, required)?;
    Ok(Json(AccessResult { workspace_id, role: required.unwrap_or_default(), allowed: true }))
}

async fn workspace_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<String>,
) -> AppResult<Json<Vec<Membership>>> {
    let ctx = RequestContext::from_headers(&headers);
    state.gate.require_workspace_role(&ctx, &workspace_id, Some(Role::Member))?;
    let members = state.store.list_for_workspace(&workspace_id).map_err(|e| {
        tracing::warn!(workspace = %workspace_id, error = %e, "member listing failed");
        AppError::unavailable("store_unavailable", "Membership store unavailable")
    })?;
    Ok(Json(members))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionGrant {
    pub token: String,
    pub expires_in_secs: u64,
}

fn session_cookie(token: &str, ttl: Duration) -> String {
    format!("{SESSION_COOKIE}={token}; Max-Age={}; HttpOnly; Secure; SameSite=Strict; Path=/", ttl.as_secs())
}

/// Issue a fresh expiring session for the authenticated caller and set it as the session cookie.
async fn create_session(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let ctx = RequestContext::from_headers(&headers);
    let principal = state.gate.require_authenticated(&ctx)?;
    let user_id = principal.user_id.clone();
    let session = state.sessions.issue(principal).map_err(|e| {
        tracing::error!(user = %user_id, error = %e, "session issue failed");
        AppError::unavailable("session_unavailable", "Session could not be issued")
    })?;
    let ttl = state.sessions.ttl;
    let cookie = HeaderValue::from_str(&session_cookie(&session.token, ttl))
        .map_err(|_| AppError::unavailable("session_unavailable", "Session could not be issued"))?;
    info!(user = %user_id, session = %session.session_id, "auth.session_issued");
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", cookie);
    Ok((h, Json(SessionGrant { token: session.token, expires_in_secs: ttl.as_secs() })))
}

#[derive(Debug, Default, Deserialize)]
struct LogoutQuery {
    #[serde(default)]
    everywhere: bool,
}

const CLEARED_SESSION_COOKIE: &str =
    "crewdash_session=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/";

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<LogoutQuery>,
) -> AppResult<impl IntoResponse> {
    let ctx = RequestContext::from_headers(&headers);
    let principal = state.gate.require_authenticated(&ctx)?;
    let removed = if q.everywhere {
        state.sessions.revoke_user(&principal.user_id)
    } else {
        ctx.token.as_deref().map(|t| usize::from(state.sessions.logout(t))).unwrap_or(0)
    };
    info!(user = %principal.user_id, removed, everywhere = q.everywhere, "auth.logout");
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", HeaderValue::from_static(CLEARED_SESSION_COOKIE));
    Ok((h, Json(serde_json::json!({"status": "ok"}))))
}
