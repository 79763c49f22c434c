//!
//! gatehouse HTTP server
//! ---------------------
//! This module defines the Axum-based HTTP interface for gatehouse.
//!
//! Responsibilities:
//! - Session gate middleware building a per-request identity context from the
//!   session cookie.
//! - Login/logout endpoints backed by the `identity` module.
//! - Cookie issue/clear helpers for the signed session credential.
//! - Environment-dependent error pages (diagnostic in development, generic in
//!   production).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::{Form, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::identity::{
    AuthProvider, ClaimsAuthProvider, GrantAllRoles, LoginRequest, RequestContext, SessionIssuer,
};

pub mod pages;

const SESSION_COOKIE: &str = "gatehouse_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Server configuration resolved from the environment at startup and passed
/// explicitly into `run_with_config`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub session_key: [u8; 32],
    pub session_ttl_minutes: i64,
    pub environment: Environment,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let http_port: u16 = std::env::var("GATEHOUSE_HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let session_key = match std::env::var("GATEHOUSE_SESSION_KEY") {
            Ok(raw) => parse_session_key(raw.trim())
                .ok_or_else(|| anyhow!("GATEHOUSE_SESSION_KEY must be 64 hex characters"))?,
            Err(_) => {
                let mut key = [0u8; 32];
                getrandom::getrandom(&mut key).map_err(|e| anyhow!(e.to_string()))?;
                warn!("GATEHOUSE_SESSION_KEY not set; generated a random key, sessions will not survive a restart");
                key
            }
        };
        let session_ttl_minutes: i64 = std::env::var("GATEHOUSE_SESSION_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20);
        let environment = match std::env::var("GATEHOUSE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        Ok(Self { http_port, session_key, session_ttl_minutes, environment })
    }
}

fn parse_session_key(raw: &str) -> Option<[u8; 32]> {
    if raw.len() != 64 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = decode_hex(raw)?;
    bytes.as_slice().try_into().ok()
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(input.len() / 2);
    let mut chars = input.chars();
    while let (Some(h), Some(l)) = (chars.next(), chars.next()) {
        let hi = h.to_digit(16)?;
        let lo = l.to_digit(16)?;
        bytes.push(((hi << 4) | lo) as u8);
    }
    Some(bytes)
}

/// Shared server state injected into all handlers.
///
/// Holds only immutable configuration: the credential issuer, the auth
/// provider, and the environment mode. Requests share no mutable state.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<SessionIssuer>,
    pub provider: Arc<dyn AuthProvider>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(cfg: &ServerConfig) -> Self {
        let issuer = Arc::new(SessionIssuer::new(
            cfg.session_key,
            chrono::Duration::minutes(cfg.session_ttl_minutes),
        ));
        let provider: Arc<dyn AuthProvider> =
            Arc::new(ClaimsAuthProvider::new(issuer.clone(), Arc::new(GrantAllRoles)));
        Self { issuer, provider, environment: cfg.environment }
    }
}

/// Start the gatehouse HTTP server with configuration from the environment.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(ServerConfig::from_env()?).await
}

pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(&cfg);
    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Mount all routes behind the session gate.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/Login/Index", get(login_index).post(login_submit))
        .route("/Login/Logout", post(logout))
        .layer(middleware::from_fn_with_state(state.clone(), session_gate))
        .with_state(state)
}

/// Session gate: runs once per request before route dispatch.
///
/// Reads the session cookie, verifies the credential, and attaches a
/// `RequestContext` to the request extensions. Missing, malformed, expired or
/// tampered credentials downgrade silently to anonymous.
async fn session_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let principal = match parse_cookie(request.headers(), SESSION_COOKIE) {
        Some(token) => {
            let verified = state.issuer.verify(&token);
            if verified.is_none() {
                debug!(request_id = %request_id, "invalid or expired session credential; continuing as anonymous");
            }
            verified
        }
        None => None,
    };
    let ctx = match principal {
        Some(p) => RequestContext::authenticated(p, request_id),
        None => RequestContext::anonymous(request_id),
    };
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn set_session_cookie(credential: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path /; expiry lives inside the credential
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE, credential
    ))
    .unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE
    ))
    .unwrap()
}

fn error_response(state: &AppState, err: AppError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match state.environment {
        Environment::Development => pages::error_page_detailed(&err),
        Environment::Production => pages::error_page_generic(),
    };
    (status, Html(body)).into_response()
}

/// Default page. Anonymous requests see the login form; authenticated ones a
/// signed-in summary.
async fn home(Extension(ctx): Extension<RequestContext>) -> Html<String> {
    match &ctx.principal {
        Some(p) => Html(pages::home_page(p)),
        None => Html(pages::login_page()),
    }
}

async fn login_index() -> Html<String> {
    Html(pages::login_page())
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(rename = "UserName", default)]
    user_name: Option<String>,
    #[serde(rename = "Email", default)]
    email: String,
}

async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let req = LoginRequest { user_name: form.user_name, email: form.email };
    match state.provider.login(&req) {
        Ok(resp) => {
            let mut headers = HeaderMap::new();
            headers.insert("Set-Cookie", set_session_cookie(&resp.credential));
            (headers, Redirect::to("/")).into_response()
        }
        Err(e) => {
            warn!("login rejected: {e}");
            error_response(&state, AppError::from(e))
        }
    }
}

async fn logout(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
    if let Some(p) = &ctx.principal {
        info!(user = %p.name, "auth.logout cleared session");
    }
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", clear_session_cookie());
    (headers, Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cookie_picks_named_pair() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("a=1; gatehouse_session=tok; b=2"));
        assert_eq!(parse_cookie(&headers, SESSION_COOKIE).as_deref(), Some("tok"));
        assert_eq!(parse_cookie(&headers, "missing"), None);
    }

    #[test]
    fn session_key_parsing() {
        let hex = "00".repeat(32);
        assert!(parse_session_key(&hex).is_some());
        assert!(parse_session_key("deadbeef").is_none());
        assert!(parse_session_key(&"zz".repeat(32)).is_none());
    }
}
