//! Credential resolution.
//!
//! Both middlewares share [`extract_credential`] and [`resolve_request_principal`];
//! they differ only in what happens when nothing resolves.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Credentials, Authorization, HeaderMapExt},
};

use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::AppState;

pub const AUTH_COOKIE: &str = "auth_token";

/// The resolved caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

/// `Authorization: Token <value>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCredential(String);

impl TokenCredential {
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl Credentials for TokenCredential {
    const SCHEME: &'static str = "Token";

    fn decode(value: &HeaderValue) -> Option<Self> {
        let raw = value.to_str().ok()?;
        let token = raw.get(Self::SCHEME.len()..)?.trim();
        (!token.is_empty()).then(|| Self(token.to_string()))
    }

    fn encode(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("{} {}", Self::SCHEME, self.0))
            .unwrap_or_else(|_| HeaderValue::from_static("Token"))
    }
}

/// The `auth_token` cookie if present and non-empty, otherwise the
/// `Authorization: Token` header.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(AUTH_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    headers
        .typed_get::<Authorization<TokenCredential>>()
        .map(|auth| auth.0.token().to_string())
}

/// `Ok(None)` covers both "no credential" and "credential did not resolve".
pub async fn resolve_request_principal(
    state: &AppState,
    headers: &HeaderMap,
) -> AppResult<Option<user::Model>> {
    let Some(token) = extract_credential(headers) else {
        return Ok(None);
    };

    let principal = state
        .tokens
        .resolve_principal(&token, state.users.as_ref())
        .await?;
    if principal.is_none() {
        tracing::debug!("presented token did not resolve to a user");
    }
    Ok(principal)
}

/// Attaches [`CurrentUser`] when a credential resolves; otherwise lets the
/// request through anonymously.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    if let Some(principal) = resolve_request_principal(&state, request.headers()).await? {
        request.extensions_mut().insert(CurrentUser(principal));
    }
    Ok(next.run(request).await)
}

/// Rejects the request with 401 unless a credential resolves.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let principal = resolve_request_principal(&state, request.headers())
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided or are invalid.".to_string())
        })?;

    request.extensions_mut().insert(CurrentUser(principal));
    Ok(next.run(request).await)
}
