use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{CurrentUser, AUTH_COOKIE};
use crate::services::accounts::{Session, SignUp};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: user::Model,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub status: &'static str,
    pub data: AuthData,
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = time::Duration::seconds(state.tokens.ttl().num_seconds());
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(max_age)
        .build()
}

fn respond(state: &AppState, jar: CookieJar, session: Session) -> (CookieJar, Json<AuthResponse>) {
    let jar = jar.add(session_cookie(state, session.token.clone()));
    let body = AuthResponse {
        status: "success",
        data: AuthData {
            user: session.user,
            token: session.token,
        },
    };
    (jar, Json(body))
}

/// Sign in with email and password; sets the session cookie
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let Json(payload) = payload?;

    let email = payload.email.as_deref().map(str::trim).unwrap_or_default();
    let password = payload.password.as_deref().unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    }

    let session = state.accounts.sign_in(email, password).await?;
    Ok(respond(&state, jar, session))
}

/// Register a new account and sign it in
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> AppResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let Json(payload) = payload?;

    let session = state
        .accounts
        .sign_up(SignUp {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone_number: payload.phone_number,
            role: payload.role,
        })
        .await?;

    let (jar, body) = respond(&state, jar, session);
    Ok((StatusCode::CREATED, jar, body))
}

/// Clear the session cookie. Tokens stay valid until they expire.
pub async fn sign_out(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, Json(json!({ "status": "success", "message": "Signed out." })))
}

/// The authenticated caller
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<serde_json::Value> {
    Json(json!({ "status": "success", "data": { "user": user } }))
}
