use axum::{
    extract::{rejection::JsonRejection, RawQuery, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::handlers::query::QueryValues;
use crate::middleware::auth::CurrentUser;
use crate::services::accounts::ProfileUpdate;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Update the caller's own profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Json<user::Model>> {
    let Json(payload) = payload?;

    let updated = state
        .accounts
        .update_profile(
            &user,
            ProfileUpdate {
                first_name: payload.first_name,
                last_name: payload.last_name,
                phone_number: payload.phone_number,
            },
        )
        .await?;

    Ok(Json(updated))
}

/// Change the caller's password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let Json(payload) = payload?;

    let current = payload
        .current_password
        .ok_or_else(|| AppError::BadRequest("Current password is required.".to_string()))?;
    let new = payload
        .new_password
        .ok_or_else(|| AppError::BadRequest("New password is required.".to_string()))?;

    state.accounts.change_password(&user, &current, &new).await?;
    Ok(Json(json!({ "status": "success", "message": "Password updated." })))
}

/// List users, optionally by role (admin)
pub async fn list_users(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<Vec<user::Model>>> {
    let role = QueryValues::parse(raw.as_deref()).get("role");
    let users = state.accounts.list_users(role.as_deref()).await?;
    Ok(Json(users))
}
