use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{auth, rides, users};
use crate::middleware::auth::{optional_auth, require_auth};
use crate::middleware::role_guard::require_admin;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes; a valid credential is attached when present
    let auth_routes = Router::new()
        .route("/sign-in", post(auth::sign_in))
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-out", post(auth::sign_out))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    // Routes for any authenticated user
    let session_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/users/me", patch(users::update_profile))
        .route("/users/me/password", post(users::change_password))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Admin routes (anonymous or non-admin callers get 403)
    let admin_routes = Router::new()
        .route("/rides", get(rides::list_rides).post(rides::create_ride))
        .route("/rides/{id}", get(rides::get_ride).patch(rides::update_ride))
        .route("/rides/{id}/events", post(rides::create_ride_event))
        .route("/reports/trip-durations", get(rides::trip_durations))
        .route("/users", get(users::list_users))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", session_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
