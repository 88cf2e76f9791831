use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::entities::ride_event;
use crate::error::AppResult;
use crate::handlers::query::QueryValues;
use crate::services::pagination::{PageEnvelope, PageRequest};
use crate::services::ride_commands::RideDraft;
use crate::services::ride_query::{RideListParams, RideQueryPlan, RideView};
use crate::services::trip_report::TripDurationRow;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRideRequest {
    #[serde(default)]
    pub status: Option<String>,
    pub id_rider: i32,
    pub id_driver: i32,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub pickup_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRideRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub description: String,
}

/// List rides with filtering, sorting and pagination (admin)
pub async fn list_rides(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<PageEnvelope<RideView>>> {
    let query = QueryValues::parse(raw.as_deref());
    let params = RideListParams {
        status: query.get("status"),
        email: query.get("email"),
        sort: query.get("sort"),
        order: query.get("order"),
        lat: query.get("lat"),
        lon: query.get("lon"),
        page: query.get("page"),
        page_size: query.get("page_size"),
    };

    let plan = RideQueryPlan::from_params(&params)?;
    let page = state.rides.list(&plan).await?;
    Ok(Json(PageEnvelope::new(page, &uri)))
}

/// Get a single ride (admin)
pub async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<RideView>> {
    Ok(Json(state.rides.get(id).await?))
}

/// Create a ride (admin)
pub async fn create_ride(
    State(state): State<AppState>,
    payload: Result<Json<CreateRideRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RideView>)> {
    let Json(payload) = payload?;

    let ride = state
        .ride_commands
        .create(RideDraft {
            status: payload.status,
            id_rider: payload.id_rider,
            id_driver: payload.id_driver,
            pickup_latitude: payload.pickup_latitude,
            pickup_longitude: payload.pickup_longitude,
            dropoff_latitude: payload.dropoff_latitude,
            dropoff_longitude: payload.dropoff_longitude,
            pickup_time: payload.pickup_time,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ride)))
}

/// Change a ride's status (admin)
pub async fn update_ride(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateRideRequest>, JsonRejection>,
) -> AppResult<Json<RideView>> {
    let Json(payload) = payload?;
    Ok(Json(state.ride_commands.update_status(id, &payload.status).await?))
}

/// Append an event to a ride (admin)
pub async fn create_ride_event(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ride_event::Model>)> {
    let Json(payload) = payload?;
    let event = state
        .ride_commands
        .append_event(id, &payload.description)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Trip durations derived from pickup/dropoff events (admin)
pub async fn trip_durations(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<PageEnvelope<TripDurationRow>>> {
    let query = QueryValues::parse(raw.as_deref());
    let page = PageRequest::from_raw(
        query.get("page").as_deref(),
        query.get("page_size").as_deref(),
    );
    let report = state.reports.durations(page).await?;
    Ok(Json(PageEnvelope::new(report, &uri)))
}
