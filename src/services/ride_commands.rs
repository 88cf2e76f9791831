//! Admin writes: creating rides, moving their status, appending events.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::entities::ride::RideStatus;
use crate::entities::ride_event;
use crate::error::{AppError, AppResult};
use crate::services::ride_query::{RideQueryService, RideView};
use crate::storage::{NewRide, RideStore, UserStore};
use crate::utils::clock::Clock;

pub const MAX_DESCRIPTION_LENGTH: usize = 255;

#[derive(Debug, Clone)]
pub struct RideDraft {
    /// Defaults to `en-route`.
    pub status: Option<String>,
    pub id_rider: i32,
    pub id_driver: i32,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub pickup_time: DateTime<Utc>,
}

fn parse_status(raw: &str) -> AppResult<RideStatus> {
    raw.trim()
        .parse::<RideStatus>()
        .map_err(|_| AppError::BadRequest("Invalid status.".to_string()))
}

fn check_coordinate(value: f64, bound: f64) -> AppResult<()> {
    if !value.is_finite() || value.abs() > bound {
        return Err(AppError::BadRequest("Invalid coordinates.".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct RideCommandService {
    rides: Arc<dyn RideStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    queries: RideQueryService,
}

impl RideCommandService {
    pub fn new(
        rides: Arc<dyn RideStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        queries: RideQueryService,
    ) -> Self {
        Self {
            rides,
            users,
            clock,
            queries,
        }
    }

    pub async fn create(&self, draft: RideDraft) -> AppResult<RideView> {
        let status = match draft.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => RideStatus::EnRoute,
            Some(raw) => parse_status(raw)?,
        };

        check_coordinate(draft.pickup_latitude, 90.0)?;
        check_coordinate(draft.dropoff_latitude, 90.0)?;
        check_coordinate(draft.pickup_longitude, 180.0)?;
        check_coordinate(draft.dropoff_longitude, 180.0)?;

        let new_ride = NewRide {
            status,
            id_rider: draft.id_rider,
            id_driver: draft.id_driver,
            pickup_latitude: draft.pickup_latitude,
            pickup_longitude: draft.pickup_longitude,
            dropoff_latitude: draft.dropoff_latitude,
            dropoff_longitude: draft.dropoff_longitude,
            pickup_time: draft.pickup_time,
        };
        new_ride.validate()?;

        if self.users.find_by_id(new_ride.id_rider).await?.is_none() {
            return Err(AppError::BadRequest("Rider not found.".to_string()));
        }
        if self.users.find_by_id(new_ride.id_driver).await?.is_none() {
            return Err(AppError::BadRequest("Driver not found.".to_string()));
        }

        let ride = self.rides.insert_ride(new_ride).await?;
        tracing::info!(ride_id = ride.id_ride, status = %ride.status, "ride created");
        self.queries.get(ride.id_ride).await
    }

    pub async fn update_status(&self, id: i32, status: &str) -> AppResult<RideView> {
        let status = parse_status(status)?;
        let ride = self
            .rides
            .update_ride_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Ride not found.".to_string()))?;

        tracing::info!(ride_id = ride.id_ride, status = %ride.status, "ride status updated");
        self.queries.get(ride.id_ride).await
    }

    /// Events are stamped with the current time.
    pub async fn append_event(&self, id: i32, description: &str) -> AppResult<ride_event::Model> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::BadRequest("Description is required.".to_string()));
        }
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(AppError::BadRequest(format!(
                "Description must be at most {} characters.",
                MAX_DESCRIPTION_LENGTH
            )));
        }

        if self.rides.find_ride(id).await?.is_none() {
            return Err(AppError::NotFound("Ride not found.".to_string()));
        }

        let event = self
            .rides
            .insert_event(id, description, self.clock.now())
            .await?;
        tracing::debug!(ride_id = id, event_id = event.id_ride_event, "ride event appended");
        Ok(event)
    }
}
