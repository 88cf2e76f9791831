//! Storage ports.
//!
//! Services talk to persistence only through [`UserStore`] and [`RideStore`].
//! The filter and window types below are the query language those ports
//! accept; each adapter interprets them natively.

pub mod database;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::ride::RideStatus;
use crate::entities::user::UserRole;
use crate::entities::{ride, ride_event, user};
use crate::error::{AppError, AppResult};

pub use database::SeaOrmStore;
pub use memory::InMemoryStore;

/// Ride filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideFilter {
    pub status: Option<RideStatus>,
    /// Case-insensitive substring of the rider's email.
    pub rider_email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Unknown or missing tokens resolve to descending.
    pub fn parse(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some("asc" | "ascending" | "a") => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }
}

/// Offset/limit window applied by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRide {
    pub status: RideStatus,
    pub id_rider: i32,
    pub id_driver: i32,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub pickup_time: DateTime<Utc>,
}

impl NewRide {
    pub fn validate(&self) -> AppResult<()> {
        if self.id_rider == self.id_driver {
            return Err(AppError::BadRequest(
                "Rider and driver must be different users.".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>>;

    async fn find_by_id(&self, id: i32) -> AppResult<Option<user::Model>>;

    async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<user::Model>>;

    async fn list_users(&self, role: Option<UserRole>) -> AppResult<Vec<user::Model>>;

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn insert_user(&self, new_user: NewUser) -> AppResult<user::Model>;

    /// Returns `None` when the user no longer exists.
    async fn update_user(&self, id: i32, changes: UserChanges) -> AppResult<Option<user::Model>>;
}

#[async_trait]
pub trait RideStore: Send + Sync {
    /// Number of rides matching `filter`, independent of any window.
    async fn count_rides(&self, filter: &RideFilter) -> AppResult<u64>;

    /// Rides matching `filter` ordered by pickup time (ties by id ascending).
    /// `None` returns the full filtered set.
    async fn find_rides(
        &self,
        filter: &RideFilter,
        order: SortOrder,
        window: Option<Window>,
    ) -> AppResult<Vec<ride::Model>>;

    async fn find_ride(&self, id: i32) -> AppResult<Option<ride::Model>>;

    /// Events of the given rides in one batch, ordered by creation time then
    /// id. `since` keeps only events created at or after that instant.
    async fn find_events(
        &self,
        ride_ids: &[i32],
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<ride_event::Model>>;

    async fn insert_ride(&self, new_ride: NewRide) -> AppResult<ride::Model>;

    /// Returns `None` when the ride does not exist.
    async fn update_ride_status(
        &self,
        id: i32,
        status: RideStatus,
    ) -> AppResult<Option<ride::Model>>;

    async fn insert_event(
        &self,
        ride_id: i32,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<ride_event::Model>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_tokens() {
        assert_eq!(SortOrder::parse(Some("asc")), SortOrder::Ascending);
        assert_eq!(SortOrder::parse(Some("ascending")), SortOrder::Ascending);
        assert_eq!(SortOrder::parse(Some("a")), SortOrder::Ascending);
        assert_eq!(SortOrder::parse(Some("desc")), SortOrder::Descending);
        assert_eq!(SortOrder::parse(Some("descending")), SortOrder::Descending);
        assert_eq!(SortOrder::parse(Some("d")), SortOrder::Descending);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Descending);
        assert_eq!(SortOrder::parse(None), SortOrder::Descending);
    }

    #[test]
    fn ride_with_same_rider_and_driver_is_rejected() {
        let ride = NewRide {
            status: RideStatus::EnRoute,
            id_rider: 3,
            id_driver: 3,
            pickup_latitude: 0.0,
            pickup_longitude: 0.0,
            dropoff_latitude: 0.0,
            dropoff_longitude: 0.0,
            pickup_time: Utc::now(),
        };
        assert!(matches!(ride.validate(), Err(AppError::BadRequest(_))));
    }
}
