use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{NewRide, NewUser, RideFilter, RideStore, SortOrder, UserChanges, UserStore, Window};
use crate::entities::ride::RideStatus;
use crate::entities::user::UserRole;
use crate::entities::{ride, ride_event, user};
use crate::error::{AppError, AppResult, EMAIL_TAKEN};

#[derive(Default)]
struct Tables {
    users: Vec<user::Model>,
    rides: Vec<ride::Model>,
    events: Vec<ride_event::Model>,
}

impl Tables {
    fn matches(&self, ride: &ride::Model, filter: &RideFilter) -> bool {
        if filter.status.is_some_and(|status| status != ride.status) {
            return false;
        }
        match filter.rider_email.as_deref() {
            None => true,
            // Inner-join semantics: a ride whose rider is gone never matches.
            Some(needle) => self
                .users
                .iter()
                .find(|u| u.id_user == ride.id_rider)
                .is_some_and(|rider| {
                    rider
                        .email
                        .to_lowercase()
                        .contains(&needle.to_lowercase())
                }),
        }
    }
}

/// Process-local store with the same query semantics as [`super::SeaOrmStore`].
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(ids: impl Iterator<Item = i32>) -> i32 {
    ids.max().unwrap_or(0) + 1
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<user::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id_user == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<user::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id_user))
            .cloned()
            .collect())
    }

    async fn list_users(&self, role: Option<UserRole>) -> AppResult<Vec<user::Model>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| role.is_none_or(|role| u.role == role))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, new_user: NewUser) -> AppResult<user::Model> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == new_user.email) {
            return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
        }

        let model = user::Model {
            id_user: next_id(tables.users.iter().map(|u| u.id_user)),
            role: new_user.role,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            phone_number: new_user.phone_number,
            password_hash: new_user.password_hash,
        };
        tables.users.push(model.clone());
        Ok(model)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> AppResult<Option<user::Model>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.users.iter_mut().find(|u| u.id_user == id) else {
            return Ok(None);
        };

        if let Some(first_name) = changes.first_name {
            existing.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            existing.last_name = last_name;
        }
        if let Some(phone_number) = changes.phone_number {
            existing.phone_number = phone_number;
        }
        if let Some(password_hash) = changes.password_hash {
            existing.password_hash = password_hash;
        }

        Ok(Some(existing.clone()))
    }
}

#[async_trait]
impl RideStore for InMemoryStore {
    async fn count_rides(&self, filter: &RideFilter) -> AppResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .rides
            .iter()
            .filter(|r| tables.matches(r, filter))
            .count();
        Ok(count as u64)
    }

    async fn find_rides(
        &self,
        filter: &RideFilter,
        order: SortOrder,
        window: Option<Window>,
    ) -> AppResult<Vec<ride::Model>> {
        let tables = self.tables.read().await;
        let mut rides: Vec<ride::Model> = tables
            .rides
            .iter()
            .filter(|r| tables.matches(r, filter))
            .cloned()
            .collect();

        rides.sort_by(|a, b| {
            let by_time = match order {
                SortOrder::Ascending => a.pickup_time.cmp(&b.pickup_time),
                SortOrder::Descending => b.pickup_time.cmp(&a.pickup_time),
            };
            by_time.then(a.id_ride.cmp(&b.id_ride))
        });

        Ok(match window {
            Some(window) => rides
                .into_iter()
                .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
                .collect(),
            None => rides,
        })
    }

    async fn find_ride(&self, id: i32) -> AppResult<Option<ride::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.rides.iter().find(|r| r.id_ride == id).cloned())
    }

    async fn find_events(
        &self,
        ride_ids: &[i32],
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<ride_event::Model>> {
        let tables = self.tables.read().await;
        let mut events: Vec<ride_event::Model> = tables
            .events
            .iter()
            .filter(|e| ride_ids.contains(&e.id_ride))
            .filter(|e| since.is_none_or(|since| e.created_at >= since))
            .cloned()
            .collect();

        events.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.id_ride_event.cmp(&b.id_ride_event))
        });
        Ok(events)
    }

    async fn insert_ride(&self, new_ride: NewRide) -> AppResult<ride::Model> {
        new_ride.validate()?;

        let mut tables = self.tables.write().await;
        let model = ride::Model {
            id_ride: next_id(tables.rides.iter().map(|r| r.id_ride)),
            status: new_ride.status,
            id_rider: new_ride.id_rider,
            id_driver: new_ride.id_driver,
            pickup_latitude: new_ride.pickup_latitude,
            pickup_longitude: new_ride.pickup_longitude,
            dropoff_latitude: new_ride.dropoff_latitude,
            dropoff_longitude: new_ride.dropoff_longitude,
            pickup_time: new_ride.pickup_time,
        };
        tables.rides.push(model.clone());
        Ok(model)
    }

    async fn update_ride_status(
        &self,
        id: i32,
        status: RideStatus,
    ) -> AppResult<Option<ride::Model>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.rides.iter_mut().find(|r| r.id_ride == id) else {
            return Ok(None);
        };
        existing.status = status;
        Ok(Some(existing.clone()))
    }

    async fn insert_event(
        &self,
        ride_id: i32,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<ride_event::Model> {
        let mut tables = self.tables.write().await;
        if !tables.rides.iter().any(|r| r.id_ride == ride_id) {
            return Err(AppError::NotFound(format!("Ride {} not found", ride_id)));
        }

        let model = ride_event::Model {
            id_ride_event: next_id(tables.events.iter().map(|e| e.id_ride_event)),
            id_ride: ride_id,
            description: description.to_string(),
            created_at,
        };
        tables.events.push(model.clone());
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: String::new(),
            role: UserRole::User,
        }
    }

    fn new_ride(rider: i32, driver: i32, status: RideStatus, minutes: i64) -> NewRide {
        NewRide {
            status,
            id_rider: rider,
            id_driver: driver,
            pickup_latitude: 40.0,
            pickup_longitude: -74.0,
            dropoff_latitude: 40.1,
            dropoff_longitude: -74.1,
            pickup_time: DateTime::from_timestamp(1_700_000_000 + minutes * 60, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_user(new_user("a@example.com")).await.unwrap();
        let err = store.insert_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let store = InMemoryStore::new();
        store.insert_user(new_user("Mixed@Example.com")).await.unwrap();
        assert!(store.find_by_email("mixed@example.com").await.unwrap().is_none());
        assert!(store.email_exists("Mixed@Example.com").await.unwrap());
    }

    #[tokio::test]
    async fn filter_window_and_count() {
        let store = InMemoryStore::new();
        let john = store.insert_user(new_user("John@example.com")).await.unwrap();
        let jane = store.insert_user(new_user("jane@example.com")).await.unwrap();
        let driver = store.insert_user(new_user("drv@example.com")).await.unwrap();

        for (i, status) in [RideStatus::Completed, RideStatus::Cancelled, RideStatus::Completed]
            .into_iter()
            .enumerate()
        {
            store
                .insert_ride(new_ride(john.id_user, driver.id_user, status, i as i64))
                .await
                .unwrap();
        }
        store
            .insert_ride(new_ride(jane.id_user, driver.id_user, RideStatus::Completed, 10))
            .await
            .unwrap();

        let filter = RideFilter {
            status: Some(RideStatus::Completed),
            rider_email: Some("JOHN".to_string()),
        };
        assert_eq!(store.count_rides(&filter).await.unwrap(), 2);

        let newest = store
            .find_rides(
                &RideFilter::default(),
                SortOrder::Descending,
                Some(Window { offset: 0, limit: 2 }),
            )
            .await
            .unwrap();
        assert_eq!(newest.iter().map(|r| r.id_ride).collect::<Vec<_>>(), vec![4, 3]);
    }

    #[tokio::test]
    async fn status_update_touches_only_the_target_ride() {
        let store = InMemoryStore::new();
        let rider = store.insert_user(new_user("r@example.com")).await.unwrap();
        let driver = store.insert_user(new_user("d@example.com")).await.unwrap();
        let first = store
            .insert_ride(new_ride(rider.id_user, driver.id_user, RideStatus::EnRoute, 0))
            .await
            .unwrap();
        let second = store
            .insert_ride(new_ride(rider.id_user, driver.id_user, RideStatus::EnRoute, 1))
            .await
            .unwrap();

        let updated = store
            .update_ride_status(first.id_ride, RideStatus::Pickup)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, RideStatus::Pickup);
        assert_eq!(
            store.find_ride(second.id_ride).await.unwrap().unwrap().status,
            RideStatus::EnRoute
        );
        assert!(store.update_ride_status(99, RideStatus::Pickup).await.unwrap().is_none());
    }
}
