use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};

use super::{NewRide, NewUser, RideFilter, RideStore, SortOrder, UserChanges, UserStore, Window};
use crate::entities::ride::RideStatus;
use crate::entities::user::UserRole;
use crate::entities::{ride, ride_event, user};
use crate::error::{AppError, AppResult};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn filtered_rides(filter: &RideFilter) -> Select<ride::Entity> {
        let mut query = ride::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(ride::Column::Status.eq(status));
        }

        if let Some(email) = filter.rider_email.as_deref() {
            let pattern = format!("%{}%", escape_like(&email.to_lowercase()));
            query = query
                .join(JoinType::InnerJoin, ride::Relation::Rider.def())
                .filter(
                    Expr::expr(Func::lower(Expr::col((user::Entity, user::Column::Email))))
                        .like(LikeExpr::new(pattern).escape('\\')),
                );
        }

        query
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_order(order: SortOrder) -> Order {
    match order {
        SortOrder::Ascending => Order::Asc,
        SortOrder::Descending => Order::Desc,
    }
}

#[async_trait]
impl UserStore for SeaOrmStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(user::Entity::find()
            .filter(user::Column::IdUser.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?)
    }

    async fn list_users(&self, role: Option<UserRole>) -> AppResult<Vec<user::Model>> {
        let mut query = user::Entity::find().order_by_asc(user::Column::IdUser);
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role));
        }
        Ok(query.all(&self.db).await?)
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn insert_user(&self, new_user: NewUser) -> AppResult<user::Model> {
        let model = user::ActiveModel {
            role: Set(new_user.role),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            email: Set(new_user.email),
            phone_number: Set(new_user.phone_number),
            password_hash: Set(new_user.password_hash),
            ..Default::default()
        };

        model.insert(&self.db).await.map_err(AppError::from_user_insert)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> AppResult<Option<user::Model>> {
        let Some(existing) = user::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = existing.into();
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(phone_number) = changes.phone_number {
            active.phone_number = Set(phone_number);
        }
        if let Some(password_hash) = changes.password_hash {
            active.password_hash = Set(password_hash);
        }

        Ok(Some(active.update(&self.db).await?))
    }
}

#[async_trait]
impl RideStore for SeaOrmStore {
    async fn count_rides(&self, filter: &RideFilter) -> AppResult<u64> {
        Ok(Self::filtered_rides(filter).count(&self.db).await?)
    }

    async fn find_rides(
        &self,
        filter: &RideFilter,
        order: SortOrder,
        window: Option<Window>,
    ) -> AppResult<Vec<ride::Model>> {
        let mut query = Self::filtered_rides(filter)
            .order_by(ride::Column::PickupTime, to_order(order))
            .order_by(ride::Column::IdRide, Order::Asc);

        if let Some(window) = window {
            // OFFSET and LIMIT bind as signed bigints.
            let max = i64::MAX as u64;
            query = query
                .offset(window.offset.min(max))
                .limit(window.limit.min(max));
        }

        Ok(query.all(&self.db).await?)
    }

    async fn find_ride(&self, id: i32) -> AppResult<Option<ride::Model>> {
        Ok(ride::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_events(
        &self,
        ride_ids: &[i32],
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<ride_event::Model>> {
        if ride_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = ride_event::Entity::find()
            .filter(ride_event::Column::IdRide.is_in(ride_ids.iter().copied()));
        if let Some(since) = since {
            query = query.filter(ride_event::Column::CreatedAt.gte(since));
        }

        Ok(query
            .order_by_asc(ride_event::Column::CreatedAt)
            .order_by_asc(ride_event::Column::IdRideEvent)
            .all(&self.db)
            .await?)
    }

    async fn insert_ride(&self, new_ride: NewRide) -> AppResult<ride::Model> {
        new_ride.validate()?;

        let model = ride::ActiveModel {
            status: Set(new_ride.status),
            id_rider: Set(new_ride.id_rider),
            id_driver: Set(new_ride.id_driver),
            pickup_latitude: Set(new_ride.pickup_latitude),
            pickup_longitude: Set(new_ride.pickup_longitude),
            dropoff_latitude: Set(new_ride.dropoff_latitude),
            dropoff_longitude: Set(new_ride.dropoff_longitude),
            pickup_time: Set(new_ride.pickup_time),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn update_ride_status(
        &self,
        id: i32,
        status: RideStatus,
    ) -> AppResult<Option<ride::Model>> {
        let Some(existing) = ride::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: ride::ActiveModel = existing.into();
        active.status = Set(status);
        Ok(Some(active.update(&self.db).await?))
    }

    async fn insert_event(
        &self,
        ride_id: i32,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<ride_event::Model> {
        let model = ride_event::ActiveModel {
            id_ride: Set(ride_id),
            description: Set(description.to_string()),
            created_at: Set(created_at),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }
}
