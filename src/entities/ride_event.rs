use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Description written when a ride enters pickup.
pub const PICKUP_DESCRIPTION: &str = "Status changed to pickup";
/// Description written when a ride enters dropoff.
pub const DROPOFF_DESCRIPTION: &str = "Status changed to dropoff";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ride_event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_ride_event: i32,
    pub id_ride: i32,
    pub description: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ride::Entity",
        from = "Column::IdRide",
        to = "super::ride::Column::IdRide",
        on_delete = "Cascade"
    )]
    Ride,
}

impl Related<super::ride::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ride.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
