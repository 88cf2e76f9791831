use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20240301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(RideStatus::Enum)
                    .values([
                        RideStatus::EnRoute,
                        RideStatus::Pickup,
                        RideStatus::Dropoff,
                        RideStatus::Completed,
                        RideStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ride::Table)
                    .if_not_exists()
                    .col(pk_auto(Ride::IdRide))
                    .col(
                        ColumnDef::new(Ride::Status)
                            .custom(RideStatus::Enum)
                            .not_null()
                            .default("en-route"),
                    )
                    .col(integer(Ride::IdRider).not_null())
                    .col(integer(Ride::IdDriver).not_null())
                    .col(double(Ride::PickupLatitude).not_null())
                    .col(double(Ride::PickupLongitude).not_null())
                    .col(double(Ride::DropoffLatitude).not_null())
                    .col(double(Ride::DropoffLongitude).not_null())
                    .col(timestamp_with_time_zone(Ride::PickupTime).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_rider")
                            .from(Ride::Table, Ride::IdRider)
                            .to(User::Table, User::IdUser)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_driver")
                            .from(Ride::Table, Ride::IdDriver)
                            .to(User::Table, User::IdUser)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_pickup_time")
                    .table(Ride::Table)
                    .col(Ride::PickupTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ride::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(RideStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ride {
    Table,
    IdRide,
    Status,
    IdRider,
    IdDriver,
    PickupLatitude,
    PickupLongitude,
    DropoffLatitude,
    DropoffLongitude,
    PickupTime,
}

#[derive(DeriveIden)]
pub enum RideStatus {
    #[sea_orm(iden = "ride_status")]
    Enum,
    #[sea_orm(iden = "en-route")]
    EnRoute,
    #[sea_orm(iden = "pickup")]
    Pickup,
    #[sea_orm(iden = "dropoff")]
    Dropoff,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
