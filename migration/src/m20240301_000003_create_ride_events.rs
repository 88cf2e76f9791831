use sea_orm_migration::{prelude::*, schema::*};

use super::m20240301_000002_create_rides::Ride;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RideEvent::Table)
                    .if_not_exists()
                    .col(pk_auto(RideEvent::IdRideEvent))
                    .col(integer(RideEvent::IdRide).not_null())
                    .col(string_len(RideEvent::Description, 255).not_null())
                    .col(
                        timestamp_with_time_zone(RideEvent::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_event_ride")
                            .from(RideEvent::Table, RideEvent::IdRide)
                            .to(Ride::Table, Ride::IdRide)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Recent-event window and milestone lookups both scan by ride then time.
        manager
            .create_index(
                Index::create()
                    .name("idx_ride_event_ride_created_at")
                    .table(RideEvent::Table)
                    .col(RideEvent::IdRide)
                    .col(RideEvent::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RideEvent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum RideEvent {
    Table,
    IdRideEvent,
    IdRide,
    Description,
    CreatedAt,
}
