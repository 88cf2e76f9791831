use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::ride_event::{self, DROPOFF_DESCRIPTION, PICKUP_DESCRIPTION};
use crate::error::AppResult;
use crate::services::pagination::{PageRequest, Paginated};
use crate::services::ride_query::{RideQueryService, RideView};
use crate::storage::{RideFilter, RideStore, SortOrder};

/// Pickup and dropoff timestamps recovered from a ride's event log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Milestones {
    pub pickup: Option<DateTime<Utc>>,
    pub dropoff: Option<DateTime<Utc>>,
}

impl Milestones {
    /// Whole minutes between pickup and dropoff, rounded down.
    pub fn duration_minutes(&self) -> Option<i64> {
        let (pickup, dropoff) = (self.pickup?, self.dropoff?);
        Some((dropoff - pickup).num_seconds().div_euclid(60))
    }
}

/// Groups events per ride. For each milestone the first event seen wins;
/// later events with the same description are ignored.
pub fn collect_milestones(events: &[ride_event::Model]) -> HashMap<i32, Milestones> {
    let mut milestones: HashMap<i32, Milestones> = HashMap::new();
    for event in events {
        let entry = milestones.entry(event.id_ride).or_default();
        let slot = match event.description.as_str() {
            PICKUP_DESCRIPTION => &mut entry.pickup,
            DROPOFF_DESCRIPTION => &mut entry.dropoff,
            _ => continue,
        };
        slot.get_or_insert(event.created_at);
    }
    milestones
}

#[derive(Debug, Clone, Serialize)]
pub struct TripDurationRow {
    #[serde(flatten)]
    pub ride: RideView,
    pub trip_duration_minutes: Option<i64>,
    pub pickup_event_time: Option<DateTime<Utc>>,
    pub dropoff_event_time: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct TripReportService {
    rides: Arc<dyn RideStore>,
    queries: RideQueryService,
}

impl TripReportService {
    pub fn new(rides: Arc<dyn RideStore>, queries: RideQueryService) -> Self {
        Self { rides, queries }
    }

    pub async fn durations(&self, page: PageRequest) -> AppResult<Paginated<TripDurationRow>> {
        let filter = RideFilter::default();
        let count = self.rides.count_rides(&filter).await?;
        if page.is_past_end(count) {
            return Ok(Paginated::new(Vec::new(), count, page));
        }
        let rides = self
            .rides
            .find_rides(&filter, SortOrder::Descending, Some(page.window()))
            .await?;

        let ride_ids: Vec<i32> = rides.iter().map(|r| r.id_ride).collect();
        let milestones = collect_milestones(&self.rides.find_events(&ride_ids, None).await?);

        let rows = self
            .queries
            .project(rides)
            .await?
            .into_iter()
            .map(|ride| {
                let found = milestones.get(&ride.id_ride).copied().unwrap_or_default();
                TripDurationRow {
                    trip_duration_minutes: found.duration_minutes(),
                    pickup_event_time: found.pickup,
                    dropoff_event_time: found.dropoff,
                    ride,
                }
            })
            .collect();

        Ok(Paginated::new(rows, count, page))
    }
}
