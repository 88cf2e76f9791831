//! Ride listing: filter, sort, paginate, then attach riders, drivers and the
//! last day of ride events.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::entities::ride::RideStatus;
use crate::entities::{ride, ride_event, user};
use crate::error::{AppError, AppResult};
use crate::services::pagination::{PageRequest, Paginated};
use crate::storage::{RideFilter, RideStore, SortOrder, UserStore};
use crate::utils::clock::Clock;
use crate::utils::geo::GeoPoint;

/// Events newer than this are attached to each listed ride.
pub const RECENT_EVENTS_WINDOW_HOURS: i64 = 24;

/// Raw listing query parameters. Everything arrives as text so that bad
/// values can be coerced instead of rejected.
#[derive(Debug, Clone, Default)]
pub struct RideListParams {
    pub status: Option<String>,
    pub email: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RideSort {
    /// Evaluated by the store, together with the page window.
    PickupTime(SortOrder),
    /// Distance is computed in-process, so the whole filtered set is loaded
    /// before ordering and slicing. Cost scales with the match count, not the
    /// page size.
    Distance { origin: GeoPoint, order: SortOrder },
}

impl Default for RideSort {
    fn default() -> Self {
        RideSort::PickupTime(SortOrder::Descending)
    }
}

impl RideSort {
    pub fn resolve(
        key: Option<&str>,
        order: Option<&str>,
        lat: Option<&str>,
        lon: Option<&str>,
    ) -> Self {
        let order = SortOrder::parse(order);
        match key.map(str::trim) {
            Some("pickup_time") => RideSort::PickupTime(order),
            Some("distance") => match (parse_coordinate(lat), parse_coordinate(lon)) {
                (Some(lat), Some(lon)) => RideSort::Distance {
                    origin: GeoPoint::new(lat, lon),
                    order,
                },
                _ => RideSort::default(),
            },
            _ => RideSort::default(),
        }
    }
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Fully resolved listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct RideQueryPlan {
    pub filter: RideFilter,
    pub sort: RideSort,
    pub page: PageRequest,
}

impl RideQueryPlan {
    pub fn from_params(params: &RideListParams) -> AppResult<Self> {
        let status = non_blank(params.status.as_deref())
            .map(|raw| {
                raw.parse::<RideStatus>()
                    .map_err(|_| AppError::BadRequest("Invalid status.".to_string()))
            })
            .transpose()?;

        Ok(Self {
            filter: RideFilter {
                status,
                rider_email: non_blank(params.email.as_deref()).map(str::to_owned),
            },
            sort: RideSort::resolve(
                params.sort.as_deref(),
                params.order.as_deref(),
                params.lat.as_deref(),
                params.lon.as_deref(),
            ),
            page: PageRequest::from_raw(params.page.as_deref(), params.page_size.as_deref()),
        })
    }
}

/// A ride as returned by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct RideView {
    pub id_ride: i32,
    pub status: RideStatus,
    pub id_rider: Option<user::Model>,
    pub id_driver: Option<user::Model>,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub pickup_time: DateTime<Utc>,
    pub todays_ride_events: Vec<ride_event::Model>,
}

/// Stable sort by distance from `origin` to each pickup point.
pub fn rank_by_distance(
    rides: Vec<ride::Model>,
    origin: GeoPoint,
    order: SortOrder,
) -> Vec<ride::Model> {
    let mut ranked: Vec<(f64, ride::Model)> = rides
        .into_iter()
        .map(|r| (origin.distance_to(r.pickup_latitude, r.pickup_longitude), r))
        .collect();

    ranked.sort_by(|(a, _), (b, _)| match order {
        SortOrder::Ascending => a.total_cmp(b),
        SortOrder::Descending => b.total_cmp(a),
    });

    ranked.into_iter().map(|(_, r)| r).collect()
}

#[derive(Clone)]
pub struct RideQueryService {
    rides: Arc<dyn RideStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl RideQueryService {
    pub fn new(rides: Arc<dyn RideStore>, users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self { rides, users, clock }
    }

    pub async fn list(&self, plan: &RideQueryPlan) -> AppResult<Paginated<RideView>> {
        let (rides, count) = match plan.sort {
            RideSort::PickupTime(order) => {
                let count = self.rides.count_rides(&plan.filter).await?;
                if plan.page.is_past_end(count) {
                    return Ok(Paginated::new(Vec::new(), count, plan.page));
                }
                let rides = self
                    .rides
                    .find_rides(&plan.filter, order, Some(plan.page.window()))
                    .await?;
                (rides, count)
            }
            RideSort::Distance { origin, order } => {
                let all = self
                    .rides
                    .find_rides(&plan.filter, SortOrder::Descending, None)
                    .await?;
                let count = all.len() as u64;
                tracing::debug!(matched = count, "ranking rides by distance in memory");
                (plan.page.slice(rank_by_distance(all, origin, order)), count)
            }
        };

        let items = self.project(rides).await?;
        tracing::debug!(
            count,
            page = plan.page.page,
            page_size = plan.page.page_size,
            returned = items.len(),
            "listed rides"
        );
        Ok(Paginated::new(items, count, plan.page))
    }

    pub async fn get(&self, id: i32) -> AppResult<RideView> {
        let ride = self
            .rides
            .find_ride(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ride not found.".to_string()))?;

        self.project(vec![ride])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Ride {} vanished during projection", id)))
    }

    /// Batch-loads riders, drivers and recent events for `rides`, keeping
    /// their order.
    pub async fn project(&self, rides: Vec<ride::Model>) -> AppResult<Vec<RideView>> {
        if rides.is_empty() {
            return Ok(Vec::new());
        }

        let ride_ids: Vec<i32> = rides.iter().map(|r| r.id_ride).collect();
        let user_ids: Vec<i32> = rides
            .iter()
            .flat_map(|r| [r.id_rider, r.id_driver])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let users: HashMap<i32, user::Model> = self
            .users
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id_user, u))
            .collect();

        let since = self.clock.now() - Duration::hours(RECENT_EVENTS_WINDOW_HOURS);
        let mut events: HashMap<i32, Vec<ride_event::Model>> = HashMap::new();
        for event in self.rides.find_events(&ride_ids, Some(since)).await? {
            events.entry(event.id_ride).or_default().push(event);
        }

        Ok(rides
            .into_iter()
            .map(|r| RideView {
                id_ride: r.id_ride,
                status: r.status,
                id_rider: users.get(&r.id_rider).cloned(),
                id_driver: users.get(&r.id_driver).cloned(),
                pickup_latitude: r.pickup_latitude,
                pickup_longitude: r.pickup_longitude,
                dropoff_latitude: r.dropoff_latitude,
                dropoff_longitude: r.dropoff_longitude,
                pickup_time: r.pickup_time,
                todays_ride_events: events.remove(&r.id_ride).unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride_at(id: i32, lat: f64, lon: f64) -> ride::Model {
        ride::Model {
            id_ride: id,
            status: RideStatus::Completed,
            id_rider: 1,
            id_driver: 2,
            pickup_latitude: lat,
            pickup_longitude: lon,
            dropoff_latitude: lat,
            dropoff_longitude: lon,
            pickup_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_sort_resolution() {
        assert_eq!(RideSort::resolve(None, None, None, None), RideSort::default());
        assert_eq!(
            RideSort::resolve(Some("pickup_time"), Some("asc"), None, None),
            RideSort::PickupTime(SortOrder::Ascending)
        );
        assert_eq!(
            RideSort::resolve(Some("fare"), Some("asc"), None, None),
            RideSort::PickupTime(SortOrder::Descending)
        );
        assert_eq!(
            RideSort::resolve(Some("distance"), Some("a"), Some("40.7"), Some("-74.0")),
            RideSort::Distance {
                origin: GeoPoint::new(40.7, -74.0),
                order: SortOrder::Ascending
            }
        );
    }

    #[test]
    fn test_distance_without_both_coordinates_falls_back() {
        for (lat, lon) in [
            (Some("40.7"), None),
            (None, Some("-74.0")),
            (Some("north"), Some("-74.0")),
            (Some("NaN"), Some("-74.0")),
        ] {
            let sort = RideSort::resolve(Some("distance"), Some("asc"), lat, lon);
            assert_eq!(sort, RideSort::PickupTime(SortOrder::Descending));
        }
    }

    #[test]
    fn test_plan_parses_filters() {
        let params = RideListParams {
            status: Some("completed".to_string()),
            email: Some("  john ".to_string()),
            page: Some("x".to_string()),
            ..Default::default()
        };
        let plan = RideQueryPlan::from_params(&params).unwrap();
        assert_eq!(plan.filter.status, Some(RideStatus::Completed));
        assert_eq!(plan.filter.rider_email.as_deref(), Some("john"));
        assert_eq!(plan.page, PageRequest::default());
    }

    #[test]
    fn test_blank_filters_are_ignored_and_bad_status_rejected() {
        let blank = RideListParams {
            status: Some(" ".to_string()),
            email: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(RideQueryPlan::from_params(&blank).unwrap().filter, RideFilter::default());

        let bad = RideListParams {
            status: Some("teleporting".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            RideQueryPlan::from_params(&bad),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_rank_by_distance_orders_and_is_stable() {
        let origin = GeoPoint::new(40.7128, -74.0060);
        let rides = vec![
            ride_at(1, 40.7282, -73.7949), // Queens, ~18 km
            ride_at(2, 40.7128, -74.0060), // origin
            ride_at(3, 40.7589, -73.9851), // Midtown, ~5 km
            ride_at(4, 40.7128, -74.0060), // origin again
        ];

        let asc = rank_by_distance(rides.clone(), origin, SortOrder::Ascending);
        assert_eq!(asc.iter().map(|r| r.id_ride).collect::<Vec<_>>(), vec![2, 4, 3, 1]);

        let desc = rank_by_distance(rides, origin, SortOrder::Descending);
        assert_eq!(desc.iter().map(|r| r.id_ride).collect::<Vec<_>>(), vec![1, 3, 2, 4]);
    }
}
