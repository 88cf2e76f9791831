//! Start-up seeding: the admin account, and optionally a small sample dataset.

use chrono::Duration;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::config::Config;
use crate::entities::ride::RideStatus;
use crate::entities::user::UserRole;
use crate::error::AppResult;
use crate::storage::{NewRide, NewUser, RideFilter, RideStore, UserStore};
use crate::utils::clock::Clock;
use crate::utils::password::hash_password;

const SAMPLE_PASSWORD: &str = "password123";

const SAMPLE_USERS: [(&str, &str, &str, &str, UserRole); 5] = [
    ("John", "Doe", "john.doe@example.com", "1234567890", UserRole::User),
    ("Jane", "Smith", "jane.smith@example.com", "1234567891", UserRole::User),
    ("Mike", "Johnson", "mike.johnson@example.com", "1234567892", UserRole::Driver),
    ("Sarah", "Williams", "sarah.williams@example.com", "1234567893", UserRole::Driver),
    ("David", "Brown", "david.brown@example.com", "1234567894", UserRole::Driver),
];

/// (pickup, dropoff) pairs around New York City.
const SAMPLE_LOCATIONS: [((f64, f64), (f64, f64)); 5] = [
    ((40.7128, -74.0060), (40.7589, -73.9851)),
    ((40.7505, -73.9934), (40.7282, -73.7949)),
    ((40.7614, -73.9776), (40.6782, -73.9442)),
    ((40.7489, -73.9680), (40.6892, -74.0445)),
    ((40.7282, -73.7949), (40.7128, -74.0060)),
];

const SAMPLE_EVENTS: [&str; 11] = [
    "Ride requested",
    "Driver assigned",
    "Driver on the way",
    "Driver arrived at pickup location",
    "Passenger picked up",
    "Ride in progress",
    "Arrived at destination",
    "Ride completed",
    "Payment processed",
    "Ride cancelled by passenger",
    "Ride cancelled by driver",
];

const SAMPLE_RIDES: usize = 10;

/// Seed the admin account if it doesn't exist
pub async fn seed_admin(users: &dyn UserStore, config: &Config) -> AppResult<()> {
    if users.email_exists(&config.admin_email).await? {
        return Ok(());
    }

    users
        .insert_user(NewUser {
            email: config.admin_email.clone(),
            password_hash: hash_password(&config.admin_password)?,
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            phone_number: String::new(),
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!(email = %config.admin_email, "admin account created");
    Ok(())
}

/// Populate sample users, rides and events. Does nothing if any ride exists.
pub async fn seed_sample_data(
    users: &dyn UserStore,
    rides: &dyn RideStore,
    clock: &dyn Clock,
) -> AppResult<()> {
    if rides.count_rides(&RideFilter::default()).await? > 0 {
        tracing::info!("rides already present, skipping sample data");
        return Ok(());
    }

    let mut rng = StdRng::from_entropy();

    for (first_name, last_name, email, phone_number, role) in SAMPLE_USERS {
        if users.email_exists(email).await? {
            continue;
        }
        let user = users
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash: hash_password(SAMPLE_PASSWORD)?,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                phone_number: phone_number.to_string(),
                role,
            })
            .await?;
        tracing::info!(email = %user.email, name = %user.full_name(), "sample user created");
    }

    let everyone = users.list_users(None).await?;
    let drivers: Vec<i32> = everyone
        .iter()
        .filter(|u| u.role == UserRole::Driver)
        .map(|u| u.id_user)
        .collect();
    let riders: Vec<i32> = everyone
        .iter()
        .filter(|u| matches!(u.role, UserRole::User | UserRole::Passenger))
        .map(|u| u.id_user)
        .collect();

    let now = clock.now();
    let mut created = Vec::new();
    for _ in 0..SAMPLE_RIDES {
        let (Some(&rider), Some(&driver)) = (riders.choose(&mut rng), drivers.choose(&mut rng))
        else {
            break;
        };
        if rider == driver {
            continue;
        }

        let Some(&((pickup_lat, pickup_lon), (dropoff_lat, dropoff_lon))) =
            SAMPLE_LOCATIONS.choose(&mut rng)
        else {
            break;
        };
        let status = RideStatus::ALL.choose(&mut rng).copied().unwrap_or(RideStatus::EnRoute);
        let pickup_time = now
            - Duration::days(rng.gen_range(0..=30))
            - Duration::hours(rng.gen_range(0..=23))
            - Duration::minutes(rng.gen_range(0..=59));

        let ride = rides
            .insert_ride(NewRide {
                status,
                id_rider: rider,
                id_driver: driver,
                pickup_latitude: pickup_lat,
                pickup_longitude: pickup_lon,
                dropoff_latitude: dropoff_lat,
                dropoff_longitude: dropoff_lon,
                pickup_time,
            })
            .await?;
        created.push(ride);
    }

    let mut events = 0;
    for ride in &created {
        let mut at = ride.pickup_time;
        for _ in 0..rng.gen_range(2..=5) {
            at += Duration::minutes(rng.gen_range(5..=30));
            if at > now {
                at = now - Duration::minutes(rng.gen_range(1..=60));
            }
            let Some(description) = SAMPLE_EVENTS.choose(&mut rng) else {
                break;
            };
            rides.insert_event(ride.id_ride, description, at).await?;
            events += 1;
        }
    }

    tracing::info!(rides = created.len(), events, "sample data seeded");
    Ok(())
}
