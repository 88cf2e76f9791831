pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::accounts::AccountService;
use services::ride_commands::RideCommandService;
use services::ride_query::RideQueryService;
use services::token::TokenService;
use services::trip_report::TripReportService;
use storage::{RideStore, UserStore};
use utils::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub accounts: AccountService,
    pub rides: RideQueryService,
    pub ride_commands: RideCommandService,
    pub reports: TripReportService,
    pub config: Config,
}

impl AppState {
    /// Wires every service onto one store that serves both users and rides.
    pub fn new<S>(store: Arc<S>, config: Config, clock: Arc<dyn Clock>) -> Self
    where
        S: UserStore + RideStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let ride_store: Arc<dyn RideStore> = store;

        let tokens = TokenService::new(clock.clone(), config.token_ttl());
        let accounts = AccountService::new(users.clone(), tokens.clone());
        let rides = RideQueryService::new(ride_store.clone(), users.clone(), clock.clone());
        let ride_commands =
            RideCommandService::new(ride_store.clone(), users.clone(), clock, rides.clone());
        let reports = TripReportService::new(ride_store, rides.clone());

        Self {
            users,
            tokens,
            accounts,
            rides,
            ride_commands,
            reports,
            config,
        }
    }
}
