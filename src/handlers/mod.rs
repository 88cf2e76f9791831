pub mod auth;
pub mod query;
pub mod rides;
pub mod users;
