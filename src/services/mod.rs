pub mod accounts;
pub mod pagination;
pub mod ride_commands;
pub mod ride_query;
pub mod token;
pub mod trip_report;
