pub mod app_settings;
pub mod error;
pub mod publisher;
pub mod remote;
pub mod routes;
pub mod session;
pub mod startup;
pub mod storage;
pub mod sweeper;
pub mod telemetry;
