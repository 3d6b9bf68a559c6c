pub mod api;
pub mod domain;
pub mod infrastructure;
pub mod schema;
pub mod services;
pub mod telemetry;
