pub mod auth;
pub mod config;
pub mod repository;
pub mod state;
