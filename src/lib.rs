//! Library exports for section-dashboard, shared between the binary and tests.

pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod routes;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;
