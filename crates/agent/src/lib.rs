//! FuelWatch agent
//!
//! HTTP front end for the fuel anomaly engine: observation ingestion, fleet
//! report broadcast, health checks and Prometheus metrics.

pub mod api;
pub mod config;
