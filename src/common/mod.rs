//! Shared building blocks used by the UI and the background workers.

pub mod config;
pub mod geo;

pub use config::DashboardConfig;
pub use geo::TileId;
