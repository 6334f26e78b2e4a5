// Library exports for waypoint-server
// This allows other crates in the workspace to use waypoint-server modules

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod feed;
pub mod session;
pub mod state;
