//! Meal console server
//!
//! Serves the administration console behind a role-based access gate and
//! exposes the small session API the pages rely on.

pub mod config;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod route_table;
pub mod routes;
pub mod state;

pub use gate::{Decision, GateSettings, RouteGate, UnknownPathPolicy};
pub use route_table::{RouteEntry, RouteSpec, RouteTable};
pub use state::AppState;
