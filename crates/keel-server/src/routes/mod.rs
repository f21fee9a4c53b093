//! API routes.

pub mod account;
pub mod health;

pub use account::{account_routes, login_handler, logout_handler, me_handler};
pub use health::{HealthResponse, health_routes};
