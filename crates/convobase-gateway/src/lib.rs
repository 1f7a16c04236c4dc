pub mod app;
pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;

pub use app::{build_router, AppState};
pub use config::GatewayConfig;
