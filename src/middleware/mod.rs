pub mod auth;
pub mod error_handling;
pub mod metrics;

pub use auth::*;
pub use error_handling::*;
pub use metrics::{metrics_handler, metrics_middleware, record_commit};
