//! portal-core: shared infrastructure for the case portal services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use error::AppError;
