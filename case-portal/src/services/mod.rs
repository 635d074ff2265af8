pub mod auth;
pub mod backend_client;
pub mod content;
pub mod error;
pub mod metrics;

pub use auth::{AuthProvider, AuthSession, SignUpOutcome, SignUpRequest};
pub use backend_client::BackendClient;
pub use content::ContentStore;
pub use error::BackendError;
