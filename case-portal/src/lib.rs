pub mod config;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
pub mod startup;

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

use gate::{AccessGate, ProfileLookup, SessionStore};
use services::{AuthProvider, ContentStore};
use session::SessionCookies;

/// Shared application state: the access gate plus the backend seams every
/// handler talks through.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
    pub auth: Arc<dyn AuthProvider>,
    pub content: Arc<dyn ContentStore>,
    pub cookies: SessionCookies,
    pub metrics: PrometheusHandle,
    /// Absolute origin used for links that leave the portal, such as the
    /// signup confirmation email.
    pub public_url: String,
}

impl AppState {
    /// Wire every seam to one backend that implements all of them.
    pub fn with_backend<B>(
        backend: Arc<B>,
        cookies: SessionCookies,
        call_timeout: Duration,
        public_url: impl Into<String>,
        metrics: PrometheusHandle,
    ) -> Self
    where
        B: SessionStore + ProfileLookup + AuthProvider + ContentStore + 'static,
    {
        let gate = AccessGate::new(backend.clone(), backend.clone(), call_timeout);
        Self {
            gate: Arc::new(gate),
            auth: backend.clone(),
            content: backend,
            cookies,
            metrics,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }
}
