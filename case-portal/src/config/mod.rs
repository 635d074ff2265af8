use portal_core::config::{load_settings, Environment};
use portal_core::error::AppError;
use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub gate: GateSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    /// Browser-facing origin, used to build the email confirmation link
    /// (e.g. `https://cases.example.com`).
    pub public_url: String,
}

#[derive(Deserialize, Clone)]
pub struct BackendSettings {
    /// Base URL of the hosted auth/database project.
    pub url: String,
    /// Public (anon) API key sent as `apikey` on every call.
    pub anon_key: Secret<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

#[derive(Deserialize, Clone)]
pub struct GateSettings {
    /// Upper bound for each session or profile call made by the access gate.
    #[serde(default = "default_gate_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl GateSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_gate_call_timeout_ms(),
        }
    }
}

fn default_gate_call_timeout_ms() -> u64 {
    3_000
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint; traces are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_service_name() -> String {
    "case-portal".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let base_path = std::env::current_dir()?;

    // Works both from the workspace root and from inside case-portal/
    let configuration_directory = if base_path.ends_with("case-portal") {
        base_path.join("config")
    } else {
        base_path.join("case-portal").join("config")
    };

    load_settings(&configuration_directory)
}
