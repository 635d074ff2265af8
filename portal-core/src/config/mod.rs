use crate::error::AppError;
use config::{Config, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Deployment environment; controls the `Secure` attribute on cookies and
/// similar production-only behaviour.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Prod
    }
}

/// Load settings from `<dir>/base.yaml`, then apply `APP_`-prefixed
/// environment overrides (`APP_SERVER__PORT=9000`).
pub fn load_settings<T: DeserializeOwned>(configuration_directory: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}
