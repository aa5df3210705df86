use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment prefix shared by all services, e.g. `APP_SERVER__PORT`.
pub const ENV_PREFIX: &str = "APP";

/// Locate a service's `config` directory.
///
/// Works both when the process runs inside the service directory and when it
/// runs from the workspace root.
pub fn configuration_directory(base_path: &Path, service_dir: &str) -> PathBuf {
    if base_path.ends_with(service_dir) {
        base_path.join("config")
    } else {
        base_path.join(service_dir).join("config")
    }
}

/// Load `base.yaml` from `config_dir` and layer `APP_*` environment variables
/// on top of it.
pub fn load<T: DeserializeOwned>(config_dir: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let config = Cfg::builder()
        .add_source(File::from(config_dir.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
