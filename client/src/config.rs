use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub server_url: String,
    pub storage_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let server_url: String = try_load("STAMPKEEPER_URL", "http://localhost:8080");

        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            storage_path: try_load("STAMPKEEPER_STORAGE", "stampkeeper_storage.json"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
