use std::path::PathBuf;

use once_cell::sync::OnceCell;
use serde::Deserialize;

pub mod app_env;

pub use app_env::app_env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors: CorsSettings,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    allowed_origins: Vec<String>,
}

impl CorsSettings {
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub db_name: String,
}

impl DatabaseSettings {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.db_name
        )
    }
}

pub fn settings() -> &'static Settings {
    static SETTINGS: OnceCell<Settings> = OnceCell::new();

    SETTINGS.get_or_init(|| load_settings(None).expect("Failed to load settings"))
}

/// Loads settings from an explicit config directory (used by CLI
/// subcommands that accept `--config-path`), falling back to `./config`
/// relative to the current directory.
pub fn load_settings(config_path: Option<PathBuf>) -> Result<Settings, config::ConfigError> {
    let mut builder = config::Config::default();

    let config_dir = config_path.unwrap_or_else(|| {
        std::env::current_dir()
            .expect("The current directory to be available")
            .join("config")
    });

    builder.merge(config::File::from(config_dir.join("base")).required(true))?;
    builder.merge(config::File::from(config_dir.join(app_env().as_str())).required(true))?;
    builder.merge(config::Environment::with_prefix("QUADSTORE").separator("__"))?;

    builder.try_into()
}
