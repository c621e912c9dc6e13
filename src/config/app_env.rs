use std::convert::{TryFrom, TryInto};

use once_cell::sync::OnceCell;

fn cell() -> &'static OnceCell<AppEnv> {
    static APP_ENV: OnceCell<AppEnv> = OnceCell::new();
    &APP_ENV
}

pub fn app_env() -> &'static AppEnv {
    cell().get_or_init(|| {
        std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".into())
            .try_into()
            .expect("To parse APP_ENV")
    })
}

/// Pins the app environment before anything reads `settings()`. Intended
/// for use from the test harness's one-time `#[ctor]` setup, which must run
/// before the first `settings()`/`app_env()` call in the process.
pub fn force_env(env: AppEnv) {
    let _ = cell().set(env);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
            AppEnv::Test => "test",
        }
    }
}

impl TryFrom<String> for AppEnv {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            otherwise => Err(format!("{} is not a known environment", otherwise)),
        }
    }
}
