use crate::error::AppError;
use crate::message::UserId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKBOT_CONFIG_PATH";

pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
pub const ROOT_USER_ID_ENV: &str = "ROOT_USER_ID";
pub const TASKS_PATH_ENV: &str = "TASKBOT_TASKS_PATH";
pub const LOG_FILE_ENV: &str = "TASKBOT_LOG_FILE";

const DEFAULT_TASKS_PATH: &str = "tasks.txt";
const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub root_user_id: Option<i64>,
    #[serde(default = "default_tasks_path")]
    pub tasks_path: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default)]
    pub pending_ttl_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: None,
            root_user_id: None,
            tasks_path: default_tasks_path(),
            log_file: None,
            api_base_url: default_api_base_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
            pending_ttl_secs: None,
        }
    }
}

fn default_tasks_path() -> PathBuf {
    PathBuf::from(DEFAULT_TASKS_PATH)
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_poll_timeout_secs() -> u64 {
    DEFAULT_POLL_TIMEOUT_SECS
}

impl Config {
    pub fn root_user(&self) -> Result<UserId, AppError> {
        self.root_user_id
            .map(UserId)
            .ok_or_else(|| AppError::invalid_data(format!("{ROOT_USER_ID_ENV} must be set")))
    }

    pub fn bot_token(&self) -> Result<&str, AppError> {
        self.bot_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::invalid_data(format!("{BOT_TOKEN_ENV} must be set")))
    }

    pub fn pending_ttl(&self) -> Option<Duration> {
        self.pending_ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub root_user_id: Option<i64>,
    pub tasks_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub poll_timeout_secs: Option<u64>,
    pub pending_ttl_secs: Option<u64>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("taskbot")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskbot")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })
}

/// Applies environment values on top of `base`. `lookup` is `std::env::var`
/// in production.
pub fn apply_env<F>(base: &Config, lookup: F) -> Result<Config, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let mut config = base.clone();

    if let Some(token) = value(BOT_TOKEN_ENV) {
        config.bot_token = Some(token);
    }
    if let Some(raw) = value(ROOT_USER_ID_ENV) {
        let id = raw.parse::<i64>().map_err(|_| {
            AppError::invalid_data(format!("{ROOT_USER_ID_ENV} must be a number, got '{raw}'"))
        })?;
        config.root_user_id = Some(id);
    }
    if let Some(path) = value(TASKS_PATH_ENV) {
        config.tasks_path = PathBuf::from(path);
    }
    if let Some(path) = value(LOG_FILE_ENV) {
        config.log_file = Some(PathBuf::from(path));
    }

    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(token) = overrides.bot_token.as_ref() {
        merged.bot_token = Some(token.clone());
    }
    if let Some(id) = overrides.root_user_id {
        merged.root_user_id = Some(id);
    }
    if let Some(path) = overrides.tasks_path.as_ref() {
        merged.tasks_path = path.clone();
    }
    if let Some(path) = overrides.log_file.as_ref() {
        merged.log_file = Some(path.clone());
    }
    if let Some(url) = overrides.api_base_url.as_ref() {
        merged.api_base_url = url.clone();
    }
    if let Some(secs) = overrides.poll_timeout_secs {
        merged.poll_timeout_secs = secs;
    }
    if let Some(secs) = overrides.pending_ttl_secs {
        merged.pending_ttl_secs = Some(secs);
    }
    merged
}
