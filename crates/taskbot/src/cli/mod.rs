use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskbot_core::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the Telegram bot with long polling
    ///
    /// Example: taskbot serve
    Serve,
    /// Talk to the bot from the terminal
    ///
    /// Lines starting with "/" are commands, anything else answers a pending
    /// prompt. This is the default when no subcommand is given.
    ///
    /// Example: taskbot console --user-id 42
    Console {
        /// Identity to send as (defaults to the root user)
        #[arg(long)]
        user_id: Option<i64>,
        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    BotToken,
    RootUserId,
    TasksPath,
    LogFile,
    ApiBaseUrl,
    PollTimeoutSecs,
    PendingTtlSecs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "bot_token" | "token" => ConfigOverrideTarget::BotToken,
        "root_user_id" | "root" => ConfigOverrideTarget::RootUserId,
        "tasks_path" => ConfigOverrideTarget::TasksPath,
        "log_file" => ConfigOverrideTarget::LogFile,
        "api_base_url" => ConfigOverrideTarget::ApiBaseUrl,
        "poll_timeout_secs" => ConfigOverrideTarget::PollTimeoutSecs,
        "pending_ttl_secs" => ConfigOverrideTarget::PendingTtlSecs,
        other => return Err(format!("unknown config field '{other}'")),
    };

    if value.is_empty() {
        return Err(format!("override for '{field}' needs a value"));
    }

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` argument into one set of overrides; later
/// arguments win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for item in raw {
        let parsed = parse_config_override(item)?;
        match parsed.target {
            ConfigOverrideTarget::BotToken => overrides.bot_token = Some(parsed.value),
            ConfigOverrideTarget::RootUserId => {
                overrides.root_user_id = Some(parse_number(&parsed.value, "root_user_id")?)
            }
            ConfigOverrideTarget::TasksPath => {
                overrides.tasks_path = Some(PathBuf::from(parsed.value))
            }
            ConfigOverrideTarget::LogFile => overrides.log_file = Some(PathBuf::from(parsed.value)),
            ConfigOverrideTarget::ApiBaseUrl => overrides.api_base_url = Some(parsed.value),
            ConfigOverrideTarget::PollTimeoutSecs => {
                overrides.poll_timeout_secs = Some(parse_number(&parsed.value, "poll_timeout_secs")?)
            }
            ConfigOverrideTarget::PendingTtlSecs => {
                overrides.pending_ttl_secs = Some(parse_number(&parsed.value, "pending_ttl_secs")?)
            }
        }
    }
    Ok(overrides)
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("'{field}' must be a number, got '{value}'"))
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
