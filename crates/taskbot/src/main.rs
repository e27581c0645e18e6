use clap::Parser;
use clap::error::ErrorKind;
use std::io;
use taskbot::cli::{Cli, Command, collect_overrides};
use taskbot::gateway::{console, telegram::TelegramGateway};
use taskbot::logging;
use taskbot_core::Bot;
use taskbot_core::config::{Config, apply_env, load_config_with_fallback, merge_overrides};
use taskbot_core::error::AppError;
use taskbot_core::message::{Sender, UserId};

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_argument(message)
}

fn resolve_config(cli: &Cli) -> Result<(Config, Option<AppError>), AppError> {
    let loaded = load_config_with_fallback();
    let config = apply_env(&loaded.config, |key| std::env::var(key).ok())?;
    let overrides = collect_overrides(&cli.config_override).map_err(AppError::invalid_argument)?;
    Ok((merge_overrides(&config, &overrides), loaded.error))
}

fn run(cli: Cli) -> Result<(), AppError> {
    let (config, config_error) = resolve_config(&cli)?;
    logging::init(config.log_file.as_deref())?;
    if let Some(err) = config_error {
        log::warn!("ignoring configuration file: {err}");
    }

    let bot = Bot::from_config(&config)?;

    match cli.command.unwrap_or(Command::Console {
        user_id: None,
        username: None,
    }) {
        Command::Serve => TelegramGateway::new(&config)?.run(&bot),
        Command::Console { user_id, username } => {
            let id = user_id.map(UserId).unwrap_or_else(|| bot.root());
            let sender = Sender::new(id, username);
            console::run(&bot, &sender, io::stdin().lock(), io::stdout().lock())
        }
    }
}

fn main() {
    // Resolve the local UTC offset while the process is still single-threaded.
    taskbot_core::model::local_offset();
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
