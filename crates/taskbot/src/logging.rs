use std::fs::OpenOptions;
use std::path::Path;
use taskbot_core::error::AppError;

/// Installs the global logger. `info` unless `RUST_LOG` says otherwise; with
/// a log file, records are appended there instead of stderr.
pub fn init(log_file: Option<&Path>) -> Result<(), AppError> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|err| AppError::invalid_data(err.to_string()))
}
