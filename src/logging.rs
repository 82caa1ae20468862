use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use color_eyre::Result;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

lazy_static::lazy_static! {
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// File logging at WARN in the working directory
pub fn init() -> Result<()> {
    init_with(None, None)
}

/// File logging to `custom_log_path` (or `LOG_FILE` in the working
/// directory). An explicit `level` wins over `RUST_LOG`.
pub fn init_with(custom_log_path: Option<PathBuf>, level: Option<tracing::Level>) -> Result<()> {
    let log_path = match custom_log_path {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            path
        }
        None => std::env::current_dir()?.join(LOG_FILE.as_str()),
    };
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let builder = EnvFilter::builder()
        .with_default_directive(level.unwrap_or(tracing::Level::WARN).into());
    let env_filter = if level.is_some() {
        builder.parse_lossy("")
    } else {
        builder.from_env_lossy()
    };

    let file_subscriber = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(Mutex::new(file))
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}
