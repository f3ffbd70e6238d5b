use std::io::Write;

use chrono::Utc;
use colored::Colorize;
use env_logger::Env;
use error_iter::ErrorIter as _;
use log::{error, Level};

pub fn init() {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        let level = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green(),
            Level::Debug => "DEBUG".blue(),
            Level::Trace => "TRACE".dimmed(),
        };
        writeln!(
            buf,
            "{} {} {} {}",
            Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string().dimmed(),
            level,
            record.target().cyan(),
            record.args()
        )
    });

    // A second init (tests, embedded use) keeps the first logger.
    let _ = builder.try_init();
}

pub fn log_error<E: std::error::Error + 'static>(context: &str, err: &E) {
    error!("{context}: {err}");
    for source in err.sources().skip(1) {
        error!("  Caused by: {source}");
    }
}
