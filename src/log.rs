//! The `log` module provides initialisation and configuration of the application's logger.
//!
//! Info and debug messages are written to stdout and warnings and errors to stderr. Optionally, all
//! messages are also written to a log file. The log level is taken from the `FLH_OPT_LOG_LEVEL`
//! environment variable if set, otherwise from the program settings.
use anyhow::{Context, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the `FLH_OPT_LOG_LEVEL`
/// environment variable or the settings file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The name of the environment variable which overrides the log level
pub const LOG_LEVEL_ENV_VAR: &str = "FLH_OPT_LOG_LEVEL";

/// The file name for the log file
const LOG_FILE_NAME: &str = "flh-opt.log";

/// Set once the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger using the `fern` logging library.
///
/// Calling this function more than once has no effect.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in the settings file
/// * `log_file_dir`: Directory in which to save a log file, if any
pub fn init(log_level_from_settings: &str, log_file_dir: Option<&Path>) -> Result<()> {
    if is_logger_initialised() {
        return Ok(());
    }

    // Retrieve the log level from the environment variable or settings
    let log_level = env::var(LOG_LEVEL_ENV_VAR)
        .unwrap_or_else(|_| log_level_from_settings.to_string());
    let log_level = parse_log_level(&log_level)?;

    let use_colour = std::io::stdout().is_terminal();
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    // Info, debug and trace messages go to stdout
    let stdout_dispatch = Dispatch::new()
        .filter(|metadata| metadata.level() > Level::Warn)
        .format(move |out, message, record| {
            write_log_coloured(out, message, record, use_colour, colours);
        })
        .chain(std::io::stdout());

    // Warnings and errors go to stderr
    let use_colour_stderr = std::io::stderr().is_terminal();
    let stderr_dispatch = Dispatch::new()
        .level(LevelFilter::Warn)
        .format(move |out, message, record| {
            write_log_coloured(out, message, record, use_colour_stderr, colours);
        })
        .chain(std::io::stderr());

    let mut dispatch = Dispatch::new()
        .level(log_level)
        .chain(stdout_dispatch)
        .chain(stderr_dispatch);

    if let Some(dir) = log_file_dir {
        let file_path = dir.join(LOG_FILE_NAME);
        let log_file = fern::log_file(&file_path)
            .with_context(|| format!("Could not open log file {}", file_path.display()))?;
        dispatch = dispatch.chain(Dispatch::new().format(write_log_plain).chain(log_file));
    }

    dispatch.apply()?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// Parse a log level such as `info` or `DEBUG` (case insensitive)
fn parse_log_level(level: &str) -> Result<LevelFilter> {
    level
        .trim()
        .parse()
        .ok()
        .with_context(|| format!("Unknown log level: {level}"))
}

/// Write a log message, with the level in colour if `use_colour` is set
fn write_log_coloured(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: ColoredLevelConfig,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    if use_colour {
        out.finish(format_args!(
            "[{timestamp} {} {}] {message}",
            colours.color(record.level()),
            record.target()
        ));
    } else {
        out.finish(format_args!(
            "[{timestamp} {} {}] {message}",
            record.level(),
            record.target()
        ));
    }
}

/// Write a log message without colour, with the full date
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    out.finish(format_args!(
        "[{} {} {}] {message}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        record.level(),
        record.target()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("info", LevelFilter::Info)]
    #[case("DEBUG", LevelFilter::Debug)]
    #[case(" warn ", LevelFilter::Warn)]
    #[case("off", LevelFilter::Off)]
    fn parse_log_level_ok(#[case] level: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_log_level(level).unwrap(), expected);
    }

    #[test]
    fn parse_log_level_bad() {
        assert_eq!(
            parse_log_level("loud").unwrap_err().to_string(),
            "Unknown log level: loud"
        );
    }
}
