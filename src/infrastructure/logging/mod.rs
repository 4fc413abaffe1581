//! Tracing setup: stdout plus optional rotating file output, mirroring the
//! teacher's `infrastructure::logging::LoggerImpl`.

use anyhow::Result;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::LoggingConfig;

/// Holds the non-blocking file writer's guard; dropping it flushes pending
/// log lines, so the caller must keep this alive for the process lifetime.
pub struct LoggerGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn init(config: &LoggingConfig) -> Result<LoggerGuard> {
    let level = parse_level(&config.level)?;
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let file_guard = match &config.log_dir {
        Some(dir) => {
            let appender = rolling::daily(dir, "graphium.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            match config.format.as_str() {
                "json" => {
                    let stdout_layer = tracing_subscriber::fmt::layer().json().with_target(true);
                    tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();
                }
                _ => {
                    let stdout_layer = tracing_subscriber::fmt::layer().pretty().with_target(true);
                    tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();
                }
            }
            Some(guard)
        }
        None => {
            match config.format.as_str() {
                "json" => {
                    let stdout_layer = tracing_subscriber::fmt::layer().json().with_target(true);
                    tracing_subscriber::registry().with(env_filter).with(stdout_layer).init();
                }
                _ => {
                    let stdout_layer = tracing_subscriber::fmt::layer().pretty().with_target(true);
                    tracing_subscriber::registry().with(env_filter).with(stdout_layer).init();
                }
            }
            None
        }
    };

    tracing::info!(level = %config.level, format = %config.format, file_output = config.log_dir.is_some(), "logger initialized");
    Ok(LoggerGuard { _file_guard: file_guard })
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!("invalid log level: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert!(matches!(parse_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_level("TRACE"), Ok(Level::TRACE)));
        assert!(parse_level("verbose").is_err());
    }
}
