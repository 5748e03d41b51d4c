use anyhow::{Context, Result};
use std::path::Path;
use surge_config::{LogFormat, LogLevel, LogTarget, LoggingConfig, Rotation};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps non-blocking file writers flushing. Drop it only at process exit.
#[derive(Default)]
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

/// Filter for `level`, keeping the HTTP stack quiet below debug
pub fn build_filter(level: LogLevel) -> EnvFilter {
    let directives = match level {
        LogLevel::Debug | LogLevel::Trace => level.as_str().to_string(),
        _ => format!("{},hyper=warn,h2=warn,rustls=warn,reqwest=warn", level.as_str()),
    };
    EnvFilter::try_new(directives)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging from configuration.
///
/// `level_override` comes from `--log-level` and wins over the file.
/// Returns a guard that must be held for as long as file targets should be written.
pub fn init_logging(config: &LoggingConfig, level_override: Option<LogLevel>) -> Result<LoggingGuard> {
    let level = level_override.unwrap_or(config.level);
    let mut guard = LoggingGuard::default();
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.targets.is_empty() {
        layers.push(console_layer(config, level));
    }

    for target in &config.targets {
        match target {
            LogTarget::Console { level: target_level } => {
                let target_level = level_override.or(*target_level).unwrap_or(level);
                layers.push(console_layer(config, target_level));
            }
            LogTarget::File {
                directory,
                file_name,
                level: target_level,
                rotation,
            } => {
                let target_level = level_override.or(*target_level).unwrap_or(level);
                let (layer, worker) = file_layer(config, directory, file_name, *rotation, target_level)?;
                layers.push(layer);
                guard._guards.push(worker);
            }
        }
    }

    // Use try_init to avoid panic if global subscriber already set
    if tracing_subscriber::registry().with(layers).try_init().is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(guard)
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

fn console_layer(config: &LoggingConfig, level: LogLevel) -> BoxedLayer {
    let filter = build_filter(level);
    let location = config.include_location;

    match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_file(location)
            .with_line_number(location)
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(true)
            .with_file(location)
            .with_line_number(location)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_thread_ids(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(
    config: &LoggingConfig,
    directory: &str,
    file_name: &str,
    rotation: Rotation,
    level: LogLevel,
) -> Result<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory))?;

    let rotation = match rotation {
        Rotation::Never => rolling::Rotation::NEVER,
        Rotation::Hourly => rolling::Rotation::HOURLY,
        Rotation::Daily => rolling::Rotation::DAILY,
    };
    let appender = RollingFileAppender::new(rotation, Path::new(directory), file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);
    let filter = build_filter(level);

    // Files are for machines unless text was asked for explicitly
    let layer = match config.format {
        LogFormat::Text | LogFormat::Compact | LogFormat::Pretty => fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    };

    Ok((layer, worker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_quiets_http_stack_at_info() {
        let filter = build_filter(LogLevel::Info).to_string();
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("info"));

        let filter = build_filter(LogLevel::Trace).to_string();
        assert!(!filter.contains("hyper"));
    }

    #[test]
    fn test_file_target_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LoggingConfig {
            targets: vec![LogTarget::File {
                directory: log_dir.to_string_lossy().to_string(),
                file_name: "run.log".to_string(),
                level: Some(LogLevel::Debug),
                rotation: Rotation::Never,
            }],
            ..LoggingConfig::default()
        };

        let guard = init_logging(&config, None).unwrap();
        assert!(log_dir.is_dir());
        drop(guard);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_simple_tracing("debug").unwrap();
        init_simple_tracing("info").unwrap();
        assert!(init_logging(&LoggingConfig::default(), Some(LogLevel::Warn)).is_ok());
    }
}
