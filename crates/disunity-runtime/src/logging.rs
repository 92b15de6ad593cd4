//! Subscriber setup from the `[logging]` section.
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "pretty"
//! span_events = { close = true }   # per-request latency of the `dispatch` span
//!
//! [logging.filters]
//! disunity_transport = "trace"
//! ```
//!
//! `RUST_LOG`, when set, replaces `level`; `filters` still apply on top.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a subscriber is already installed, for example by an
/// application embedding the runtime.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = try_init(config);
}

/// Like [`init_from_config`], but reports an already installed subscriber.
pub fn try_init(config: &LoggingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt_layer(config))
        .with(env_filter(config))
        .try_init()
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let base = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    config
        .filters
        .iter()
        .filter_map(|(module, level)| format!("{module}={level}").parse::<Directive>().ok())
        .fold(base, EnvFilter::add_directive)
}

fn fmt_layer(config: &LoggingConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(writer(config))
        .with_span_events(span_events(&config.span_events))
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location);

    match config.format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
        // Compact, and json without the json-log feature.
        _ => layer.compact().boxed(),
    }
}

fn span_events(config: &SpanEventConfig) -> FmtSpan {
    [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |events, (_, event)| events | event)
}

/// File output without a usable `file_path` goes to stdout.
fn writer(config: &LoggingConfig) -> BoxMakeWriter {
    match config.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File => match rolling_file(config) {
            Some(appender) => BoxMakeWriter::new(appender),
            None => BoxMakeWriter::new(std::io::stdout),
        },
    }
}

/// Opens a daily rolling appender named after `file_path`.
fn rolling_file(config: &LoggingConfig) -> Option<RollingFileAppender> {
    let path = config.file_path.as_deref()?;
    let prefix = path.file_name()?.to_string_lossy().into_owned();
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(config.max_files.max(1) as usize)
        .build(directory)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_span_events() {
        let config = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(span_events(&config), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(span_events(&SpanEventConfig::default()), FmtSpan::NONE);
    }

    #[test]
    fn test_module_filters_are_added() {
        let mut config = LoggingConfig::default();
        config
            .filters
            .insert("disunity_transport".into(), LogLevel::Trace);

        let filter = env_filter(&config).to_string();
        assert!(filter.contains("disunity_transport=trace"), "{filter}");
    }

    #[test]
    fn test_rolling_file_requires_path() {
        assert!(rolling_file(&LoggingConfig::default()).is_none());

        let dir = std::env::temp_dir().join(format!("disunity-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = LoggingConfig {
            output: LogOutput::File,
            file_path: Some(dir.join("disunity.log")),
            ..Default::default()
        };
        assert!(rolling_file(&config).is_some());
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_from_config(&LoggingConfig::default());
        init_from_config(&LoggingConfig::default());
        assert!(try_init(&LoggingConfig::default()).is_err());
    }
}
