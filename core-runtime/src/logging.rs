//! # Logging
//!
//! Installs the process-wide `tracing` subscriber for the client core.
//!
//! Output goes to stdout in one of three [`LogFormat`]s. Unless a custom
//! filter is given, the core crates log at the configured level and the HTTP
//! stack (`hyper`, `h2`, `reqwest`) only at `warn`. When the host supplies a
//! [`LoggerSink`], every event that passes the filter is also handed to it as
//! a [`LogEntry`], with credential fields redacted on the way out.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//!
//! let config = LoggingConfig::from_env()?
//!     .with_level(LogLevel::Debug)
//!     .with_format(LogFormat::Compact);
//! init_logging(config).expect("Failed to initialize logging");
//! tracing::info!(target: "core_api", "ready");
//! ```

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Environment variable holding a filter directive string.
pub const LOG_FILTER_ENV: &str = "OPSDESK_LOG";
/// Environment variable selecting `pretty`, `json` or `compact` output.
pub const LOG_FORMAT_ENV: &str = "OPSDESK_LOG_FORMAT";

const REDACTED: &str = "[REDACTED]";

const CORE_TARGETS: &[&str] = &[
    "opsdesk_workspace",
    "bridge_desktop",
    "core_runtime",
    "core_auth",
    "core_api",
    "core_tasks",
    "core_service",
];

const QUIET_TARGETS: &[&str] = &["h2", "hyper", "reqwest"];

/// Name fragments that mark a field as carrying a credential.
const CREDENTIAL_MARKERS: &[&str] = &[
    "token",
    "password",
    "secret",
    "authorization",
    "bearer",
    "api_key",
    "apikey",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored output for development
    Pretty,
    /// One JSON object per line
    Json,
    /// Single-line text
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(Error::Config(format!("Unknown log format: {}", other))),
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the core crates when no custom filter is set
    pub level: LogLevel,
    /// Full `EnvFilter` directive string, replacing the default directives
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Redact credential fields and mask emails before they reach the sink
    pub redact_pii: bool,
    /// Emit span open/close lines (pretty) or span context (json)
    pub span_events: bool,
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            redact_pii: true,
            span_events: true,
            show_target: true,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `OPSDESK_LOG` and `OPSDESK_LOG_FORMAT`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(filter) = std::env::var(LOG_FILTER_ENV) {
            if !filter.trim().is_empty() {
                config.filter = Some(filter);
            }
        }
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Mirror events to a host logger.
    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_pii_redaction(mut self, redact: bool) -> Self {
        self.redact_pii = redact;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails on an unparsable filter, or when a global subscriber is already set
/// (including by an earlier call).
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let mirror = config
        .logger_sink
        .clone()
        .map(|sink| SinkForwarder::new(sink, config.redact_pii));

    tracing_subscriber::registry()
        .with(output_layer(&config))
        .with(filter)
        .with(mirror)
        .try_init()
        .map_err(|e| Error::Config(format!("Logging already initialized: {}", e)))
}

fn output_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.show_target)
        .with_writer(std::io::stdout);

    match config.format {
        LogFormat::Pretty => {
            let spans = if config.span_events {
                FmtSpan::NEW | FmtSpan::CLOSE
            } else {
                FmtSpan::NONE
            };
            base.pretty().with_span_events(spans).boxed()
        }
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.span_events)
            .with_span_list(config.span_events)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => default_directives(config.level),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn default_directives(level: LogLevel) -> String {
    let level = match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };

    CORE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Layer handing each event to the host [`LoggerSink`].
struct SinkForwarder {
    sink: Arc<dyn LoggerSink>,
    redact: bool,
}

impl SinkForwarder {
    fn new(sink: Arc<dyn LoggerSink>, redact: bool) -> Self {
        Self { sink, redact }
    }

    fn entry_for(&self, event: &Event<'_>, level: LogLevel) -> LogEntry {
        let metadata = event.metadata();
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());

        fields
            .values
            .into_iter()
            .fold(LogEntry::new(level, metadata.target(), message), |entry, (name, value)| {
                let value = if self.redact {
                    redact_if_sensitive(&name, &value)
                } else {
                    value
                };
                entry.with_field(name, value)
            })
    }

    fn deliver(&self, entry: LogEntry) {
        let sink = Arc::clone(&self.sink);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(err) = sink.log(entry).await {
                        eprintln!("logger sink failed: {err}");
                    }
                });
            }
            Err(_) => {
                if let Err(err) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("logger sink failed: {err}");
                }
            }
        }
    }
}

impl<S> Layer<S> for SinkForwarder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let level = sink_level(event.metadata().level());
        if level < self.sink.min_level() {
            return;
        }

        let mut entry = self.entry_for(event, level);
        entry.span_id = ctx.lookup_current().map(|span| span.name().to_string());
        self.deliver(entry);
    }
}

fn sink_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        Level::TRACE => LogLevel::Trace,
    }
}

/// Collects event fields as strings. Numbers, bools and errors arrive through
/// `record_debug`.
#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

/// Redact a value about to be logged.
///
/// Credential-like field names (`accessToken`, `refresh_token`, `password`,
/// `Authorization`) yield `[REDACTED]`; values that look like email addresses
/// keep only their first character.
///
/// ```ignore
/// info!(email = %redact_if_sensitive("email", &email), "Signing in");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let name = field_name.to_ascii_lowercase();
    if CREDENTIAL_MARKERS.iter().any(|marker| name.contains(marker)) {
        return REDACTED.to_string();
    }

    match value.split_once('@') {
        Some((local, domain)) if domain.contains('.') => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{REDACTED}")
        }
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    fn with_forwarder(redact: bool, emit: impl FnOnce()) -> Vec<LogEntry> {
        let sink = Arc::new(RecordingSink::default());
        let subscriber =
            tracing_subscriber::registry().with(SinkForwarder::new(sink.clone(), redact));
        tracing::subscriber::with_default(subscriber, emit);
        let entries = sink.entries.lock().unwrap().clone();
        entries
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Compact ".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_directives_quiet_http_stack() {
        let directives = default_directives(LogLevel::Debug);

        assert!(directives.contains("core_auth=debug"));
        assert!(directives.contains("core_tasks=debug"));
        assert!(directives.contains("reqwest=warn"));
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_custom_filter_replaces_defaults() {
        let config = LoggingConfig::default().with_filter("core_api=trace");
        let filter = build_filter(&config).unwrap().to_string();

        assert!(filter.contains("core_api=trace"));
        assert!(!filter.contains("core_auth"));
    }

    #[test]
    fn test_forwarder_collects_message_and_fields() {
        let entries = with_forwarder(false, || {
            tracing::info!(target: "core_api", status = 404u64, endpoint = "/orders/9", "Request failed");
        });

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "core_api");
        assert_eq!(entries[0].message, "Request failed");
        assert_eq!(entries[0].fields.get("status"), Some(&"404".to_string()));
        assert_eq!(entries[0].fields.get("endpoint"), Some(&"/orders/9".to_string()));
    }

    #[test]
    fn test_forwarder_respects_sink_level() {
        let entries = with_forwarder(false, || {
            tracing::trace!("too chatty");
            tracing::debug!("kept");
        });

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Debug);
    }

    #[test]
    fn test_forwarder_redacts_credentials() {
        let entries = with_forwarder(true, || {
            tracing::info!(refresh_token = "r-123", email = "ana@loja.com", "Renewal started");
        });

        let fields = &entries[0].fields;
        assert_eq!(fields.get("refresh_token"), Some(&REDACTED.to_string()));
        assert_eq!(fields.get("email"), Some(&"a***@[REDACTED]".to_string()));
    }

    #[test]
    fn test_span_name_is_attached() {
        let entries = with_forwarder(false, || {
            let span = tracing::info_span!("refresh");
            let _entered = span.enter();
            tracing::info!("inside");
        });

        assert_eq!(entries[0].span_id.as_deref(), Some("refresh"));
    }
}
