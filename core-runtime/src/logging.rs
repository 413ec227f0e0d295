//! # Logging & Tracing Infrastructure
//!
//! Provides structured logging with the `tracing` crate, supporting:
//! - JSON, pretty-print and compact output formats
//! - Module-level filtering
//! - Redaction of credential-bearing fields
//! - Fan-out to any number of pluggable `LoggerSink` destinations
//!
//! ## Overview
//!
//! This module configures the `tracing-subscriber` infrastructure and mirrors
//! every event that survives filtering into the configured sinks (console,
//! file, host loggers). Each sink applies its own `min_level`, so a file sink
//! can keep debug output while the console only shows warnings.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_sink(Arc::new(ConsoleLogger::new(LogLevel::Warn)));
//!
//! init_logging(config)?;
//! tracing::info!(target: "core_network", status = 200, "Request finished");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{LogEntry, LogLevel, LoggerSink};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    /// Output format of the stdout layer
    pub format: LogFormat,
    /// Minimum log level for workspace crates
    pub level: LogLevel,
    /// Redact credential-bearing fields before they reach sinks
    pub redact_pii: bool,
    /// Custom filter string (e.g., "core_auth=debug,core_network=trace")
    pub filter: Option<String>,
    /// Destinations every surviving event is mirrored to
    pub sinks: Vec<Arc<dyn LoggerSink>>,
    /// Emit span enter/exit events
    pub enable_spans: bool,
    /// Display target module in logs
    pub display_target: bool,
    /// Display thread info
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_pii: true,
            filter: None,
            sinks: Vec::new(),
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("redact_pii", &self.redact_pii)
            .field("filter", &self.filter)
            .field("sinks", &self.sinks.len())
            .field("enable_spans", &self.enable_spans)
            .field("display_target", &self.display_target)
            .field("display_thread_info", &self.display_thread_info)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_pii_redaction(mut self, redact: bool) -> Self {
        self.redact_pii = redact;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Adds a log destination. Sinks are invoked in the order they were added.
    pub fn with_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Initialize the global logging system.
///
/// This should be called once during application startup. Sinks receive
/// entries on background threads; see [`flush_logging`].
///
/// # Errors
///
/// - `Error::Config` if the filter string is invalid
/// - `Error::Logging` if a global subscriber is already installed
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink_layer = LoggerSinkLayer::new(config.sinks.clone(), config.redact_pii)
        .map_err(|e| Error::Logging(format!("Failed to start log sinks: {}", e)))?;
    let dispatcher = sink_layer.dispatcher();
    let registry = tracing_subscriber::registry().with(filter).with(sink_layer);

    let result = match config.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_thread_names(config.display_thread_info)
                .with_span_events(span_events(config.enable_spans))
                .with_writer(io::stdout);
            registry.with(fmt_layer).try_init()
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(config.enable_spans)
                .with_span_list(config.enable_spans)
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_thread_names(config.display_thread_info)
                .with_writer(io::stdout);
            registry.with(fmt_layer).try_init()
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_thread_names(config.display_thread_info)
                .with_writer(io::stdout);
            registry.with(fmt_layer).try_init()
        }
    };

    result.map_err(|e| Error::Logging(format!("Failed to initialize logging: {}", e)))?;
    let _ = SINK_DISPATCHER.set(dispatcher);
    Ok(())
}

fn span_events(enable: bool) -> FmtSpan {
    if enable {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    }
}

/// Builds the `EnvFilter` for the configuration.
///
/// Without a custom filter, workspace crates log at the configured level and
/// HTTP dependencies at `warn`.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom_filter) => custom_filter.clone(),
        None => {
            let level = config.level.as_str().to_lowercase();
            let crates = [
                "foundation_workspace",
                "bridge_desktop",
                "core_runtime",
                "core_auth",
                "core_network",
                "core_service",
            ];
            let mut directives: Vec<String> = crates
                .iter()
                .map(|name| format!("{}={}", name, level))
                .collect();
            directives.extend(
                ["h2=warn", "hyper=warn", "reqwest=warn"]
                    .iter()
                    .map(|d| d.to_string()),
            );
            directives.join(",")
        }
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

static SINK_DISPATCHER: OnceLock<SinkDispatcher> = OnceLock::new();

/// Waits until every sink installed by [`init_logging`] has written and
/// flushed the entries queued so far.
///
/// Call before the process exits; queued entries are otherwise lost.
pub fn flush_logging() {
    if let Some(dispatcher) = SINK_DISPATCHER.get() {
        dispatcher.flush();
    }
}

enum SinkCommand {
    Log(LogEntry),
    Flush(std_mpsc::SyncSender<()>),
}

struct SinkWorker {
    min_level: LogLevel,
    sender: mpsc::UnboundedSender<SinkCommand>,
}

impl SinkWorker {
    /// Runs `sink` on its own thread. Entries are delivered in the order
    /// they were queued.
    fn spawn(index: usize, sink: Arc<dyn LoggerSink>) -> io::Result<Self> {
        let min_level = sink.min_level();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name(format!("log-sink-{}", index))
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(command) = receiver.recv().await {
                        match command {
                            SinkCommand::Log(entry) => {
                                if let Err(err) = sink.log(entry).await {
                                    eprintln!("LoggerSink error: {}", err);
                                }
                            }
                            SinkCommand::Flush(ack) => {
                                if let Err(err) = sink.flush().await {
                                    eprintln!("LoggerSink flush error: {}", err);
                                }
                                let _ = ack.send(());
                            }
                        }
                    }

                    if let Err(err) = sink.flush().await {
                        eprintln!("LoggerSink flush error: {}", err);
                    }
                });
            })?;

        Ok(Self { min_level, sender })
    }
}

/// Ordered delivery queues, one per sink.
#[derive(Clone)]
struct SinkDispatcher {
    workers: Arc<Vec<SinkWorker>>,
}

impl SinkDispatcher {
    fn new(sinks: Vec<Arc<dyn LoggerSink>>) -> io::Result<Self> {
        let workers = sinks
            .into_iter()
            .enumerate()
            .map(|(index, sink)| SinkWorker::spawn(index, sink))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Self {
            workers: Arc::new(workers),
        })
    }

    fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    fn accepts(&self, level: LogLevel) -> bool {
        self.workers.iter().any(|worker| level >= worker.min_level)
    }

    fn dispatch(&self, entry: LogEntry) {
        for worker in self.workers.iter().filter(|w| entry.level >= w.min_level) {
            let _ = worker.sender.send(SinkCommand::Log(entry.clone()));
        }
    }

    fn flush(&self) {
        let acks: Vec<_> = self
            .workers
            .iter()
            .filter_map(|worker| {
                let (ack, done) = std_mpsc::sync_channel(1);
                worker.sender.send(SinkCommand::Flush(ack)).ok().map(|_| done)
            })
            .collect();

        for done in acks {
            let _ = done.recv_timeout(FLUSH_TIMEOUT);
        }
    }
}

/// Layer that forwards events to every configured `LoggerSink`.
struct LoggerSinkLayer {
    dispatcher: SinkDispatcher,
    redact_pii: bool,
}

impl LoggerSinkLayer {
    fn new(sinks: Vec<Arc<dyn LoggerSink>>, redact_pii: bool) -> io::Result<Self> {
        Ok(Self {
            dispatcher: SinkDispatcher::new(sinks)?,
            redact_pii,
        })
    }

    fn dispatcher(&self) -> SinkDispatcher {
        self.dispatcher.clone()
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if self.dispatcher.is_empty() {
            return;
        }

        let metadata = event.metadata();
        let level = tracing_level_to_log_level(*metadata.level());

        if !self.dispatcher.accepts(level) {
            return;
        }

        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());

        let mut entry = LogEntry::new(level, metadata.target(), message);
        for (key, value) in visitor.fields {
            let value = if self.redact_pii {
                redact_if_sensitive(&key, &value)
            } else {
                value
            };
            entry = entry.with_field(key, value);
        }

        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span_id(span.name());
        }

        self.dispatcher.dispatch(entry);
    }
}

#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl SinkVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for SinkVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}

fn tracing_level_to_log_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Redacts values of credential-bearing fields and masks e-mail addresses.
///
/// ```ignore
/// use core_runtime::logging::redact_if_sensitive;
///
/// tracing::debug!(token = %redact_if_sensitive("token", &token), "Attached bearer");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &[
        "token",
        "password",
        "secret",
        "api_key",
        "authorization",
        "bearer",
        "cookie",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|&f| field_lower.contains(f)) {
        return "[REDACTED]".to_string();
    }

    match value.find('@') {
        Some(at_pos) if value[at_pos..].contains('.') => {
            let first: String = value[..at_pos].chars().take(1).collect();
            format!("{}***@[REDACTED]", first)
        }
        _ => value.to_string(),
    }
}
