//! Logging Abstractions
//!
//! Structured log entries, a format-string renderer, and the [`LoggerSink`]
//! trait that log destinations implement. The runtime fans every surviving
//! `tracing` event out to all configured sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown log level: {}",
                other
            ))),
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Target module/component
    pub target: String,
    /// Log message
    pub message: String,
    /// Structured fields
    pub fields: HashMap<String, String>,
    /// Name of the span the event was emitted in
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Timestamp,
    Level,
    Target,
    Message,
    Fields,
    Span,
}

/// Format-string renderer for [`LogEntry`] values.
///
/// Supported placeholders: `{timestamp}`, `{level}`, `{target}`, `{message}`,
/// `{fields}` and `{span}`. Anything else, including unknown placeholders, is
/// copied verbatim.
///
/// ```
/// use bridge_traits::logging::{LogEntry, LogFormatter, LogLevel};
///
/// let formatter = LogFormatter::new("[{level}] {message}{fields}");
/// let entry = LogEntry::new(LogLevel::Warn, "net", "slow request").with_field("ms", "950");
/// assert_eq!(formatter.render(&entry), "[WARN] slow request ms=950");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFormatter {
    template: String,
    segments: Vec<Segment>,
}

impl LogFormatter {
    pub const DEFAULT_TEMPLATE: &'static str = "{timestamp} [{level}] {target}: {message}{fields}";

    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let segments = Self::parse(&template);
        Self { template, segments }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn parse(template: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open..];

            let Some(close) = after.find('}') else {
                rest = after;
                break;
            };

            let placeholder = match &after[1..close] {
                "timestamp" => Some(Segment::Timestamp),
                "level" => Some(Segment::Level),
                "target" => Some(Segment::Target),
                "message" => Some(Segment::Message),
                "fields" => Some(Segment::Fields),
                "span" => Some(Segment::Span),
                _ => None,
            };

            match placeholder {
                Some(segment) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                None => literal.push_str(&after[..=close]),
            }

            rest = &after[close + 1..];
        }

        // Whatever is left, including an unclosed `{`, is literal text.
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        segments
    }

    /// Renders an entry into a single line.
    pub fn render(&self, entry: &LogEntry) -> String {
        let mut out = String::with_capacity(self.template.len() + entry.message.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Timestamp => out.push_str(
                    &entry
                        .timestamp
                        .format("%Y-%m-%d %H:%M:%S%.3f")
                        .to_string(),
                ),
                Segment::Level => out.push_str(entry.level.as_str()),
                Segment::Target => out.push_str(&entry.target),
                Segment::Message => out.push_str(&entry.message),
                Segment::Fields => {
                    let mut keys: Vec<&String> = entry.fields.keys().collect();
                    keys.sort();
                    for key in keys {
                        out.push(' ');
                        out.push_str(key);
                        out.push('=');
                        out.push_str(&entry.fields[key]);
                    }
                }
                Segment::Span => out.push_str(entry.span_id.as_deref().unwrap_or("-")),
            }
        }

        out
    }
}

impl Default for LogFormatter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TEMPLATE)
    }
}

/// Logger sink trait
///
/// A log destination: console, file, host logging (OSLog, Logcat), or a
/// remote collector.
///
/// # Security
///
/// Implementations should ensure:
/// - No sensitive data (tokens, passwords) is logged
/// - Log levels respect debug/release build configurations
///
/// # Example
///
/// ```ignore
/// use bridge_traits::logging::{LoggerSink, LogEntry, LogLevel};
///
/// async fn log_error(logger: &dyn LoggerSink, error: &str) {
///     let entry = LogEntry::new(LogLevel::Error, "core", error)
///         .with_field("component", "network");
///     logger.log(entry).await.ok();
/// }
/// ```
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    /// Forward a log entry to the destination
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush any buffered logs
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Get the minimum log level that will be processed
    ///
    /// Logs below this level are filtered out before reaching the sink.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Console logger writing formatted lines to stdout
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
    pub formatter: LogFormatter,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            formatter: LogFormatter::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: LogFormatter) -> Self {
        self.formatter = formatter;
        self
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

#[async_trait::async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            println!("{}", self.formatter.render(&entry));
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_entry() -> LogEntry {
        LogEntry::new(LogLevel::Info, "core_network", "Request finished")
            .with_timestamp(DateTime::from_timestamp(1_700_000_000, 0).unwrap())
    }

    #[test]
    fn test_log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Info, "test", "Test message")
            .with_field("user_id", "123")
            .with_span_id("refresh");

        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.target, "test");
        assert_eq!(entry.message, "Test message");
        assert_eq!(entry.fields.get("user_id"), Some(&"123".to_string()));
        assert_eq!(entry.span_id, Some("refresh".to_string()));
    }

    #[test]
    fn test_level_parsing_and_ordering() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_default_template() {
        let entry = fixed_entry().with_field("status", "200");
        let line = LogFormatter::default().render(&entry);
        assert_eq!(
            line,
            "2023-11-14 22:13:20.000 [INFO] core_network: Request finished status=200"
        );
    }

    #[test]
    fn test_fields_sorted_and_span_placeholder() {
        let entry = fixed_entry()
            .with_field("b", "2")
            .with_field("a", "1");
        let formatter = LogFormatter::new("{span}|{message}{fields}");

        assert_eq!(formatter.render(&entry), "-|Request finished a=1 b=2");
        assert_eq!(
            formatter.render(&entry.with_span_id("execute")),
            "execute|Request finished a=1 b=2"
        );
    }

    #[test]
    fn test_unknown_and_unclosed_placeholders_are_literal() {
        let formatter = LogFormatter::new("{level} {nope} {message} {oops");
        assert_eq!(
            formatter.render(&fixed_entry()),
            "INFO {nope} Request finished {oops"
        );
    }

    #[tokio::test]
    async fn test_console_logger() {
        let logger = ConsoleLogger::new(LogLevel::Debug);
        let entry = LogEntry::new(LogLevel::Info, "test", "Test log");

        logger.log(entry).await.unwrap();
        assert_eq!(logger.min_level(), LogLevel::Debug);
    }
}
