//! Global logging into a file sink

use bridge_desktop::FileLoggerSink;
use bridge_traits::{LogFormatter, LogLevel};
use core_runtime::logging::{flush_logging, init_logging, LogFormat, LoggingConfig};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_sink_keeps_event_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("core.log");
    let sink = FileLoggerSink::open(&path, LogLevel::Debug)
        .await
        .unwrap()
        .with_formatter(LogFormatter::new("{message}"));

    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug)
            .with_sink(Arc::new(sink)),
    )
    .unwrap();

    for i in 0..100 {
        tracing::debug!(target: "core_auth", "line {}", i);
    }
    flush_logging();

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    let expected: Vec<String> = (0..100).map(|i| format!("line {}", i)).collect();
    assert_eq!(contents.lines().collect::<Vec<_>>(), expected);
}
