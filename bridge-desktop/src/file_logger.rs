//! File log destination

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    logging::{LogEntry, LogFormatter, LogLevel, LoggerSink},
};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends formatted log lines to a file.
///
/// Writes go through a single buffered handle guarded by a mutex so lines
/// from concurrent events never interleave.
pub struct FileLoggerSink {
    path: PathBuf,
    min_level: LogLevel,
    formatter: LogFormatter,
    file: Mutex<tokio::io::BufWriter<File>>,
}

impl FileLoggerSink {
    /// Opens (or creates) `path` for appending, creating parent directories.
    pub async fn open(path: impl AsRef<Path>, min_level: LogLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!(
                    "Failed to open log file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            path,
            min_level,
            formatter: LogFormatter::default(),
            file: Mutex::new(tokio::io::BufWriter::new(file)),
        })
    }

    pub fn with_formatter(mut self, formatter: LogFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LoggerSink for FileLoggerSink {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }

        let mut line = self.formatter.render(&entry);
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        if entry.level >= LogLevel::Error {
            file.flush().await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.file.lock().await.flush().await?;
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
