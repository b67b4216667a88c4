//! Stream consumer
//!
//! A [`FileSink`] drains a record channel in delivery order, renders each
//! record, appends it to the active file and rotates once the file grows past
//! the configured size. One task owns one sink; nothing here is shared.

use std::path::Path;

use tokio::task::JoinHandle;

use crate::config::{Route, SinkConfig};
use crate::error::Result;
use crate::file_manager::FileManager;
use crate::record::{LogRecord, RecordReceiver};
use crate::render::Renderer;
use crate::retention;
use crate::rotation::should_rotate;

/// Lifecycle of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    /// Accepting records
    Running,
    /// Inbound channel closed; no more records are written
    Stopped,
}

/// Counters describing what a sink has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Successful rotations, including the one at startup
    pub rotations: u64,
    /// Records fully written to disk
    pub records_written: u64,
    /// Records whose write failed
    pub write_errors: u64,
    /// Files removed by retention
    pub files_pruned: u64,
}

/// A file sink: renders records and writes them to a rotating file
#[derive(Debug)]
pub struct FileSink {
    config: SinkConfig,
    renderer: Renderer,
    files: FileManager,
    status: SinkStatus,
    stats: SinkStats,
}

impl FileSink {
    /// Create a sink and establish a clean active file
    ///
    /// An existing file at the active path is moved aside first. Failing to
    /// do so is fatal and the sink is not created.
    ///
    /// Each active path needs its own sink. A second sink on the same path
    /// moves the first one's live file aside.
    pub fn new(config: SinkConfig) -> Result<Self> {
        let files = FileManager::new(
            config.directory.clone(),
            config.filename.clone(),
            config.check_file_exists,
        );
        let mut sink = Self {
            renderer: Renderer::new(config.shape),
            config,
            files,
            status: SinkStatus::Stopped,
            stats: SinkStats::default(),
        };

        sink.files.rotate()?;
        sink.stats.rotations += 1;
        sink.apply_retention();
        sink.status = SinkStatus::Running;

        tracing::info!(
            path = %sink.files.path().display(),
            max_file_size = sink.config.max_file_size,
            max_file_count = ?sink.config.max_file_count,
            "File sink started"
        );
        Ok(sink)
    }

    /// Create a sink from a route descriptor
    pub fn from_route(route: &Route) -> Result<Self> {
        Self::new(SinkConfig::from_route(route))
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn status(&self) -> SinkStatus {
        self.status
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    /// Path of the active file
    pub fn path(&self) -> &Path {
        self.files.path()
    }

    /// Bytes written to the active file since the last rotation
    pub fn current_size(&self) -> u64 {
        self.files.size()
    }

    /// Drain the channel until the producer closes it
    ///
    /// Records are handled one at a time in delivery order. Per-record
    /// failures are logged and never end the loop.
    pub async fn stream(&mut self, mut records: RecordReceiver) {
        if self.status == SinkStatus::Stopped {
            tracing::warn!(path = %self.files.path().display(), "Sink already stopped");
            return;
        }

        while let Some(record) = records.recv().await {
            self.process(&record);
        }

        self.status = SinkStatus::Stopped;
        tracing::info!(
            path = %self.files.path().display(),
            records = self.stats.records_written,
            rotations = self.stats.rotations,
            "File sink stopped"
        );
    }

    /// Run [`FileSink::stream`] on its own task, handing the sink back when
    /// the channel closes
    pub fn spawn(mut self, records: RecordReceiver) -> JoinHandle<Self> {
        tokio::spawn(async move {
            self.stream(records).await;
            self
        })
    }

    /// Render and write one record, rotating afterwards if needed
    pub fn process(&mut self, record: &LogRecord) {
        if self.status == SinkStatus::Stopped {
            tracing::debug!("Dropping record for stopped sink");
            return;
        }

        let buf = self.renderer.render(record);

        // A failed rotation leaves no handle; retry it before writing
        if !self.files.is_open() {
            self.rotate();
        }

        if self.config.check_file_exists {
            if let Err(e) = self.files.ensure_open() {
                tracing::error!(error = %e, "Failed to reopen log file");
            }
        }

        match self.files.write(&buf) {
            Ok(_) => self.stats.records_written += 1,
            Err(e) => {
                self.stats.write_errors += 1;
                tracing::error!(error = %e, "Failed to write log record");
                return;
            }
        }

        if should_rotate(self.files.size(), self.config.max_file_size) {
            self.rotate();
        }
    }

    /// Rotate after startup; failures are logged and the sink keeps going
    fn rotate(&mut self) {
        match self.files.rotate() {
            Ok(_) => {
                self.stats.rotations += 1;
                self.apply_retention();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to rotate log file");
            }
        }
    }

    fn apply_retention(&mut self) {
        let Some(keep_count) = self.config.max_file_count else {
            return;
        };

        match retention::prune(self.files.directory(), self.files.filename(), keep_count) {
            Ok(count) => {
                if count > 0 {
                    tracing::debug!(count, "Pruned old log files");
                }
                self.stats.files_pruned += count as u64;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to prune old log files");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{create_channel, Container};
    use crate::render::RenderShape;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir, max_file_size: u64) -> SinkConfig {
        SinkConfig {
            filename: "a.log".to_string(),
            max_file_size,
            ..SinkConfig::default()
        }
        .with_directory(dir.path())
    }

    fn record(data: &str) -> LogRecord {
        LogRecord::new(
            Container {
                name: "web".to_string(),
                ..Container::default()
            },
            "stdout",
            data,
        )
    }

    /// A payload whose rendered line is exactly `len` bytes
    fn record_of_len(renderer: &Renderer, len: usize) -> LogRecord {
        let base = renderer.render(&record("")).len();
        record(&"x".repeat(len - base))
    }

    fn rotated_count(dir: &TempDir) -> usize {
        fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with("a.log.")
            })
            .count()
    }

    #[test]
    fn test_new_performs_initial_rotation() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.log"), "previous run\n").unwrap();

        let sink = FileSink::new(test_config(&temp_dir, 1024)).unwrap();

        assert_eq!(sink.status(), SinkStatus::Running);
        assert_eq!(sink.stats().rotations, 1);
        assert_eq!(sink.current_size(), 0);
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "");
        assert_eq!(rotated_count(&temp_dir), 1);
    }

    #[test]
    fn test_new_fails_when_directory_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir, 1024).with_directory(temp_dir.path().join("missing"));

        assert!(FileSink::new(config).is_err());
    }

    #[test]
    fn test_small_records_do_not_rotate() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = FileSink::new(test_config(&temp_dir, 1024 * 1024)).unwrap();
        let renderer = Renderer::default();

        let records: Vec<LogRecord> = (0..10).map(|i| record(&format!("line {}", i))).collect();
        let expected: usize = records.iter().map(|r| renderer.render(r).len()).sum();

        for r in &records {
            sink.process(r);
        }

        assert_eq!(sink.current_size(), expected as u64);
        assert_eq!(fs::metadata(sink.path()).unwrap().len(), expected as u64);
        assert_eq!(sink.stats().rotations, 1);
        assert_eq!(sink.stats().records_written, 10);
    }

    #[test]
    fn test_rotation_fires_after_threshold_exceeded() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = Renderer::default();
        let line = record_of_len(&renderer, 80);
        let mut sink = FileSink::new(test_config(&temp_dir, 200)).unwrap();

        sink.process(&line);
        assert_eq!(sink.current_size(), 80);
        sink.process(&line);
        assert_eq!(sink.current_size(), 160);
        assert_eq!(sink.stats().rotations, 1);

        sink.process(&line);
        assert_eq!(sink.stats().rotations, 2);
        assert_eq!(sink.current_size(), 0);
        assert_eq!(fs::metadata(sink.path()).unwrap().len(), 0);
        assert_eq!(rotated_count(&temp_dir), 1);
    }

    #[test]
    fn test_exact_threshold_does_not_rotate() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = Renderer::default();
        let line = record_of_len(&renderer, 100);
        let mut sink = FileSink::new(test_config(&temp_dir, 200)).unwrap();

        sink.process(&line);
        sink.process(&line);

        assert_eq!(sink.current_size(), 200);
        assert_eq!(sink.stats().rotations, 1);
    }

    #[test]
    fn test_retention_applied_after_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = Renderer::default();
        let line = record_of_len(&renderer, 80);
        let config = SinkConfig {
            max_file_count: Some(2),
            ..test_config(&temp_dir, 50)
        };
        let mut sink = FileSink::new(config).unwrap();

        for _ in 0..5 {
            sink.process(&line);
        }

        assert_eq!(sink.stats().rotations, 6);
        let remaining = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(remaining, 2);
        assert!(sink.path().exists());
    }

    #[test]
    fn test_structured_shape_written_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = SinkConfig {
            shape: RenderShape::Structured,
            ..test_config(&temp_dir, 1024)
        };
        let mut sink = FileSink::new(config).unwrap();

        sink.process(&record(r#"{"a":1}"#));

        let content = fs::read_to_string(sink.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
        assert_eq!(value["line"]["a"], 1);
        assert_eq!(value["container"], "web");
    }

    #[test]
    fn test_existence_check_recreates_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = SinkConfig {
            check_file_exists: true,
            ..test_config(&temp_dir, 1024)
        };
        let mut sink = FileSink::new(config).unwrap();

        sink.process(&record("first"));
        fs::remove_file(sink.path()).unwrap();
        sink.process(&record("second"));

        let content = fs::read_to_string(sink.path()).unwrap();
        assert!(content.contains("second"));
        assert!(!content.contains("first"));
        assert_eq!(sink.current_size(), content.len() as u64);
    }

    #[tokio::test]
    async fn test_stream_drains_channel_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FileSink::new(test_config(&temp_dir, 1024 * 1024)).unwrap();
        let (tx, rx) = create_channel(16);

        let handle = sink.spawn(rx);
        for i in 0..20 {
            tx.send(record(&format!("msg {}", i))).await.unwrap();
        }
        drop(tx);

        let sink = handle.await.unwrap();
        assert_eq!(sink.status(), SinkStatus::Stopped);
        assert_eq!(sink.stats().records_written, 20);

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 20);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line["line"], format!("msg {}", i));
        }
    }

    #[tokio::test]
    async fn test_stopped_sink_ignores_records() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = FileSink::new(test_config(&temp_dir, 1024)).unwrap();
        let (tx, rx) = create_channel(1);
        drop(tx);

        sink.stream(rx).await;
        assert_eq!(sink.status(), SinkStatus::Stopped);

        sink.process(&record("late"));
        assert_eq!(sink.stats().records_written, 0);
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "");
    }

    #[test]
    fn test_write_failure_does_not_stop_sink() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = Renderer::default();
        let line = record_of_len(&renderer, 80);
        let mut sink = FileSink::new(test_config(&temp_dir, 50)).unwrap();

        // Rotation fails once the directory is gone, leaving no open handle
        fs::remove_dir_all(temp_dir.path()).unwrap();
        sink.process(&line);
        assert_eq!(sink.stats().rotations, 1);

        sink.process(&line);
        assert_eq!(sink.stats().write_errors, 1);
        assert_eq!(sink.status(), SinkStatus::Running);
    }

    #[test]
    fn test_recovers_after_failed_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        fs::create_dir(&log_dir).unwrap();

        let renderer = Renderer::default();
        let line = record_of_len(&renderer, 80);
        let config = SinkConfig {
            filename: "a.log".to_string(),
            max_file_size: 50,
            ..SinkConfig::default()
        }
        .with_directory(&log_dir);
        let mut sink = FileSink::new(config).unwrap();

        fs::remove_dir_all(&log_dir).unwrap();
        sink.process(&line);
        assert_eq!(sink.stats().rotations, 1);

        fs::create_dir(&log_dir).unwrap();
        let small = record("ok");
        for _ in 0..3 {
            sink.process(&small);
        }

        // Each record outgrows the limit, so every write is followed by a rotation
        assert_eq!(sink.stats().write_errors, 0);
        assert_eq!(sink.stats().records_written, 4);
        assert_eq!(sink.stats().rotations, 5);
        assert!(sink.path().exists());

        let archived: Vec<String> = fs::read_dir(&log_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p != sink.path())
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();
        assert_eq!(archived.len(), 3);
        assert!(archived.iter().all(|c| c.contains("\"line\":\"ok\"")));
    }
}
