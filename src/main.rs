use std::collections::HashSet;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use file_sink::config::DEFAULT_FILENAME;
use file_sink::record::DEFAULT_CHANNEL_BUFFER;
use file_sink::{create_channel, logging, FileSink, LogRecord, Route, SinkConfig};

/// Overrides the output directory for every route
const DIR_ENV: &str = "FILE_SINK_DIR";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let mut routes: Vec<String> = std::env::args().skip(1).collect();
    if routes.is_empty() {
        routes.push(format!("file://{}", DEFAULT_FILENAME));
    }

    let dir_override = std::env::var(DIR_ENV).ok().filter(|d| !d.is_empty());

    let mut configs = Vec::with_capacity(routes.len());
    for raw in &routes {
        let route = Route::parse(raw)?;
        let mut config = SinkConfig::from_route(&route);
        if let Some(dir) = &dir_override {
            config = config.with_directory(dir);
        }
        configs.push(config);
    }
    ensure_unique_paths(&configs)?;

    // One task per sink; a sink that cannot start aborts the whole process
    let mut senders = Vec::with_capacity(configs.len());
    let mut handles = Vec::with_capacity(configs.len());
    for config in configs {
        let path = config.file_path();
        let sink = FileSink::new(config)
            .with_context(|| format!("Failed to start sink for {}", path.display()))?;
        let (tx, rx) = create_channel(DEFAULT_CHANNEL_BUFFER);
        senders.push(tx);
        handles.push(sink.spawn(rx));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let record: LogRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed record");
                continue;
            }
        };

        for tx in &senders {
            if tx.send(record.clone()).await.is_err() {
                tracing::error!("Sink channel closed unexpectedly");
            }
        }
    }

    // Closing the channels stops the sinks
    drop(senders);
    for handle in handles {
        let sink = handle.await.context("Sink task panicked")?;
        tracing::info!(
            path = %sink.path().display(),
            stats = ?sink.stats(),
            "Sink finished"
        );
    }

    Ok(())
}

/// Reject routes that would put two sinks on the same active file
fn ensure_unique_paths(configs: &[SinkConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for config in configs {
        let path = config.file_path();
        if !seen.insert(path.clone()) {
            anyhow::bail!("More than one route writes to {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_routes_rejected() {
        let configs = vec![
            SinkConfig::from_route_with_check(&Route::new("a.log"), false),
            SinkConfig::from_route_with_check(&Route::new("b.log"), false),
            SinkConfig::from_route_with_check(
                &Route::new("a.log").with_option("maxfilesize", "10"),
                false,
            ),
        ];

        let err = ensure_unique_paths(&configs).unwrap_err();
        assert!(err.to_string().contains("a.log"));
    }

    #[test]
    fn test_distinct_routes_accepted() {
        let configs = vec![
            SinkConfig::from_route_with_check(&Route::new("a.log"), false),
            SinkConfig::from_route_with_check(&Route::new("a.log"), false)
                .with_directory("/tmp/other"),
        ];

        assert!(ensure_unique_paths(&configs).is_ok());
    }
}
