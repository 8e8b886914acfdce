//! JSONL event source adapter.
//!
//! Replays raw announcements from JSONL files, one [`RawEvent`] per line:
//!
//! ```text
//! {"text": "Name: Foo\nType: Library\nTags: #go", "url": "https://example.com", "origin_id": -100123}
//! ```
//!
//! Useful for backfills and for exercising the pipeline without a bot token.

use std::path::{Path, PathBuf};

use postboard_core::RawEvent;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::{deliver, Delivery, EventSource, SourceMetadata, SourceStats};
use crate::pipeline::Relay;
use crate::shutdown::Shutdown;
use crate::{Error, Result};

/// Input path meaning "read standard input".
pub const STDIN_PATH: &str = "-";

/// Configuration for the JSONL source.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Input file, directory, or `-` for stdin.
    pub input: PathBuf,

    /// Continue processing on errors (log and skip malformed lines).
    pub continue_on_error: bool,

    /// Limit number of files to process (for testing).
    pub limit: Option<usize>,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(STDIN_PATH),
            continue_on_error: true,
            limit: None,
        }
    }
}

/// JSONL file event source.
pub struct JsonlSource {
    config: JsonlConfig,
}

impl JsonlSource {
    /// Create a new JSONL source with the given configuration.
    pub fn new(config: JsonlConfig) -> Self {
        Self { config }
    }

    fn reads_stdin(&self) -> bool {
        self.config.input.as_os_str() == STDIN_PATH
    }

    /// Collect files to process based on input path.
    async fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let input = &self.config.input;
        let metadata = fs::metadata(input).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Input path does not exist: {}", input.display()),
            ))
        })?;

        let mut files = Vec::new();
        if metadata.is_file() {
            files.push(input.clone());
        } else {
            let mut entries = fs::read_dir(input).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_file() && is_jsonl(&path) {
                    files.push(path);
                }
            }
            // Sort for deterministic processing order
            files.sort();
        }

        if let Some(limit) = self.config.limit {
            files.truncate(limit);
        }

        Ok(files)
    }

    /// Read lines from `reader` until EOF, shutdown, or a closed relay.
    ///
    /// Returns `Ok(false)` when the caller should stop reading further input.
    async fn process_reader<R>(
        &self,
        reader: R,
        relay: &Relay<RawEvent>,
        shutdown: &Shutdown,
        stats: &mut SourceStats,
        bytes_read: &mut usize,
    ) -> Result<bool>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut lines = reader.lines();
        let mut line_num = 0usize;

        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    tracing::info!("Shutdown requested, stopping JSONL replay");
                    return Ok(false);
                }
                line = lines.next_line() => line,
            };

            line_num += 1;
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(true),
                Err(e) => {
                    tracing::warn!(line = line_num, error = %e, "I/O error");
                    stats.parse_errors += 1;
                    if self.config.continue_on_error {
                        continue;
                    }
                    return Err(Error::Io(e));
                }
            };
            *bytes_read += line.len() + 1;

            if line.trim().is_empty() {
                continue;
            }

            let event = match serde_json::from_str::<RawEvent>(&line) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(line = line_num, error = %e, "JSON parse error");
                    stats.parse_errors += 1;
                    if self.config.continue_on_error {
                        continue;
                    }
                    return Err(Error::Json(e.to_string()));
                }
            };

            if deliver(relay, event, stats) == Delivery::Stop {
                return Ok(false);
            }
        }
    }
}

impl EventSource for JsonlSource {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn run(&mut self, relay: Relay<RawEvent>, shutdown: Shutdown) -> Result<SourceStats> {
        let mut stats = SourceStats::default();
        let mut bytes_read = 0usize;
        let mut files_processed = 0usize;

        if self.reads_stdin() {
            tracing::info!("Reading events from stdin");
            let reader = BufReader::new(tokio::io::stdin());
            self.process_reader(reader, &relay, &shutdown, &mut stats, &mut bytes_read)
                .await?;
        } else {
            let files = self.collect_files().await?;
            tracing::info!("Found {} JSONL files to process", files.len());

            for (file_idx, file_path) in files.iter().enumerate() {
                tracing::info!(
                    "[{}/{}] Processing: {}",
                    file_idx + 1,
                    files.len(),
                    file_path.display()
                );

                let outcome = match File::open(file_path).await {
                    Ok(file) => {
                        self.process_reader(
                            BufReader::new(file),
                            &relay,
                            &shutdown,
                            &mut stats,
                            &mut bytes_read,
                        )
                        .await
                    }
                    Err(e) => Err(Error::Io(e)),
                };

                match outcome {
                    Ok(keep_going) => {
                        files_processed += 1;
                        if !keep_going {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Error processing {}: {}", file_path.display(), e);
                        if !self.config.continue_on_error {
                            return Err(e);
                        }
                    }
                }
            }
        }

        stats.source_metadata = SourceMetadata {
            files_processed: Some(files_processed),
            bytes_read: Some(bytes_read),
            ..Default::default()
        };
        Ok(stats)
    }
}

fn is_jsonl(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "jsonl" || ext == "ndjson" || ext == "json")
}
