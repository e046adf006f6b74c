use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use super::error::StorageResult;
use super::schema::MetricRecord;

/// Append-only JSON-lines metrics log
///
/// The file is opened per operation; there is no locking against other
/// processes writing the same file.
#[derive(Debug, Clone)]
pub struct MetricsLog {
    path: PathBuf,
}

impl MetricsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line, creating the file if needed.
    #[instrument(skip(self, record), fields(path = %self.path.display()))]
    pub async fn append(&self, record: &MetricRecord) -> StorageResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("appended record for {}", record.timestamp);
        Ok(())
    }

    /// Read the full history.
    ///
    /// A missing file is an empty history. Blank lines are ignored and lines
    /// that do not parse (including invalid UTF-8) are skipped with a warning.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn read_all(&self) -> StorageResult<Vec<MetricRecord>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("metrics log does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        // lines are parsed as bytes so a torn or non-UTF-8 line only loses itself
        let records = content
            .split(|byte| *byte == b'\n')
            .enumerate()
            .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
            .filter_map(|(index, line)| match serde_json::from_slice(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("skipping malformed line {}: {e}", index + 1);
                    None
                }
            })
            .collect::<Vec<MetricRecord>>();

        debug!("read {} records", records.len());
        Ok(records)
    }
}
