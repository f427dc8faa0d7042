// CSV file writer
// Separator-joined fields with a trailing separator, CRLF line endings, no quoting

use crate::errors::ExecutionError;
use crate::models::{DbKind, ResultSet};
use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

const LINE_TERMINATOR: &str = "\r\n";

/// Attempts at claiming a fresh timestamped name before giving up
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Writes result sets as CSV files under the workflow temp directory
#[derive(Debug, Clone)]
pub struct CsvWriter {
    temp_dir: PathBuf,
    separator: String,
}

impl CsvWriter {
    /// Create a new CSV writer
    pub fn new(temp_dir: impl Into<PathBuf>, separator: impl Into<String>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            separator: separator.into(),
        }
    }

    /// Render the result set as CSV text.
    ///
    /// Every field, header included, is followed by the separator. Values are
    /// written verbatim: a value containing the separator or a line break
    /// is not quoted.
    pub fn render(&self, result_set: &ResultSet) -> String {
        let mut out = String::new();

        for column in result_set.columns() {
            out.push_str(column);
            out.push_str(&self.separator);
        }
        out.push_str(LINE_TERMINATOR);

        for row in 0..result_set.row_count() {
            for column in result_set.columns() {
                out.push_str(result_set.value(row, column).unwrap_or_default());
                out.push_str(&self.separator);
            }
            out.push_str(LINE_TERMINATOR);
        }

        out
    }

    /// Write the result set to `<temp_dir>/<Kind>_<timestamp>.csv` and return the path
    #[instrument(skip(self, result_set), fields(rows = result_set.row_count()))]
    pub async fn write(
        &self,
        kind: DbKind,
        result_set: &ResultSet,
    ) -> Result<PathBuf, ExecutionError> {
        let contents = self.render(result_set);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.temp_dir.join(artifact_file_name(kind, Local::now()));

            // create_new claims the name atomically
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(contents.as_bytes()).await.map_err(|e| {
                        ExecutionError::CsvWriteFailed(format!(
                            "Failed to write {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    file.flush().await.map_err(|e| {
                        ExecutionError::CsvWriteFailed(format!(
                            "Failed to flush {}: {}",
                            path.display(),
                            e
                        ))
                    })?;

                    debug!(path = %path.display(), bytes = contents.len(), "CSV file written");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Err(e) => {
                    return Err(ExecutionError::CsvWriteFailed(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(ExecutionError::CsvWriteFailed(format!(
            "Could not find a free file name in {} after {} attempts",
            self.temp_dir.display(),
            MAX_NAME_ATTEMPTS
        )))
    }
}

/// `<Kind>_<yyyy-MM-dd-HH-mm-ss-fff>.csv`
pub fn artifact_file_name(kind: DbKind, at: DateTime<Local>) -> String {
    format!("{}_{}.csv", kind.name(), at.format("%Y-%m-%d-%H-%M-%S-%3f"))
}
