// Execution runner - drives one payload through connector and writer

use crate::errors::{ExecutionError, TaskError};
use crate::executor::{Connector, CsvWriter};
use crate::models::{ArtifactRegistry, ExecutionOutcome, Payload};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Runs single SQL payloads and classifies their outcome
pub struct ExecutionRunner {
    connector: Arc<dyn Connector>,
    writer: CsvWriter,
    connection_string: String,
    task_id: String,
}

impl ExecutionRunner {
    /// Create a new execution runner
    pub fn new(
        connector: Arc<dyn Connector>,
        writer: CsvWriter,
        connection_string: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            writer,
            connection_string: connection_string.into(),
            task_id: task_id.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Execute one payload.
    ///
    /// Every failure is logged and returned as `ExecutionOutcome::Failed`.
    /// Only cancellation is returned as an error.
    #[instrument(skip(self, registry, cancel), fields(task_id = %self.task_id, payload = %payload))]
    pub async fn run(
        &self,
        payload: &Payload,
        registry: &mut ArtifactRegistry,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, TaskError> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TaskError::Cancelled),
            result = self.execute(payload) => result,
        };

        let outcome = match result {
            Ok(Some(path)) => {
                registry.register(path.clone(), self.task_id.clone());
                info!(path = %path.display(), "CSV file generated: {}", path.display());
                ExecutionOutcome::Succeeded(path)
            }
            Ok(None) => ExecutionOutcome::SucceededNoOutput,
            Err(e) => {
                match payload {
                    Payload::Inline(_) => error!(
                        error = %e,
                        category = ?e.category(),
                        "An error occurred while executing sql script. Error: {}",
                        e
                    ),
                    Payload::File(path) => error!(
                        error = %e,
                        category = ?e.category(),
                        "An error occurred while executing sql script {}. Error: {}",
                        path.display(),
                        e
                    ),
                }
                return Ok(ExecutionOutcome::Failed(e.to_string()));
            }
        };

        match payload {
            Payload::Inline(_) => {
                info!("The script has been executed through the sql option of the task.")
            }
            Payload::File(path) => info!("The script {} has been executed.", path.display()),
        }

        Ok(outcome)
    }

    /// Read, execute and write; returns the CSV path when rows were produced
    async fn execute(&self, payload: &Payload) -> Result<Option<PathBuf>, ExecutionError> {
        let sql = match payload {
            Payload::Inline(sql) => sql.clone(),
            Payload::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                ExecutionError::ScriptReadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?,
        };

        let result_set = self
            .connector
            .query(&self.connection_string, &sql)
            .await?;

        match result_set {
            Some(rs) if rs.has_rows() => {
                let path = self.writer.write(self.connector.kind(), &rs).await?;
                Ok(Some(path))
            }
            _ => Ok(None),
        }
    }
}
