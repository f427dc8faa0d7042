// Batch orchestrator - inline script then each input file, aggregated into one status

use super::runner::ExecutionRunner;
use crate::config::Settings;
use crate::errors::TaskError;
use crate::executor::{connector_for, Connector, CsvWriter};
use crate::models::{
    AggregateStatus, ArtifactRegistry, ExecutionOutcome, Payload, TaskConfig, TaskStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Tracks per-attempt outcomes over a run
///
/// Inline successes do not count as file successes: an
/// inline failure with no successful file is an `Error`, never a `Warning`.
#[derive(Debug, Default)]
pub struct StatusTracker {
    any_failure: bool,
    any_file_succeeded: bool,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inline(&mut self, outcome: &ExecutionOutcome) {
        if !outcome.is_success() {
            self.any_failure = true;
        }
    }

    pub fn record_file(&mut self, outcome: &ExecutionOutcome) {
        if outcome.is_success() {
            self.any_file_succeeded = true;
        } else {
            self.any_failure = true;
        }
    }

    /// Terminal status; consumes the tracker
    pub fn finish(self) -> AggregateStatus {
        match (self.any_failure, self.any_file_succeeded) {
            (false, _) => AggregateStatus::Success,
            (true, true) => AggregateStatus::Warning,
            (true, false) => AggregateStatus::Error,
        }
    }
}

/// One SQL-to-CSV task: the configured backend, inline script and separator
pub struct SqlToCsvTask {
    config: TaskConfig,
    runner: ExecutionRunner,
}

impl SqlToCsvTask {
    /// Build the task with the connector for the configured backend kind
    pub fn new(
        config: TaskConfig,
        temp_dir: impl Into<PathBuf>,
        task_id: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        let connector = connector_for(config.db_kind, connect_timeout);
        Self::with_connector(config, connector, temp_dir, task_id)
    }

    /// Build the task from loaded settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.task.clone(),
            settings.workflow.temp_dir.clone(),
            settings.workflow.task_id.clone(),
            Duration::from_secs(settings.connector.connect_timeout_seconds),
        )
    }

    /// Build the task around an explicit connector
    pub fn with_connector(
        config: TaskConfig,
        connector: Arc<dyn Connector>,
        temp_dir: impl Into<PathBuf>,
        task_id: impl Into<String>,
    ) -> Self {
        let writer = CsvWriter::new(temp_dir, config.separator.clone());
        let runner = ExecutionRunner::new(
            connector,
            writer,
            config.connection_string.clone(),
            task_id,
        );
        Self { config, runner }
    }

    /// Run the inline script (if any), then every input file in order.
    ///
    /// Per-payload failures are folded into the returned status; only
    /// cancellation aborts the run.
    #[instrument(
        skip(self, input_files, registry, cancel),
        fields(task_id = %self.runner.task_id(), db_kind = %self.config.db_kind, files = input_files.len())
    )]
    pub async fn run(
        &self,
        input_files: &[PathBuf],
        registry: &mut ArtifactRegistry,
        cancel: &CancellationToken,
    ) -> Result<TaskStatus, TaskError> {
        info!("Executing SQL scripts...");

        let mut tracker = StatusTracker::new();

        if let Some(sql) = self.config.inline_script() {
            let outcome = self
                .runner
                .run(&Payload::Inline(sql.to_string()), registry, cancel)
                .await?;
            tracker.record_inline(&outcome);
        }

        for file in input_files {
            let outcome = self
                .runner
                .run(&Payload::File(file.clone()), registry, cancel)
                .await?;
            tracker.record_file(&outcome);
        }

        let status = tracker.finish();
        info!(status = ?status, artifacts = registry.len(), "Task finished.");

        Ok(TaskStatus::new(status))
    }
}
