// Worker binary entry point
// Runs one SQL-to-CSV task from layered configuration and reports its status

use anyhow::{Context, Result};
use common::config::Settings;
use common::models::ArtifactRegistry;
use common::task::SqlToCsvTask;
use common::telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;

    telemetry::init_logging(&settings.observability.log_level)?;

    settings
        .validate()
        .context("Invalid configuration")?;

    info!(
        db_kind = %settings.task.db_kind,
        task_id = %settings.workflow.task_id,
        input_files = settings.workflow.input_files.len(),
        "Configuration loaded successfully"
    );

    let temp_dir = &settings.workflow.temp_dir;
    if !temp_dir.exists() {
        tokio::fs::create_dir_all(temp_dir)
            .await
            .context("Failed to create workflow temp directory")?;
        info!(path = %temp_dir.display(), "Created workflow temp directory");
    }

    let task = SqlToCsvTask::from_settings(&settings);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Shutdown signal received, cancelling task run");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let mut registry = ArtifactRegistry::new();
    let status = task
        .run(&settings.workflow.input_files, &mut registry, &cancel)
        .await
        .context("Task run aborted")?;

    let report = serde_json::json!({
        "task_id": settings.workflow.task_id,
        "status": status.status,
        "non_fatal": status.non_fatal,
        "artifacts": registry,
    });
    println!("{}", report);

    Ok(())
}
