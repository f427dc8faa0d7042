// Property-based tests for status aggregation and configuration loading

use common::config::Settings;
use common::models::{AggregateStatus, DbKind, ExecutionOutcome};
use common::task::StatusTracker;
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn outcome_strategy() -> impl Strategy<Value = ExecutionOutcome> {
    prop_oneof![
        Just(ExecutionOutcome::SucceededNoOutput),
        "[a-z]{1,8}".prop_map(|name| ExecutionOutcome::Succeeded(format!("/tmp/{}.csv", name).into())),
        "[a-z ]{1,20}".prop_map(ExecutionOutcome::Failed),
    ]
}

proptest! {
    /// *For any* inline outcome and sequence of file outcomes, the status is
    /// Success without failures, Warning when a file succeeded despite a
    /// failure, and Error otherwise.
    #[test]
    fn property_aggregate_status_derivation(
        inline in prop::option::of(outcome_strategy()),
        files in prop::collection::vec(outcome_strategy(), 0..12),
    ) {
        let mut tracker = StatusTracker::new();
        if let Some(outcome) = &inline {
            tracker.record_inline(outcome);
        }
        for outcome in &files {
            tracker.record_file(outcome);
        }

        let any_failure = inline.iter().chain(files.iter()).any(|o| !o.is_success());
        let any_file_succeeded = files.iter().any(ExecutionOutcome::is_success);

        let expected = if !any_failure {
            AggregateStatus::Success
        } else if any_file_succeeded {
            AggregateStatus::Warning
        } else {
            AggregateStatus::Error
        };

        prop_assert_eq!(tracker.finish(), expected);
    }

    /// *For any* casing of a kind name, parsing yields that kind
    #[test]
    fn property_db_kind_parse_ignores_case(index in 0usize..7, mask in prop::collection::vec(any::<bool>(), 16)) {
        let kind = DbKind::ALL[index];
        let mixed: String = kind
            .name()
            .chars()
            .zip(mask.iter().cycle())
            .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
            .collect();

        prop_assert_eq!(mixed.parse::<DbKind>().unwrap(), kind);
    }
}

#[test]
fn test_settings_load_from_toml_with_task_option_names() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
[task]
type = "postgresql"
connectionString = "postgresql://reporter@localhost/sales"
sql = "SELECT * FROM invoices"

[workflow]
temp_dir = "/tmp/sqlcsv"
task_id = "17"
input_files = ["/scripts/a.sql", "/scripts/b.sql"]
"#,
    )
    .unwrap();

    let settings = Settings::load_from_path(dir.path()).unwrap();

    assert_eq!(settings.task.db_kind, DbKind::PostgreSql);
    assert_eq!(
        settings.task.connection_string,
        "postgresql://reporter@localhost/sales"
    );
    assert_eq!(settings.task.inline_script(), Some("SELECT * FROM invoices"));
    assert_eq!(settings.task.separator, ";");
    assert_eq!(settings.workflow.task_id, "17");
    assert_eq!(settings.workflow.input_files.len(), 2);
    assert_eq!(settings.connector.connect_timeout_seconds, 30);
    assert_eq!(settings.observability.log_level, "info");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_local_file_overrides_default() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
[task]
type = "sqlite"
connectionString = "sqlite://a.db"

[workflow]
temp_dir = "/tmp/sqlcsv"
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("local.toml"),
        r#"
[task]
separator = "|"
"#,
    )
    .unwrap();

    let settings = Settings::load_from_path(dir.path()).unwrap();

    assert_eq!(settings.task.separator, "|");
    assert!(settings.workflow.input_files.is_empty());
    assert!(!settings.workflow.task_id.is_empty());
}

#[test]
fn test_settings_reject_unknown_db_kind() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
[task]
type = "db2"
connectionString = "x"

[workflow]
temp_dir = "/tmp/sqlcsv"
"#,
    )
    .unwrap();

    assert!(Settings::load_from_path(dir.path()).is_err());
}
