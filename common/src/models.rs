// Data models for the SQL-to-CSV task

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// DbKind represents the supported database systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DbKind {
    SqlServer,
    Access,
    Oracle,
    MySql,
    Sqlite,
    PostgreSql,
    Teradata,
}

impl DbKind {
    pub const ALL: [DbKind; 7] = [
        DbKind::SqlServer,
        DbKind::Access,
        DbKind::Oracle,
        DbKind::MySql,
        DbKind::Sqlite,
        DbKind::PostgreSql,
        DbKind::Teradata,
    ];

    /// Name used in configuration and as the artifact file name prefix.
    ///
    /// PostgreSQL artifacts are prefixed `PostgreSql_`; older output used
    /// `PostGreSql_`. Both spellings parse as [`DbKind::PostgreSql`].
    pub fn name(&self) -> &'static str {
        match self {
            DbKind::SqlServer => "SqlServer",
            DbKind::Access => "Access",
            DbKind::Oracle => "Oracle",
            DbKind::MySql => "MySql",
            DbKind::Sqlite => "Sqlite",
            DbKind::PostgreSql => "PostgreSql",
            DbKind::Teradata => "Teradata",
        }
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DbKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DbKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownDbKind(s.to_string()))
    }
}

impl TryFrom<String> for DbKind {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DbKind> for String {
    fn from(kind: DbKind) -> Self {
        kind.name().to_string()
    }
}

fn default_separator() -> String {
    ";".to_string()
}

/// Settings of one SQL-to-CSV task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(rename = "type", alias = "db_kind")]
    pub db_kind: DbKind,
    #[serde(
        rename = "connectionString",
        alias = "connectionstring",
        alias = "connection_string"
    )]
    pub connection_string: String,
    #[serde(rename = "sql", alias = "inline_sql", default)]
    pub inline_sql: Option<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl TaskConfig {
    pub fn new(db_kind: DbKind, connection_string: impl Into<String>) -> Self {
        Self {
            db_kind,
            connection_string: connection_string.into(),
            inline_sql: None,
            separator: default_separator(),
        }
    }

    pub fn with_inline_sql(mut self, sql: impl Into<String>) -> Self {
        self.inline_sql = Some(sql.into());
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// The inline script, if one is configured and non-empty
    pub fn inline_script(&self) -> Option<&str> {
        self.inline_sql.as_deref().filter(|sql| !sql.is_empty())
    }
}

/// One unit of SQL text to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Inline(String),
    File(PathBuf),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Inline(_) => f.write_str("inline script"),
            Payload::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Tabular result of one query
///
/// Values are already rendered to text; NULL is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Value of `column` in row `row`, looked up by name.
    ///
    /// Duplicate column names resolve to the first column carrying that name.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }
}

/// A CSV file produced by a task run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvArtifact {
    pub path: PathBuf,
    pub task_id: String,
}

/// Artifacts produced over a whole task run, owned by the caller
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ArtifactRegistry {
    artifacts: Vec<CsvArtifact>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, task_id: impl Into<String>) {
        self.artifacts.push(CsvArtifact {
            path: path.into(),
            task_id: task_id.into(),
        });
    }

    pub fn artifacts(&self) -> &[CsvArtifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.artifacts.iter().any(|a| a.path == path)
    }
}

/// Outcome of one payload execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Query returned rows, written to the given CSV file
    Succeeded(PathBuf),
    /// Query ran but returned no rows; no file was written
    SucceededNoOutput,
    Failed(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ExecutionOutcome::Failed(_))
    }
}

/// Verdict for a whole task run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Success,
    Warning,
    Error,
}

/// Status handed back to the hosting pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskStatus {
    pub status: AggregateStatus,
    /// Always false: the pipeline proceeds regardless, only `status` signals health
    pub non_fatal: bool,
}

impl TaskStatus {
    pub fn new(status: AggregateStatus) -> Self {
        Self {
            status,
            non_fatal: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_kind_parse_is_case_insensitive() {
        assert_eq!("sqlserver".parse::<DbKind>().unwrap(), DbKind::SqlServer);
        assert_eq!("POSTGRESQL".parse::<DbKind>().unwrap(), DbKind::PostgreSql);
        assert_eq!("PostGreSql".parse::<DbKind>().unwrap(), DbKind::PostgreSql);
        assert_eq!(" teradata ".parse::<DbKind>().unwrap(), DbKind::Teradata);
    }

    #[test]
    fn test_postgresql_file_prefix() {
        assert_eq!(DbKind::PostgreSql.name(), "PostgreSql");
        assert_eq!(DbKind::PostgreSql.to_string(), "PostgreSql");
    }

    #[test]
    fn test_db_kind_round_trips_through_name() {
        for kind in DbKind::ALL {
            assert_eq!(kind.name().parse::<DbKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_db_kind_rejected() {
        let err = "db2".parse::<DbKind>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownDbKind(name) if name == "db2"));
    }

    #[test]
    fn test_task_config_defaults() {
        let config = TaskConfig::new(DbKind::Sqlite, "sqlite::memory:");
        assert_eq!(config.separator, ";");
        assert!(config.inline_script().is_none());
    }

    #[test]
    fn test_empty_inline_sql_is_not_a_script() {
        let config = TaskConfig::new(DbKind::MySql, "mysql://localhost/db").with_inline_sql("");
        assert!(config.inline_script().is_none());

        let config = config.with_inline_sql("SELECT 1");
        assert_eq!(config.inline_script(), Some("SELECT 1"));
    }

    #[test]
    fn test_task_config_deserializes_option_names() {
        let config: TaskConfig = serde_json::from_value(serde_json::json!({
            "type": "mysql",
            "connectionString": "mysql://root@localhost/app",
            "sql": "SELECT * FROM users",
        }))
        .unwrap();

        assert_eq!(config.db_kind, DbKind::MySql);
        assert_eq!(config.connection_string, "mysql://root@localhost/app");
        assert_eq!(config.inline_script(), Some("SELECT * FROM users"));
        assert_eq!(config.separator, ";");
    }

    #[test]
    fn test_result_set_lookup_uses_first_duplicate_column() {
        let rs = ResultSet::new(
            vec!["id".into(), "id".into(), "name".into()],
            vec![vec!["1".into(), "2".into(), "alice".into()]],
        );
        assert_eq!(rs.value(0, "id"), Some("1"));
        assert_eq!(rs.value(0, "name"), Some("alice"));
        assert_eq!(rs.value(0, "missing"), None);
        assert_eq!(rs.value(1, "id"), None);
    }

    #[test]
    fn test_payload_display() {
        assert_eq!(Payload::Inline("SELECT 1".into()).to_string(), "inline script");
        assert_eq!(
            Payload::File(PathBuf::from("/scripts/a.sql")).to_string(),
            "/scripts/a.sql"
        );
    }

    #[test]
    fn test_task_status_is_never_non_fatal() {
        let status = TaskStatus::new(AggregateStatus::Warning);
        assert!(!status.non_fatal);
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({"status": "warning", "non_fatal": false})
        );
    }
}
