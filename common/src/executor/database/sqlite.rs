// SQLite connector implementation

use super::{connect_with_timeout, first_result_set, sqlx_result_set};
use crate::errors::ExecutionError;
use crate::executor::Connector;
use crate::models::{DbKind, ResultSet};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use std::time::Duration;

/// SQLite connector
pub struct SqliteConnector {
    timeout: Duration,
}

impl SqliteConnector {
    /// Create a new SQLite connector
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[tracing::instrument(skip(self, conn, sql))]
    async fn execute_raw_sql(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::debug!("Executing raw SQL on SQLite");

        let rows = first_result_set(sqlx::raw_sql(sql).fetch_many(&mut *conn))
            .await
            .map_err(|e| {
                ExecutionError::DatabaseQueryFailed(format!("SQLite query failed: {}", e))
            })?;

        tracing::info!("SQLite query returned {} rows", rows.len());

        sqlx_result_set(rows)
    }
}

/// Parse either a `sqlite:` URL or an ADO-style `Data Source=<path>;...` string
pub(crate) fn parse_connect_options(
    connection_string: &str,
) -> Result<SqliteConnectOptions, ExecutionError> {
    let trimmed = connection_string.trim();

    if trimmed.starts_with("sqlite:") {
        return SqliteConnectOptions::from_str(trimmed).map_err(|e| {
            ExecutionError::DatabaseConnectionFailed(format!(
                "Invalid SQLite connection string: {}",
                e
            ))
        });
    }

    let data_source = trimmed
        .split(';')
        .filter_map(|part| part.split_once('='))
        .find(|(key, _)| {
            let key = key.trim();
            key.eq_ignore_ascii_case("data source") || key.eq_ignore_ascii_case("datasource")
        })
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ExecutionError::DatabaseConnectionFailed(
                "Invalid SQLite connection string. Expected: sqlite:<path> or Data Source=<path>"
                    .to_string(),
            )
        })?;

    if data_source == ":memory:" {
        return SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            ExecutionError::DatabaseConnectionFailed(format!(
                "Invalid SQLite connection string: {}",
                e
            ))
        });
    }

    Ok(SqliteConnectOptions::new().filename(data_source))
}

#[async_trait]
impl Connector for SqliteConnector {
    fn kind(&self) -> DbKind {
        DbKind::Sqlite
    }

    #[tracing::instrument(skip(self, connection_string, sql), fields(database_type = "sqlite"))]
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::info!("Connecting to SQLite database");

        let options = parse_connect_options(connection_string)?;
        let mut conn = connect_with_timeout("SQLite", self.timeout, options.connect()).await?;

        let result = self.execute_raw_sql(&mut conn, sql).await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "Failed to close SQLite connection");
        }

        result
    }
}
