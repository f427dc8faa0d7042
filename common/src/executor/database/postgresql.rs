// PostgreSQL connector implementation

use super::{connect_with_timeout, first_result_set, sqlx_result_set};
use crate::errors::ExecutionError;
use crate::executor::Connector;
use crate::models::{DbKind, ResultSet};
use async_trait::async_trait;
use sqlx::postgres::PgConnection;
use sqlx::Connection;
use std::time::Duration;

/// PostgreSQL connector
pub struct PostgreSqlConnector {
    timeout: Duration,
}

impl PostgreSqlConnector {
    /// Create a new PostgreSQL connector
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Execute the script over the simple query protocol so that every value
    /// arrives in text form
    #[tracing::instrument(skip(self, conn, sql))]
    async fn execute_raw_sql(
        &self,
        conn: &mut PgConnection,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::debug!("Executing raw SQL on PostgreSQL");

        let rows = first_result_set(sqlx::raw_sql(sql).fetch_many(&mut *conn))
            .await
            .map_err(|e| {
                ExecutionError::DatabaseQueryFailed(format!("PostgreSQL query failed: {}", e))
            })?;

        tracing::info!("PostgreSQL query returned {} rows", rows.len());

        sqlx_result_set(rows)
    }
}

#[async_trait]
impl Connector for PostgreSqlConnector {
    fn kind(&self) -> DbKind {
        DbKind::PostgreSql
    }

    #[tracing::instrument(skip(self, connection_string, sql), fields(database_type = "postgresql"))]
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::info!("Connecting to PostgreSQL database");

        let mut conn = connect_with_timeout(
            "PostgreSQL",
            self.timeout,
            PgConnection::connect(connection_string),
        )
        .await?;

        let result = self.execute_raw_sql(&mut conn, sql).await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "Failed to close PostgreSQL connection");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_connection_string_fails_to_connect() {
        let connector = PostgreSqlConnector::new(Duration::from_secs(5));
        let result = connector.query("postgresql://[::1", "SELECT 1").await;
        assert!(matches!(
            result,
            Err(ExecutionError::DatabaseConnectionFailed(_))
        ));
    }
}
