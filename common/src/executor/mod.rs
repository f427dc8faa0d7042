// Executor module for SQL payload execution
// Provides the backend connector trait and the CSV writer

pub mod csv;
pub mod database;

use crate::errors::ExecutionError;
use crate::models::{DbKind, ResultSet};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use csv::CsvWriter;

/// Connector runs one SQL command against one backend kind.
///
/// Every call opens its own connection and closes it before returning.
/// `Ok(None)` means the command produced no tabular result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Backend kind this connector talks to
    fn kind(&self) -> DbKind;

    /// Execute `sql` on a fresh connection opened from `connection_string`
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError>;
}

/// Build the connector for a backend kind
pub fn connector_for(kind: DbKind, connect_timeout: Duration) -> Arc<dyn Connector> {
    use database::*;

    match kind {
        DbKind::SqlServer => Arc::new(SqlServerConnector::new(connect_timeout)),
        DbKind::Access => Arc::new(OdbcConnector::new(DbKind::Access, connect_timeout)),
        DbKind::Oracle => Arc::new(OracleConnector::new()),
        DbKind::MySql => Arc::new(MySqlConnector::new(connect_timeout)),
        DbKind::Sqlite => Arc::new(SqliteConnector::new(connect_timeout)),
        DbKind::PostgreSql => Arc::new(PostgreSqlConnector::new(connect_timeout)),
        DbKind::Teradata => Arc::new(OdbcConnector::new(DbKind::Teradata, connect_timeout)),
    }
}
