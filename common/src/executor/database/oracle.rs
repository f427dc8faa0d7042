// Oracle connector implementation
// The oracle driver is blocking, so each call runs on tokio's blocking pool

use super::rendered_result_set;
use crate::errors::ExecutionError;
use crate::executor::Connector;
use crate::models::{DbKind, ResultSet};
use async_trait::async_trait;

/// Oracle connector
#[derive(Default)]
pub struct OracleConnector;

impl OracleConnector {
    /// Create a new Oracle connector
    pub fn new() -> Self {
        Self
    }
}

/// Split `username/password@connect_string`
pub(crate) fn parse_connection_string(
    connection_string: &str,
) -> Result<(&str, &str, &str), ExecutionError> {
    let (credentials, connect_string) = connection_string.rsplit_once('@').ok_or_else(|| {
        ExecutionError::DatabaseConnectionFailed(
            "Invalid Oracle connection string format. Expected: username/password@host:port/service_name".to_string(),
        )
    })?;

    let (username, password) = credentials.split_once('/').ok_or_else(|| {
        ExecutionError::DatabaseConnectionFailed(
            "Invalid Oracle credentials format. Expected: username/password".to_string(),
        )
    })?;

    Ok((username, password, connect_string))
}

/// Run `sql` on a fresh connection; blocking
fn execute_blocking(connection_string: &str, sql: &str) -> Result<Option<ResultSet>, ExecutionError> {
    let (username, password, connect_string) = parse_connection_string(connection_string)?;

    let conn = oracle::Connection::connect(username, password, connect_string).map_err(|e| {
        ExecutionError::DatabaseConnectionFailed(format!("Failed to connect to Oracle: {}", e))
    })?;

    let result = execute_raw_sql(&conn, sql);

    if let Err(e) = conn.close() {
        tracing::warn!(error = %e, "Failed to close Oracle connection");
    }

    result
}

fn execute_raw_sql(
    conn: &oracle::Connection,
    sql: &str,
) -> Result<Option<ResultSet>, ExecutionError> {
    tracing::debug!("Executing raw SQL on Oracle");

    let mut stmt = conn.statement(sql).build().map_err(|e| {
        ExecutionError::DatabaseQueryFailed(format!("Failed to prepare Oracle statement: {}", e))
    })?;

    if !stmt.is_query() {
        stmt.execute(&[]).map_err(|e| {
            ExecutionError::DatabaseQueryFailed(format!("Oracle statement failed: {}", e))
        })?;
        conn.commit().map_err(|e| {
            ExecutionError::DatabaseQueryFailed(format!("Oracle commit failed: {}", e))
        })?;
        return Ok(None);
    }

    let rows = stmt.query(&[]).map_err(|e| {
        ExecutionError::DatabaseQueryFailed(format!("Oracle query failed: {}", e))
    })?;

    let columns: Vec<String> = rows
        .column_info()
        .iter()
        .map(|info| info.name().to_string())
        .collect();

    let mut rendered = Vec::new();
    for row_result in rows {
        let row = row_result.map_err(|e| {
            ExecutionError::DatabaseQueryFailed(format!("Failed to fetch Oracle row: {}", e))
        })?;

        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value = row.get::<usize, Option<String>>(i).map_err(|e| {
                ExecutionError::DatabaseQueryFailed(format!(
                    "Failed to read Oracle column '{}': {}",
                    columns[i], e
                ))
            })?;
            values.push(value.unwrap_or_default());
        }
        rendered.push(values);
    }

    tracing::info!("Oracle query returned {} rows", rendered.len());

    Ok(rendered_result_set(columns, rendered))
}

#[async_trait]
impl Connector for OracleConnector {
    fn kind(&self) -> DbKind {
        DbKind::Oracle
    }

    #[tracing::instrument(skip(self, connection_string, sql), fields(database_type = "oracle"))]
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::info!("Connecting to Oracle database");

        let connection_string = connection_string.to_string();
        let sql = sql.to_string();
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            execute_blocking(&connection_string, &sql)
        })
        .await
        .map_err(|e| ExecutionError::DatabaseQueryFailed(format!("Oracle worker failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection_string() {
        let (user, password, connect) =
            parse_connection_string("scott/tiger@db.example.com:1521/ORCLPDB1").unwrap();
        assert_eq!(user, "scott");
        assert_eq!(password, "tiger");
        assert_eq!(connect, "db.example.com:1521/ORCLPDB1");
    }

    #[test]
    fn test_parse_connection_string_password_with_at_sign() {
        let (_, password, connect) =
            parse_connection_string("scott/t@ger@localhost/XE").unwrap();
        assert_eq!(password, "t@ger");
        assert_eq!(connect, "localhost/XE");
    }

    #[tokio::test]
    async fn test_missing_connect_descriptor_fails() {
        let connector = OracleConnector::new();
        let result = connector.query("scott/tiger", "SELECT 1 FROM DUAL").await;
        assert!(matches!(
            result,
            Err(ExecutionError::DatabaseConnectionFailed(_))
        ));
    }

    #[test]
    fn test_missing_password_fails() {
        assert!(parse_connection_string("scott@localhost/XE").is_err());
    }
}
