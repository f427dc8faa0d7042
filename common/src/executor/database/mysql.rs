// MySQL connector implementation

use super::{connect_with_timeout, keep_first_rows, rendered_result_set};
use crate::errors::ExecutionError;
use crate::executor::Connector;
use crate::models::{DbKind, ResultSet};
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::Value;
use std::time::Duration;

/// MySQL connector
pub struct MySqlConnector {
    timeout: Duration,
}

impl MySqlConnector {
    /// Create a new MySQL connector
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Execute raw SQL on MySQL, keeping the first result set that has rows.
    ///
    /// Every result set is read so that each statement of the script runs.
    #[tracing::instrument(skip(self, conn, sql))]
    async fn execute_raw_sql(
        &self,
        conn: &mut mysql_async::Conn,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::debug!("Executing raw SQL on MySQL");

        let mut result = conn.query_iter(sql).await.map_err(|e| {
            ExecutionError::DatabaseQueryFailed(format!("MySQL query failed: {}", e))
        })?;

        let mut rows: Vec<mysql_async::Row> = Vec::new();
        while !result.is_empty() {
            let set: Vec<mysql_async::Row> = result.collect().await.map_err(|e| {
                ExecutionError::DatabaseQueryFailed(format!("MySQL query failed: {}", e))
            })?;
            keep_first_rows(&mut rows, set);
        }

        tracing::info!("MySQL query returned {} rows", rows.len());

        let Some(first) = rows.first() else {
            return Ok(None);
        };

        let columns: Vec<String> = first
            .columns_ref()
            .iter()
            .map(|column| column.name_str().into_owned())
            .collect();

        let rendered = rows
            .iter()
            .map(|row| {
                (0..columns.len())
                    .map(|i| row.as_ref(i).map(render_value).unwrap_or_default())
                    .collect()
            })
            .collect();

        Ok(rendered_result_set(columns, rendered))
    }
}

/// Render a MySQL value as text; NULL becomes the empty string and
/// non-UTF-8 bytes are hex-encoded
fn render_value(value: &Value) -> String {
    match value {
        Value::NULL => String::new(),
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => hex::encode(bytes),
        },
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            if *micros == 0 {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                )
            } else {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
                    year, month, day, hour, minute, second, micros
                )
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u32::from(*hours) + days * 24;
            if *micros == 0 {
                format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
            } else {
                format!(
                    "{}{:02}:{:02}:{:02}.{:06}",
                    sign, hours, minutes, seconds, micros
                )
            }
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    fn kind(&self) -> DbKind {
        DbKind::MySql
    }

    #[tracing::instrument(skip(self, connection_string, sql), fields(database_type = "mysql"))]
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::info!("Connecting to MySQL database");

        let opts = mysql_async::Opts::from_url(connection_string).map_err(|e| {
            ExecutionError::DatabaseConnectionFailed(format!(
                "Invalid MySQL connection string: {}",
                e
            ))
        })?;

        let mut conn =
            connect_with_timeout("MySQL", self.timeout, mysql_async::Conn::new(opts)).await?;

        let result = self.execute_raw_sql(&mut conn, sql).await;

        if let Err(e) = conn.disconnect().await {
            tracing::warn!(error = %e, "Failed to disconnect from MySQL");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_scalar_values() {
        assert_eq!(render_value(&Value::NULL), "");
        assert_eq!(render_value(&Value::Bytes(b"alice".to_vec())), "alice");
        assert_eq!(render_value(&Value::Bytes(vec![0xff, 0x00])), "ff00");
        assert_eq!(render_value(&Value::Int(-7)), "-7");
        assert_eq!(render_value(&Value::UInt(7)), "7");
        assert_eq!(render_value(&Value::Double(1.5)), "1.5");
    }

    #[test]
    fn test_render_temporal_values() {
        assert_eq!(
            render_value(&Value::Date(2024, 3, 9, 14, 5, 0, 0)),
            "2024-03-09 14:05:00"
        );
        assert_eq!(
            render_value(&Value::Time(true, 1, 2, 3, 4, 500)),
            "-26:03:04.000500"
        );
    }

    #[tokio::test]
    async fn test_invalid_connection_string() {
        let connector = MySqlConnector::new(Duration::from_secs(5));
        let result = connector.query("not a url", "SELECT 1").await;
        assert!(matches!(
            result,
            Err(ExecutionError::DatabaseConnectionFailed(_))
        ));
    }
}
