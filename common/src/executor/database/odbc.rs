// ODBC connector implementation, used for Access and Teradata
// The ODBC driver manager is blocking, so each call runs on tokio's blocking pool

use crate::errors::ExecutionError;
use crate::executor::Connector;
use crate::models::{DbKind, ResultSet};
use async_trait::async_trait;
use std::time::Duration;

/// Rows fetched per round trip
#[cfg(feature = "odbc")]
const BATCH_SIZE: usize = 1000;

/// Upper bound for a single text value, in bytes
#[cfg(feature = "odbc")]
const MAX_TEXT_LEN: usize = 64 * 1024;

/// Connector for backends reached through an ODBC driver
pub struct OdbcConnector {
    kind: DbKind,
    timeout: Duration,
}

impl OdbcConnector {
    /// Create a new ODBC connector for `kind`
    pub fn new(kind: DbKind, timeout: Duration) -> Self {
        Self { kind, timeout }
    }
}

#[cfg(feature = "odbc")]
fn execute_blocking(
    connection_string: &str,
    sql: &str,
    timeout: Duration,
) -> Result<Option<ResultSet>, ExecutionError> {
    use odbc_api::buffers::TextRowSet;
    use odbc_api::{ConnectionOptions, Cursor, Environment, ResultSetMetadata};

    let env = Environment::new().map_err(|e| {
        ExecutionError::DatabaseConnectionFailed(format!(
            "Failed to initialize ODBC environment: {}",
            e
        ))
    })?;

    let options = ConnectionOptions {
        login_timeout_sec: Some(timeout.as_secs().try_into().unwrap_or(u32::MAX)),
        ..ConnectionOptions::default()
    };

    let conn = env
        .connect_with_connection_string(connection_string, options)
        .map_err(|e| {
            ExecutionError::DatabaseConnectionFailed(format!("Failed to connect via ODBC: {}", e))
        })?;

    tracing::debug!("Executing raw SQL over ODBC");

    let query_failed =
        |e: odbc_api::Error| ExecutionError::DatabaseQueryFailed(format!("ODBC query failed: {}", e));

    let Some(mut cursor) = conn.execute(sql, ()).map_err(query_failed)? else {
        return Ok(None);
    };

    let columns: Vec<String> = cursor
        .column_names()
        .map_err(query_failed)?
        .collect::<Result<_, _>>()
        .map_err(query_failed)?;

    let buffer = TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(MAX_TEXT_LEN))
        .map_err(query_failed)?;
    let mut row_set_cursor = cursor.bind_buffer(buffer).map_err(query_failed)?;

    let mut rendered = Vec::new();
    while let Some(batch) = row_set_cursor.fetch().map_err(query_failed)? {
        for row in 0..batch.num_rows() {
            let values = (0..batch.num_cols())
                .map(|col| {
                    batch
                        .at(col, row)
                        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                        .unwrap_or_default()
                })
                .collect();
            rendered.push(values);
        }
    }

    tracing::info!("ODBC query returned {} rows", rendered.len());

    Ok(super::rendered_result_set(columns, rendered))
}

#[cfg(not(feature = "odbc"))]
fn execute_blocking(
    _connection_string: &str,
    _sql: &str,
    _timeout: Duration,
) -> Result<Option<ResultSet>, ExecutionError> {
    Err(ExecutionError::BackendUnavailable(
        "built without the `odbc` feature".to_string(),
    ))
}

#[async_trait]
impl Connector for OdbcConnector {
    fn kind(&self) -> DbKind {
        self.kind
    }

    #[tracing::instrument(skip(self, connection_string, sql), fields(database_type = %self.kind))]
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::info!("Connecting to {} database via ODBC", self.kind);

        let connection_string = connection_string.to_string();
        let sql = sql.to_string();
        let timeout = self.timeout;
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            execute_blocking(&connection_string, &sql, timeout)
        })
        .await
        .map_err(|e| ExecutionError::DatabaseQueryFailed(format!("ODBC worker failed: {}", e)))?
    }
}
