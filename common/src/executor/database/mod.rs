// Database connector module
// One file per backend driver

mod mysql;
mod odbc;
mod oracle;
mod postgresql;
mod sqlite;
mod sqlserver;

use crate::errors::ExecutionError;
use crate::models::ResultSet;
use futures::{Stream, TryStreamExt};
use std::future::Future;
use std::time::Duration;

pub use mysql::MySqlConnector;
pub use odbc::OdbcConnector;
pub use oracle::OracleConnector;
pub use postgresql::PostgreSqlConnector;
pub use sqlite::SqliteConnector;
pub use sqlserver::SqlServerConnector;

/// Bound connection establishment by `timeout`
pub(crate) async fn connect_with_timeout<T, E, F>(
    backend: &str,
    timeout: Duration,
    connect: F,
) -> Result<T, ExecutionError>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(ExecutionError::DatabaseConnectionFailed(format!(
            "Failed to connect to {}: {}",
            backend, e
        ))),
        Err(_) => Err(ExecutionError::DatabaseConnectionFailed(format!(
            "Timed out connecting to {} after {} seconds",
            backend,
            timeout.as_secs()
        ))),
    }
}

/// Assemble a result set from rows already rendered to text.
///
/// Statements that produce no rows yield `None`.
pub(crate) fn rendered_result_set(columns: Vec<String>, rows: Vec<Vec<String>>) -> Option<ResultSet> {
    if rows.is_empty() && columns.is_empty() {
        None
    } else {
        Some(ResultSet::new(columns, rows))
    }
}

/// Fold one result set of a multi-statement script into `kept`.
///
/// The first result set that has rows wins; later ones are discarded.
pub(crate) fn keep_first_rows<R>(kept: &mut Vec<R>, set: Vec<R>) {
    if kept.is_empty() {
        *kept = set;
    }
}

/// Drain a sqlx `fetch_many` stream, keeping the rows of the first
/// result set that has any.
///
/// The whole stream is consumed so that every statement of the script runs.
pub(crate) async fn first_result_set<Q, R, S>(mut stream: S) -> Result<Vec<R>, sqlx::Error>
where
    S: Stream<Item = Result<sqlx::Either<Q, R>, sqlx::Error>> + Unpin,
{
    let mut rows = Vec::new();
    let mut complete = false;

    while let Some(item) = stream.try_next().await? {
        match item {
            sqlx::Either::Left(_) => {
                if !rows.is_empty() {
                    complete = true;
                }
            }
            sqlx::Either::Right(row) if !complete => rows.push(row),
            sqlx::Either::Right(_) => {}
        }
    }

    Ok(rows)
}

/// Render sqlx rows as text.
///
/// Values are decoded without type checking so that every column type comes
/// back in the driver's textual form. Binary values that are not UTF-8 are
/// hex-encoded.
pub(crate) fn sqlx_result_set<R>(rows: Vec<R>) -> Result<Option<ResultSet>, ExecutionError>
where
    R: sqlx::Row,
    usize: sqlx::ColumnIndex<R>,
    for<'r> String: sqlx::Decode<'r, R::Database>,
    for<'r> Vec<u8>: sqlx::Decode<'r, R::Database>,
{
    use sqlx::Column;

    let Some(first) = rows.first() else {
        return Ok(None);
    };

    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    let mut rendered = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value = match row.try_get_unchecked::<Option<String>, _>(i) {
                Ok(text) => text.unwrap_or_default(),
                Err(_) => row
                    .try_get_unchecked::<Option<Vec<u8>>, _>(i)
                    .map_err(|e| {
                        ExecutionError::DatabaseQueryFailed(format!(
                            "Failed to read column '{}': {}",
                            columns[i], e
                        ))
                    })?
                    .map(hex::encode)
                    .unwrap_or_default(),
            };
            values.push(value);
        }
        rendered.push(values);
    }

    Ok(rendered_result_set(columns, rendered))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_result_set_without_columns_is_none() {
        assert!(rendered_result_set(Vec::new(), Vec::new()).is_none());
    }

    #[test]
    fn test_rendered_result_set_keeps_columns_without_rows() {
        let rs = rendered_result_set(vec!["id".to_string()], Vec::new()).unwrap();
        assert!(!rs.has_rows());
        assert_eq!(rs.columns(), ["id".to_string()]);
    }

    #[test]
    fn test_keep_first_rows_skips_empty_sets_and_ignores_later_ones() {
        let mut kept = Vec::new();
        for set in [vec![], vec!["a", "b"], vec![], vec!["c"]] {
            keep_first_rows(&mut kept, set);
        }
        assert_eq!(kept, vec!["a", "b"]);
    }

    #[test]
    fn test_keep_first_rows_all_empty_stays_empty() {
        let mut kept: Vec<&str> = Vec::new();
        keep_first_rows(&mut kept, Vec::new());
        keep_first_rows(&mut kept, Vec::new());
        assert!(kept.is_empty());
    }

    #[tokio::test]
    async fn test_first_result_set_skips_leading_and_trailing_statements() {
        let items: Vec<Result<sqlx::Either<(), &str>, sqlx::Error>> = vec![
            Ok(sqlx::Either::Left(())),
            Ok(sqlx::Either::Right("a")),
            Ok(sqlx::Either::Right("b")),
            Ok(sqlx::Either::Left(())),
            Ok(sqlx::Either::Right("c")),
            Ok(sqlx::Either::Left(())),
        ];

        let rows = first_result_set(futures::stream::iter(items)).await.unwrap();
        assert_eq!(rows, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_connect_timeout_is_connection_failure() {
        let result: Result<(), ExecutionError> = connect_with_timeout(
            "test",
            Duration::from_millis(10),
            futures::future::pending::<Result<(), String>>(),
        )
        .await;

        match result {
            Err(ExecutionError::DatabaseConnectionFailed(msg)) => assert!(msg.contains("Timed out")),
            other => panic!("Expected DatabaseConnectionFailed, got: {:?}", other),
        }
    }
}
