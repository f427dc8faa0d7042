// SQL Server connector implementation over TDS

use super::{connect_with_timeout, keep_first_rows, rendered_result_set};
use crate::errors::ExecutionError;
use crate::executor::Connector;
use crate::models::{DbKind, ResultSet};
use async_trait::async_trait;
use tiberius::{Client, Config, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use std::time::Duration;

type SqlServerClient = Client<Compat<TcpStream>>;

/// SQL Server connector
pub struct SqlServerConnector {
    timeout: Duration,
}

impl SqlServerConnector {
    /// Create a new SQL Server connector
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn connect(config: Config) -> Result<SqlServerClient, String> {
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| e.to_string())?;
        tcp.set_nodelay(true).map_err(|e| e.to_string())?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| e.to_string())
    }

    /// Execute a batch over the simple query path, keeping the first result
    /// set that has rows
    #[tracing::instrument(skip(self, client, sql))]
    async fn execute_raw_sql(
        &self,
        client: &mut SqlServerClient,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::debug!("Executing raw SQL on SQL Server");

        let sets = client
            .simple_query(sql)
            .await
            .map_err(|e| {
                ExecutionError::DatabaseQueryFailed(format!("SQL Server query failed: {}", e))
            })?
            .into_results()
            .await
            .map_err(|e| {
                ExecutionError::DatabaseQueryFailed(format!("Failed to fetch SQL Server rows: {}", e))
            })?;

        let mut rows: Vec<Row> = Vec::new();
        for set in sets {
            keep_first_rows(&mut rows, set);
        }

        tracing::info!("SQL Server query returned {} rows", rows.len());

        let Some(first) = rows.first() else {
            return Ok(None);
        };

        let columns: Vec<String> = first
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let rendered = rows
            .iter()
            .map(|row| (0..columns.len()).map(|i| render_cell(row, i)).collect())
            .collect();

        Ok(rendered_result_set(columns, rendered))
    }
}

/// Try each listed type in turn; the first one that matches the column's
/// wire type renders the value, and a typed NULL renders as ""
macro_rules! render_as {
    ($row:expr, $idx:expr, $($ty:ty),+ $(,)?) => {
        $(
            match $row.try_get::<$ty, usize>($idx) {
                Ok(Some(value)) => return value.to_string(),
                Ok(None) => return String::new(),
                Err(_) => {}
            }
        )+
    };
}

fn render_cell(row: &Row, idx: usize) -> String {
    render_as!(
        row,
        idx,
        &str,
        i64,
        i32,
        i16,
        u8,
        f64,
        f32,
        bool,
        tiberius::numeric::Numeric,
        tiberius::Uuid,
        chrono::NaiveDateTime,
        chrono::DateTime<chrono::FixedOffset>,
        chrono::NaiveDate,
        chrono::NaiveTime,
    );

    match row.try_get::<&[u8], usize>(idx) {
        Ok(Some(bytes)) => hex::encode(bytes),
        _ => String::new(),
    }
}

#[async_trait]
impl Connector for SqlServerConnector {
    fn kind(&self) -> DbKind {
        DbKind::SqlServer
    }

    #[tracing::instrument(skip(self, connection_string, sql), fields(database_type = "sqlserver"))]
    async fn query(
        &self,
        connection_string: &str,
        sql: &str,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        tracing::info!("Connecting to SQL Server database");

        let config = Config::from_ado_string(connection_string).map_err(|e| {
            ExecutionError::DatabaseConnectionFailed(format!(
                "Invalid SQL Server connection string: {}",
                e
            ))
        })?;

        let mut client =
            connect_with_timeout("SQL Server", self.timeout, Self::connect(config)).await?;

        let result = self.execute_raw_sql(&mut client, sql).await;

        if let Err(e) = client.close().await {
            tracing::warn!(error = %e, "Failed to close SQL Server connection");
        }

        result
    }
}
