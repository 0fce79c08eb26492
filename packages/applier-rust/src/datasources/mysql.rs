//! `MySQL` / `PolarDB-X` [`DataSource`] backed by a `sqlx` pool.
//!
//! Statements with parameters go through the binary (prepared) protocol.
//! Parameterless statements, which include DDL, `USE` and transaction
//! control, go through the text protocol since several of them cannot be
//! prepared.

use async_trait::async_trait;
use rpl_apply_core::SqlValue;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Column, Executor, MySql, Row};

use crate::config::ApplierConfig;
use crate::traits::{DataSource, DbConnection, TextRow};

/// Pooled `MySQL` connections.
#[derive(Debug, Clone)]
pub struct MySqlDataSource {
    pool: MySqlPool,
}

impl MySqlDataSource {
    /// Opens a pool sized and timed by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(config: &ApplierConfig) -> anyhow::Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.database_url)
            .await?;
        tracing::info!(max_connections = config.max_connections, "destination pool ready");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataSource for MySqlDataSource {
    async fn acquire(&self) -> anyhow::Result<Box<dyn DbConnection>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(MySqlConnection {
            conn: Some(conn),
            auto_commit: true,
        }))
    }
}

struct MySqlConnection {
    conn: Option<PoolConnection<MySql>>,
    auto_commit: bool,
}

impl MySqlConnection {
    fn conn(&mut self) -> anyhow::Result<&mut PoolConnection<MySql>> {
        self.conn
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("connection already released"))
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::UInt(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Decimal(v) | SqlValue::String(v) => query.bind(v.clone()),
        SqlValue::Bytes(v) => query.bind(v.clone()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
    }
}

fn text_row(row: &MySqlRow) -> TextRow {
    let columns = row
        .columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            // Status listings mix text and binary-collated columns.
            let value = row
                .try_get::<Option<String>, _>(index)
                .or_else(|_| {
                    row.try_get::<Option<Vec<u8>>, _>(index)
                        .map(|bytes| bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
                })
                .ok()
                .flatten();
            (column.name().to_string(), value)
        })
        .collect();
    TextRow::new(columns)
}

#[async_trait]
impl DbConnection for MySqlConnection {
    async fn set_auto_commit(&mut self, auto_commit: bool) -> anyhow::Result<()> {
        let sql = if auto_commit {
            "SET autocommit=1"
        } else {
            "SET autocommit=0"
        };
        if !auto_commit {
            // The session counts as dirty even if the statement is cut short.
            self.auto_commit = false;
        }
        let conn = self.conn()?;
        (&mut **conn).execute(sql).await?;
        self.auto_commit = auto_commit;
        Ok(())
    }

    async fn execute_update(&mut self, sql: &str, params: &[SqlValue]) -> anyhow::Result<u64> {
        let conn = self.conn()?;
        let result = if params.is_empty() {
            (&mut **conn).execute(sql).await?
        } else {
            params
                .iter()
                .fold(sqlx::query(sql), bind_value)
                .execute(&mut **conn)
                .await?
        };
        Ok(result.rows_affected())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        (&mut **conn).execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        (&mut **conn).execute("ROLLBACK").await?;
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> anyhow::Result<Vec<TextRow>> {
        let conn = self.conn()?;
        let rows = (&mut **conn).fetch_all(sql).await?;
        Ok(rows.iter().map(text_row).collect())
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        if self.conn.is_none() {
            return Ok(());
        }
        if !self.auto_commit {
            for sql in ["ROLLBACK", "SET autocommit=1"] {
                let conn = self.conn()?;
                let result = (&mut **conn).execute(sql).await;
                if let Err(err) = result {
                    if let Some(conn) = self.conn.take() {
                        drop(conn.detach());
                    }
                    return Err(err.into());
                }
            }
            self.auto_commit = true;
        }
        drop(self.conn.take());
        Ok(())
    }
}

impl Drop for MySqlConnection {
    /// A connection dropped before a completed release may still hold an open
    /// transaction; it is closed instead of going back to the pool.
    fn drop(&mut self) {
        if self.auto_commit {
            return;
        }
        if let Some(conn) = self.conn.take() {
            tracing::warn!("connection dropped inside a transaction, closing it");
            drop(conn.detach());
        }
    }
}
