use async_trait::async_trait;
use rpl_apply_core::SqlValue;

/// One result row with every column rendered as text.
///
/// Used for status listings such as `SHOW FULL DDL`, where the caller only
/// inspects string columns by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRow {
    columns: Vec<(String, Option<String>)>,
}

impl TextRow {
    #[must_use]
    pub fn new(columns: Vec<(String, Option<String>)>) -> Self {
        Self { columns }
    }

    /// Builds a row from non-null `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }

    /// Value of `column` (case-insensitive). `None` for NULL or a missing column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, value)| value.as_deref())
    }
}

/// Source of destination connections, typically a driver pool.
///
/// Used as `Arc<dyn DataSource>`.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Obtain a connection for exclusive use by one executor call.
    async fn acquire(&self) -> anyhow::Result<Box<dyn DbConnection>>;
}

/// A single destination connection.
///
/// Every connection handed out by [`DataSource::acquire`] must be passed to
/// [`release`](DbConnection::release) exactly once, on every exit path.
/// Implementations must also tolerate being dropped unreleased, as happens
/// when a call is cancelled: uncommitted work is discarded and a connection
/// with an open transaction is never handed out again.
#[async_trait]
pub trait DbConnection: Send {
    /// Toggle autocommit. Disabling it opens a transaction that lasts until
    /// [`commit`](DbConnection::commit) or [`rollback`](DbConnection::rollback).
    async fn set_auto_commit(&mut self, auto_commit: bool) -> anyhow::Result<()>;

    /// Bind `params` to the `?` placeholders of `sql` and execute it.
    /// Returns the affected row count.
    async fn execute_update(&mut self, sql: &str, params: &[SqlValue]) -> anyhow::Result<u64>;

    async fn commit(&mut self) -> anyhow::Result<()>;

    async fn rollback(&mut self) -> anyhow::Result<()>;

    /// Run a parameterless query and return its rows as text.
    async fn query(&mut self, sql: &str) -> anyhow::Result<Vec<TextRow>>;

    /// Return the connection to its source. Autocommit is restored if it was
    /// disabled; uncommitted work is discarded.
    async fn release(&mut self) -> anyhow::Result<()>;
}

/// External task-status store that keeps the last error per task.
pub trait TaskStatusSink: Send + Sync {
    fn record_last_error(&self, task_id: &str, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_row_lookup_ignores_case() {
        let row = TextRow::from_pairs([("DDL_STMT", "ALTER TABLE t"), ("STATE", "RUNNING")]);
        assert_eq!(row.get("ddl_stmt"), Some("ALTER TABLE t"));
        assert_eq!(row.get("STATE"), Some("RUNNING"));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn text_row_null_reads_as_none() {
        let row = TextRow::new(vec![("STATE".to_string(), None)]);
        assert_eq!(row.get("STATE"), None);
    }
}
