//! In-memory [`DataSource`] implementation.
//!
//! [`MemoryDataSource`] records executed statements instead of sending them
//! anywhere. Statements run with autocommit disabled are staged per
//! connection and only become visible on commit, so transactional behavior
//! can be observed. Failures can be injected per statement text, on acquire,
//! commit, rollback and status queries. A connection dropped without being
//! released discards its staged statements and is counted separately.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rpl_apply_core::SqlValue;

use crate::traits::{DataSource, DbConnection, TextRow};

/// A statement as it reached the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Default)]
struct MemoryState {
    committed: Vec<ExecutedStatement>,
    ddl_jobs: Vec<TextRow>,
    failing_patterns: Vec<String>,
    stalling_patterns: Vec<String>,
    fail_acquire: bool,
    fail_commit: bool,
    fail_rollback: bool,
    fail_query: bool,
    acquired: usize,
    released: usize,
    dropped: usize,
    rollbacks: usize,
}

/// Recording data source for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Any statement whose text contains `pattern` fails on execution.
    pub fn fail_statements_containing(&self, pattern: impl Into<String>) {
        self.state.lock().failing_patterns.push(pattern.into());
    }

    /// Any statement whose text contains `pattern` never completes.
    pub fn stall_statements_containing(&self, pattern: impl Into<String>) {
        self.state.lock().stalling_patterns.push(pattern.into());
    }

    pub fn fail_acquire(&self, fail: bool) {
        self.state.lock().fail_acquire = fail;
    }

    pub fn fail_commit(&self, fail: bool) {
        self.state.lock().fail_commit = fail;
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.state.lock().fail_rollback = fail;
    }

    pub fn fail_status_query(&self, fail: bool) {
        self.state.lock().fail_query = fail;
    }

    /// Rows returned by every subsequent query.
    pub fn set_ddl_jobs(&self, jobs: Vec<TextRow>) {
        self.state.lock().ddl_jobs = jobs;
    }

    /// Statements made durable so far, in execution order.
    #[must_use]
    pub fn committed(&self) -> Vec<ExecutedStatement> {
        self.state.lock().committed.clone()
    }

    #[must_use]
    pub fn acquired_count(&self) -> usize {
        self.state.lock().acquired
    }

    #[must_use]
    pub fn released_count(&self) -> usize {
        self.state.lock().released
    }

    /// Connections dropped without a release, e.g. by a cancelled call.
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.state.lock().dropped
    }

    #[must_use]
    pub fn rollback_count(&self) -> usize {
        self.state.lock().rollbacks
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn acquire(&self) -> anyhow::Result<Box<dyn DbConnection>> {
        let mut state = self.state.lock();
        if state.fail_acquire {
            anyhow::bail!("connection refused");
        }
        state.acquired += 1;
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
            auto_commit: true,
            pending: Vec::new(),
            released: false,
        }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    auto_commit: bool,
    pending: Vec<ExecutedStatement>,
    released: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> anyhow::Result<()> {
        if self.released {
            anyhow::bail!("connection already released");
        }
        Ok(())
    }
}

#[async_trait]
impl DbConnection for MemoryConnection {
    async fn set_auto_commit(&mut self, auto_commit: bool) -> anyhow::Result<()> {
        self.ensure_open()?;
        if auto_commit && !self.auto_commit {
            // Enabling autocommit commits the open transaction, as MySQL does.
            let pending = std::mem::take(&mut self.pending);
            self.state.lock().committed.extend(pending);
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    async fn execute_update(&mut self, sql: &str, params: &[SqlValue]) -> anyhow::Result<u64> {
        self.ensure_open()?;
        let stalls = {
            let state = self.state.lock();
            state.stalling_patterns.iter().any(|p| sql.contains(p.as_str()))
        };
        if stalls {
            std::future::pending::<()>().await;
        }
        let mut state = self.state.lock();
        if let Some(pattern) = state.failing_patterns.iter().find(|p| sql.contains(p.as_str())) {
            anyhow::bail!("injected failure on `{pattern}`");
        }
        let executed = ExecutedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        };
        if self.auto_commit {
            state.committed.push(executed);
        } else {
            self.pending.push(executed);
        }
        Ok(1)
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        if state.fail_commit {
            anyhow::bail!("commit failed");
        }
        state.committed.append(&mut self.pending);
        Ok(())
    }

    async fn rollback(&mut self) -> anyhow::Result<()> {
        self.ensure_open()?;
        self.pending.clear();
        let mut state = self.state.lock();
        state.rollbacks += 1;
        if state.fail_rollback {
            anyhow::bail!("rollback failed");
        }
        Ok(())
    }

    async fn query(&mut self, _sql: &str) -> anyhow::Result<Vec<TextRow>> {
        self.ensure_open()?;
        let state = self.state.lock();
        if state.fail_query {
            anyhow::bail!("status query failed");
        }
        Ok(state.ddl_jobs.clone())
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.pending.clear();
        self.auto_commit = true;
        self.state.lock().released += 1;
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.pending.clear();
        self.state.lock().dropped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn autocommit_statements_are_visible_immediately() {
        let ds = MemoryDataSource::new();
        let mut conn = ds.acquire().await.unwrap();
        conn.execute_update("INSERT 1", &[SqlValue::Int(1)]).await.unwrap();
        assert_eq!(ds.committed().len(), 1);
        assert_eq!(ds.committed()[0].params, vec![SqlValue::Int(1)]);
        conn.release().await.unwrap();
        assert_eq!(ds.released_count(), 1);
    }

    #[tokio::test]
    async fn transaction_is_staged_until_commit() {
        let ds = MemoryDataSource::new();
        let mut conn = ds.acquire().await.unwrap();
        conn.set_auto_commit(false).await.unwrap();
        conn.execute_update("INSERT 1", &[]).await.unwrap();
        assert!(ds.committed().is_empty());
        conn.commit().await.unwrap();
        assert_eq!(ds.committed().len(), 1);
        conn.release().await.unwrap();
    }

    #[tokio::test]
    async fn release_discards_uncommitted_work() {
        let ds = MemoryDataSource::new();
        let mut conn = ds.acquire().await.unwrap();
        conn.set_auto_commit(false).await.unwrap();
        conn.execute_update("INSERT 1", &[]).await.unwrap();
        conn.release().await.unwrap();
        conn.release().await.unwrap();
        assert!(ds.committed().is_empty());
        assert_eq!(ds.released_count(), 1);
        assert!(conn.execute_update("INSERT 2", &[]).await.is_err());
    }

    #[tokio::test]
    async fn injected_failures() {
        let ds = MemoryDataSource::new();
        ds.fail_statements_containing("DELETE");
        let mut conn = ds.acquire().await.unwrap();
        assert!(conn.execute_update("DELETE FROM t", &[]).await.is_err());
        assert!(conn.execute_update("INSERT INTO t", &[]).await.is_ok());
        conn.release().await.unwrap();

        ds.fail_acquire(true);
        assert!(ds.acquire().await.is_err());
        assert_eq!(ds.acquired_count(), 1);
    }

    #[tokio::test]
    async fn dropped_connection_discards_staged_work() {
        let ds = MemoryDataSource::new();
        let mut conn = ds.acquire().await.unwrap();
        conn.set_auto_commit(false).await.unwrap();
        conn.execute_update("INSERT 1", &[]).await.unwrap();
        drop(conn);
        assert!(ds.committed().is_empty());
        assert_eq!(ds.dropped_count(), 1);
        assert_eq!(ds.released_count(), 0);

        let mut conn = ds.acquire().await.unwrap();
        conn.release().await.unwrap();
        drop(conn);
        assert_eq!(ds.dropped_count(), 1);
    }

    #[tokio::test]
    async fn query_returns_configured_jobs() {
        let ds = MemoryDataSource::new();
        ds.set_ddl_jobs(vec![TextRow::from_pairs([("STATE", "RUNNING")])]);
        let mut conn = ds.acquire().await.unwrap();
        let rows = conn.query("SHOW FULL DDL").await.unwrap();
        assert_eq!(rows.len(), 1);
        ds.fail_status_query(true);
        assert!(conn.query("SHOW FULL DDL").await.is_err());
        conn.release().await.unwrap();
    }
}
