//! Polls the destination for the state of asynchronously dispatched DDL.

use std::sync::Arc;

use rpl_apply_core::ddl::{DDL_STATE_COLUMN, DDL_STMT_COLUMN};
use rpl_apply_core::{resolve_outcome, DdlJob, DdlOutcome};
use tracing::{debug, error, warn};

use crate::config::ApplierConfig;
use crate::error::ApplyError;
use crate::traits::{DataSource, TextRow};

/// Looks up DDL jobs by the token they were dispatched with.
pub struct DdlStateTracker {
    data_source: Arc<dyn DataSource>,
    status_query: String,
}

impl DdlStateTracker {
    pub fn new(data_source: Arc<dyn DataSource>, config: &ApplierConfig) -> Self {
        Self {
            data_source,
            status_query: config.ddl_status_query.clone(),
        }
    }

    /// Current outcome of the DDL dispatched with `token`.
    ///
    /// # Errors
    ///
    /// [`ApplyError::StatusQuery`] if no connection could be acquired or the
    /// status listing could not be read.
    pub async fn query_state(&self, token: &str) -> Result<DdlOutcome, ApplyError> {
        let rows = self.list_jobs().await.map_err(|source| {
            error!(token, error = %format!("{source:#}"), "DDL state query failed");
            ApplyError::StatusQuery {
                token: token.to_string(),
                source,
            }
        })?;

        let jobs: Vec<DdlJob> = rows.iter().map(job_from_row).collect();
        let outcome = resolve_outcome(&jobs, token);
        debug!(token, jobs = jobs.len(), ?outcome, "DDL state resolved");
        Ok(outcome)
    }

    async fn list_jobs(&self) -> anyhow::Result<Vec<TextRow>> {
        let mut conn = self.data_source.acquire().await?;
        let result = conn.query(&self.status_query).await;
        if let Err(err) = conn.release().await {
            warn!(error = %format!("{err:#}"), "failed to release connection");
        }
        result
    }
}

fn job_from_row(row: &TextRow) -> DdlJob {
    DdlJob {
        statement: row.get(DDL_STMT_COLUMN).map(str::to_string),
        state: row.get(DDL_STATE_COLUMN).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasources::MemoryDataSource;

    fn tracker(ds: &MemoryDataSource) -> DdlStateTracker {
        DdlStateTracker::new(Arc::new(ds.clone()), &ApplierConfig::default())
    }

    #[tokio::test]
    async fn missing_job_has_succeeded() {
        let ds = MemoryDataSource::new();
        ds.set_ddl_jobs(vec![TextRow::from_pairs([
            ("DDL_STMT", "/*+TDDL:cmd_extra(TSO=1)*/ALTER TABLE a ADD x INT"),
            ("STATE", "RUNNING"),
        ])]);
        let outcome = tracker(&ds).query_state("2").await.unwrap();
        assert_eq!(outcome, DdlOutcome::Succeeded);
        assert_eq!(ds.acquired_count(), ds.released_count());
    }

    #[tokio::test]
    async fn listed_job_is_running() {
        let ds = MemoryDataSource::new();
        ds.set_ddl_jobs(vec![TextRow::from_pairs([
            ("DDL_STMT", "/*+TDDL:cmd_extra(TSO=42)*/ALTER TABLE a ADD x INT"),
            ("STATE", "RUNNING"),
        ])]);
        assert_eq!(tracker(&ds).query_state("42").await.unwrap(), DdlOutcome::Running);
    }

    #[tokio::test]
    async fn pending_job_has_failed() {
        let ds = MemoryDataSource::new();
        ds.set_ddl_jobs(vec![TextRow::from_pairs([
            (
                "ddl_stmt",
                "/*+TDDL:cmd_extra(PURE_ASYNC_DDL_MODE=TRUE,TSO=42)*/DROP TABLE a",
            ),
            ("state", "PENDING"),
        ])]);
        assert_eq!(tracker(&ds).query_state("42").await.unwrap(), DdlOutcome::Failed);
    }

    #[tokio::test]
    async fn null_state_reads_as_running() {
        let ds = MemoryDataSource::new();
        ds.set_ddl_jobs(vec![TextRow::new(vec![
            (
                "DDL_STMT".to_string(),
                Some("/*+TDDL:cmd_extra(TSO=5)*/TRUNCATE TABLE a".to_string()),
            ),
            ("STATE".to_string(), None),
        ])]);
        assert_eq!(tracker(&ds).query_state("5").await.unwrap(), DdlOutcome::Running);
    }

    #[tokio::test]
    async fn query_failure_carries_token() {
        let ds = MemoryDataSource::new();
        ds.fail_status_query(true);
        let err = tracker(&ds).query_state("77").await.unwrap_err();
        assert!(matches!(err, ApplyError::StatusQuery { ref token, .. } if token == "77"));
        assert_eq!(ds.acquired_count(), 1);
        assert_eq!(ds.released_count(), 1);
    }

    #[tokio::test]
    async fn acquire_failure_is_a_status_error() {
        let ds = MemoryDataSource::new();
        ds.fail_acquire(true);
        let err = tracker(&ds).query_state("1").await.unwrap_err();
        assert!(err.to_string().contains("token 1"));
    }
}
