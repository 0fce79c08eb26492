//! Statement executor: runs built statements against the destination.
//!
//! Every public call acquires its own connection, releases it on every exit
//! path and resolves to a boolean outcome. A call that is cancelled drops its
//! connection instead, which discards any open transaction. Failures are logged with the
//! statement text and parameters and recorded as the task's last error;
//! nothing is retried here.

use std::sync::Arc;

use rpl_apply_core::escape::quote_identifier;
use rpl_apply_core::{
    build_ddl_context, format_params, plan_row_change, ApplyPlan, DdlAction, DdlStatementContext,
    RowChangeSet, Statement, StatementContext, TableSchema,
};
use tracing::{debug, error, info, warn};

use crate::config::ApplierConfig;
use crate::error::ApplyError;
use crate::status::ApplyContext;
use crate::traits::{DataSource, DbConnection};

const STATEMENTS_TOTAL: &str = "rpl_apply_statements_total";
const TRANSACTIONS_TOTAL: &str = "rpl_apply_transactions_total";

fn outcome_label(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

// ---------------------------------------------------------------------------
// StatementExecutor
// ---------------------------------------------------------------------------

/// Executes statements on connections drawn from a [`DataSource`].
///
/// Holds no per-call state, so one executor can be shared between tasks.
pub struct StatementExecutor {
    data_source: Arc<dyn DataSource>,
    config: Arc<ApplierConfig>,
}

impl StatementExecutor {
    pub fn new(data_source: Arc<dyn DataSource>, config: Arc<ApplierConfig>) -> Self {
        Self {
            data_source,
            config,
        }
    }

    /// Executes a single statement with autocommit on.
    pub async fn execute_one<S>(&self, ctx: &ApplyContext, stmt: &S) -> bool
    where
        S: Statement + Sync + ?Sized,
    {
        let result = match self.acquire().await {
            Ok(mut conn) => {
                let result = run_statement(ctx, conn.as_mut(), stmt).await;
                release(conn).await;
                result
            }
            Err(err) => Err(err),
        };

        let ok = result.is_ok();
        metrics::counter!(STATEMENTS_TOTAL, "outcome" => outcome_label(ok)).increment(1);
        if let Err(err) = result {
            fail(ctx, stmt.table(), &err);
        }
        ok
    }

    /// Executes `stmts` in order inside one transaction.
    ///
    /// Either every statement is committed or none is. On failure the
    /// transaction is rolled back; a failed rollback is logged but the
    /// recorded error stays the one that caused it.
    pub async fn execute_transactional(&self, ctx: &ApplyContext, stmts: &[StatementContext]) -> bool {
        let table = stmts.first().map_or("", |s| s.table.as_str());
        let result = match self.acquire().await {
            Ok(mut conn) => {
                let result = run_transaction(ctx, conn.as_mut(), stmts).await;
                if result.is_err() {
                    if let Err(err) = conn.rollback().await {
                        let err = ApplyError::Rollback(err);
                        error!(task_id = %ctx.task_id, table, error = %err, "rollback failed");
                    }
                }
                release(conn).await;
                result
            }
            Err(err) => Err(err),
        };

        let ok = result.is_ok();
        metrics::counter!(TRANSACTIONS_TOTAL, "outcome" => outcome_label(ok)).increment(1);
        if let Err(err) = result {
            fail(ctx, table, &err);
        }
        ok
    }

    /// Executes a plan: a lone or merged statement with autocommit, several
    /// statements as one transaction. An empty plan succeeds without
    /// touching the destination.
    pub async fn apply(&self, ctx: &ApplyContext, plan: &ApplyPlan) -> bool {
        match plan {
            ApplyPlan::Statements(stmts) => match stmts.as_slice() {
                [] => true,
                [stmt] => self.execute_one(ctx, stmt).await,
                _ => self.execute_transactional(ctx, stmts).await,
            },
            ApplyPlan::Merged(stmt) => self.execute_one(ctx, stmt).await,
        }
    }

    /// Plans `change` under the configured policy and applies it.
    pub async fn apply_row_change(
        &self,
        ctx: &ApplyContext,
        change: &RowChangeSet,
        schema: &TableSchema,
    ) -> bool {
        match plan_row_change(change, schema, self.config.apply_policy) {
            Ok(plan) => self.apply(ctx, &plan).await,
            Err(err) => {
                fail(ctx, &schema.name, &ApplyError::from(err));
                false
            }
        }
    }

    /// Sends a DDL statement. Schema-scoped statements are preceded by a
    /// `USE` on the same connection.
    pub async fn dispatch_ddl(&self, ctx: &ApplyContext, ddl: &DdlStatementContext) -> bool {
        info!(task_id = %ctx.task_id, schema = %ddl.schema, token = %ddl.token, "dispatching DDL");
        let result = match self.acquire().await {
            Ok(mut conn) => {
                let result = run_ddl(ctx, conn.as_mut(), ddl).await;
                release(conn).await;
                result
            }
            Err(err) => Err(err),
        };

        let ok = result.is_ok();
        metrics::counter!(STATEMENTS_TOTAL, "outcome" => outcome_label(ok)).increment(1);
        if let Err(err) = result {
            fail(ctx, &ddl.schema, &err);
        }
        ok
    }

    /// Builds the dispatch context for `statement` with the configured hint
    /// and sends it.
    pub async fn apply_ddl(
        &self,
        ctx: &ApplyContext,
        statement: &str,
        schema: &str,
        action: DdlAction,
        token: &str,
    ) -> bool {
        let ddl = build_ddl_context(statement, schema, action, token, self.config.ddl_hint);
        self.dispatch_ddl(ctx, &ddl).await
    }

    async fn acquire(&self) -> Result<Box<dyn DbConnection>, ApplyError> {
        self.data_source.acquire().await.map_err(ApplyError::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Connection helpers
// ---------------------------------------------------------------------------

async fn run_statement<S>(
    ctx: &ApplyContext,
    conn: &mut dyn DbConnection,
    stmt: &S,
) -> Result<(), ApplyError>
where
    S: Statement + Sync + ?Sized,
{
    debug!(
        task_id = %ctx.task_id,
        sql = stmt.sql(),
        params = %format_params(stmt.params()),
        "executing"
    );
    match conn.execute_update(stmt.sql(), stmt.params()).await {
        Ok(_) => Ok(()),
        Err(source) => {
            error!(
                task_id = %ctx.task_id,
                table = stmt.table(),
                sql = stmt.sql(),
                params = %format_params(stmt.params()),
                "statement failed"
            );
            Err(ApplyError::Execute {
                sql: stmt.sql().to_string(),
                source,
            })
        }
    }
}

async fn run_transaction(
    ctx: &ApplyContext,
    conn: &mut dyn DbConnection,
    stmts: &[StatementContext],
) -> Result<(), ApplyError> {
    conn.set_auto_commit(false)
        .await
        .map_err(ApplyError::AutoCommit)?;
    for stmt in stmts {
        run_statement(ctx, conn, stmt).await?;
    }
    conn.commit().await.map_err(ApplyError::Commit)
}

async fn run_ddl(
    ctx: &ApplyContext,
    conn: &mut dyn DbConnection,
    ddl: &DdlStatementContext,
) -> Result<(), ApplyError> {
    if !ddl.schema.is_empty() {
        let use_schema = StatementContext::new(
            format!("USE {}", quote_identifier(&ddl.schema)),
            ddl.schema.clone(),
            Vec::new(),
        );
        run_statement(ctx, conn, &use_schema).await?;
    }
    run_statement(ctx, conn, ddl).await
}

async fn release(mut conn: Box<dyn DbConnection>) {
    if let Err(err) = conn.release().await {
        warn!(error = %format!("{err:#}"), "failed to release connection");
    }
}

fn fail(ctx: &ApplyContext, table: &str, err: &ApplyError) {
    let message = err.to_string();
    error!(task_id = %ctx.task_id, table, error = %message, "apply failed");
    ctx.record_error(&message);
}
