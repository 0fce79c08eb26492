//! DDL dispatch statements and asynchronous DDL outcome resolution.
//!
//! DDL against the distributed engine completes asynchronously. Each
//! dispatched statement carries a correlation token inside a hint comment;
//! completion is observed by listing in-flight DDL jobs and looking for the
//! token. A job that is no longer listed has finished.

use serde::{Deserialize, Serialize};

use crate::context::DdlStatementContext;

/// Status listing of in-flight DDL jobs.
pub const SHOW_FULL_DDL: &str = "SHOW FULL DDL";
/// Column of the status listing holding the job's statement text.
pub const DDL_STMT_COLUMN: &str = "DDL_STMT";
/// Column of the status listing holding the job's state.
pub const DDL_STATE_COLUMN: &str = "STATE";
/// State text marking a job the engine has not picked up.
pub const DDL_STATE_PENDING: &str = "PENDING";

/// DDL statement kinds carried by change-log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DdlAction {
    Create,
    Drop,
    Alter,
    Rename,
    Truncate,
    CreateIndex,
    DropIndex,
    CreateDatabase,
    DropDatabase,
}

impl DdlAction {
    /// Whether the statement acts on a database rather than on an object
    /// inside one.
    #[must_use]
    pub fn is_database_level(self) -> bool {
        matches!(self, DdlAction::CreateDatabase | DdlAction::DropDatabase)
    }
}

/// Hint flavour prefixed to table-level DDL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DdlHintMode {
    /// `/*+TDDL:cmd_extra(TSO=<token>)*/`
    #[default]
    Tso,
    /// `/*+TDDL:cmd_extra(PURE_ASYNC_DDL_MODE=TRUE,TSO=<token>)*/`: the
    /// engine acknowledges the statement before running it.
    PureAsync,
}

impl DdlHintMode {
    #[must_use]
    pub fn render(self, token: &str) -> String {
        match self {
            DdlHintMode::Tso => format!("/*+TDDL:cmd_extra(TSO={token})*/"),
            DdlHintMode::PureAsync => {
                format!("/*+TDDL:cmd_extra(PURE_ASYNC_DDL_MODE=TRUE,TSO={token})*/")
            }
        }
    }
}

/// Observed state of a dispatched DDL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DdlOutcome {
    /// Still listed as an in-flight job.
    Running,
    /// Listed as `PENDING`; treated as failed.
    Failed,
    /// No longer listed.
    Succeeded,
}

impl DdlOutcome {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, DdlOutcome::Running)
    }
}

/// Text that appears verbatim in the statement of a job dispatched with
/// `token`.
#[must_use]
pub fn token_marker(token: &str) -> String {
    format!("TSO={token})")
}

/// Builds the dispatch context for a DDL statement.
///
/// `statement` is the (already rewritten) DDL and `schema` the database it
/// applies to. Database-level statements run as-is with no schema; every
/// other kind is prefixed with a hint carrying `token`.
#[must_use]
pub fn build_ddl_context(
    statement: &str,
    schema: &str,
    action: DdlAction,
    token: &str,
    hint: DdlHintMode,
) -> DdlStatementContext {
    let (sql, schema) = match action {
        DdlAction::CreateDatabase | DdlAction::DropDatabase => {
            (statement.to_string(), String::new())
        }
        DdlAction::Create
        | DdlAction::Drop
        | DdlAction::Alter
        | DdlAction::Rename
        | DdlAction::Truncate
        | DdlAction::CreateIndex
        | DdlAction::DropIndex => (format!("{}{statement}", hint.render(token)), schema.to_string()),
    };
    DdlStatementContext {
        sql,
        schema,
        original_sql: statement.to_string(),
        token: token.to_string(),
    }
}

/// One row of the DDL status listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DdlJob {
    pub statement: Option<String>,
    pub state: Option<String>,
}

/// Maps a status listing to the outcome of the job dispatched with `token`.
///
/// The first job whose statement contains the token marker decides: a state
/// containing `PENDING` is [`DdlOutcome::Failed`], anything else is
/// [`DdlOutcome::Running`]. No matching job means [`DdlOutcome::Succeeded`].
pub fn resolve_outcome<'a, I>(jobs: I, token: &str) -> DdlOutcome
where
    I: IntoIterator<Item = &'a DdlJob>,
{
    let marker = token_marker(token);
    jobs.into_iter()
        .find(|job| {
            job.statement
                .as_deref()
                .is_some_and(|stmt| stmt.contains(&marker))
        })
        .map_or(DdlOutcome::Succeeded, |job| {
            if job
                .state
                .as_deref()
                .is_some_and(|state| state.contains(DDL_STATE_PENDING))
            {
                DdlOutcome::Failed
            } else {
                DdlOutcome::Running
            }
        })
}
