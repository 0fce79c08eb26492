//! Apply planning: choosing which builder handles a row change.

use serde::{Deserialize, Serialize};

use crate::context::{MergedStatementContext, StatementContext};
use crate::dml::{
    build_delete, build_delete_then_insert, build_merged_delete, build_merged_insert,
    build_merged_upsert, build_update, build_upsert, InsertMode,
};
use crate::error::BuildError;
use crate::schema::TableSchema;
use crate::types::{DmlAction, RowChangeSet};

/// How row changes are expressed on the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyPolicy {
    /// One statement per row; inserts become upserts.
    #[default]
    PerRow,
    /// Inserts become DELETE + INSERT pairs, for destinations without upsert.
    DeleteThenInsert,
    /// Inserts and deletes are merged into one statement each; the insert
    /// verb is chosen by the mode.
    Merge(InsertMode),
    /// Inserts are merged into one `REPLACE`; deletes are merged.
    MergeUpsert,
}

/// Statements produced for one row change.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyPlan {
    /// Executed in order, atomically when there is more than one.
    Statements(Vec<StatementContext>),
    /// A single statement spanning every row.
    Merged(MergedStatementContext),
}

impl ApplyPlan {
    /// Number of statements the plan executes.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        match self {
            ApplyPlan::Statements(stmts) => stmts.len(),
            ApplyPlan::Merged(_) => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statement_count() == 0
    }
}

/// Converts `change` into statements against `schema` under `policy`.
///
/// Updates are always applied row by row. An empty change yields an empty
/// plan. Deletes on a table without identity columns fail under every
/// policy, merged or not.
///
/// # Errors
///
/// Propagates the builder's [`BuildError`].
pub fn plan_row_change(
    change: &RowChangeSet,
    schema: &TableSchema,
    policy: ApplyPolicy,
) -> Result<ApplyPlan, BuildError> {
    if change.row_count() == 0 {
        return Ok(ApplyPlan::Statements(Vec::new()));
    }

    let plan = match (change.action, policy) {
        (DmlAction::Insert, ApplyPolicy::PerRow) => ApplyPlan::Statements(build_upsert(change, schema)?),
        (DmlAction::Insert, ApplyPolicy::DeleteThenInsert) => {
            ApplyPlan::Statements(build_delete_then_insert(change, schema)?)
        }
        (DmlAction::Insert, ApplyPolicy::Merge(mode)) => {
            ApplyPlan::Merged(build_merged_insert(change, schema, mode)?)
        }
        (DmlAction::Insert, ApplyPolicy::MergeUpsert) => {
            ApplyPlan::Merged(build_merged_upsert(change, schema)?)
        }
        (DmlAction::Update, _) => ApplyPlan::Statements(build_update(change, schema)?),
        (DmlAction::Delete, ApplyPolicy::PerRow | ApplyPolicy::DeleteThenInsert) => {
            ApplyPlan::Statements(build_delete(change, schema)?)
        }
        (DmlAction::Delete, ApplyPolicy::Merge(_) | ApplyPolicy::MergeUpsert) => {
            ApplyPlan::Merged(build_merged_delete(change, schema)?)
        }
    };
    Ok(plan)
}
