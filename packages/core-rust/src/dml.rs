//! DML statement synthesis.
//!
//! Every builder turns a [`RowChangeSet`] plus the destination [`TableSchema`]
//! into parameterized SQL. Identifiers are quoted and inlined, values are
//! always bound. The implicit row identifier column is dropped from every
//! column list, SET list, predicate and parameter list before any text is
//! assembled.

use serde::{Deserialize, Serialize};

use crate::context::{MergedStatementContext, StatementContext};
use crate::error::BuildError;
use crate::escape::{is_implicit_row_id, qualified_table, quote_identifier};
use crate::identity::where_columns;
use crate::schema::TableSchema;
use crate::types::{RowChangeSet, SqlValue};

/// SQL verb used by [`build_merged_insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsertMode {
    /// `INSERT INTO`: duplicates fail the statement.
    Simple,
    /// `INSERT IGNORE INTO`: duplicate rows are skipped.
    Ignore,
    /// `REPLACE INTO`: duplicate rows are overwritten.
    Replace,
}

impl InsertMode {
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            InsertMode::Simple => "INSERT INTO",
            InsertMode::Ignore => "INSERT IGNORE INTO",
            InsertMode::Replace => "REPLACE INTO",
        }
    }
}

// ---------------------------------------------------------------------------
// Per-row families
// ---------------------------------------------------------------------------

/// `INSERT .. ON DUPLICATE KEY UPDATE` for every row.
///
/// The parameter list is the row's values followed by the same values again,
/// one copy for the VALUES clause and one for the update clause.
///
/// # Errors
///
/// [`BuildError::NoColumns`] if no replicable column remains.
pub fn build_upsert(
    change: &RowChangeSet,
    schema: &TableSchema,
) -> Result<Vec<StatementContext>, BuildError> {
    let columns = insert_columns(change, schema)?;
    let names = column_list(&columns);
    let values = placeholders(columns.len());
    let updates = assignments(&columns);
    let sql = format!(
        "INSERT INTO {}({names}) VALUES ({values}) ON DUPLICATE KEY UPDATE {updates}",
        qualified_table(&schema.schema, &schema.name),
    );

    Ok((0..change.row_count())
        .map(|row| {
            let mut params = row_values(change, row, &columns);
            params.extend_from_within(..);
            StatementContext::new(sql.clone(), schema.name.clone(), params)
        })
        .collect())
}

/// A DELETE by identity followed by a plain INSERT, for every row.
///
/// The DELETE is emitted only when the table has at least one identity
/// column; the INSERT is always emitted.
///
/// # Errors
///
/// [`BuildError::NoColumns`] if no replicable column remains.
pub fn build_delete_then_insert(
    change: &RowChangeSet,
    schema: &TableSchema,
) -> Result<Vec<StatementContext>, BuildError> {
    let columns = insert_columns(change, schema)?;
    let identity = identity_columns(schema);
    let table = qualified_table(&schema.schema, &schema.name);
    let insert_sql = format!(
        "INSERT INTO {table}({}) VALUES ({})",
        column_list(&columns),
        placeholders(columns.len()),
    );

    let mut contexts = Vec::with_capacity(change.row_count() * 2);
    for row in 0..change.row_count() {
        if !identity.is_empty() {
            let (predicate, params) = where_predicate(change, row, &identity);
            contexts.push(StatementContext::new(
                format!("DELETE FROM {table} WHERE {predicate}"),
                schema.name.clone(),
                params,
            ));
        }
        contexts.push(StatementContext::new(
            insert_sql.clone(),
            schema.name.clone(),
            row_values(change, row, &columns),
        ));
    }
    Ok(contexts)
}

/// `DELETE .. WHERE <identity predicate>` for every row.
///
/// # Errors
///
/// [`BuildError::NoIdentityColumns`] if the table cannot be addressed.
pub fn build_delete(
    change: &RowChangeSet,
    schema: &TableSchema,
) -> Result<Vec<StatementContext>, BuildError> {
    let identity = required_identity(schema)?;
    let table = qualified_table(&schema.schema, &schema.name);

    Ok((0..change.row_count())
        .map(|row| {
            let (predicate, params) = where_predicate(change, row, &identity);
            StatementContext::new(
                format!("DELETE FROM {table} WHERE {predicate}"),
                schema.name.clone(),
                params,
            )
        })
        .collect())
}

/// `UPDATE .. SET <changed columns> WHERE <identity predicate>` for every row.
///
/// The SET list holds only the columns that changed in that row, in column
/// order; the predicate is matched against the row's current values. Rows
/// with nothing to set produce no statement.
///
/// # Errors
///
/// [`BuildError::NoIdentityColumns`] if the table cannot be addressed.
pub fn build_update(
    change: &RowChangeSet,
    schema: &TableSchema,
) -> Result<Vec<StatementContext>, BuildError> {
    let identity = required_identity(schema)?;
    let table = qualified_table(&schema.schema, &schema.name);

    let mut contexts = Vec::with_capacity(change.row_count());
    for row in 0..change.row_count() {
        let mut set_columns = Vec::new();
        let mut params = Vec::new();
        for column in replicable_columns(change) {
            if let Some(value) = change.change_value(row, column) {
                set_columns.push(column);
                params.push(value.clone());
            }
        }
        if set_columns.is_empty() {
            tracing::debug!(table = %schema.name, row, "update row has no changed columns, skipped");
            continue;
        }

        let (predicate, where_params) = where_predicate(change, row, &identity);
        params.extend(where_params);
        contexts.push(StatementContext::new(
            format!(
                "UPDATE {table} SET {} WHERE {predicate}",
                assignments(&set_columns)
            ),
            schema.name.clone(),
            params,
        ));
    }
    Ok(contexts)
}

/// `SELECT * .. WHERE <identity predicate>` for every row, used to look a
/// replicated row up on the destination.
///
/// # Errors
///
/// [`BuildError::NoIdentityColumns`] if the table cannot be addressed.
pub fn build_select(
    change: &RowChangeSet,
    schema: &TableSchema,
) -> Result<Vec<StatementContext>, BuildError> {
    let identity = required_identity(schema)?;
    let table = qualified_table(&schema.schema, &schema.name);

    Ok((0..change.row_count())
        .map(|row| {
            let (predicate, params) = where_predicate(change, row, &identity);
            StatementContext::new(
                format!("SELECT * FROM {table} WHERE {predicate}"),
                schema.name.clone(),
                params,
            )
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Merged families
// ---------------------------------------------------------------------------

/// One `REPLACE INTO .. VALUES (..),(..)` covering every row.
///
/// # Errors
///
/// [`BuildError::NoRows`] for an empty change, [`BuildError::NoColumns`] if
/// no replicable column remains.
pub fn build_merged_upsert(
    change: &RowChangeSet,
    schema: &TableSchema,
) -> Result<MergedStatementContext, BuildError> {
    build_merged_insert(change, schema, InsertMode::Replace)
}

/// One multi-row insert whose verb is chosen by `mode`.
///
/// The column list is shared by all rows; parameters are flattened row by
/// row in input order.
///
/// # Errors
///
/// [`BuildError::NoRows`] for an empty change, [`BuildError::NoColumns`] if
/// no replicable column remains.
pub fn build_merged_insert(
    change: &RowChangeSet,
    schema: &TableSchema,
    mode: InsertMode,
) -> Result<MergedStatementContext, BuildError> {
    require_rows(change, schema)?;
    let columns = insert_columns(change, schema)?;
    let row_placeholders = format!("({})", placeholders(columns.len()));

    let mut params = Vec::with_capacity(columns.len() * change.row_count());
    for row in 0..change.row_count() {
        params.extend(row_values(change, row, &columns));
    }
    let values = vec![row_placeholders.as_str(); change.row_count()].join(",");

    Ok(MergedStatementContext {
        sql: format!(
            "{} {}({}) VALUES {values}",
            mode.verb(),
            qualified_table(&schema.schema, &schema.name),
            column_list(&columns),
        ),
        params,
        table: schema.name.clone(),
        row_count: change.row_count(),
    })
}

/// One `DELETE .. WHERE (k1,k2) in ((?,?),(?,?))` covering every row.
///
/// NULL identity values are bound inside their tuple like any other value.
/// Since a tuple holding NULL never compares equal, such a row is left in
/// place and the statement still succeeds. Per-row [`build_delete`] uses
/// `IS NULL` and does match it.
///
/// # Errors
///
/// [`BuildError::NoRows`] for an empty change,
/// [`BuildError::NoIdentityColumns`] if the table cannot be addressed.
pub fn build_merged_delete(
    change: &RowChangeSet,
    schema: &TableSchema,
) -> Result<MergedStatementContext, BuildError> {
    require_rows(change, schema)?;
    let identity = required_identity(schema)?;
    let identity_refs: Vec<&str> = identity.iter().map(String::as_str).collect();
    let tuple = format!("({})", placeholders(identity.len()));

    let mut params = Vec::with_capacity(identity.len() * change.row_count());
    for row in 0..change.row_count() {
        params.extend(row_values(change, row, &identity_refs));
    }

    Ok(MergedStatementContext {
        sql: format!(
            "DELETE FROM {} WHERE ({}) in ({})",
            qualified_table(&schema.schema, &schema.name),
            identity_refs
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(","),
            vec![tuple.as_str(); change.row_count()].join(","),
        ),
        params,
        table: schema.name.clone(),
        row_count: change.row_count(),
    })
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Identity columns with the implicit row identifier removed.
#[must_use]
pub fn identity_columns(schema: &TableSchema) -> Vec<String> {
    where_columns(schema)
        .into_iter()
        .filter(|c| !is_implicit_row_id(c))
        .collect()
}

fn required_identity(schema: &TableSchema) -> Result<Vec<String>, BuildError> {
    let identity = identity_columns(schema);
    if identity.is_empty() {
        return Err(BuildError::NoIdentityColumns {
            table: schema.name.clone(),
        });
    }
    Ok(identity)
}

fn require_rows(change: &RowChangeSet, schema: &TableSchema) -> Result<(), BuildError> {
    if change.row_count() == 0 {
        return Err(BuildError::NoRows {
            table: schema.name.clone(),
        });
    }
    Ok(())
}

fn replicable_columns(change: &RowChangeSet) -> impl Iterator<Item = &str> {
    change
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| !is_implicit_row_id(name))
}

fn insert_columns<'a>(
    change: &'a RowChangeSet,
    schema: &TableSchema,
) -> Result<Vec<&'a str>, BuildError> {
    let columns: Vec<&str> = replicable_columns(change).collect();
    if columns.is_empty() {
        return Err(BuildError::NoColumns {
            table: schema.name.clone(),
        });
    }
    Ok(columns)
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(",")
}

fn assignments(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("{}=?", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(",")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn row_values(change: &RowChangeSet, row: usize, columns: &[&str]) -> Vec<SqlValue> {
    columns
        .iter()
        .map(|c| change.row_value(row, c).clone())
        .collect()
}

/// `a=? AND b IS NULL ..` over `identity` for one row. NULL values become
/// `IS NULL` terms and bind nothing, since `=` never matches NULL.
fn where_predicate(
    change: &RowChangeSet,
    row: usize,
    identity: &[String],
) -> (String, Vec<SqlValue>) {
    let mut terms = Vec::with_capacity(identity.len());
    let mut params = Vec::with_capacity(identity.len());
    for column in identity {
        let value = change.row_value(row, column);
        if value.is_null() {
            terms.push(format!("{} IS NULL", quote_identifier(column)));
        } else {
            terms.push(format!("{}=?", quote_identifier(column)));
            params.push(value.clone());
        }
    }
    (terms.join(" AND "), params)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
