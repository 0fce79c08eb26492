use serde::{Deserialize, Serialize};

use crate::types::SqlValue;

/// Anything the executor can bind and run: SQL text with `?` placeholders
/// plus position-correspondent parameters.
pub trait Statement {
    fn sql(&self) -> &str;

    fn params(&self) -> &[SqlValue];

    /// Logical target table, for diagnostics only.
    fn table(&self) -> &str;
}

/// One executable statement addressing a single logical row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementContext {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub table: String,
}

impl StatementContext {
    pub fn new(sql: impl Into<String>, table: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            table: table.into(),
        }
    }
}

impl Statement for StatementContext {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn params(&self) -> &[SqlValue] {
        &self.params
    }

    fn table(&self) -> &str {
        &self.table
    }
}

/// One statement whose VALUES or IN list spans several logical rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedStatementContext {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub table: String,
    /// Number of logical rows folded into this statement.
    pub row_count: usize,
}

impl Statement for MergedStatementContext {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn params(&self) -> &[SqlValue] {
        &self.params
    }

    fn table(&self) -> &str {
        &self.table
    }
}

/// A DDL statement ready for dispatch.
///
/// `schema` is the database the statement runs against; it is empty for
/// database-level statements, which must run without a default database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlStatementContext {
    /// Text sent to the destination, hint-prefixed where applicable.
    pub sql: String,
    pub schema: String,
    /// Statement as received, before any hint was added.
    pub original_sql: String,
    /// Correlation token embedded in the hint.
    pub token: String,
}

impl Statement for DdlStatementContext {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn params(&self) -> &[SqlValue] {
        &[]
    }

    fn table(&self) -> &str {
        &self.schema
    }
}

/// Renders parameters for log lines: comma separated, NULL as `null-value`.
#[must_use]
pub fn format_params(params: &[SqlValue]) -> String {
    params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_render_with_null_marker() {
        let params = vec![
            SqlValue::Int(1),
            SqlValue::Null,
            SqlValue::String("a".to_string()),
        ];
        assert_eq!(format_params(&params), "1,null-value,a");
        assert_eq!(format_params(&[]), "");
    }

    #[test]
    fn ddl_context_binds_nothing() {
        let ctx = DdlStatementContext {
            sql: "DROP TABLE t".to_string(),
            schema: "db".to_string(),
            original_sql: "DROP TABLE t".to_string(),
            token: "1".to_string(),
        };
        assert!(ctx.params().is_empty());
        assert_eq!(ctx.table(), "db");
    }
}
