/// Contract violations detected while synthesizing SQL.
///
/// These indicate malformed input from the decoding layer, not runtime
/// database conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("table {table} has no columns")]
    NoColumns { table: String },
    #[error("row change for {table} carries no rows")]
    NoRows { table: String },
    #[error("table {table} has no identity columns for a merged delete")]
    NoIdentityColumns { table: String },
    #[error("key column {column} is not a column of {table}")]
    UnknownKeyColumn { table: String, column: String },
}
