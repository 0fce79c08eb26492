use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Single column of a table snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name as it appears in the destination table.
    pub name: String,
    /// 1-based position in the table definition.
    pub ordinal: u32,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            name: name.into(),
            ordinal,
        }
    }
}

/// Snapshot of a destination table's layout and keys.
///
/// Immutable for the duration of one apply call. Key lists are expected to be
/// subsets of `columns`; see [`TableSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Database (schema) name.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Columns in declared order.
    pub columns: Vec<ColumnDescriptor>,
    /// Primary-key column names.
    #[serde(default)]
    pub primary_keys: Vec<String>,
    /// Unique-key column names.
    #[serde(default)]
    pub unique_keys: Vec<String>,
    /// Database-level shard key, if the table is sharded across databases.
    #[serde(default)]
    pub db_shard_key: Option<String>,
    /// Table-level shard key, if the table is sharded across tables.
    #[serde(default)]
    pub table_shard_key: Option<String>,
}

impl TableSchema {
    /// Creates a keyless, unsharded schema from a list of column names.
    pub fn new<I, S>(schema: impl Into<String>, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns
            .into_iter()
            .zip(1u32..)
            .map(|(name, ordinal)| ColumnDescriptor::new(name, ordinal))
            .collect();
        Self {
            schema: schema.into(),
            name: name.into(),
            columns,
            primary_keys: Vec::new(),
            unique_keys: Vec::new(),
            db_shard_key: None,
            table_shard_key: None,
        }
    }

    #[must_use]
    pub fn with_primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_unique_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_shard_keys(mut self, db_shard_key: Option<&str>, table_shard_key: Option<&str>) -> Self {
        self.db_shard_key = db_shard_key.map(str::to_string);
        self.table_shard_key = table_shard_key.map(str::to_string);
        self
    }

    /// Column names in declared order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Checks the snapshot invariants: at least one column, and every key
    /// column is a declared column.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.columns.is_empty() {
            return Err(BuildError::NoColumns {
                table: self.name.clone(),
            });
        }
        for key in self.primary_keys.iter().chain(&self.unique_keys) {
            if !self.has_column(key) {
                return Err(BuildError::UnknownKeyColumn {
                    table: self.name.clone(),
                    column: key.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_declaration_order() {
        let schema = TableSchema::new("db", "t", ["id", "name", "age"]);
        let ordinals: Vec<u32> = schema.columns.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert_eq!(schema.column_names().collect::<Vec<_>>(), vec!["id", "name", "age"]);
    }

    #[test]
    fn validate_accepts_well_formed_schema() {
        let schema = TableSchema::new("db", "t", ["id", "email"])
            .with_primary_keys(["id"])
            .with_unique_keys(["email"]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_table() {
        let schema = TableSchema::new("db", "t", Vec::<String>::new());
        assert_eq!(
            schema.validate(),
            Err(BuildError::NoColumns {
                table: "t".to_string()
            })
        );
    }

    #[test]
    fn validate_rejects_unknown_key_column() {
        let schema = TableSchema::new("db", "t", ["id"]).with_unique_keys(["missing"]);
        assert!(matches!(
            schema.validate(),
            Err(BuildError::UnknownKeyColumn { column, .. }) if column == "missing"
        ));
    }
}
