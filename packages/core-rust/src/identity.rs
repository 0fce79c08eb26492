//! Identity column resolution: which columns address exactly one row.
//!
//! The returned order is significant. It fixes the order of predicate terms
//! and therefore of bound parameters, so it must be stable for a schema.

use crate::schema::TableSchema;

/// Columns used in WHERE / IN predicates to address one row of `schema`.
///
/// Primary keys if any, else unique keys, followed by the db-level and
/// table-level shard keys when not already present. A table with neither
/// primary nor unique keys is identified by its whole row image, in declared
/// column order, and shard keys are not appended.
///
/// Key columns keep the order of the schema's key list (the key definition
/// order reported by the source), not their column ordinals.
#[must_use]
pub fn where_columns(schema: &TableSchema) -> Vec<String> {
    let mut columns: Vec<String> = if schema.primary_keys.is_empty() {
        schema.unique_keys.clone()
    } else {
        schema.primary_keys.clone()
    };

    if columns.is_empty() {
        return schema.column_names().map(str::to_string).collect();
    }

    for shard_key in [&schema.db_shard_key, &schema.table_shard_key]
        .into_iter()
        .flatten()
    {
        if !shard_key.trim().is_empty() && !columns.contains(shard_key) {
            columns.push(shard_key.clone());
        }
    }

    columns
}

/// [`where_columns`] extended with the unique keys when the table has a
/// primary key, for checks that must respect secondary uniqueness too.
#[must_use]
pub fn identify_columns(schema: &TableSchema) -> Vec<String> {
    let mut columns = where_columns(schema);
    if !schema.primary_keys.is_empty() {
        columns.extend(schema.unique_keys.iter().cloned());
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new("db", "users", ["id", "email", "tenant", "region", "name"])
    }

    #[test]
    fn primary_key_only() {
        let schema = users().with_primary_keys(["id"]);
        assert_eq!(where_columns(&schema), vec!["id"]);
    }

    #[test]
    fn key_order_follows_key_definition() {
        let schema = users().with_primary_keys(["tenant", "id"]);
        assert_eq!(where_columns(&schema), vec!["tenant", "id"]);
    }

    #[test]
    fn primary_key_wins_over_unique_key() {
        let schema = users().with_primary_keys(["id"]).with_unique_keys(["email"]);
        assert_eq!(where_columns(&schema), vec!["id"]);
    }

    #[test]
    fn unique_key_when_no_primary_key() {
        let schema = users().with_unique_keys(["email"]);
        assert_eq!(where_columns(&schema), vec!["email"]);
    }

    #[test]
    fn shard_keys_appended_in_db_then_table_order() {
        let schema = users()
            .with_primary_keys(["id"])
            .with_shard_keys(Some("tenant"), Some("region"));
        assert_eq!(where_columns(&schema), vec!["id", "tenant", "region"]);
    }

    #[test]
    fn shard_key_already_in_key_is_not_duplicated() {
        let schema = users()
            .with_primary_keys(["id", "tenant"])
            .with_shard_keys(Some("tenant"), Some("tenant"));
        assert_eq!(where_columns(&schema), vec!["id", "tenant"]);
    }

    #[test]
    fn blank_shard_key_is_ignored() {
        let schema = users()
            .with_primary_keys(["id"])
            .with_shard_keys(Some(" "), None);
        assert_eq!(where_columns(&schema), vec!["id"]);
    }

    #[test]
    fn keyless_table_uses_all_columns_without_shard_keys() {
        let schema = users().with_shard_keys(Some("tenant"), Some("region"));
        assert_eq!(
            where_columns(&schema),
            vec!["id", "email", "tenant", "region", "name"]
        );
    }

    #[test]
    fn resolution_is_stable_across_calls() {
        let schema = users()
            .with_unique_keys(["email", "name"])
            .with_shard_keys(None, Some("region"));
        assert_eq!(where_columns(&schema), where_columns(&schema));
        assert_eq!(where_columns(&schema), vec!["email", "name", "region"]);
    }

    #[test]
    fn identify_columns_appends_unique_keys_with_primary_key() {
        let schema = users()
            .with_primary_keys(["id"])
            .with_unique_keys(["email"])
            .with_shard_keys(Some("tenant"), None);
        assert_eq!(identify_columns(&schema), vec!["id", "tenant", "email"]);
    }

    #[test]
    fn identify_columns_without_primary_key_matches_where_columns() {
        let schema = users().with_unique_keys(["email"]);
        assert_eq!(identify_columns(&schema), where_columns(&schema));
    }
}
