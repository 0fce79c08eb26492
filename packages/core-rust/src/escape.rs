//! Identifier quoting.
//!
//! Identifiers are escaped and inlined into SQL text; values never are. Every
//! value produced by the builders is bound to a `?` placeholder.

/// Hidden row identifier that RDS adds to keyless tables. It is never
/// replicated as a regular column.
pub const IMPLICIT_ROW_ID_COLUMN: &str = "__#alibaba_rds_row_id#__";

/// Whether `column` is the implicit row identifier (case-insensitive).
#[must_use]
pub fn is_implicit_row_id(column: &str) -> bool {
    column.eq_ignore_ascii_case(IMPLICIT_ROW_ID_COLUMN)
}

/// Quotes an identifier with backticks, doubling any embedded backtick.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Renders `` `schema`.`table` ``.
#[must_use]
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifier_is_wrapped() {
        assert_eq!(quote_identifier("id"), "`id`");
    }

    #[test]
    fn embedded_backticks_are_doubled() {
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(quote_identifier("`; DROP TABLE t; --"), "```; DROP TABLE t; --`");
    }

    #[test]
    fn quotes_pass_through_inside_backticks() {
        assert_eq!(quote_identifier("it's \"x\""), "`it's \"x\"`");
    }

    #[test]
    fn qualified_name() {
        assert_eq!(qualified_table("db", "orders"), "`db`.`orders`");
    }

    #[test]
    fn implicit_row_id_matches_any_case() {
        assert!(is_implicit_row_id("__#alibaba_rds_row_id#__"));
        assert!(is_implicit_row_id("__#ALIBABA_RDS_ROW_ID#__"));
        assert!(!is_implicit_row_id("id"));
    }
}
