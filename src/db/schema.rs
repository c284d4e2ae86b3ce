//! SQL DDL and schema introspection for the per-kind tables.

/// Name of the unique identity column.
pub const ID_COLUMN: &str = "id";

/// Name of the serialized blob column holding the full object state.
pub const JSON_COLUMN: &str = "json";

/// Live column list of a table, in declaration order.
/// `pragma_table_info` accepts the table name as a bound parameter.
pub const TABLE_INFO_SQL: &str = "SELECT name FROM pragma_table_info(?) ORDER BY cid";

/// Quote an identifier for SQLite, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Minimal hybrid table for one model kind:
/// - `id` TEXT UNIQUE (identity; upsert-by-id relies on it)
/// - `json` TEXT NOT NULL (full serialized state, authoritative on read)
///
/// Deployments may pre-create the table with extra native columns; this
/// statement then leaves it untouched.
pub fn create_table_sql(kind: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({} TEXT UNIQUE, {} TEXT NOT NULL)",
        quote_ident(kind),
        ID_COLUMN,
        JSON_COLUMN
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_and_hostile_identifiers() {
        assert_eq!(quote_ident("Item"), r#""Item""#);
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn create_table_has_id_and_json() {
        assert_eq!(
            create_table_sql("User"),
            r#"CREATE TABLE IF NOT EXISTS "User" (id TEXT UNIQUE, json TEXT NOT NULL)"#
        );
    }
}
