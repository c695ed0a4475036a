//! SQL text for the PostgreSQL driver.
//!
//! Identifiers are double-quoted; every value travels as a bind parameter.

use crate::traits::{parse_number, Comparator, FilterPredicate, PredicateTranslator, Translation};

/// Registry of written tables and their comma-joined column lists.
pub(crate) const REGISTRY_TABLE: &str = "schema";

/// Quote an identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SQL operator for a comparator
pub(crate) fn sql_operator(op: Comparator) -> &'static str {
    match op {
        Comparator::Eq => "=",
        other => other.as_str(),
    }
}

pub(crate) fn create_registry_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR(128) PRIMARY KEY, {} VARCHAR(255) NOT NULL)",
        quote_ident(REGISTRY_TABLE),
        quote_ident("tablename"),
        quote_ident("columns"),
    )
}

/// First column is the primary key; every column is variable-length text.
pub(crate) fn create_table_sql(table: &str, header: &[String]) -> String {
    let mut columns = Vec::with_capacity(header.len());
    for (idx, name) in header.iter().enumerate() {
        if idx == 0 {
            columns.push(format!("{} VARCHAR(128) PRIMARY KEY", quote_ident(name)));
        } else {
            columns.push(format!("{} VARCHAR(128)", quote_ident(name)));
        }
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        columns.join(", ")
    )
}

/// Upsert of a table's column list into the registry: `$1` table, `$2` columns.
pub(crate) fn register_sql() -> String {
    format!(
        "INSERT INTO {registry} ({name}, {cols}) VALUES ($1, $2) \
         ON CONFLICT ({name}) DO UPDATE SET {cols} = EXCLUDED.{cols}",
        registry = quote_ident(REGISTRY_TABLE),
        name = quote_ident("tablename"),
        cols = quote_ident("columns"),
    )
}

pub(crate) fn insert_sql(table: &str, header: &[String]) -> String {
    let placeholders = (1..=header.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        quoted_list(header),
        placeholders
    )
}

/// A `WHERE` body and the values bound to its `$n` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereClause {
    pub sql: String,
    pub binds: Vec<String>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

pub(crate) fn select_sql(table: &str, columns: &[String], clause: &WhereClause) -> String {
    let mut sql = format!("SELECT {} FROM {}", quoted_list(columns), quote_ident(table));
    if !clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clause.sql);
    }
    sql
}

/// Translates predicates into a parameterized `WHERE` body.
///
/// Stored values are compared as text. An ordering predicate with a numeric
/// comparand is returned as a residual and checked on each fetched row, since
/// whether a stored value counts as a number is decided by `parse_number`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationalTranslator;

impl RelationalTranslator {
    fn clause(predicate: &FilterPredicate, op: Comparator, param: usize) -> String {
        let column = format!("CAST({} AS TEXT)", quote_ident(&predicate.column));
        if op.is_ordering() {
            format!("{} COLLATE \"C\" {} ${}", column, sql_operator(op), param)
        } else {
            format!("{} {} ${}", column, sql_operator(op), param)
        }
    }
}

impl PredicateTranslator for RelationalTranslator {
    type Fragment = WhereClause;

    fn translate(&self, filters: &[FilterPredicate]) -> Translation<WhereClause> {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();
        let mut residual = Vec::new();

        for predicate in filters {
            let Some(op) = predicate.comparator else {
                continue;
            };
            if op.is_ordering() && parse_number(&predicate.comparand).is_some() {
                residual.push(predicate.clone());
                continue;
            }
            binds.push(predicate.comparand.clone());
            conditions.push(Self::clause(predicate, op, binds.len()));
        }

        let native = WhereClause {
            sql: conditions.join(" AND "),
            binds,
        };
        if residual.is_empty() {
            Translation::Native(native)
        } else {
            Translation::Split { native, residual }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn where_clause(filters: &[FilterPredicate]) -> WhereClause {
        match RelationalTranslator.translate(filters) {
            Translation::Native(clause) => clause,
            Translation::Split { .. } | Translation::InMemory(_) => {
                panic!("expected a fully native translation")
            }
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("price"), "\"price\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("albums", &strings(&["title", "artist", "price"]));
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"albums\" (\"title\" VARCHAR(128) PRIMARY KEY, \
             \"artist\" VARCHAR(128), \"price\" VARCHAR(128))"
        );
    }

    #[test]
    fn test_insert_sql_is_parameterized() {
        let sql = insert_sql("albums", &strings(&["title", "artist", "price"]));
        assert_eq!(
            sql,
            "INSERT INTO \"albums\" (\"title\", \"artist\", \"price\") VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn test_register_sql_upserts() {
        let sql = register_sql();
        assert!(sql.starts_with("INSERT INTO \"schema\""));
        assert!(sql.contains("ON CONFLICT (\"tablename\") DO UPDATE"));
    }

    #[test]
    fn test_select_without_conditions() {
        let clause = where_clause(&[FilterPredicate::column("title")]);
        assert!(clause.is_empty());
        assert_eq!(
            select_sql("albums", &strings(&["title"]), &clause),
            "SELECT \"title\" FROM \"albums\""
        );
    }

    #[test]
    fn test_equality_and_operator_mapping() {
        let clause = where_clause(&[
            FilterPredicate::column("title"),
            FilterPredicate::new("artist", Comparator::Eq, "John Coltrane"),
            FilterPredicate::new("label", Comparator::Ne, "Blue Note"),
        ]);

        assert_eq!(
            clause.sql,
            "CAST(\"artist\" AS TEXT) = $1 AND CAST(\"label\" AS TEXT) != $2"
        );
        assert_eq!(clause.binds, strings(&["John Coltrane", "Blue Note"]));
    }

    #[test]
    fn test_numeric_ordering_is_residual() {
        let filters = [
            FilterPredicate::column("title"),
            FilterPredicate::new("artist", Comparator::Eq, "John Coltrane"),
            FilterPredicate::new("price", Comparator::Gt, "60"),
        ];

        match RelationalTranslator.translate(&filters) {
            Translation::Split { native, residual } => {
                assert_eq!(native.sql, "CAST(\"artist\" AS TEXT) = $1");
                assert_eq!(native.binds, strings(&["John Coltrane"]));
                assert_eq!(residual, vec![FilterPredicate::new("price", Comparator::Gt, "60")]);
            }
            other => panic!("unexpected translation {:?}", other),
        }
    }

    #[test]
    fn test_no_numeric_cast_in_sql() {
        let filters = [
            FilterPredicate::new("price", Comparator::Gt, "60"),
            FilterPredicate::new("price", Comparator::Le, "1e5"),
        ];

        match RelationalTranslator.translate(&filters) {
            Translation::Split { native, residual } => {
                assert!(native.is_empty());
                assert!(native.binds.is_empty());
                assert_eq!(residual.len(), 2);
            }
            other => panic!("unexpected translation {:?}", other),
        }
    }

    #[test]
    fn test_text_ordering_clause() {
        let clause = where_clause(&[FilterPredicate::new("title", Comparator::Le, "M")]);
        assert_eq!(clause.sql, "CAST(\"title\" AS TEXT) COLLATE \"C\" <= $1");
    }

    #[test]
    fn test_comparand_is_never_inlined() {
        let hostile = "x'; DROP TABLE albums; --";
        let clause = where_clause(&[FilterPredicate::new("title", Comparator::Eq, hostile)]);
        assert!(!clause.sql.contains("DROP"));
        assert_eq!(clause.binds, vec![hostile.to_string()]);
    }
}
