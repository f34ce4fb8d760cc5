//! DDL parsing
//!
//! Converts `CREATE TABLE` statements into a [`Schema`] using the `sqlparser`
//! crate. Statements other than table definitions are skipped.

use crate::common::error::SchemaPressResult;
use crate::schema::{Column, Schema, Table};
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Parses schema definitions written in SQL
pub struct DdlParser {
    dialect: GenericDialect,
}

impl DdlParser {
    pub fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }

    /// Parse a DDL script into a schema named `name`
    pub fn parse(&self, name: &str, ddl: &str) -> SchemaPressResult<Schema> {
        let statements = Parser::parse_sql(&self.dialect, ddl)
            .map_err(|e| crate::parse_err!("{}: {}", name, e))?;

        let mut tables = Vec::new();
        for statement in statements {
            match statement {
                Statement::CreateTable(create) => {
                    let mut table = Table::new(create.name.to_string());
                    for column in &create.columns {
                        let mut col =
                            Column::new(column.name.value.clone(), column.data_type.to_string());
                        for option in &column.options {
                            col.constraints.push(option.to_string());
                        }
                        table.columns.push(col);
                    }
                    for constraint in &create.constraints {
                        table.constraints.push(constraint.to_string());
                    }
                    tables.push(table);
                }
                other => {
                    debug!(schema = name, statement = %other, "skipping non-table statement");
                }
            }
        }

        if tables.is_empty() {
            return Err(crate::parse_err!("{}: no CREATE TABLE statements found", name));
        }

        Ok(Schema::new(name, tables))
    }
}

impl Default for DdlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a DDL script (convenience function)
pub fn parse_ddl(name: &str, ddl: &str) -> SchemaPressResult<Schema> {
    DdlParser::new().parse(name, ddl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::SchemaPressError;

    const TPCH_NATION: &str = "
CREATE TABLE nation
(
    n_nationkey  INTEGER not null,
    n_name       CHAR(25) not null,
    n_regionkey  INTEGER not null,
    n_comment    VARCHAR(152)
);

CREATE TABLE region
(
    r_regionkey  INTEGER not null PRIMARY KEY,
    r_name       CHAR(25) not null,
    r_comment    VARCHAR(152)
);";

    #[test]
    fn test_parse_tables_and_columns() {
        let schema = parse_ddl("tpch", TPCH_NATION).unwrap();
        assert_eq!(schema.name, "tpch");
        assert_eq!(schema.table_count(), 2);

        let nation = schema.get_table("nation").unwrap();
        assert_eq!(nation.columns.len(), 4);
        let key = nation.get_column("n_nationkey").unwrap();
        assert_eq!(key.data_type, "INTEGER");
        assert_eq!(key.constraints, vec!["NOT NULL".to_string()]);

        let comment = nation.get_column("n_comment").unwrap();
        assert_eq!(comment.data_type, "VARCHAR(152)");
        assert!(comment.constraints.is_empty());
    }

    #[test]
    fn test_parse_column_keys() {
        let schema = parse_ddl("tpch", TPCH_NATION).unwrap();
        let region = schema.get_table("region").unwrap();
        let key = region.get_column("r_regionkey").unwrap();
        assert_eq!(key.constraints.len(), 2);
        assert!(key.constraints.iter().any(|c| c == "PRIMARY KEY"));
    }

    #[test]
    fn test_table_constraints() {
        let ddl = "CREATE TABLE lineitem (l_orderkey BIGINT, l_linenumber BIGINT, \
                   PRIMARY KEY (l_orderkey, l_linenumber));";
        let schema = parse_ddl("lineitem", ddl).unwrap();
        let table = &schema.tables()[0];
        assert_eq!(table.constraints.len(), 1);
        assert!(table.constraints[0].starts_with("PRIMARY KEY"));
    }

    #[test]
    fn test_skips_other_statements() {
        let ddl = "CREATE TABLE t (a INT); INSERT INTO t VALUES (1);";
        let schema = parse_ddl("mixed", ddl).unwrap();
        assert_eq!(schema.table_count(), 1);
    }

    #[test]
    fn test_malformed_ddl() {
        let err = parse_ddl("broken", "CREATE TABLE (a INT").unwrap_err();
        assert!(matches!(err, SchemaPressError::Parse(_)));

        let err = parse_ddl("empty", "SELECT 1;").unwrap_err();
        assert!(err.to_string().contains("no CREATE TABLE"));
    }
}
