//! Relational schema model
//!
//! A `Schema` is the immutable object graph the compression pipeline starts
//! from: an ordered list of tables, each with typed columns and the textual
//! constraint phrases attached to columns and tables. Schemas come from SQL
//! DDL (`parser`) or from Spider-format catalogs (`spider`).

pub mod parser;
pub mod spider;

pub use parser::{parse_ddl, DdlParser};
pub use spider::{load_spider_file, parse_spider, SpiderDatabase};

use serde::{Deserialize, Serialize};

/// A typed table column with its constraint phrases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type as written in DDL (e.g. `VARCHAR(25)`)
    pub data_type: String,
    /// Constraint phrases in declaration order (e.g. `NOT NULL`)
    pub constraints: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }
}

/// A table is characterized by its columns and table-level constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<Column>,
    /// Table-level constraint phrases (composite keys, checks)
    pub constraints: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Mutable column lookup, used by loaders attaching key phrases
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|col| col.name == name)
    }
}

/// A schema is an ordered sequence of tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Identifier of the schema (file stem or Spider db_id)
    pub name: String,
    tables: Vec<Table>,
}

impl Schema {
    pub fn new(name: impl Into<String>, tables: Vec<Table>) -> Self {
        Self {
            name: name.into(),
            tables,
        }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
