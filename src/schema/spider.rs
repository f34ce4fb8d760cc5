//! Spider catalog loader
//!
//! Spider's `tables.json` describes each database as parallel arrays of table
//! names, `(table index, column name)` pairs, column types, primary keys and
//! foreign key column pairs. Single-column keys become column phrases
//! (`PRIMARY KEY`, `REFERENCES t(c)`); composite primary keys become a
//! table-level `PRIMARY KEY (a, b)` phrase.

use crate::common::error::SchemaPressResult;
use crate::schema::{Column, Schema, Table};
use serde::Deserialize;
use std::path::Path;

/// Primary key entry: a column index, or a list of them in newer releases
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SpiderKey {
    Single(usize),
    Composite(Vec<usize>),
}

/// One database entry of a Spider `tables.json` file
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderDatabase {
    pub db_id: String,
    pub table_names_original: Vec<String>,
    pub column_names_original: Vec<(i64, String)>,
    pub column_types: Vec<String>,
    #[serde(default)]
    pub primary_keys: Vec<SpiderKey>,
    #[serde(default)]
    pub foreign_keys: Vec<(usize, usize)>,
}

impl SpiderDatabase {
    fn column(&self, idx: usize) -> SchemaPressResult<(usize, &str)> {
        match self.column_names_original.get(idx) {
            Some((table_idx, name))
                if *table_idx >= 0 && (*table_idx as usize) < self.table_names_original.len() =>
            {
                Ok((*table_idx as usize, name.as_str()))
            }
            _ => Err(crate::parse_err!("{}: invalid column index {}", self.db_id, idx)),
        }
    }

    fn table_name(&self, idx: usize) -> SchemaPressResult<&str> {
        self.table_names_original
            .get(idx)
            .map(|s| s.as_str())
            .ok_or_else(|| crate::parse_err!("{}: invalid table index {}", self.db_id, idx))
    }
}

/// Parse schema from Spider representation
pub fn parse_spider(db: &SpiderDatabase) -> SchemaPressResult<Schema> {
    let mut tables: Vec<Table> = db
        .table_names_original
        .iter()
        .map(|name| Table::new(name.clone()))
        .collect();

    for ((table_idx, col_name), col_type) in db.column_names_original.iter().zip(&db.column_types) {
        // index -1 is the `*` pseudo column
        if *table_idx < 0 || col_name == "*" {
            continue;
        }
        let table = tables
            .get_mut(*table_idx as usize)
            .ok_or_else(|| crate::parse_err!("{}: invalid table index {}", db.db_id, table_idx))?;
        table.columns.push(Column::new(col_name.clone(), col_type.clone()));
    }

    for key in &db.primary_keys {
        let columns = match key {
            SpiderKey::Single(idx) => vec![*idx],
            SpiderKey::Composite(cols) => cols.clone(),
        };
        match columns.as_slice() {
            [] => {}
            [idx] => {
                let (table_idx, name) = db.column(*idx)?;
                if let Some(col) = tables[table_idx].get_column_mut(name) {
                    col.constraints.push("PRIMARY KEY".to_string());
                }
            }
            [first, ..] => {
                let (table_idx, _) = db.column(*first)?;
                let names = columns
                    .iter()
                    .map(|idx| db.column(*idx).map(|(_, name)| name.to_string()))
                    .collect::<SchemaPressResult<Vec<_>>>()?;
                tables[table_idx]
                    .constraints
                    .push(format!("PRIMARY KEY ({})", names.join(", ")));
            }
        }
    }

    for (from_idx, to_idx) in &db.foreign_keys {
        let (from_table, from_col) = db.column(*from_idx)?;
        let (to_table, to_col) = db.column(*to_idx)?;
        let phrase = format!("REFERENCES {}({})", db.table_name(to_table)?, to_col);
        if let Some(col) = tables[from_table].get_column_mut(from_col) {
            col.constraints.push(phrase);
        }
    }

    Ok(Schema::new(db.db_id.clone(), tables))
}

/// Read every database of a Spider `tables.json` file
pub fn load_spider_file(path: &Path) -> SchemaPressResult<Vec<SpiderDatabase>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| crate::parse_err!("{}: {}", path.display(), e))
}
