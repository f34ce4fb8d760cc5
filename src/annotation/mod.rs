//! Schema annotations
//!
//! Flattens a [`Schema`](crate::schema::Schema) into textual elements that
//! each need an encoding decision, and groups elements sharing the same
//! canonical string so they are decided together.

pub mod extract;
pub mod merge;

pub use extract::extract;
pub use merge::{group_index, merge_elements};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an element in extraction order
pub type ElementId = usize;

/// Index of a group in merge order
pub type GroupId = usize;

/// Semantic class of a schema fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    TableName,
    ColumnName,
    TypeName,
    /// Column or table constraint such as `NOT NULL` or `DEFAULT 0`
    Constraint,
    /// Key clause such as `PRIMARY KEY`, `UNIQUE` or `REFERENCES t(c)`
    KeyPhrase,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::TableName => "table_name",
            ElementKind::ColumnName => "column_name",
            ElementKind::TypeName => "type_name",
            ElementKind::Constraint => "constraint",
            ElementKind::KeyPhrase => "key_phrase",
        }
    }

    /// Identifiers are eligible for shared prefix entries
    pub fn is_identifier(&self) -> bool {
        matches!(self, ElementKind::TableName | ElementKind::ColumnName)
    }

    /// Classify a constraint phrase
    pub fn of_phrase(phrase: &str) -> Self {
        let upper = phrase.trim_start().to_uppercase();
        const KEY_PREFIXES: [&str; 5] =
            ["PRIMARY KEY", "UNIQUE", "REFERENCES", "FOREIGN KEY", "CONSTRAINT"];
        if KEY_PREFIXES.iter().any(|p| upper.starts_with(p)) {
            ElementKind::KeyPhrase
        } else {
            ElementKind::Constraint
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Table (and column, if any) an element was taken from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementOwner {
    pub table: String,
    pub column: Option<String>,
}

impl ElementOwner {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: None,
        }
    }

    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: Some(column.into()),
        }
    }
}

impl fmt::Display for ElementOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}.{}", self.table, column),
            None => write!(f, "{}", self.table),
        }
    }
}

/// An atomic textual fragment of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    /// Canonical string, also the merge key
    pub value: String,
    pub owner: ElementOwner,
}

/// Elements sharing a canonical string, decided as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementGroup {
    pub id: GroupId,
    pub value: String,
    /// Kind of the first member
    pub kind: ElementKind,
    /// Members disagree on their kind (e.g. a column named like a type)
    pub mixed_kinds: bool,
    pub members: Vec<ElementId>,
}

impl ElementGroup {
    /// Number of elements resolved by this group's decision
    pub fn weight(&self) -> usize {
        self.members.len()
    }
}
