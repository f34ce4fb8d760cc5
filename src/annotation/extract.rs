//! Element extraction
//!
//! Walks tables in order and emits, per table, the table name followed by each
//! column's name, type and constraint phrases, then the table-level phrases.
//! The resulting order is what the renderer walks to rebuild table lines.

use crate::annotation::{Element, ElementKind, ElementOwner};
use crate::schema::Schema;
use tracing::debug;

/// Flatten `schema` into elements in declaration order
pub fn extract(schema: &Schema) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut push = |kind: ElementKind, value: &str, owner: ElementOwner| {
        let id = elements.len();
        elements.push(Element {
            id,
            kind,
            value: value.to_string(),
            owner,
        });
    };

    for table in schema.tables() {
        push(ElementKind::TableName, &table.name, ElementOwner::table(&table.name));
        for column in &table.columns {
            let owner = ElementOwner::column(&table.name, &column.name);
            push(ElementKind::ColumnName, &column.name, owner.clone());
            push(ElementKind::TypeName, &column.data_type, owner.clone());
            for phrase in &column.constraints {
                push(ElementKind::of_phrase(phrase), phrase, owner.clone());
            }
        }
        for phrase in &table.constraints {
            push(ElementKind::of_phrase(phrase), phrase, ElementOwner::table(&table.name));
        }
    }

    debug!(schema = %schema.name, elements = elements.len(), "extracted elements");
    elements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_order_and_kinds() {
        let table = Table::new("orders")
            .with_column(
                Column::new("id", "INTEGER")
                    .with_constraint("NOT NULL")
                    .with_constraint("PRIMARY KEY"),
            )
            .with_column(
                Column::new("customer_id", "INTEGER").with_constraint("REFERENCES customer(id)"),
            )
            .with_constraint("UNIQUE (id, customer_id)");
        let elements = extract(&Schema::new("shop", vec![table]));

        let summary: Vec<(ElementKind, &str)> =
            elements.iter().map(|e| (e.kind, e.value.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (ElementKind::TableName, "orders"),
                (ElementKind::ColumnName, "id"),
                (ElementKind::TypeName, "INTEGER"),
                (ElementKind::Constraint, "NOT NULL"),
                (ElementKind::KeyPhrase, "PRIMARY KEY"),
                (ElementKind::ColumnName, "customer_id"),
                (ElementKind::TypeName, "INTEGER"),
                (ElementKind::KeyPhrase, "REFERENCES customer(id)"),
                (ElementKind::KeyPhrase, "UNIQUE (id, customer_id)"),
            ]
        );
        assert!(elements.iter().enumerate().all(|(i, e)| e.id == i));
        assert_eq!(elements[3].owner.to_string(), "orders.id");
        assert_eq!(elements[8].owner.column, None);
    }

    #[test]
    fn test_phrase_classification() {
        assert_eq!(ElementKind::of_phrase("DEFAULT 0"), ElementKind::Constraint);
        assert_eq!(ElementKind::of_phrase("CHECK (price > 0)"), ElementKind::Constraint);
        assert_eq!(ElementKind::of_phrase("unique"), ElementKind::KeyPhrase);
        assert_eq!(
            ElementKind::of_phrase("FOREIGN KEY (a) REFERENCES t(b)"),
            ElementKind::KeyPhrase
        );
    }
}
