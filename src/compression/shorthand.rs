//! Schema-aware shorthand rules
//!
//! Two rule families shorten fragments by semantic class. Type synonyms
//! replace the base of a type name (`INTEGER` becomes `INT`, parameters are
//! kept) and cost nothing to explain. Legend shorthands replace a key or
//! constraint phrase by a symbol that must be defined once in the legend.

use crate::annotation::{ElementGroup, ElementKind};
use serde::{Deserialize, Serialize};

/// Standard SQL spellings and their shorter equivalents
const TYPE_SYNONYMS: &[(&str, &str)] = &[
    ("INTEGER", "INT"),
    ("CHARACTER VARYING", "VARCHAR"),
    ("CHARACTER", "CHAR"),
    ("DOUBLE PRECISION", "DOUBLE"),
    ("BOOLEAN", "BOOL"),
    ("DECIMAL", "DEC"),
    ("TIMESTAMP WITHOUT TIME ZONE", "TIMESTAMP"),
    ("TIMESTAMP WITH TIME ZONE", "TIMESTAMPTZ"),
    ("BIGINT", "INT8"),
    ("SMALLINT", "INT2"),
];

/// Phrases and the legend symbols replacing them
const LEGEND_RULES: &[(&str, &str)] = &[
    ("PRIMARY KEY", "*"),
    ("REFERENCES ", "->"),
    ("NOT NULL", "!"),
    ("UNIQUE", "^"),
    ("DEFAULT ", "="),
];

/// Replaces the base of a type name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymRule {
    pub long: String,
    pub short: String,
}

/// Splits `VARCHAR(25)` into `("VARCHAR", "(25)")`
pub fn split_type(value: &str) -> (&str, &str) {
    match value.find('(') {
        Some(pos) => (&value[..pos], &value[pos..]),
        None => (value, ""),
    }
}

impl SynonymRule {
    pub fn new(long: &str, short: &str) -> Self {
        Self {
            long: long.to_string(),
            short: short.to_string(),
        }
    }

    /// Shortened type, if `value` has this rule's base
    pub fn apply(&self, value: &str) -> Option<String> {
        let (base, params) = split_type(value);
        (base == self.long).then(|| format!("{}{}", self.short, params))
    }

    /// Inverse of [`apply`](Self::apply)
    pub fn restore(&self, token: &str) -> Option<String> {
        let (base, params) = split_type(token);
        (base == self.short).then(|| format!("{}{}", self.long, params))
    }
}

/// A phrase replaced by a legend symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendRule {
    pub phrase: &'static str,
    pub key: &'static str,
}

impl LegendRule {
    pub fn applies_to(&self, kind: ElementKind) -> bool {
        matches!(kind, ElementKind::Constraint | ElementKind::KeyPhrase)
    }

    /// Replaces the first occurrence of the phrase
    pub fn apply(&self, value: &str) -> Option<String> {
        value
            .contains(self.phrase)
            .then(|| value.replacen(self.phrase, self.key, 1))
    }
}

/// Synonyms whose short base is not already a type in the schema.
///
/// A type already spelled `INT` would otherwise decode to `INTEGER`.
pub fn enabled_synonyms(groups: &[ElementGroup]) -> Vec<SynonymRule> {
    let type_bases: Vec<&str> = groups
        .iter()
        .filter(|g| g.kind == ElementKind::TypeName || g.mixed_kinds)
        .map(|g| split_type(&g.value).0)
        .collect();
    TYPE_SYNONYMS
        .iter()
        .filter(|(_, short)| !type_bases.contains(short))
        .map(|(long, short)| SynonymRule::new(long, short))
        .collect()
}

/// Legend rules whose key occurs in no canonical value
pub fn enabled_legend(groups: &[ElementGroup]) -> Vec<LegendRule> {
    LEGEND_RULES
        .iter()
        .filter(|(_, key)| !groups.iter().any(|g| g.value.contains(key)))
        .map(|&(phrase, key)| LegendRule { phrase, key })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: usize, kind: ElementKind, value: &str) -> ElementGroup {
        ElementGroup {
            id,
            value: value.to_string(),
            kind,
            mixed_kinds: false,
            members: vec![id],
        }
    }

    #[test]
    fn test_synonym_keeps_parameters() {
        let rule = SynonymRule::new("CHARACTER VARYING", "VARCHAR");
        assert_eq!(rule.apply("CHARACTER VARYING(40)"), Some("VARCHAR(40)".to_string()));
        assert_eq!(rule.apply("CHARACTER(40)"), None);
        assert_eq!(rule.restore("VARCHAR(40)"), Some("CHARACTER VARYING(40)".to_string()));
    }

    #[test]
    fn test_synonym_disabled_by_existing_short_type() {
        let groups = vec![
            group(0, ElementKind::TypeName, "INTEGER"),
            group(1, ElementKind::TypeName, "INT"),
            group(2, ElementKind::ColumnName, "BOOL"),
        ];
        let enabled = enabled_synonyms(&groups);
        assert!(!enabled.iter().any(|r| r.long == "INTEGER"));
        assert!(enabled.iter().any(|r| r.long == "BOOLEAN"));
    }

    #[test]
    fn test_legend_rules() {
        let rule = LegendRule {
            phrase: "REFERENCES ",
            key: "->",
        };
        assert_eq!(
            rule.apply("REFERENCES nation(n_nationkey)"),
            Some("->nation(n_nationkey)".to_string())
        );
        assert_eq!(rule.apply("NOT NULL"), None);
        assert!(rule.applies_to(ElementKind::KeyPhrase));
        assert!(!rule.applies_to(ElementKind::ColumnName));

        let groups = vec![group(0, ElementKind::Constraint, "CHECK (a >= 0)")];
        let enabled = enabled_legend(&groups);
        assert!(!enabled.iter().any(|r| r.key == "="));
        assert!(enabled.iter().any(|r| r.key == "*"));
    }
}
