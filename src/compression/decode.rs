//! Rendering, decoding and validation of assignments
//!
//! A token decodes by the first rule that applies:
//!
//! 1. it contains the key of an active dictionary entry, which is replaced by
//!    the expansion;
//! 2. it is a type name whose base is the short form of a synonym some group
//!    chose, which is restored to the long form;
//! 3. otherwise it is verbatim.

use crate::annotation::{group_index, ElementKind};
use crate::common::error::{SchemaPressError, SchemaPressResult};
use crate::compression::shorthand::SynonymRule;
use crate::compression::types::{Assignment, CandidateSet, DictionaryEntry};
use crate::compression::CompressionInstance;
use std::collections::HashMap;

/// Inverts the encodings selected by one assignment
pub struct Decoder<'a> {
    active: Vec<&'a DictionaryEntry>,
    synonyms: Vec<&'a SynonymRule>,
}

impl<'a> Decoder<'a> {
    pub fn new(candidates: &'a CandidateSet, assignment: &Assignment) -> Self {
        let active = assignment
            .active_entries
            .iter()
            .filter_map(|&id| candidates.entries.get(id))
            .collect();
        let synonyms = assignment
            .synonyms_in_use(candidates)
            .into_iter()
            .filter_map(|idx| candidates.synonyms.get(idx))
            .collect();
        Self { active, synonyms }
    }

    pub fn decode(&self, token: &str, kind: ElementKind) -> String {
        if let Some(entry) = self.active.iter().find(|e| token.contains(e.key.as_str())) {
            return token.replacen(entry.key.as_str(), &entry.expansion, 1);
        }
        if kind == ElementKind::TypeName {
            if let Some(restored) = self.synonyms.iter().find_map(|rule| rule.restore(token)) {
                return restored;
            }
        }
        token.to_string()
    }

    /// Legend line defining every active entry
    pub fn legend(&self) -> String {
        self.active.iter().map(|e| e.definition()).collect()
    }
}

/// Renders the compressed schema: the legend line (if any entry is active)
/// followed by one `table(column type constraints,...)` line per table
pub fn render(instance: &CompressionInstance, assignment: &Assignment) -> String {
    let index = group_index(&instance.groups, instance.elements.len());

    let mut lines = Vec::new();
    let legend = Decoder::new(&instance.candidates, assignment).legend();
    if !legend.is_empty() {
        lines.push(legend);
    }

    let mut current: Option<(String, Vec<String>)> = None;
    for element in &instance.elements {
        let text = assignment
            .chosen(index[element.id], &instance.candidates)
            .map_or(element.value.as_str(), |c| c.rendered.as_str());
        match element.kind {
            ElementKind::TableName => {
                if let Some((name, items)) = current.take() {
                    lines.push(format!("{}({})", name, items.join(",")));
                }
                current = Some((text.to_string(), Vec::new()));
            }
            ElementKind::ColumnName => {
                if let Some((_, items)) = current.as_mut() {
                    items.push(text.to_string());
                }
            }
            _ => {
                if let Some((_, items)) = current.as_mut() {
                    match (element.owner.column.is_some(), items.last_mut()) {
                        (true, Some(item)) => {
                            item.push(' ');
                            item.push_str(text);
                        }
                        _ => items.push(text.to_string()),
                    }
                }
            }
        }
    }
    if let Some((name, items)) = current {
        lines.push(format!("{}({})", name, items.join(",")));
    }
    lines.join("\n")
}

/// Checks every invariant a produced assignment must satisfy.
///
/// Exactly one valid candidate per group, every referenced entry activated,
/// no token shared by different values, and every element decoding back to
/// its canonical string. Any violation is a [`SchemaPressError::CollisionViolation`].
pub fn validate(instance: &CompressionInstance, assignment: &Assignment) -> SchemaPressResult<()> {
    let groups = &instance.groups;
    let candidates = &instance.candidates;

    if assignment.choices.len() != groups.len() {
        return Err(SchemaPressError::CollisionViolation(format!(
            "assignment covers {} of {} groups",
            assignment.choices.len(),
            groups.len()
        )));
    }

    let mut owners: HashMap<&str, &str> = HashMap::new();
    for group in groups {
        let candidate = assignment.chosen(group.id, candidates).ok_or_else(|| {
            SchemaPressError::CollisionViolation(format!(
                "group {} ('{}') selects missing candidate {}",
                group.id, group.value, assignment.choices[group.id]
            ))
        })?;
        if let Some(entry) = candidate.entry {
            if !assignment.active_entries.contains(&entry) {
                return Err(SchemaPressError::CollisionViolation(format!(
                    "group {} uses '{}' without defining entry {}",
                    group.id, candidate.rendered, entry
                )));
            }
        }
        if let Some(other) = owners.insert(candidate.rendered.as_str(), group.value.as_str()) {
            if other != group.value {
                return Err(SchemaPressError::CollisionViolation(format!(
                    "token '{}' encodes both '{}' and '{}'",
                    candidate.rendered, other, group.value
                )));
            }
        }
    }

    let decoder = Decoder::new(candidates, assignment);
    let index = group_index(groups, instance.elements.len());
    for element in &instance.elements {
        let token = assignment
            .chosen(index[element.id], candidates)
            .map(|c| c.rendered.as_str())
            .unwrap_or_default();
        let decoded = decoder.decode(token, element.kind);
        if decoded != element.value {
            return Err(SchemaPressError::CollisionViolation(format!(
                "{} '{}' at {} decodes from '{}' to '{}'",
                element.kind, element.value, element.owner, token, decoded
            )));
        }
    }
    Ok(())
}
