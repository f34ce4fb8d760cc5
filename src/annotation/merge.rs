//! Annotation merging
//!
//! Elements with identical canonical strings must resolve to the same
//! encoding, so they are collapsed into one [`ElementGroup`]. This shrinks the
//! decision space from one variable set per element to one per distinct string.

use crate::annotation::{Element, ElementGroup, GroupId};
use std::collections::HashMap;
use tracing::debug;

/// Group `elements` by canonical string.
///
/// Groups appear in first-occurrence order and members in input order. When
/// `merge` is false every element becomes its own group.
pub fn merge_elements(elements: &[Element], merge: bool) -> Vec<ElementGroup> {
    let mut groups: Vec<ElementGroup> = Vec::new();
    let mut by_value: HashMap<&str, GroupId> = HashMap::new();

    for element in elements {
        if merge {
            if let Some(&id) = by_value.get(element.value.as_str()) {
                let group = &mut groups[id];
                group.mixed_kinds |= group.kind != element.kind;
                group.members.push(element.id);
                continue;
            }
            by_value.insert(element.value.as_str(), groups.len());
        }
        groups.push(ElementGroup {
            id: groups.len(),
            value: element.value.clone(),
            kind: element.kind,
            mixed_kinds: false,
            members: vec![element.id],
        });
    }

    debug!(
        elements = elements.len(),
        groups = groups.len(),
        merge,
        "merged elements"
    );
    groups
}

/// Map each element id to the group containing it
pub fn group_index(groups: &[ElementGroup], element_count: usize) -> Vec<GroupId> {
    let mut index = vec![0; element_count];
    for group in groups {
        for &member in &group.members {
            if let Some(slot) = index.get_mut(member) {
                *slot = group.id;
            }
        }
    }
    index
}
