//! Greedy encoding selection
//!
//! Groups are visited by potential saving, highest first. Each group takes the
//! candidate with the lowest marginal cost, where a dictionary reference pays
//! its entry's definition only if no earlier group activated it. Tokens that
//! equal another value's verbatim form, or that a different value already
//! committed to, are skipped, so the result is collision-free by construction.

use crate::annotation::{ElementGroup, GroupId};
use crate::common::error::SchemaPressResult;
use crate::compression::traits::{Compressor, Outcome};
use crate::compression::types::{Assignment, CandidateSet, EntryId, Method};
use crate::compression::CompressionInstance;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Fast feasible heuristic, also the ILP's warm start
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyCompressor;

impl GreedyCompressor {
    pub fn new() -> Self {
        Self
    }

    pub fn assign(&self, groups: &[ElementGroup], candidates: &CandidateSet) -> Assignment {
        let mut reserved: HashMap<&str, &str> = HashMap::new();
        for group in groups {
            reserved.insert(group.value.as_str(), group.value.as_str());
        }
        let mut committed: HashMap<&str, &str> = HashMap::new();
        let mut active: BTreeSet<EntryId> = BTreeSet::new();
        let mut choices = vec![0; groups.len()];

        for group_id in processing_order(groups, candidates) {
            let group = &groups[group_id];
            let value = group.value.as_str();
            let mut best: Option<(usize, usize)> = None;

            for (idx, candidate) in candidates.candidates(group_id).iter().enumerate() {
                let token = candidate.rendered.as_str();
                let taken =
                    |owners: &HashMap<&str, &str>| owners.get(token).is_some_and(|v| *v != value);
                if idx > 0 && (taken(&reserved) || taken(&committed)) {
                    continue;
                }
                let definition = candidate
                    .entry
                    .filter(|entry| !active.contains(entry))
                    .and_then(|entry| candidates.entries.get(entry))
                    .map_or(0, |entry| entry.definition_cost);
                let marginal = group.weight() * candidate.length + definition;
                if best.map_or(true, |(_, cost)| marginal < cost) {
                    best = Some((idx, marginal));
                }
            }

            let choice = best.map_or(0, |(idx, _)| idx);
            if let Some(candidate) = candidates.candidates(group_id).get(choice) {
                committed.insert(candidate.rendered.as_str(), value);
                if let Some(entry) = candidate.entry {
                    active.insert(entry);
                }
            }
            choices[group_id] = choice;
        }

        let assignment = Assignment::from_choices(choices, candidates);
        debug!(
            groups = groups.len(),
            active_entries = assignment.active_entries.len(),
            "greedy assignment complete"
        );
        assignment
    }
}

/// Groups by descending `weight · (verbatim − shortest candidate)`, then by value
fn processing_order(groups: &[ElementGroup], candidates: &CandidateSet) -> Vec<GroupId> {
    let mut order: Vec<(usize, &str, GroupId)> = groups
        .iter()
        .map(|group| {
            let options = candidates.candidates(group.id);
            let verbatim = options.first().map_or(0, |c| c.length);
            let best = options.iter().map(|c| c.length).min().unwrap_or(verbatim);
            (group.weight() * (verbatim - best), group.value.as_str(), group.id)
        })
        .collect();
    order.sort_by_key(|&(saving, value, id)| (Reverse(saving), value, id));
    order.into_iter().map(|(_, _, id)| id).collect()
}

impl Compressor for GreedyCompressor {
    fn method(&self) -> Method {
        Method::Greedy
    }

    fn compress(&self, instance: &CompressionInstance) -> SchemaPressResult<Outcome> {
        Ok(Outcome::heuristic(
            self.assign(&instance.groups, &instance.candidates),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ElementKind;
    use crate::common::length::LengthModel;
    use crate::compression::types::{Candidate, CandidateKind, DictionaryEntry, EntryOrigin};

    fn group(id: usize, value: &str, weight: usize) -> ElementGroup {
        ElementGroup {
            id,
            value: value.to_string(),
            kind: ElementKind::ColumnName,
            mixed_kinds: false,
            members: (0..weight).map(|i| id * 100 + i).collect(),
        }
    }

    fn shorthand(rendered: &str, entry: Option<EntryId>) -> Candidate {
        Candidate {
            kind: CandidateKind::Shorthand,
            rendered: rendered.to_string(),
            length: rendered.len(),
            entry,
            synonym: None,
        }
    }

    fn entry(id: EntryId, key: &str, expansion: &str, cost: usize) -> DictionaryEntry {
        DictionaryEntry {
            id,
            key: key.to_string(),
            expansion: expansion.to_string(),
            origin: EntryOrigin::Value,
            definition_cost: cost,
        }
    }

    #[test]
    fn test_pays_definition_once() {
        let groups = vec![group(0, "customer_name", 3), group(1, "customer_city", 3)];
        let set = CandidateSet {
            per_group: vec![
                vec![
                    Candidate::verbatim("customer_name", LengthModel::Chars),
                    shorthand("$Aname", Some(0)),
                ],
                vec![
                    Candidate::verbatim("customer_city", LengthModel::Chars),
                    shorthand("$Acity", Some(0)),
                ],
            ],
            entries: vec![entry(0, "$A", "customer_", 13)],
            ..CandidateSet::default()
        };
        let assignment = GreedyCompressor::new().assign(&groups, &set);
        assert_eq!(assignment.choices, vec![1, 1]);
        assert_eq!(assignment.total_length(&groups, &set).unwrap(), 18 + 18 + 13);
    }

    #[test]
    fn test_skips_reserved_tokens() {
        // "ab" may not shorten to "a" because another group is literally "a"
        let groups = vec![group(0, "ab", 5), group(1, "a", 1)];
        let set = CandidateSet {
            per_group: vec![
                vec![Candidate::verbatim("ab", LengthModel::Chars), shorthand("a", None)],
                vec![Candidate::verbatim("a", LengthModel::Chars)],
            ],
            ..CandidateSet::default()
        };
        let assignment = GreedyCompressor::new().assign(&groups, &set);
        assert_eq!(assignment.choices, vec![0, 0]);
    }

    #[test]
    fn test_skips_committed_tokens() {
        let groups = vec![group(0, "alpha", 4), group(1, "omega", 2)];
        let set = CandidateSet {
            per_group: vec![
                vec![Candidate::verbatim("alpha", LengthModel::Chars), shorthand("x", None)],
                vec![
                    Candidate::verbatim("omega", LengthModel::Chars),
                    shorthand("x", None),
                    shorthand("om", None),
                ],
            ],
            ..CandidateSet::default()
        };
        let assignment = GreedyCompressor::new().assign(&groups, &set);
        // alpha has the larger saving and claims "x" first
        assert_eq!(assignment.choices, vec![1, 2]);
    }

    #[test]
    fn test_keeps_verbatim_when_definition_too_costly() {
        let groups = vec![group(0, "region", 1)];
        let set = CandidateSet {
            per_group: vec![vec![
                Candidate::verbatim("region", LengthModel::Chars),
                shorthand("$A", Some(0)),
            ]],
            entries: vec![entry(0, "$A", "region", 10)],
            ..CandidateSet::default()
        };
        let assignment = GreedyCompressor::new().assign(&groups, &set);
        assert_eq!(assignment.choices, vec![0]);
        assert!(assignment.active_entries.is_empty());
    }

    #[test]
    fn test_processing_order() {
        let groups = vec![group(0, "b", 1), group(1, "aaaa", 2), group(2, "a", 1)];
        let set = CandidateSet {
            per_group: vec![
                vec![Candidate::verbatim("b", LengthModel::Chars)],
                vec![Candidate::verbatim("aaaa", LengthModel::Chars), shorthand("q", None)],
                vec![Candidate::verbatim("a", LengthModel::Chars)],
            ],
            ..CandidateSet::default()
        };
        assert_eq!(processing_order(&groups, &set), vec![1, 2, 0]);
    }
}
