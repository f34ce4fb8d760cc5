//! Candidate generation
//!
//! For every group the generator emits, in this order:
//!
//! 1. the verbatim string;
//! 2. references to mined dictionary entries, shortest first;
//! 3. shorthand rules for the group's semantic class.
//!
//! Dictionary entries are mined from the schema itself: whole values that
//! occur at least twice and `_`-terminated identifier prefixes shared by at
//! least two distinct identifiers. Entries are ranked by estimated saving and
//! keyed `<sigil><letter>`, where the sigil is a character absent from every
//! canonical value, so a key can never be confused with schema text.

use crate::annotation::{ElementGroup, ElementKind, GroupId};
use crate::common::constants::{KEY_SIGILS, MAX_DICTIONARY_ENTRIES};
use crate::common::length::LengthModel;
use crate::compression::shorthand::{enabled_legend, enabled_synonyms};
use crate::compression::types::{
    definition_text, Candidate, CandidateKind, CandidateSet, CollisionPair, DictionaryEntry,
    EntryId, EntryOrigin,
};
use crate::config::CompressorConfig;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Enumerates the admissible encodings of each group
pub struct CandidateGenerator<'a> {
    config: &'a CompressorConfig,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(config: &'a CompressorConfig) -> Self {
        Self { config }
    }

    fn model(&self) -> LengthModel {
        self.config.length_model
    }

    pub fn generate(&self, groups: &[ElementGroup]) -> CandidateSet {
        let model = self.model();
        let mut entries = match choose_sigil(groups) {
            Some(sigil) => self.mine_entries(groups, sigil),
            None => {
                debug!("every key sigil occurs in the schema, skipping dictionary mining");
                Vec::new()
            }
        };
        let mined = entries.len();
        let synonyms = enabled_synonyms(groups);
        let legend = enabled_legend(groups);
        let mut legend_ids: HashMap<&'static str, EntryId> = HashMap::new();

        let mut per_group = Vec::with_capacity(groups.len());
        for group in groups {
            let verbatim = Candidate::verbatim(&group.value, model);
            let mut options: Vec<Candidate> = Vec::new();

            let mut references: Vec<Candidate> = entries[..mined]
                .iter()
                .filter_map(|entry| self.reference(group, entry))
                .collect();
            references.sort_by_key(|c| (c.length, c.entry));
            options.extend(references);

            if !group.mixed_kinds {
                if group.kind == ElementKind::TypeName {
                    for (idx, rule) in synonyms.iter().enumerate() {
                        if let Some(rendered) = rule.apply(&group.value) {
                            options.push(Candidate {
                                kind: CandidateKind::Shorthand,
                                length: model.measure(&rendered),
                                rendered,
                                entry: None,
                                synonym: Some(idx),
                            });
                        }
                    }
                }
                for rule in legend.iter().filter(|r| r.applies_to(group.kind)) {
                    let Some(rendered) = rule.apply(&group.value) else {
                        continue;
                    };
                    let id = *legend_ids.entry(rule.key).or_insert_with(|| {
                        let id = entries.len();
                        entries.push(DictionaryEntry {
                            id,
                            key: rule.key.to_string(),
                            expansion: rule.phrase.to_string(),
                            origin: EntryOrigin::Legend,
                            definition_cost: model.measure(&definition_text(rule.key, rule.phrase)),
                        });
                        id
                    });
                    options.push(Candidate {
                        kind: CandidateKind::Shorthand,
                        length: model.measure(&rendered),
                        rendered,
                        entry: Some(id),
                        synonym: None,
                    });
                }
            }

            let mut seen: BTreeSet<String> = BTreeSet::new();
            seen.insert(verbatim.rendered.clone());
            let mut candidates = vec![verbatim];
            for option in options {
                if option.length < candidates[0].length && seen.insert(option.rendered.clone()) {
                    candidates.push(option);
                }
            }
            per_group.push(candidates);
        }

        let collisions = find_collisions(groups, &per_group);
        let set = CandidateSet {
            per_group,
            entries,
            synonyms,
            collisions,
        };
        debug!(
            groups = groups.len(),
            candidates = set.candidate_count(),
            entries = set.entries.len(),
            collisions = set.collisions.len(),
            "generated candidates"
        );
        set
    }

    /// Reference to `entry` for `group`, if the entry covers its value
    fn reference(&self, group: &ElementGroup, entry: &DictionaryEntry) -> Option<Candidate> {
        let rendered = if group.value == entry.expansion {
            entry.key.clone()
        } else if entry.origin == EntryOrigin::Prefix
            && group.kind.is_identifier()
            && group.value.starts_with(&entry.expansion)
        {
            format!("{}{}", entry.key, &group.value[entry.expansion.len()..])
        } else {
            return None;
        };
        Some(Candidate {
            kind: CandidateKind::Dictionary,
            length: self.model().measure(&rendered),
            rendered,
            entry: Some(entry.id),
            synonym: None,
        })
    }

    /// Ranked whole-value and prefix entries, keyed in rank order
    fn mine_entries(&self, groups: &[ElementGroup], sigil: char) -> Vec<DictionaryEntry> {
        let model = self.model();
        let sample_key = format!("{}A", sigil);
        let key_len = model.measure(&sample_key) as i64;
        let definition_cost =
            |expansion: &str| model.measure(&definition_text(&sample_key, expansion)) as i64;

        let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
        let mut identifiers: BTreeSet<&str> = BTreeSet::new();
        for group in groups {
            *occurrences.entry(group.value.as_str()).or_default() += group.weight();
            if group.kind.is_identifier() {
                identifiers.insert(group.value.as_str());
            }
        }

        let mut mined: BTreeMap<&str, (EntryOrigin, i64)> = BTreeMap::new();
        for (&value, &count) in &occurrences {
            if count < 2 {
                continue;
            }
            let saving =
                count as i64 * (model.measure(value) as i64 - key_len) - definition_cost(value);
            if saving > 0 {
                mined.insert(value, (EntryOrigin::Value, saving));
            }
        }

        let mut prefixes: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for &value in &identifiers {
            for (pos, ch) in value.char_indices() {
                let end = pos + ch.len_utf8();
                if ch == '_' && end >= self.config.min_prefix_len && end < value.len() {
                    prefixes.entry(&value[..end]).or_default().push(value);
                }
            }
        }
        for (prefix, values) in prefixes {
            if values.len() < 2 {
                continue;
            }
            let per_use: i64 = values
                .iter()
                .map(|v| {
                    let rendered = format!("{}{}", sample_key, &v[prefix.len()..]);
                    let count = occurrences.get(v).copied().unwrap_or(0) as i64;
                    count * (model.measure(v) as i64 - model.measure(&rendered) as i64)
                })
                .sum();
            let saving = per_use - definition_cost(prefix);
            if saving > 0 {
                mined
                    .entry(prefix)
                    .and_modify(|e| *e = (EntryOrigin::Prefix, e.1.max(saving)))
                    .or_insert((EntryOrigin::Prefix, saving));
            }
        }

        let mut ranked: Vec<(&str, EntryOrigin, i64)> = mined
            .into_iter()
            .map(|(expansion, (origin, saving))| (expansion, origin, saving))
            .collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(b.0)));
        ranked.truncate(self.config.max_dictionary_entries.min(MAX_DICTIONARY_ENTRIES));

        ranked
            .into_iter()
            .zip('A'..='Z')
            .enumerate()
            .map(|(id, ((expansion, origin, _), letter))| {
                let key = format!("{}{}", sigil, letter);
                DictionaryEntry {
                    id,
                    definition_cost: model.measure(&definition_text(&key, expansion)),
                    key,
                    expansion: expansion.to_string(),
                    origin,
                }
            })
            .collect()
    }
}

/// First sigil that occurs in no canonical value
pub fn choose_sigil(groups: &[ElementGroup]) -> Option<char> {
    KEY_SIGILS
        .iter()
        .copied()
        .find(|sigil| !groups.iter().any(|g| g.value.contains(*sigil)))
}

/// All pairs of candidates from groups with different values sharing a token
fn find_collisions(groups: &[ElementGroup], per_group: &[Vec<Candidate>]) -> Vec<CollisionPair> {
    let mut by_token: HashMap<&str, Vec<(GroupId, usize)>> = HashMap::new();
    for (group, candidates) in per_group.iter().enumerate() {
        for (idx, candidate) in candidates.iter().enumerate() {
            by_token
                .entry(candidate.rendered.as_str())
                .or_default()
                .push((group, idx));
        }
    }

    let mut pairs = Vec::new();
    for users in by_token.values() {
        for (i, &first) in users.iter().enumerate() {
            for &second in &users[i + 1..] {
                if groups[first.0].value != groups[second.0].value {
                    pairs.push(CollisionPair { first, second });
                }
            }
        }
    }
    pairs.sort();
    pairs
}
