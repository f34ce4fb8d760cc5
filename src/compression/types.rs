/// Encoding candidates, assignments and compression results
use crate::annotation::{ElementGroup, GroupId};
use crate::common::error::{SchemaPressError, SchemaPressResult};
use crate::common::length::LengthModel;
use crate::compression::shorthand::SynonymRule;
use crate::config::AblationSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Index into [`CandidateSet::entries`]
pub type EntryId = usize;

/// How a candidate encodes its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// The canonical string itself
    Verbatim,
    /// A mined dictionary key, alone or followed by the unshared suffix
    Dictionary,
    /// A type synonym or a legend shorthand
    Shorthand,
}

/// One admissible encoding for a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub rendered: String,
    pub length: usize,
    /// Dictionary entry that must be defined when this candidate is chosen
    pub entry: Option<EntryId>,
    /// Synonym rule (index into [`CandidateSet::synonyms`]) this candidate applies
    pub synonym: Option<usize>,
}

impl Candidate {
    pub fn verbatim(value: &str, model: LengthModel) -> Self {
        Self {
            kind: CandidateKind::Verbatim,
            rendered: value.to_string(),
            length: model.measure(value),
            entry: None,
            synonym: None,
        }
    }
}

/// Origin of a dictionary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    /// Repeated whole value
    Value,
    /// Identifier prefix ending in `_`
    Prefix,
    /// Fixed legend shorthand such as `*` for `PRIMARY KEY`
    Legend,
}

/// A shared abbreviation defined once in the legend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub id: EntryId,
    pub key: String,
    pub expansion: String,
    pub origin: EntryOrigin,
    /// Length of the legend definition, paid once when activated
    pub definition_cost: usize,
}

impl DictionaryEntry {
    /// Legend text `key=expansion;`
    pub fn definition(&self) -> String {
        definition_text(&self.key, &self.expansion)
    }
}

pub fn definition_text(key: &str, expansion: &str) -> String {
    use crate::common::constants::{DEFINITION_SEPARATOR, DEFINITION_TERMINATOR};
    format!("{}{}{}{}", key, DEFINITION_SEPARATOR, expansion, DEFINITION_TERMINATOR)
}

/// Two candidates of groups with different values rendering the same token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollisionPair {
    pub first: (GroupId, usize),
    pub second: (GroupId, usize),
}

/// Candidates of every group plus the shared state they reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSet {
    /// Candidates per group, verbatim first
    pub per_group: Vec<Vec<Candidate>>,
    pub entries: Vec<DictionaryEntry>,
    /// Type synonyms enabled for this schema
    pub synonyms: Vec<SynonymRule>,
    pub collisions: Vec<CollisionPair>,
}

impl CandidateSet {
    pub fn candidates(&self, group: GroupId) -> &[Candidate] {
        self.per_group.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn candidate_count(&self) -> usize {
        self.per_group.iter().map(Vec::len).sum()
    }

    /// Objective of choosing verbatim everywhere
    pub fn verbatim_length(&self, groups: &[ElementGroup]) -> usize {
        groups
            .iter()
            .map(|g| g.weight() * self.candidates(g.id).first().map_or(0, |c| c.length))
            .sum()
    }
}

/// Chosen candidate per group plus the entries thereby activated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub choices: Vec<usize>,
    pub active_entries: BTreeSet<EntryId>,
}

impl Assignment {
    /// Verbatim for every group
    pub fn verbatim(group_count: usize) -> Self {
        Self {
            choices: vec![0; group_count],
            active_entries: BTreeSet::new(),
        }
    }

    /// Builds an assignment activating exactly the entries the choices need
    pub fn from_choices(choices: Vec<usize>, candidates: &CandidateSet) -> Self {
        let active_entries = choices
            .iter()
            .enumerate()
            .filter_map(|(group, &choice)| {
                candidates
                    .candidates(group)
                    .get(choice)
                    .and_then(|c| c.entry)
            })
            .collect();
        Self {
            choices,
            active_entries,
        }
    }

    pub fn chosen<'c>(
        &self,
        group: GroupId,
        candidates: &'c CandidateSet,
    ) -> Option<&'c Candidate> {
        self.choices
            .get(group)
            .and_then(|&choice| candidates.candidates(group).get(choice))
    }

    /// Σ weight·length over groups plus definitions of active entries
    pub fn total_length(
        &self,
        groups: &[ElementGroup],
        candidates: &CandidateSet,
    ) -> SchemaPressResult<usize> {
        let mut total = 0;
        for group in groups {
            let candidate = self.chosen(group.id, candidates).ok_or_else(|| {
                SchemaPressError::CollisionViolation(format!(
                    "group {} ('{}') has no valid choice",
                    group.id, group.value
                ))
            })?;
            total += group.weight() * candidate.length;
        }
        for &entry in &self.active_entries {
            total += candidates
                .entries
                .get(entry)
                .map(|e| e.definition_cost)
                .ok_or_else(|| crate::internal_err!("unknown dictionary entry {}", entry))?;
        }
        Ok(total)
    }

    /// Synonym rules chosen by at least one group
    pub fn synonyms_in_use(&self, candidates: &CandidateSet) -> BTreeSet<usize> {
        (0..self.choices.len())
            .filter_map(|group| self.chosen(group, candidates).and_then(|c| c.synonym))
            .collect()
    }
}

/// Compression method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Verbatim,
    Greedy,
    Ilp,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Verbatim => "verbatim",
            Method::Greedy => "greedy",
            Method::Ilp => "ilp",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Method {
    type Err = SchemaPressError;

    fn from_str(s: &str) -> SchemaPressResult<Self> {
        match s.to_lowercase().as_str() {
            "verbatim" => Ok(Method::Verbatim),
            "greedy" => Ok(Method::Greedy),
            "ilp" => Ok(Method::Ilp),
            other => Err(SchemaPressError::InvalidArgument(format!(
                "unknown method '{}', expected verbatim, greedy or ilp",
                other
            ))),
        }
    }
}

/// Solver statistics of an ILP run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    pub solver: String,
    pub objective: i64,
    pub is_optimal: bool,
    pub best_bound: f64,
    pub gap: f64,
    pub nr_variables: usize,
    pub nr_constraints: usize,
    pub nodes: u64,
}

/// Measurements of one compression run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetrics {
    pub length_model: LengthModel,
    pub original_length: usize,
    pub compressed_length: usize,
    pub compression_ratio: f64,
    pub seconds: f64,
    pub is_optimal: bool,
    pub nr_groups: usize,
    pub nr_candidates: usize,
    pub nr_entries: usize,
    pub solve: Option<SolveStats>,
}

/// Outcome of compressing one schema with one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    pub schema: String,
    pub method: Method,
    pub flags: AblationSet,
    pub assignment: Assignment,
    pub metrics: CompressionMetrics,
    /// Legend and table lines ready to be placed in a prompt
    pub text: String,
}
