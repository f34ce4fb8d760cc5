//! Compressor configuration and ablation flags

use crate::common::constants::{
    DEFAULT_DICTIONARY_ENTRIES, DEFAULT_MIN_PREFIX_LEN, DEFAULT_TIMEOUT_SECS,
    MAX_DICTIONARY_ENTRIES,
};
use crate::common::error::{SchemaPressError, SchemaPressResult};
use crate::common::length::LengthModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A single switch disabling one part of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ablation {
    /// Solve the ILP without the greedy warm start
    NoStart,
    /// Solve the ILP without branching hints
    NoHints,
    /// Decide per element instead of per merged group
    NoMerge,
    /// Skip the ILP method entirely
    NoIlp,
}

impl Ablation {
    pub const ALL: [Ablation; 4] = [
        Ablation::NoStart,
        Ablation::NoHints,
        Ablation::NoMerge,
        Ablation::NoIlp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Ablation::NoStart => "nostart",
            Ablation::NoHints => "nohints",
            Ablation::NoMerge => "nomerge",
            Ablation::NoIlp => "noilp",
        }
    }
}

impl fmt::Display for Ablation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Ablation {
    type Err = SchemaPressError;

    fn from_str(s: &str) -> SchemaPressResult<Self> {
        let normalized = s.trim().trim_start_matches("--").to_lowercase();
        Ablation::ALL
            .iter()
            .copied()
            .find(|a| a.name() == normalized)
            .ok_or_else(|| SchemaPressError::InvalidArgument(format!("unknown ablation '{}'", s)))
    }
}

/// The set of enabled ablations for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AblationSet(BTreeSet<Ablation>);

impl AblationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ablation: Ablation) -> Self {
        self.0.insert(ablation);
        self
    }

    pub fn insert(&mut self, ablation: Ablation) {
        self.0.insert(ablation);
    }

    pub fn contains(&self, ablation: Ablation) -> bool {
        self.0.contains(&ablation)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Ablation> + '_ {
        self.0.iter().copied()
    }

    /// Flag names, in declaration order
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|a| a.name().to_string()).collect()
    }

    /// Every combination of the ILP toggles that keeps the flags of `self`.
    ///
    /// `NoIlp` is not a toggle of the ILP itself and is never part of the
    /// expansion. The first element is always `self` without `NoIlp`.
    pub fn sweep(&self) -> Vec<AblationSet> {
        let toggles: Vec<Ablation> = [Ablation::NoStart, Ablation::NoHints, Ablation::NoMerge]
            .into_iter()
            .filter(|a| !self.contains(*a))
            .collect();
        let base: BTreeSet<Ablation> = self.iter().filter(|a| *a != Ablation::NoIlp).collect();

        (0..1usize << toggles.len())
            .map(|mask| {
                let mut set = base.clone();
                for (bit, ablation) in toggles.iter().enumerate() {
                    if mask & (1 << bit) != 0 {
                        set.insert(*ablation);
                    }
                }
                AblationSet(set)
            })
            .collect()
    }
}

impl FromIterator<Ablation> for AblationSet {
    fn from_iter<I: IntoIterator<Item = Ablation>>(iter: I) -> Self {
        AblationSet(iter.into_iter().collect())
    }
}

impl fmt::Display for AblationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.names().join("+"))
        }
    }
}

/// Comma or plus separated flag list, `none` for the empty set
impl FromStr for AblationSet {
    type Err = SchemaPressError;

    fn from_str(s: &str) -> SchemaPressResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(AblationSet::new());
        }
        trimmed
            .split([',', '+'])
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect()
    }
}

/// Settings for one compression run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorConfig {
    pub length_model: LengthModel,
    /// Cap on mined dictionary entries (at most 26, one key letter each)
    pub max_dictionary_entries: usize,
    /// Shortest `_`-terminated prefix considered for a dictionary entry
    pub min_prefix_len: usize,
    /// Wall-clock budget handed to the solver
    pub time_limit: Duration,
    pub ablations: AblationSet,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            length_model: LengthModel::default(),
            max_dictionary_entries: DEFAULT_DICTIONARY_ENTRIES,
            min_prefix_len: DEFAULT_MIN_PREFIX_LEN,
            time_limit: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            ablations: AblationSet::new(),
        }
    }
}

impl CompressorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length_model(mut self, length_model: LengthModel) -> Self {
        self.length_model = length_model;
        self
    }

    pub fn with_max_dictionary_entries(mut self, entries: usize) -> Self {
        self.max_dictionary_entries = entries.min(MAX_DICTIONARY_ENTRIES);
        self
    }

    pub fn with_min_prefix_len(mut self, len: usize) -> Self {
        self.min_prefix_len = len;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_ablations(mut self, ablations: AblationSet) -> Self {
        self.ablations = ablations;
        self
    }

    pub fn warm_start(&self) -> bool {
        !self.ablations.contains(Ablation::NoStart)
    }

    pub fn hints(&self) -> bool {
        !self.ablations.contains(Ablation::NoHints)
    }

    pub fn merge(&self) -> bool {
        !self.ablations.contains(Ablation::NoMerge)
    }

    pub fn validate(&self) -> SchemaPressResult<()> {
        if self.max_dictionary_entries > MAX_DICTIONARY_ENTRIES {
            return Err(SchemaPressError::InvalidArgument(format!(
                "max_dictionary_entries must be at most {}, got {}",
                MAX_DICTIONARY_ENTRIES, self.max_dictionary_entries
            )));
        }
        if self.min_prefix_len < 2 {
            return Err(SchemaPressError::InvalidArgument(
                "min_prefix_len must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}
