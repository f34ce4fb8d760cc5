//! Benchmark run configuration

use crate::common::constants::{DEFAULT_DICTIONARY_ENTRIES, DEFAULT_TIMEOUT_SECS};
use crate::common::length::LengthModel;
use crate::compression::Method;
use crate::config::{Ablation, AblationSet, CompressorConfig};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Settings of one benchmark run over a corpus
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Directory of `.sql` files and Spider `tables.json` catalogs
    pub corpus: PathBuf,
    /// JSON file the records are written to
    pub output: PathBuf,
    /// Per-case solver time limit
    pub timeout: Duration,
    pub ablations: AblationSet,
    /// Expand the ablations into every combination of the ILP toggles
    pub sweep: bool,
    /// Worker threads, 1 runs cases sequentially
    pub threads: usize,
    pub length_model: LengthModel,
    pub max_dictionary_entries: usize,
}

impl BenchmarkConfig {
    pub fn new(corpus: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            corpus: corpus.into(),
            output: output.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            ablations: AblationSet::new(),
            sweep: false,
            threads: 1,
            length_model: LengthModel::Chars,
            max_dictionary_entries: DEFAULT_DICTIONARY_ENTRIES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ablations(mut self, ablations: AblationSet) -> Self {
        self.ablations = ablations;
        self
    }

    pub fn with_sweep(mut self, sweep: bool) -> Self {
        self.sweep = sweep;
        self
    }

    /// `0` uses one thread per core
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = if threads == 0 { num_cpus::get() } else { threads };
        self
    }

    pub fn with_length_model(mut self, length_model: LengthModel) -> Self {
        self.length_model = length_model;
        self
    }

    /// The (method, flags) combinations run for every schema.
    ///
    /// A verbatim baseline comes first and carries no flags. Greedy only
    /// depends on merging, so it runs once per distinct merge setting and is
    /// tagged with `nomerge` alone. The ILP runs for every flag combination
    /// unless `noilp` is set.
    pub fn plans(&self) -> Vec<(Method, AblationSet)> {
        let sets = if self.sweep {
            self.ablations.sweep()
        } else {
            vec![self.ablations.clone()]
        };

        let mut greedy_seen = BTreeSet::new();
        let mut plans = vec![(Method::Verbatim, AblationSet::new())];
        for flags in sets {
            let greedy_flags: AblationSet =
                flags.iter().filter(|a| *a == Ablation::NoMerge).collect();
            if greedy_seen.insert(greedy_flags.clone()) {
                plans.push((Method::Greedy, greedy_flags));
            }
            if !self.ablations.contains(Ablation::NoIlp) {
                let ilp_flags: AblationSet =
                    flags.iter().filter(|a| *a != Ablation::NoIlp).collect();
                plans.push((Method::Ilp, ilp_flags));
            }
        }
        plans
    }

    /// Compressor settings for one plan
    pub fn compressor_config(&self, flags: &AblationSet) -> CompressorConfig {
        CompressorConfig::default()
            .with_length_model(self.length_model)
            .with_max_dictionary_entries(self.max_dictionary_entries)
            .with_time_limit(self.timeout)
            .with_ablations(flags.clone())
    }
}
