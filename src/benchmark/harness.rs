//! Benchmark harness
//!
//! Runs every enabled (method, flags) plan on every schema of a corpus. Each
//! case is isolated: a parse error, a timeout without solution or an invariant
//! breach becomes a failed record and the run continues. Records are appended
//! to a shared sink that rewrites the output file after every case, so an
//! interrupted run keeps everything measured so far.

use crate::benchmark::config::BenchmarkConfig;
use crate::benchmark::corpus::{load_corpus, CorpusEntry};
use crate::benchmark::record::BenchmarkRecord;
use crate::common::error::{SchemaPressError, SchemaPressResult};
use crate::compression::{Method, SchemaCompressor};
use crate::solver::{BranchAndBound, Solver};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Collects records and keeps the output file current
pub struct RecordSink {
    records: Mutex<Vec<BenchmarkRecord>>,
    output: Option<PathBuf>,
}

impl RecordSink {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            output,
        }
    }

    /// Appends `record` and re-persists the full array
    pub fn push(&self, record: BenchmarkRecord) -> SchemaPressResult<()> {
        let mut records = self.records.lock();
        records.push(record);
        match &self.output {
            Some(path) => persist(path, records.as_slice()),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorts the records by schema, method and flags and writes them once more
    pub fn finish(self) -> SchemaPressResult<Vec<BenchmarkRecord>> {
        let mut records = self.records.into_inner();
        records.sort_by(|a, b| {
            (&a.schema, a.method.name(), &a.flags).cmp(&(&b.schema, b.method.name(), &b.flags))
        });
        if let Some(path) = &self.output {
            persist(path, &records)?;
        }
        Ok(records)
    }
}

/// Writes to a sibling temp file, then renames over `path`
fn persist<T: Serialize + ?Sized>(path: &Path, value: &T) -> SchemaPressResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Aggregate view of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkSummary {
    pub schemas: usize,
    pub cases: usize,
    pub failed: usize,
    pub optimal: usize,
    /// Mean compression ratio over successful non-baseline cases
    pub mean_ratio: Option<f64>,
}

impl BenchmarkSummary {
    pub fn from_records(schemas: usize, records: &[BenchmarkRecord]) -> Self {
        let ratios: Vec<f64> = records
            .iter()
            .filter(|r| r.method != Method::Verbatim)
            .filter_map(|r| r.compression_ratio)
            .collect();
        Self {
            schemas,
            cases: records.len(),
            failed: records.iter().filter(|r| r.is_error()).count(),
            optimal: records.iter().filter(|r| r.is_optimal).count(),
            mean_ratio: if ratios.is_empty() {
                None
            } else {
                Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
            },
        }
    }
}

pub struct BenchmarkHarness {
    config: BenchmarkConfig,
    solver: Arc<dyn Solver>,
}

impl BenchmarkHarness {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self::with_solver(config, Arc::new(BranchAndBound::new()))
    }

    pub fn with_solver(config: BenchmarkConfig, solver: Arc<dyn Solver>) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Runs the whole corpus and returns every record
    pub fn run(&self) -> SchemaPressResult<(Vec<BenchmarkRecord>, BenchmarkSummary)> {
        let entries = load_corpus(&self.config.corpus)?;
        let plans = self.config.plans();
        info!(
            corpus = %self.config.corpus.display(),
            schemas = entries.len(),
            plans = plans.len(),
            threads = self.config.threads,
            timeout_s = self.config.timeout.as_secs_f64(),
            "starting benchmark"
        );

        let sink = RecordSink::new(Some(self.config.output.clone()));
        // an empty corpus still produces a valid output file
        persist(&self.config.output, &Vec::<BenchmarkRecord>::new())?;

        if self.config.threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
                .map_err(|e| SchemaPressError::Internal(format!("thread pool: {}", e)))?;
            pool.install(|| {
                entries
                    .par_iter()
                    .try_for_each(|entry| self.run_entry(entry, &sink))
            })?;
        } else {
            for entry in &entries {
                self.run_entry(entry, &sink)?;
            }
        }

        let records = sink.finish()?;
        let summary = BenchmarkSummary::from_records(entries.len(), &records);
        info!(
            cases = summary.cases,
            failed = summary.failed,
            optimal = summary.optimal,
            mean_ratio = summary.mean_ratio.unwrap_or(0.0),
            output = %self.config.output.display(),
            "benchmark complete"
        );
        Ok((records, summary))
    }

    /// Runs every plan on one schema. Only sink I/O errors propagate.
    fn run_entry(&self, entry: &CorpusEntry, sink: &RecordSink) -> SchemaPressResult<()> {
        let started = Instant::now();
        let schema = match entry.load_schema() {
            Ok(schema) => schema,
            Err(err) => {
                warn!(schema = %entry.id, error = %err, "failed to load schema");
                let seconds = started.elapsed().as_secs_f64();
                for (method, flags) in self.config.plans() {
                    let record = BenchmarkRecord::failed(&entry.id, method, &flags, seconds, &err);
                    sink.push(record)?;
                }
                return Ok(());
            }
        };

        for (method, flags) in self.config.plans() {
            let config = self.config.compressor_config(&flags);
            let compressor = SchemaCompressor::with_solver(config, self.solver.clone());
            let started = Instant::now();
            let record = match compressor.compress(&schema, method) {
                Ok(mut result) => {
                    result.schema = entry.id.clone();
                    BenchmarkRecord::from_result(&result)
                }
                Err(err) => {
                    if err.is_invariant_breach() {
                        error!(
                            schema = %entry.id,
                            method = %method,
                            flags = %flags,
                            error = %err,
                            "invariant breach"
                        );
                    } else {
                        warn!(
                            schema = %entry.id,
                            method = %method,
                            flags = %flags,
                            error = %err,
                            "case failed"
                        );
                    }
                    let seconds = started.elapsed().as_secs_f64();
                    BenchmarkRecord::failed(&entry.id, method, &flags, seconds, &err)
                }
            };
            sink.push(record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AblationSet;
    use tempfile::TempDir;

    fn record(schema: &str, method: Method) -> BenchmarkRecord {
        let err = SchemaPressError::Internal("x".to_string());
        BenchmarkRecord::failed(schema, method, &AblationSet::new(), 0.0, &err)
    }

    #[test]
    fn test_sink_persists_after_each_push() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let sink = RecordSink::new(Some(path.clone()));

        sink.push(record("b", Method::Ilp)).unwrap();
        let saved: Vec<BenchmarkRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.len(), 1);

        sink.push(record("a", Method::Greedy)).unwrap();
        assert_eq!(sink.len(), 2);
        let records = sink.finish().unwrap();
        assert_eq!(records[0].schema, "a");
        assert!(!dir.path().join("out.json.tmp").exists());
    }

    #[test]
    fn test_summary_skips_baseline_ratio() {
        let mut baseline = record("a", Method::Verbatim);
        baseline.error = None;
        baseline.compression_ratio = Some(1.0);
        let mut greedy = record("a", Method::Greedy);
        greedy.error = None;
        greedy.compression_ratio = Some(2.0);
        let summary = BenchmarkSummary::from_records(1, &[baseline, greedy]);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.mean_ratio, Some(2.0));
    }

    #[test]
    fn test_summary() {
        let records = vec![record("a", Method::Greedy), record("b", Method::Ilp)];
        let summary = BenchmarkSummary::from_records(2, &records);
        assert_eq!(summary.cases, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.mean_ratio, None);
    }
}
