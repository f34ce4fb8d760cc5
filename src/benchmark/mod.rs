//! Corpus benchmarking of the compression methods

pub mod config;
pub mod corpus;
pub mod harness;
pub mod record;

pub use config::BenchmarkConfig;
pub use corpus::{load_corpus, CorpusEntry, CorpusSource};
pub use harness::{BenchmarkHarness, BenchmarkSummary, RecordSink};
pub use record::BenchmarkRecord;
