//! Schema compression pipeline
//!
//! parse → extract → merge → generate candidates → greedy / ILP → validate →
//! measure. [`SchemaCompressor`] runs the whole pipeline for one schema and
//! one method; the submodules hold the individual stages.

pub mod candidates;
pub mod decode;
pub mod greedy;
pub mod ilp;
pub mod shorthand;
pub mod traits;
pub mod types;

pub use candidates::CandidateGenerator;
pub use decode::{render, validate, Decoder};
pub use greedy::GreedyCompressor;
pub use ilp::{IlpBuilder, IlpCompressor, IlpModel};
pub use traits::{CompressionStats, Compressor, Outcome};
pub use types::{
    Assignment, Candidate, CandidateKind, CandidateSet, CollisionPair, CompressionMetrics,
    CompressionResult, DictionaryEntry, EntryId, EntryOrigin, Method, SolveStats,
};

use crate::annotation::{extract, merge_elements, Element, ElementGroup};
use crate::common::error::SchemaPressResult;
use crate::config::CompressorConfig;
use crate::schema::Schema;
use crate::solver::{BranchAndBound, Solver};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Everything the compressors decide over, derived once per run
#[derive(Debug, Clone)]
pub struct CompressionInstance {
    pub schema: String,
    pub elements: Vec<Element>,
    pub groups: Vec<ElementGroup>,
    pub candidates: CandidateSet,
}

impl CompressionInstance {
    pub fn build(schema: &Schema, config: &CompressorConfig) -> Self {
        let elements = extract(schema);
        let groups = merge_elements(&elements, config.merge());
        let candidates = CandidateGenerator::new(config).generate(&groups);
        Self {
            schema: schema.name.clone(),
            elements,
            groups,
            candidates,
        }
    }

    /// Length of the uncompressed encoding
    pub fn original_length(&self) -> usize {
        self.candidates.verbatim_length(&self.groups)
    }
}

/// Baseline leaving every fragment as written
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimCompressor;

impl Compressor for VerbatimCompressor {
    fn method(&self) -> Method {
        Method::Verbatim
    }

    fn compress(&self, instance: &CompressionInstance) -> SchemaPressResult<Outcome> {
        Ok(Outcome::heuristic(Assignment::verbatim(instance.groups.len())))
    }
}

/// Runs the compression pipeline
pub struct SchemaCompressor {
    config: CompressorConfig,
    solver: Arc<dyn Solver>,
}

impl SchemaCompressor {
    /// Compressor using the built-in branch and bound backend
    pub fn new(config: CompressorConfig) -> Self {
        Self::with_solver(config, Arc::new(BranchAndBound::new()))
    }

    pub fn with_solver(config: CompressorConfig, solver: Arc<dyn Solver>) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    fn compressor(&self, method: Method) -> Box<dyn Compressor> {
        match method {
            Method::Verbatim => Box::new(VerbatimCompressor),
            Method::Greedy => Box::new(GreedyCompressor::new()),
            Method::Ilp => Box::new(IlpCompressor::new(self.solver.clone(), self.config.clone())),
        }
    }

    pub fn compress(
        &self,
        schema: &Schema,
        method: Method,
    ) -> SchemaPressResult<CompressionResult> {
        self.config.validate()?;
        let started = Instant::now();
        let instance = CompressionInstance::build(schema, &self.config);
        let compressor = self.compressor(method);
        let method = compressor.method();
        let outcome = compressor.compress(&instance)?;

        if let Err(err) = validate(&instance, &outcome.assignment) {
            error!(
                schema = %instance.schema,
                method = %method,
                groups = instance.groups.len(),
                candidates = instance.candidates.candidate_count(),
                collisions = instance.candidates.collisions.len(),
                active_entries = ?outcome.assignment.active_entries,
                error = %err,
                "produced assignment violates an encoding invariant"
            );
            return Err(err);
        }

        let original_length = instance.original_length();
        let compressed_length = outcome
            .assignment
            .total_length(&instance.groups, &instance.candidates)?;
        if compressed_length > original_length {
            return Err(crate::internal_err!(
                "{} assignment for {} is longer than verbatim ({} > {})",
                method,
                instance.schema,
                compressed_length,
                original_length
            ));
        }

        let text = render(&instance, &outcome.assignment);
        let is_optimal = outcome.is_optimal();
        let mut metrics = CompressionMetrics {
            length_model: self.config.length_model,
            original_length,
            compressed_length,
            compression_ratio: 1.0,
            seconds: 0.0,
            is_optimal,
            nr_groups: instance.groups.len(),
            nr_candidates: instance.candidates.candidate_count(),
            nr_entries: instance.candidates.entries.len(),
            solve: outcome.solve,
        };
        metrics.compression_ratio = metrics.compression_ratio();
        metrics.seconds = started.elapsed().as_secs_f64();

        info!(
            schema = %instance.schema,
            method = %method,
            flags = %self.config.ablations,
            original = original_length,
            compressed = compressed_length,
            ratio = metrics.compression_ratio,
            seconds = metrics.seconds,
            "compressed schema"
        );

        Ok(CompressionResult {
            schema: instance.schema,
            method,
            flags: self.config.ablations.clone(),
            assignment: outcome.assignment,
            metrics,
            text,
        })
    }
}

/// Compress `schema` with the built-in solver (convenience function)
pub fn compress_schema(
    schema: &Schema,
    method: Method,
    config: &CompressorConfig,
) -> SchemaPressResult<CompressionResult> {
    SchemaCompressor::new(config.clone()).compress(schema, method)
}
