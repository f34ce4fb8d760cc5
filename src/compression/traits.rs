//! Compressor trait
//!
//! Every encoding strategy turns a prepared [`CompressionInstance`] into an
//! [`Assignment`], optionally with solver statistics. The pipeline validates
//! and measures whatever a compressor returns.
use crate::common::error::SchemaPressResult;
use crate::compression::types::{Assignment, CompressionMetrics, Method, SolveStats};
use crate::compression::CompressionInstance;

/// What a compressor produced for one instance
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub assignment: Assignment,
    /// Present when an integer program was solved
    pub solve: Option<SolveStats>,
}

impl Outcome {
    pub fn heuristic(assignment: Assignment) -> Self {
        Self {
            assignment,
            solve: None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.solve.as_ref().is_some_and(|s| s.is_optimal)
    }
}

/// An encoding strategy
pub trait Compressor: Send + Sync {
    fn method(&self) -> Method;

    /// Chooses one candidate per group of `instance`
    fn compress(&self, instance: &CompressionInstance) -> SchemaPressResult<Outcome>;
}

/// Helper trait for compression statistics
pub trait CompressionStats {
    /// Returns the verbatim length
    fn original_length(&self) -> usize;

    /// Returns the encoded length including legend definitions
    fn compressed_length(&self) -> usize;

    /// Returns the compression ratio (original / compressed)
    fn compression_ratio(&self) -> f64 {
        if self.compressed_length() > 0 {
            self.original_length() as f64 / self.compressed_length() as f64
        } else {
            1.0
        }
    }

    /// Returns the space savings as a percentage
    fn space_savings(&self) -> f64 {
        if self.original_length() > 0 {
            (1.0 - (self.compressed_length() as f64 / self.original_length() as f64)) * 100.0
        } else {
            0.0
        }
    }
}

impl CompressionStats for CompressionMetrics {
    fn original_length(&self) -> usize {
        self.original_length
    }

    fn compressed_length(&self) -> usize {
        self.compressed_length
    }
}
