//! schemapress - Token-efficient schema descriptions
//!
//! Compresses relational schemas for inclusion in LLM prompts. Every textual
//! fragment of a schema (table and column names, types, constraints) is either
//! written verbatim, abbreviated through a shared dictionary defined once in a
//! legend, or replaced by a shorter equivalent. A greedy heuristic and an
//! integer program choose the encodings so the total length is minimal while
//! the text stays unambiguous.
//!
pub mod annotation;
pub mod benchmark;
pub mod common;
pub mod compression;
pub mod config;
pub mod schema;
pub mod solver;

// Re-export common types for convenience
pub use common::{LengthModel, SchemaPressError, SchemaPressResult};

// Re-export the schema model for convenience
pub use schema::{parser::parse_ddl, Column, Schema, Table};

// Re-export the compression pipeline for convenience
pub use compression::{
    compress_schema, CompressionInstance, CompressionMetrics, CompressionResult, Method,
    SchemaCompressor,
};

pub use config::{Ablation, AblationSet, CompressorConfig};

pub use benchmark::{BenchmarkConfig, BenchmarkHarness, BenchmarkRecord};
