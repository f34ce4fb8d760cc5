//! Benchmark output records

use crate::common::error::SchemaPressError;
use crate::compression::{CompressionResult, Method};
use crate::config::AblationSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (schema, method, flags) measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub schema: String,
    pub method: Method,
    pub flags: Vec<String>,
    pub original_length: Option<usize>,
    pub compressed_length: Option<usize>,
    pub compression_ratio: Option<f64>,
    pub seconds: f64,
    pub is_optimal: bool,
    pub gap: Option<f64>,
    pub nr_variables: Option<usize>,
    pub nr_constraints: Option<usize>,
    pub nodes: Option<u64>,
    /// Message of a failed case
    pub error: Option<String>,
    pub error_kind: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl BenchmarkRecord {
    pub fn from_result(result: &CompressionResult) -> Self {
        let metrics = &result.metrics;
        let solve = metrics.solve.as_ref();
        Self {
            schema: result.schema.clone(),
            method: result.method,
            flags: result.flags.names(),
            original_length: Some(metrics.original_length),
            compressed_length: Some(metrics.compressed_length),
            compression_ratio: Some(metrics.compression_ratio),
            seconds: metrics.seconds,
            is_optimal: metrics.is_optimal,
            gap: solve.map(|s| s.gap),
            nr_variables: solve.map(|s| s.nr_variables),
            nr_constraints: solve.map(|s| s.nr_constraints),
            nodes: solve.map(|s| s.nodes),
            error: None,
            error_kind: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(
        schema: impl Into<String>,
        method: Method,
        flags: &AblationSet,
        seconds: f64,
        err: &SchemaPressError,
    ) -> Self {
        Self {
            schema: schema.into(),
            method,
            flags: flags.names(),
            original_length: None,
            compressed_length: None,
            compression_ratio: None,
            seconds,
            is_optimal: false,
            gap: None,
            nr_variables: None,
            nr_constraints: None,
            nodes: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Ablation, CompressorConfig};
    use crate::compression::compress_schema;
    use crate::schema::{Column, Schema, Table};

    #[test]
    fn test_record_from_result() {
        let schema = Schema::new(
            "people",
            vec![Table::new("person").with_column(Column::new("person_id", "INTEGER"))],
        );
        let result = compress_schema(&schema, Method::Ilp, &CompressorConfig::default()).unwrap();
        let record = BenchmarkRecord::from_result(&result);
        assert_eq!(record.schema, "people");
        assert_eq!(record.method, Method::Ilp);
        assert!(record.flags.is_empty());
        assert!(record.nr_variables.is_some());
        assert!(!record.is_error());

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"method\":\"ilp\""));
    }

    #[test]
    fn test_failed_record() {
        let flags = AblationSet::new().with(Ablation::NoHints);
        let err = SchemaPressError::Parse("unexpected token".to_string());
        let record = BenchmarkRecord::failed("broken.sql", Method::Greedy, &flags, 0.01, &err);
        assert!(record.is_error());
        assert_eq!(record.error_kind.as_deref(), Some("parse"));
        assert_eq!(record.flags, vec!["nohints".to_string()]);
        assert_eq!(record.compression_ratio, None);
    }
}
