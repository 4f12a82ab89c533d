//! Metrics reports exported by world tests.
//!
//! Tests that exercise the terrain pipeline at scale write one JSON report
//! each, so CI can compare generation cost and streaming behaviour across
//! commits.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level metrics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Test identifier
    pub test_name: String,

    /// Collection time (RFC 3339)
    pub timestamp: String,

    /// Git commit hash (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,

    /// Overall test result
    pub result: TestResult,

    /// Height field and chunk generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<TerrainMetrics>,

    /// Chunk streaming scheduler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<StreamingMetrics>,

    /// Entity instance pools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<EntityMetrics>,

    /// Chunk mesh output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendering: Option<RenderMetrics>,

    /// Test execution
    pub test_execution: TestExecutionMetrics,
}

/// Overall test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Test passed all validations
    Pass,
    /// Test failed
    Fail,
    /// Test was skipped
    Skip,
}

/// Chunk generation cost and output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainMetrics {
    /// Chunks generated
    pub chunks_generated: usize,

    /// Height samples taken
    pub samples: usize,

    /// Average time per chunk in microseconds
    pub avg_gen_time_us: f64,

    /// Fastest chunk in microseconds
    pub min_gen_time_us: u128,

    /// Slowest chunk in microseconds
    pub max_gen_time_us: u128,

    /// Total generation time in milliseconds
    pub total_gen_time_ms: f64,

    /// Lowest height seen
    pub min_height: f32,

    /// Highest height seen
    pub max_height: f32,

    /// Distinct biomes seen
    pub unique_biomes: usize,

    /// Seam check results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seam_validation: Option<SeamValidation>,
}

/// Edge agreement between neighbouring chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeamValidation {
    /// Shared edges checked
    pub total_seams: usize,

    /// Edges whose vertices matched
    pub seams_valid: usize,

    /// Edges with at least one mismatch
    pub seams_failed: usize,

    /// Largest vertex difference on any edge
    pub max_seam_diff: f64,
}

/// Scheduler counters over one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingMetrics {
    /// Frames simulated
    pub frames: usize,

    /// Generation requests dispatched
    pub requested: u64,

    /// Chunks materialized
    pub materialized: u64,

    /// Chunks destroyed
    pub destroyed: u64,

    /// Requests cancelled by player movement
    pub cancelled: u64,

    /// Results discarded as stale
    pub discarded_late: u64,

    /// Chunks rescued from the destruction queue
    pub rescued: u64,

    /// Largest pending set observed
    pub peak_pending: usize,

    /// Realized chunks when the run ended
    pub realized_at_end: usize,
}

/// Instance pool occupancy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityMetrics {
    /// Entity types configured
    pub types: usize,

    /// Live instances across all pools
    pub live_instances: usize,

    /// Total slot capacity across all pools
    pub capacity: usize,

    /// Live instances per entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_type: Option<BTreeMap<String, usize>>,
}

/// Chunk mesh output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderMetrics {
    /// Chunks meshed
    pub chunks_meshed: usize,

    /// Triangles across all chunks
    pub total_triangles: usize,

    /// Average triangles per chunk
    pub avg_triangles_per_chunk: f64,

    /// Vertices across all chunks
    pub total_vertices: usize,
}

/// Test execution metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Wall clock duration in seconds
    pub duration_seconds: f64,

    /// Assertions checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertions_checked: Option<usize>,
}

/// Builder for [`MetricsReport`].
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Start a passing report stamped with the current time.
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                commit_hash: None,
                result: TestResult::Pass,
                terrain: None,
                streaming: None,
                entities: None,
                rendering: None,
                test_execution: TestExecutionMetrics::default(),
            },
        }
    }

    /// Set the result.
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set the commit hash.
    pub fn commit_hash(mut self, hash: impl Into<String>) -> Self {
        self.report.commit_hash = Some(hash.into());
        self
    }

    /// Attach terrain metrics.
    pub fn terrain(mut self, metrics: TerrainMetrics) -> Self {
        self.report.terrain = Some(metrics);
        self
    }

    /// Attach streaming metrics.
    pub fn streaming(mut self, metrics: StreamingMetrics) -> Self {
        self.report.streaming = Some(metrics);
        self
    }

    /// Attach entity metrics.
    pub fn entities(mut self, metrics: EntityMetrics) -> Self {
        self.report.entities = Some(metrics);
        self
    }

    /// Attach render metrics.
    pub fn rendering(mut self, metrics: RenderMetrics) -> Self {
        self.report.rendering = Some(metrics);
        self
    }

    /// Set execution metrics.
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Finish.
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Writes a [`MetricsReport`] as pretty JSON.
pub struct MetricsSink {
    path: PathBuf,
}

impl MetricsSink {
    /// Sink at `path`, creating parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Write (or overwrite) the report.
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        debug!(test = %report.test_name, path = %self.path.display(), "Wrote metrics report");
        Ok(())
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn metrics_report_parses_back() {
        let report = MetricsReportBuilder::new("streaming_walk")
            .streaming(StreamingMetrics {
                frames: 600,
                requested: 45,
                materialized: 40,
                destroyed: 15,
                cancelled: 5,
                ..Default::default()
            })
            .execution(TestExecutionMetrics {
                duration_seconds: 1.5,
                assertions_checked: Some(12),
            })
            .build();

        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: MetricsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.test_name, "streaming_walk");
        assert_eq!(parsed.result, TestResult::Pass);
        assert_eq!(parsed.streaming.unwrap().cancelled, 5);
        assert!(parsed.terrain.is_none());
        assert!(!json.contains("\"terrain\""));
    }

    #[test]
    fn metrics_sink_writes_file() {
        let path = std::env::temp_dir().join(format!(
            "wanderworld-metrics-{}/report.json",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let sink = MetricsSink::create(&path).unwrap();
        sink.write(&MetricsReportBuilder::new("sink").result(TestResult::Skip).build())
            .unwrap();
        let contents = fs::read_to_string(sink.path()).unwrap();
        assert!(contents.contains("\"skip\""));
    }
}
