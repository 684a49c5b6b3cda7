//! Report encoding
//!
//! This module encodes a finished fleet run into the fleet.driver_scores.v1
//! JSON report consumed by downstream ranking services. Every floating point
//! number is rounded to the configured precision at this boundary only; the
//! pipeline itself never rounds.

use crate::clustering::{ClusterProfile, ClusteringOutcome, KSelection};
use crate::error::ComputeError;
use crate::fleet::FleetStatistics;
use crate::pipeline::FleetRun;
use crate::schema::RejectionSummary;
use crate::stats::round_to;
use crate::types::{
    AggregateFlag, ClusterName, DriverAggregate, DriverResult, EquityAdjustment, ScoreSet,
    SubScores,
};
use crate::{PRODUCER_NAME, RUMBO_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output schema identifier
pub const REPORT_SCHEMA_VERSION: &str = "fleet.driver_scores.v1";

/// Serialization layout of an encoded report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Compact single-document JSON
    #[default]
    Json,
    /// Indented single-document JSON
    JsonPretty,
    /// One driver per line, then one fleet line
    Ndjson,
}

impl std::str::FromStr for OutputFormat {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "pretty" => Ok(OutputFormat::JsonPretty),
            "ndjson" => Ok(OutputFormat::Ndjson),
            other => Err(ComputeError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Report producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    /// Unique per run
    pub run_id: String,
}

/// Cluster membership as reported per driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverClusterRecord {
    pub label: usize,
    pub name: ClusterName,
    pub projection: [f64; 2],
}

/// Carbon metrics of one driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonRecord {
    pub total_co2_kg: f64,
    pub co2_per_km: Option<f64>,
    pub co2_idling_kg: f64,
    pub carbon_efficiency_score: f64,
}

/// One driver in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    /// 1-based position by adjusted score
    pub rank: usize,
    pub driver_id: String,
    pub driver_name: String,
    pub scores: ScoreSet,
    pub sub_scores: SubScores,
    pub equity: EquityAdjustment,
    pub cluster: Option<DriverClusterRecord>,
    pub carbon: CarbonRecord,
    pub flags: Vec<AggregateFlag>,
    /// Raw driver aggregates behind the scores
    pub metrics: DriverAggregate,
}

/// Clustering model summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringSummary {
    pub k: usize,
    pub features: Vec<String>,
    /// Absent when the cluster count was fixed by configuration
    pub selection: Option<KSelection>,
    pub silhouette: f64,
    pub davies_bouldin: f64,
    pub variance_explained: [f64; 2],
    pub total_variance_explained: f64,
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
    pub clusters: Vec<ClusterProfile>,
}

impl From<&ClusteringOutcome> for ClusteringSummary {
    fn from(outcome: &ClusteringOutcome) -> Self {
        ClusteringSummary {
            k: outcome.model.k,
            features: outcome.features.iter().map(|f| f.as_str().to_string()).collect(),
            selection: outcome.selection.clone(),
            silhouette: outcome.model.silhouette,
            davies_bouldin: outcome.model.davies_bouldin,
            variance_explained: outcome.pca.variance_explained,
            total_variance_explained: outcome.pca.total_variance_explained(),
            inertia: outcome.model.inertia,
            iterations: outcome.model.iterations,
            converged: outcome.model.converged,
            clusters: outcome.profiles.clone(),
        }
    }
}

/// The fleet.driver_scores.v1 document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverScoreReport {
    pub schema_version: String,
    pub generated_at: String,
    pub producer: ReportProducer,
    pub drivers: Vec<DriverRecord>,
    pub fleet_statistics: FleetStatistics,
    pub clustering: Option<ClusteringSummary>,
    pub clustering_error: Option<String>,
    pub rejected_records: RejectionSummary,
}

/// NDJSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum ReportLine {
    Driver(Box<DriverRecord>),
    Fleet {
        schema_version: String,
        generated_at: String,
        producer: ReportProducer,
        fleet_statistics: FleetStatistics,
        clustering: Option<ClusteringSummary>,
        clustering_error: Option<String>,
        rejected_records: RejectionSummary,
    },
}

/// Report encoder
pub struct ReportEncoder {
    run_id: String,
    decimals: u32,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique run ID
    pub fn new(decimals: u32) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            decimals,
        }
    }

    /// Create an encoder with a specific run ID
    pub fn with_run_id(run_id: String, decimals: u32) -> Self {
        Self { run_id, decimals }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Build the report document (unrounded)
    pub fn encode(&self, run: &FleetRun) -> DriverScoreReport {
        DriverScoreReport {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: RUMBO_VERSION.to_string(),
                run_id: self.run_id.clone(),
            },
            drivers: run
                .results
                .iter()
                .enumerate()
                .map(|(i, r)| driver_record(i + 1, r))
                .collect(),
            fleet_statistics: run.fleet.clone(),
            clustering: run.clustering.as_ref().ok().map(ClusteringSummary::from),
            clustering_error: run.clustering.as_ref().err().map(|e| e.to_string()),
            rejected_records: run.rejections.clone(),
        }
    }

    /// Encode to a string in the requested layout, rounded
    pub fn encode_to_string(&self, run: &FleetRun, format: OutputFormat) -> Result<String, ComputeError> {
        let report = self.encode(run);
        match format {
            OutputFormat::Json => {
                serde_json::to_string(&self.rounded(&report)?).map_err(ComputeError::JsonError)
            }
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&self.rounded(&report)?)
                .map_err(ComputeError::JsonError),
            OutputFormat::Ndjson => {
                let mut lines = Vec::with_capacity(report.drivers.len() + 1);
                let DriverScoreReport {
                    schema_version,
                    generated_at,
                    producer,
                    drivers,
                    fleet_statistics,
                    clustering,
                    clustering_error,
                    rejected_records,
                } = report;
                for driver in drivers {
                    let line = ReportLine::Driver(Box::new(driver));
                    lines.push(serde_json::to_string(&self.rounded(&line)?)?);
                }
                let fleet = ReportLine::Fleet {
                    schema_version,
                    generated_at,
                    producer,
                    fleet_statistics,
                    clustering,
                    clustering_error,
                    rejected_records,
                };
                lines.push(serde_json::to_string(&self.rounded(&fleet)?)?);
                Ok(lines.join("\n") + "\n")
            }
        }
    }

    /// Encode to compact JSON
    pub fn encode_to_json(&self, run: &FleetRun) -> Result<String, ComputeError> {
        self.encode_to_string(run, OutputFormat::Json)
    }

    fn rounded<T: Serialize>(&self, value: &T) -> Result<serde_json::Value, ComputeError> {
        let mut json = serde_json::to_value(value)?;
        round_numbers(&mut json, self.decimals);
        Ok(json)
    }
}

fn driver_record(rank: usize, result: &DriverResult) -> DriverRecord {
    let aggregate = result.driver.aggregate();
    DriverRecord {
        rank,
        driver_id: aggregate.driver_id.clone(),
        driver_name: aggregate.driver_name.clone(),
        scores: result.driver.score_set(),
        sub_scores: result.driver.scored.normalized.sub_scores,
        equity: result.driver.equity,
        cluster: result.cluster.map(|c| DriverClusterRecord {
            label: c.label,
            name: c.name,
            projection: c.projection,
        }),
        carbon: CarbonRecord {
            total_co2_kg: aggregate.total_co2_kg,
            co2_per_km: aggregate.co2_per_km,
            co2_idling_kg: aggregate.total_co2_idling_kg,
            carbon_efficiency_score: result.driver.scored.scores.carbon_efficiency,
        },
        flags: aggregate.flags.clone(),
        metrics: aggregate.clone(),
    }
}

/// Round every non-integer number in place
pub fn round_numbers(value: &mut serde_json::Value, decimals: u32) {
    match value {
        serde_json::Value::Number(n) if n.is_f64() => {
            if let Some(rounded) = n
                .as_f64()
                .map(|f| round_to(f, decimals))
                .and_then(serde_json::Number::from_f64)
            {
                *n = rounded;
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                round_numbers(item, decimals);
            }
        }
        serde_json::Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                round_numbers(item, decimals);
            }
        }
        _ => {}
    }
}
