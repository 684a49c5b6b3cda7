//! Pipeline orchestration
//!
//! This module provides the public API for Rumbo scoring.
//! It orchestrates the full pipeline from raw trip JSON to the driver score report.

use crate::adapters::{ScaniaAdapter, TelemetryAdapter};
use crate::aggregator::DriverAggregator;
use crate::clustering::{cluster_drivers, ClusteringOutcome};
use crate::config::ScoringConfig;
use crate::encoder::{OutputFormat, ReportEncoder};
use crate::equity::EquityAdjuster;
use crate::error::{ComputeError, ConfigError, InsufficientPopulation};
use crate::features::TripFeatureExtractor;
use crate::fleet::FleetStatistics;
use crate::schema::{ParsedBatch, RejectedRecord, RejectionSummary, TripRecordAdapter};
use crate::scorer::CompositeScorer;
use crate::types::{DriverResult, TripRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{info, warn};

/// Score a JSON array of fleet.trip_record.v1 records.
///
/// # Arguments
/// * `trips_json` - JSON array of trip records
/// * `config_json` - Optional scoring configuration; defaults apply when `None`
///
/// # Returns
/// The driver score report as compact JSON
///
/// # Example
/// ```ignore
/// let report = score_trips_json(trips_json, None)?;
/// ```
pub fn score_trips_json(trips_json: &str, config_json: Option<&str>) -> Result<String, ComputeError> {
    let scorer = FleetScorer::from_config_json(config_json)?;
    let run = scorer.score_input(trips_json, InputFormat::Json)?;
    scorer.encoder().encode_to_json(&run)
}

/// Score a Scania Driver Evaluation Report payload.
///
/// # Arguments
/// * `payload_json` - Raw Scania API response JSON
/// * `config_json` - Optional scoring configuration; defaults apply when `None`
///
/// # Returns
/// The driver score report as compact JSON
pub fn score_scania_json(
    payload_json: &str,
    config_json: Option<&str>,
) -> Result<String, ComputeError> {
    let scorer = FleetScorer::from_config_json(config_json)?;
    let run = scorer.score_input(payload_json, InputFormat::Scania)?;
    scorer.encoder().encode_to_json(&run)
}

/// Layout of an input document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// JSON array of trip records
    #[default]
    Json,
    /// One trip record per line
    Ndjson,
    /// Scania Driver Evaluation Report payload
    Scania,
}

impl FromStr for InputFormat {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(InputFormat::Json),
            "ndjson" => Ok(InputFormat::Ndjson),
            "scania" => Ok(InputFormat::Scania),
            other => Err(ComputeError::UnsupportedFormat(format!(
                "'{other}' (expected json, ndjson or scania)"
            ))),
        }
    }
}

/// Parse an input document into a batch of raw trips
pub fn parse_input(input: &str, format: InputFormat) -> Result<ParsedBatch, ComputeError> {
    match format {
        InputFormat::Json => TripRecordAdapter::parse_array(input),
        InputFormat::Ndjson => Ok(TripRecordAdapter::parse_ndjson(input)),
        InputFormat::Scania => ScaniaAdapter.parse(input),
    }
}

/// Result of one scoring run
#[derive(Debug, Clone)]
pub struct FleetRun {
    /// Drivers by adjusted score, descending; ties by driver id
    pub results: Vec<DriverResult>,
    pub fleet: FleetStatistics,
    /// Clustering outcome, or why the population could not be clustered
    pub clustering: Result<ClusteringOutcome, InsufficientPopulation>,
    pub rejections: RejectionSummary,
}

/// Outcome of checking an input document without scoring it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub accepted_records: usize,
    pub driver_count: usize,
    pub rejected_records: RejectionSummary,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.rejected_records.count == 0
    }
}

/// Scoring engine bound to one validated configuration.
///
/// Holds no state between runs, so alternative configurations can score the
/// same fleet side by side.
#[derive(Debug, Clone)]
pub struct FleetScorer {
    config: ScoringConfig,
}

impl FleetScorer {
    /// Create a scorer; the configuration is validated up front
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create a scorer from optional configuration JSON
    pub fn from_config_json(config_json: Option<&str>) -> Result<Self, ComputeError> {
        let config = match config_json {
            Some(json) => ScoringConfig::from_json(json)?,
            None => ScoringConfig::default(),
        };
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Report encoder using the configured precision
    pub fn encoder(&self) -> ReportEncoder {
        ReportEncoder::new(self.config.output.decimals)
    }

    /// Parse and score an input document
    pub fn score_input(&self, input: &str, format: InputFormat) -> Result<FleetRun, ComputeError> {
        Ok(self.score_batch(parse_input(input, format)?))
    }

    /// Score a parsed batch; trips failing extraction join the rejections
    pub fn score_batch(&self, batch: ParsedBatch) -> FleetRun {
        let (trips, rejected) = self.extract(batch);
        self.score_trip_records(trips, rejected)
    }

    /// Check an input document without scoring it
    pub fn validate_input(
        &self,
        input: &str,
        format: InputFormat,
    ) -> Result<ValidationReport, ComputeError> {
        let batch = parse_input(input, format)?;
        let total_records = batch.total();
        let (trips, rejected) = self.extract(batch);
        let drivers: BTreeSet<&str> = trips.iter().map(|t| t.driver_id.as_str()).collect();

        Ok(ValidationReport {
            total_records,
            accepted_records: trips.len(),
            driver_count: drivers.len(),
            rejected_records: RejectionSummary::from_rejections(
                &rejected,
                self.config.output.max_error_samples,
            ),
        })
    }

    /// Run aggregation, scoring, equity and clustering over canonical trips.
    ///
    /// Pipeline stages:
    /// 1. DriverAggregator - Group trips per driver
    /// 2. CompositeScorer - Normalize and score each driver
    /// 3. EquityAdjuster - Fleet-relative distance correction
    /// 4. cluster_drivers - Behavioral clustering over the whole population
    /// 5. FleetStatistics - Fleet summary over the final results
    pub fn score_trip_records(
        &self,
        trips: Vec<TripRecord>,
        rejected: Vec<RejectedRecord>,
    ) -> FleetRun {
        let trip_count = trips.len();

        // Stage 1: one aggregate per driver
        let aggregates = DriverAggregator::aggregate(trips);

        // Stage 2: sub-scores, pillars and base score
        let scored = aggregates
            .into_iter()
            .map(|aggregate| CompositeScorer::score_aggregate(aggregate, &self.config))
            .collect();

        // Stage 3: equity adjustment
        let adjusted = EquityAdjuster::adjust(scored, &self.config.equity);

        // Stage 4: clustering; failure leaves the scores intact
        let clustering = cluster_drivers(&adjusted, &self.config.clustering);
        if let Err(e) = &clustering {
            warn!(error = %e, "clustering skipped");
        }

        let mut results: Vec<DriverResult> = match &clustering {
            Ok(outcome) => adjusted
                .into_iter()
                .zip(&outcome.assignments)
                .map(|(driver, assignment)| DriverResult {
                    driver,
                    cluster: Some(*assignment),
                })
                .collect(),
            Err(_) => adjusted
                .into_iter()
                .map(|driver| DriverResult {
                    driver,
                    cluster: None,
                })
                .collect(),
        };
        results.sort_by(|a, b| {
            b.driver
                .driver_score_adjusted
                .total_cmp(&a.driver.driver_score_adjusted)
                .then_with(|| a.driver.aggregate().driver_id.cmp(&b.driver.aggregate().driver_id))
        });

        // Stage 5: fleet summary
        let fleet = FleetStatistics::compute(&results);
        let rejections =
            RejectionSummary::from_rejections(&rejected, self.config.output.max_error_samples);

        info!(
            trips = trip_count,
            drivers = fleet.driver_count,
            rejected = rejections.count,
            clustered = clustering.is_ok(),
            "scored fleet"
        );

        FleetRun {
            results,
            fleet,
            clustering,
            rejections,
        }
    }

    /// Encode a run in the requested layout
    pub fn encode(&self, run: &FleetRun, format: OutputFormat) -> Result<String, ComputeError> {
        self.encoder().encode_to_string(run, format)
    }

    fn extract(&self, batch: ParsedBatch) -> (Vec<TripRecord>, Vec<RejectedRecord>) {
        let ParsedBatch { trips, mut rejected } = batch;
        let mut records = Vec::with_capacity(trips.len());
        for indexed in trips {
            let driver_id = indexed.trip.driver_id.clone();
            match TripFeatureExtractor::extract(indexed.trip, &self.config.carbon) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(
                        index = indexed.index,
                        driver_id = driver_id.as_deref().unwrap_or("-"),
                        %error,
                        "rejected trip record"
                    );
                    rejected.push(RejectedRecord {
                        index: indexed.index,
                        driver_id,
                        error,
                    });
                }
            }
        }
        (records, rejected)
    }
}
