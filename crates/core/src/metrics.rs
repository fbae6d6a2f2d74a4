//! Batch processing counters.

use crate::records::ExtractedRecord;
use crate::types::{DashboardType, ValidationStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for one batch run (or one file before merging).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    pub cancelled_files: usize,

    pub total_slides: usize,
    pub processed_slides: usize,
    pub failed_slides: usize,

    pub extracted_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    /// Valid records that carry warnings. Included in `valid_records`.
    pub warning_records: usize,
    pub records_by_type: BTreeMap<DashboardType, usize>,

    pub cache_hits: usize,

    /// Mean confidence over all extracted records.
    pub average_confidence: f64,
    pub processing_time_secs: f64,
}

impl ProcessingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one assembled record.
    pub fn record(&mut self, record: &ExtractedRecord) {
        let base = record.base();
        self.extracted_records += 1;
        match base.validation_status {
            ValidationStatus::Valid => self.valid_records += 1,
            ValidationStatus::Warning => {
                self.valid_records += 1;
                self.warning_records += 1;
            }
            ValidationStatus::Invalid | ValidationStatus::Pending => self.invalid_records += 1,
        }
        *self.records_by_type.entry(record.dashboard_type()).or_insert(0) += 1;

        let n = self.extracted_records as f64;
        self.average_confidence += (base.confidence_score - self.average_confidence) / n;
    }

    /// Fold another run's counters into this one.
    pub fn merge(&mut self, other: &ProcessingMetrics) {
        let total_records = self.extracted_records + other.extracted_records;
        if total_records > 0 {
            self.average_confidence = (self.average_confidence * self.extracted_records as f64
                + other.average_confidence * other.extracted_records as f64)
                / total_records as f64;
        }

        self.total_files += other.total_files;
        self.processed_files += other.processed_files;
        self.failed_files += other.failed_files;
        self.cancelled_files += other.cancelled_files;
        self.total_slides += other.total_slides;
        self.processed_slides += other.processed_slides;
        self.failed_slides += other.failed_slides;
        self.extracted_records = total_records;
        self.valid_records += other.valid_records;
        self.invalid_records += other.invalid_records;
        self.warning_records += other.warning_records;
        for (dashboard, count) in &other.records_by_type {
            *self.records_by_type.entry(*dashboard).or_insert(0) += count;
        }
        self.cache_hits += other.cache_hits;
    }

    /// Stamp the wall time of the run.
    pub fn finalize(&mut self, elapsed: Duration) {
        self.processing_time_secs = elapsed.as_secs_f64();
    }
}
