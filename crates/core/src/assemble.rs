//! Confidence scoring, status derivation and record provenance.

use crate::clock::Clock;
use crate::metrics::ProcessingMetrics;
use crate::records::ExtractedRecord;
use crate::types::ValidationStatus;

const ERROR_PENALTY: f64 = 0.2;
const WARNING_PENALTY: f64 = 0.05;

/// `1 - 0.2 * errors - 0.05 * warnings`, clamped to `[0, 1]`.
pub fn confidence_score(errors: usize, warnings: usize) -> f64 {
    let raw = 1.0 - ERROR_PENALTY * errors as f64 - WARNING_PENALTY * warnings as f64;
    // Six warnings must land on 0.7 exactly, not 0.69999...
    (raw.clamp(0.0, 1.0) * 1e6).round() / 1e6
}

/// Status for a scored record.
///
/// `Invalid` when there are errors or the score is below `threshold`;
/// otherwise `Warning` if warnings exist, else `Valid`.
pub fn derive_status(errors: usize, warnings: usize, score: f64, threshold: f64) -> ValidationStatus {
    if errors > 0 || score < threshold {
        ValidationStatus::Invalid
    } else if warnings > 0 {
        ValidationStatus::Warning
    } else {
        ValidationStatus::Valid
    }
}

/// Finalizes validated records and counts them.
pub struct RecordAssembler<'a> {
    clock: &'a dyn Clock,
    min_confidence: f64,
    metrics: ProcessingMetrics,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(clock: &'a dyn Clock, min_confidence: f64) -> Self {
        Self {
            clock,
            min_confidence,
            metrics: ProcessingMetrics::new(),
        }
    }

    /// Stamp provenance, score the record and count it. Records are never
    /// dropped, whatever their status.
    pub fn assemble(&mut self, mut record: ExtractedRecord) -> ExtractedRecord {
        let now = self.clock.now();
        let base = record.base_mut();
        let errors = base.validation_errors.len();
        let warnings = base.validation_warnings.len();

        base.extraction_timestamp = now;
        base.confidence_score = confidence_score(errors, warnings);
        base.validation_status = derive_status(errors, warnings, base.confidence_score, self.min_confidence);

        self.metrics.record(&record);
        record
    }

    pub fn metrics_mut(&mut self) -> &mut ProcessingMetrics {
        &mut self.metrics
    }

    pub fn into_metrics(self) -> ProcessingMetrics {
        self.metrics
    }
}
