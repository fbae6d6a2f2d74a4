//! Structural and business-rule validation of extracted records.

use crate::fields::Field;
use crate::records::ExtractedRecord;
use crate::types::DashboardType;
use serde::Serialize;

/// Numeric bounds for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeRule {
    pub field: Field,
    pub min: f64,
    pub max: f64,
}

/// `sum(components)` must not exceed `total * (1 + tolerance)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyRule {
    pub components: Vec<Field>,
    pub total: Field,
    pub tolerance: f64,
}

/// Validation rules for one dashboard type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    pub required: Vec<Field>,
    pub ranges: Vec<RangeRule>,
    pub consistency: Vec<ConsistencyRule>,
}

fn range(field: Field, max: f64) -> RangeRule {
    RangeRule {
        field,
        min: 0.0,
        max,
    }
}

impl RuleSet {
    /// Built-in rules for a dashboard type. No consistency rules ship by
    /// default.
    pub fn for_dashboard(dashboard: DashboardType) -> Self {
        use Field::*;
        let (required, ranges) = match dashboard {
            DashboardType::SocialMedia => (
                vec![Platform, ReachViews],
                vec![
                    range(ReachViews, 10_000_000.0),
                    range(Engagement, 1_000_000.0),
                    range(Likes, 1_000_000.0),
                    range(Shares, 100_000.0),
                    range(Comments, 100_000.0),
                    range(Saved, 100_000.0),
                ],
            ),
            DashboardType::CommunityMarketing => (
                vec![ReachViews],
                vec![
                    range(ReachViews, 500_000.0),
                    range(Engagement, 100_000.0),
                    range(Likes, 50_000.0),
                    range(Shares, 10_000.0),
                    range(Comments, 5_000.0),
                    range(Saved, 1_000.0),
                ],
            ),
            DashboardType::KolEngagement => (
                vec![Views],
                vec![
                    range(Views, 10_000_000.0),
                    range(Likes, 1_000_000.0),
                    range(Shares, 100_000.0),
                    range(Comments, 50_000.0),
                    range(Saved, 10_000.0),
                ],
            ),
            DashboardType::PerformanceMarketing => (
                vec![Impressions],
                vec![
                    range(Impressions, 100_000_000.0),
                    range(Spend, 100_000.0),
                    range(Clicks, 1_000_000.0),
                    range(Conversions, 10_000.0),
                    range(Revenue, 1_000_000.0),
                ],
            ),
            DashboardType::PromotionPosts => (
                vec![Reach],
                vec![
                    range(Reach, 1_000_000.0),
                    range(Engagement, 100_000.0),
                    range(Likes, 50_000.0),
                    range(Shares, 10_000.0),
                    range(Comments, 5_000.0),
                    range(Saved, 1_000.0),
                ],
            ),
        };
        Self {
            required,
            ranges,
            consistency: Vec::new(),
        }
    }

    /// Replace or add the range for `rule.field`.
    pub fn set_range(&mut self, rule: RangeRule) {
        match self.ranges.iter_mut().find(|r| r.field == rule.field) {
            Some(existing) => *existing = rule,
            None => self.ranges.push(rule),
        }
    }
}

/// Format a bound without a trailing `.0` for whole numbers.
fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Run every rule against a record, appending to its errors and warnings.
///
/// When `auto_correct` is set, out-of-range values are clamped to the
/// nearest bound after the warning is recorded.
pub fn validate(record: &mut ExtractedRecord, rules: &RuleSet, auto_correct: bool) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for field in &rules.required {
        if !record.is_present(*field) {
            errors.push(format!("Missing required field: {}", field));
        }
    }

    for rule in &rules.ranges {
        let Some(value) = record.number(rule.field) else {
            continue;
        };
        if value < rule.min || value > rule.max {
            warnings.push(format!(
                "Value out of range for {}: {} (expected {} to {})",
                rule.field,
                fmt_number(value),
                fmt_number(rule.min),
                fmt_number(rule.max)
            ));
            if auto_correct && record.clamp(rule.field, rule.min, rule.max) {
                log::debug!("Clamped {} to [{}, {}]", rule.field, rule.min, rule.max);
            }
        }
    }

    for rule in &rules.consistency {
        let Some(total) = record.number(rule.total) else {
            continue;
        };
        let sum: f64 = rule.components.iter().filter_map(|f| record.number(*f)).sum();
        if sum > total * (1.0 + rule.tolerance) {
            let names: Vec<&str> = rule.components.iter().map(|f| f.name()).collect();
            warnings.push(format!(
                "Inconsistent values: {} sum to {} which exceeds {} ({})",
                names.join(" + "),
                fmt_number(sum),
                rule.total,
                fmt_number(total)
            ));
        }
    }

    for field in ExtractedRecord::schema(record.dashboard_type()) {
        if let Some(date) = record.date(*field) {
            if date.parsed.is_none() {
                warnings.push(format!("Unparsable date for {}: '{}'", field, date.raw));
            }
        }
    }

    let base = record.base_mut();
    base.validation_errors.extend(errors);
    base.validation_warnings.extend(warnings);
}
