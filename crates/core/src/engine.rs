//! Per-deck processing: classify, extract and validate every slide, then
//! assemble the records and count the outcome.

use crate::assemble::RecordAssembler;
use crate::cancel::CancellationToken;
use crate::classify::Classifier;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::extract::FieldExtractor;
use crate::metrics::ProcessingMetrics;
use crate::records::ExtractedRecord;
use crate::types::{Deck, Diagnostic, SlideContent};
use crate::validate::validate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Records, counters and diagnostics of one deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckResult {
    pub records: Vec<ExtractedRecord>,
    pub metrics: ProcessingMetrics,
    pub diagnostics: Vec<Diagnostic>,
}

/// What happened to one slide before assembly.
enum SlideOutcome {
    Unreadable(Diagnostic),
    Unclassified,
    NoData,
    Records(Vec<ExtractedRecord>),
}

/// Runs the extraction stages over a loaded deck.
#[derive(Clone)]
pub struct DeckProcessor {
    config: Arc<Config>,
    classifier: Arc<Classifier>,
    clock: Arc<dyn Clock>,
}

impl DeckProcessor {
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Arc<Config>, clock: Arc<dyn Clock>) -> Self {
        let classifier = Arc::new(Classifier::new(&config));
        Self {
            config,
            classifier,
            clock,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Process every slide of `deck`.
    ///
    /// Returns `None` if cancellation was requested before the deck
    /// finished; a cancelled deck contributes nothing.
    pub fn process_deck(&self, deck: &Deck, cancel: &CancellationToken) -> Option<DeckResult> {
        if cancel.is_cancelled() {
            return None;
        }

        let outcomes: Vec<Option<SlideOutcome>> = deck
            .slides
            .par_iter()
            .map(|slide| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.process_slide(deck, slide))
            })
            .collect();

        if cancel.is_cancelled() {
            log::info!("{}: cancelled", deck.filename);
            return None;
        }

        let mut assembler = RecordAssembler::new(self.clock.as_ref(), self.config.min_confidence());
        let mut records = Vec::new();
        let mut diagnostics = Vec::new();
        let mut failed_slides = 0;

        for outcome in outcomes.into_iter().flatten() {
            if cancel.is_cancelled() {
                log::info!("{}: cancelled during assembly", deck.filename);
                return None;
            }
            match outcome {
                SlideOutcome::Unreadable(diagnostic) => {
                    failed_slides += 1;
                    diagnostics.push(diagnostic);
                }
                SlideOutcome::Unclassified | SlideOutcome::NoData => failed_slides += 1,
                SlideOutcome::Records(slide_records) => {
                    records.extend(slide_records.into_iter().map(|r| assembler.assemble(r)));
                }
            }
        }

        let mut metrics = assembler.into_metrics();
        metrics.total_files = 1;
        metrics.processed_files = 1;
        metrics.total_slides = deck.slides.len();
        metrics.failed_slides = failed_slides;
        metrics.processed_slides = deck.slides.len() - failed_slides;

        log::info!(
            "{}: {} slides, {} records ({} valid), {} failed slides",
            deck.filename,
            metrics.total_slides,
            metrics.extracted_records,
            metrics.valid_records,
            metrics.failed_slides
        );

        Some(DeckResult {
            records,
            metrics,
            diagnostics,
        })
    }

    fn process_slide(&self, deck: &Deck, slide: &SlideContent) -> SlideOutcome {
        if let Some(issue) = deck.issues.iter().find(|i| i.slide_number == slide.slide_number) {
            return SlideOutcome::Unreadable(Diagnostic::parse_error(
                &deck.filename,
                issue.slide_number,
                &issue.message,
            ));
        }

        let Some(classification) = self.classifier.classify(slide) else {
            log::debug!("{}: slide {} unclassified", deck.filename, slide.slide_number);
            return SlideOutcome::Unclassified;
        };

        let mut records =
            FieldExtractor::new(&self.config).extract(slide, &classification, &deck.filename);
        if records.is_empty() {
            return SlideOutcome::NoData;
        }

        let rules = self.config.rules(classification.dashboard);
        for record in &mut records {
            validate(record, rules, self.config.auto_correction());
        }
        SlideOutcome::Records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::types::{DashboardType, DeckFormat, DiagnosticKind, Platform, ValidationStatus};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn processor() -> DeckProcessor {
        let config =
            Config::from_yaml_str(include_str!("../../../config/dashboard_config.yaml")).unwrap();
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap());
        DeckProcessor::with_clock(Arc::new(config), Arc::new(clock))
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sample_deck() -> Deck {
        let mut deck = Deck::new("march.pptx", DeckFormat::Pptx);
        deck.add_slide(SlideContent::new(1).with_text("Monthly Report"));
        deck.add_slide(
            SlideContent::new(2)
                .with_text("TF Value-Mart FB Page Wallposts Performance")
                .with_table(vec![row(&["Post A", "3/1/2024", "1000", "50", "30", "5", "10", "5"])]),
        );
        deck.add_unreadable_slide(3, "truncated XML");
        deck.add_slide(SlideContent::new(4).with_text("KOL Engagement").with_text("Overview"));
        deck
    }

    #[test]
    fn test_process_deck() {
        let result = processor()
            .process_deck(&sample_deck(), &CancellationToken::new())
            .unwrap();

        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.dashboard_type(), DashboardType::SocialMedia);
        assert_eq!(record.base().validation_status, ValidationStatus::Valid);
        assert_eq!(record.base().confidence_score, 1.0);
        assert_eq!(
            record.base().extraction_timestamp,
            Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap()
        );
        let social = record.as_social_media().unwrap();
        assert_eq!(social.platform, Platform::Facebook);
        assert_eq!(social.engagement_rate(), Some(5.0));
        assert_eq!(social.total_interactions(), Some(50));

        let m = &result.metrics;
        assert_eq!(m.total_slides, 4);
        assert_eq!(m.processed_slides, 1);
        // Unclassified title slide, unreadable slide and a slide without data.
        assert_eq!(m.failed_slides, 3);
        assert_eq!(m.extracted_records, 1);
        assert_eq!(m.records_by_type[&DashboardType::SocialMedia], 1);

        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::ParseError);
        assert_eq!(result.diagnostics[0].slide_number, Some(3));
    }

    #[test]
    fn test_records_keep_slide_order() {
        let mut deck = Deck::new("order.pptx", DeckFormat::Pptx);
        for n in 1..=20 {
            deck.add_slide(
                SlideContent::new(n)
                    .with_text("Promotion Posts")
                    .with_text(format!("Reach: {}", n * 100)),
            );
        }
        let result = processor().process_deck(&deck, &CancellationToken::new()).unwrap();
        let slides: Vec<usize> = result.records.iter().map(|r| r.base().slide_number).collect();
        assert_eq!(slides, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_records_are_kept() {
        let mut deck = Deck::new("gaps.pptx", DeckFormat::Pptx);
        deck.add_slide(
            SlideContent::new(1)
                .with_text("Ads Performance")
                .with_text("Clicks: 120"),
        );
        let result = processor().process_deck(&deck, &CancellationToken::new()).unwrap();
        assert_eq!(result.records.len(), 1);
        let base = result.records[0].base();
        assert_eq!(base.validation_status, ValidationStatus::Invalid);
        assert_eq!(base.validation_errors, vec!["Missing required field: impressions"]);
        assert_eq!(result.metrics.invalid_records, 1);
    }

    #[test]
    fn test_cancelled_deck_contributes_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(processor().process_deck(&sample_deck(), &token).is_none());
    }

    /// Trips the token the first time a record is stamped.
    struct CancellingClock {
        token: CancellationToken,
        stamps: AtomicUsize,
    }

    impl Clock for CancellingClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            self.stamps.fetch_add(1, Ordering::SeqCst);
            self.token.cancel();
            Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap()
        }
    }

    #[test]
    fn test_cancel_mid_deck_contributes_nothing() {
        let mut deck = Deck::new("midway.pptx", DeckFormat::Pptx);
        for n in 1..=5 {
            deck.add_slide(
                SlideContent::new(n)
                    .with_text("Promotion Posts")
                    .with_text(format!("Reach: {}", n * 100)),
            );
        }

        let token = CancellationToken::new();
        let clock = Arc::new(CancellingClock {
            token: token.clone(),
            stamps: AtomicUsize::new(0),
        });
        let config =
            Config::from_yaml_str(include_str!("../../../config/dashboard_config.yaml")).unwrap();
        let processor = DeckProcessor::with_clock(Arc::new(config), clock.clone());

        assert!(processor.process_deck(&deck, &token).is_none());
        assert!(token.is_cancelled());
        // Only the first record was assembled before the run stopped.
        assert_eq!(clock.stamps.load(Ordering::SeqCst), 1);
    }
}
