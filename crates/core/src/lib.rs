//! Core domain types, configuration, classification, field extraction,
//! validation and scoring for marketing slide decks.

pub mod assemble;
pub mod cancel;
pub mod classify;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fields;
pub mod metrics;
pub mod normalize;
pub mod records;
pub mod types;
pub mod validate;
pub mod values;

pub use cancel::CancellationToken;
pub use classify::{Classification, Classifier, MatchMethod};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use engine::{DeckProcessor, DeckResult};
pub use error::{Error, Result};
pub use fields::{Field, FieldMapping, FieldSpec};
pub use metrics::ProcessingMetrics;
pub use records::{
    BaseRecord, CommunityMarketingData, ExtractedRecord, KolEngagementData,
    PerformanceMarketingData, PromotionPostsData, SocialMediaData,
};
pub use types::{
    DashboardType, Deck, DeckFormat, Diagnostic, DiagnosticKind, Platform, SlideContent,
    ValidationStatus,
};
