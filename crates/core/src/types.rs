//! Domain types for slide content, classification vocabularies and diagnostics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A table grid: rows of cells in reading order.
pub type Table = Vec<Vec<String>>;

/// Normalized content of a single slide.
///
/// Merged table cells have already been flattened: every logical cell of a
/// merged region carries the merged value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    /// 1-based slide number.
    pub slide_number: usize,

    /// Text blocks in reading order (one per shape).
    pub text_blocks: Vec<String>,

    /// Tables in document order.
    pub tables: Vec<Table>,
}

impl SlideContent {
    /// Create an empty slide with the given number.
    pub fn new(slide_number: usize) -> Self {
        Self {
            slide_number,
            text_blocks: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Add a text block, ignoring blank text.
    pub fn add_text_block(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.text_blocks.push(text);
        }
    }

    /// Add a table, ignoring tables without any rows.
    pub fn add_table(&mut self, table: Table) {
        if !table.is_empty() {
            self.tables.push(table);
        }
    }

    /// Builder-style helper used heavily in tests.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.add_text_block(text);
        self
    }

    /// Builder-style helper used heavily in tests.
    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    /// True when the slide has neither text nor tables.
    pub fn is_empty(&self) -> bool {
        self.text_blocks.is_empty() && self.tables.is_empty()
    }

    /// The first text block, which authors use as the slide title.
    pub fn title(&self) -> Option<&str> {
        self.text_blocks
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
    }

    /// All searchable strings: text blocks followed by every table cell.
    pub fn searchable_text(&self) -> impl Iterator<Item = &str> {
        self.text_blocks.iter().map(String::as_str).chain(
            self.tables
                .iter()
                .flat_map(|t| t.iter().flat_map(|row| row.iter().map(String::as_str))),
        )
    }
}

/// The format of the source deck file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckFormat {
    /// Modern PPTX / PPTM (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary).
    Ppt,
}

impl DeckFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" | "pptm" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }
        if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
            return Some(Self::Ppt);
        }
        None
    }
}

/// A slide that could not be read. The slide is still present in
/// [`Deck::slides`] as empty content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideIssue {
    pub slide_number: usize,
    pub message: String,
}

/// One loaded deck: ordered slide content plus slide-level read failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    /// Original filename (without path).
    pub filename: String,

    /// Detected format of the source file.
    pub format: DeckFormat,

    /// Slides in presentation order, including empty ones.
    pub slides: Vec<SlideContent>,

    /// Slides whose shapes or tables could not be read.
    pub issues: Vec<SlideIssue>,
}

impl Deck {
    /// Create a new deck with the given filename and format.
    pub fn new(filename: impl Into<String>, format: DeckFormat) -> Self {
        Self {
            filename: filename.into(),
            format,
            slides: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Add a successfully read slide.
    pub fn add_slide(&mut self, slide: SlideContent) {
        self.slides.push(slide);
    }

    /// Record an unreadable slide: an empty slide takes its place.
    pub fn add_unreadable_slide(&mut self, slide_number: usize, message: impl Into<String>) {
        let message = message.into();
        log::warn!(
            "{}: slide {} could not be read: {}",
            self.filename,
            slide_number,
            message
        );
        self.slides.push(SlideContent::new(slide_number));
        self.issues.push(SlideIssue {
            slide_number,
            message,
        });
    }

    /// Whether a slide was recorded as unreadable.
    pub fn is_unreadable(&self, slide_number: usize) -> bool {
        self.issues.iter().any(|i| i.slide_number == slide_number)
    }
}

/// The five record schemas a slide can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardType {
    SocialMedia,
    CommunityMarketing,
    KolEngagement,
    PerformanceMarketing,
    PromotionPosts,
}

impl DashboardType {
    /// All dashboard types in classification priority order.
    pub const ALL: [DashboardType; 5] = [
        DashboardType::SocialMedia,
        DashboardType::CommunityMarketing,
        DashboardType::KolEngagement,
        DashboardType::PerformanceMarketing,
        DashboardType::PromotionPosts,
    ];

    /// Configuration key for this dashboard type.
    pub fn key(&self) -> &'static str {
        match self {
            DashboardType::SocialMedia => "social_media",
            DashboardType::CommunityMarketing => "community_marketing",
            DashboardType::KolEngagement => "kol_engagement",
            DashboardType::PerformanceMarketing => "performance_marketing",
            DashboardType::PromotionPosts => "promotion_posts",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            DashboardType::SocialMedia => "Social Media",
            DashboardType::CommunityMarketing => "Community Marketing",
            DashboardType::KolEngagement => "KOL Engagement",
            DashboardType::PerformanceMarketing => "Performance Marketing",
            DashboardType::PromotionPosts => "Promotion Posts",
        }
    }

    /// Parse a configuration key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl fmt::Display for DashboardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Categorical outcome of validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Warning,
    #[default]
    Pending,
}

impl ValidationStatus {
    /// True for records without errors whose score meets the threshold.
    ///
    /// `Warning` counts as valid: it only signals that warnings exist.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid | ValidationStatus::Warning)
    }
}

/// A closed vocabulary that free text is parsed into.
///
/// Lookup is case-insensitive and ignores punctuation; anything not in the
/// vocabulary maps to [`Vocabulary::UNKNOWN`].
pub trait Vocabulary: Sized + Copy + PartialEq + 'static {
    /// The fallback variant.
    const UNKNOWN: Self;

    /// Every known variant except `UNKNOWN`.
    fn variants() -> &'static [Self];

    /// Spellings that map to this variant.
    fn aliases(&self) -> &'static [&'static str];

    /// Case-insensitive lookup against the variant set.
    fn lookup(raw: &str) -> Self {
        let key = crate::normalize::label_key(raw);
        if key.is_empty() {
            return Self::UNKNOWN;
        }
        Self::variants()
            .iter()
            .copied()
            .find(|v| {
                v.aliases()
                    .iter()
                    .any(|a| crate::normalize::label_key(a) == key)
            })
            .unwrap_or(Self::UNKNOWN)
    }
}

/// Social platform a slide or record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    Instagram,
    TikTok,
    Twitter,
    LinkedIn,
    YouTube,
    #[default]
    Unknown,
}

impl Platform {
    /// Known platforms in detection priority order.
    pub const ALL: [Platform; 6] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::TikTok,
        Platform::Twitter,
        Platform::LinkedIn,
        Platform::YouTube,
    ];

    /// Configuration key (`dashboard_config.platforms.<key>`).
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::LinkedIn => "linkedin",
            Platform::YouTube => "youtube",
            Platform::Unknown => "unknown",
        }
    }

    /// Parse a configuration key, case-insensitively.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    /// Names used to spot the platform in slide text when the configuration
    /// gives none.
    pub fn default_keywords(&self) -> &'static [&'static str] {
        match self {
            Platform::Facebook => &["facebook", "fb"],
            Platform::Instagram => &["instagram", "ig"],
            Platform::TikTok => &["tiktok", "tik tok"],
            Platform::Twitter => &["twitter", "x.com"],
            Platform::LinkedIn => &["linkedin", "lnkd"],
            Platform::YouTube => &["youtube", "yt"],
            Platform::Unknown => &[],
        }
    }

    /// Metric column order of headerless post tables for this platform.
    pub fn default_metrics(&self) -> &'static [&'static str] {
        match self {
            Platform::Facebook | Platform::Instagram => {
                &["Reach", "Engagement", "Likes", "Shares", "Comments", "Saved"]
            }
            Platform::TikTok | Platform::YouTube => {
                &["Views", "Engagement", "Likes", "Shares", "Comments", "Saved"]
            }
            Platform::Twitter | Platform::LinkedIn | Platform::Unknown => &[],
        }
    }
}

impl Vocabulary for Platform {
    const UNKNOWN: Self = Platform::Unknown;

    fn variants() -> &'static [Self] {
        &Platform::ALL
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.default_keywords()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
            Platform::Twitter => "Twitter",
            Platform::LinkedIn => "LinkedIn",
            Platform::YouTube => "YouTube",
            Platform::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Influencer tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KolTier {
    Mega,
    Macro,
    Micro,
    Nano,
    #[default]
    Unknown,
}

impl KolTier {
    /// Tier implied by a video view count.
    pub fn from_views(views: i64) -> Self {
        match views {
            v if v >= 1_000_000 => KolTier::Mega,
            v if v >= 100_000 => KolTier::Macro,
            v if v >= 10_000 => KolTier::Micro,
            _ => KolTier::Nano,
        }
    }
}

impl Vocabulary for KolTier {
    const UNKNOWN: Self = KolTier::Unknown;

    fn variants() -> &'static [Self] {
        &[KolTier::Mega, KolTier::Macro, KolTier::Micro, KolTier::Nano]
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            KolTier::Mega => &["mega", "mega kol", "mega influencer"],
            KolTier::Macro => &["macro", "macro kol", "macro influencer"],
            KolTier::Micro => &["micro", "micro kol", "micro influencer"],
            KolTier::Nano => &["nano", "nano kol", "nano influencer"],
            KolTier::Unknown => &[],
        }
    }
}

/// Objective of a paid ad set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdType {
    PageLikes,
    ProfileVisits,
    Followers,
    Conversions,
    Traffic,
    Awareness,
    #[default]
    Unknown,
}

impl Vocabulary for AdType {
    const UNKNOWN: Self = AdType::Unknown;

    fn variants() -> &'static [Self] {
        &[
            AdType::PageLikes,
            AdType::ProfileVisits,
            AdType::Followers,
            AdType::Conversions,
            AdType::Traffic,
            AdType::Awareness,
        ]
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            AdType::PageLikes => &["page likes", "page like", "likes"],
            AdType::ProfileVisits => &["profile visits", "profile visit", "visits"],
            AdType::Followers => &["followers", "follows", "follower"],
            AdType::Conversions => &["conversions", "conversion", "sales"],
            AdType::Traffic => &["traffic", "link clicks"],
            AdType::Awareness => &["awareness", "reach", "brand awareness"],
            AdType::Unknown => &[],
        }
    }
}

/// Kind of promotional campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CampaignType {
    Seasonal,
    FlashSale,
    ProductLaunch,
    BrandAwareness,
    DiscountSale,
    GeneralPromotion,
    #[default]
    Unknown,
}

impl Vocabulary for CampaignType {
    const UNKNOWN: Self = CampaignType::Unknown;

    fn variants() -> &'static [Self] {
        &[
            CampaignType::Seasonal,
            CampaignType::FlashSale,
            CampaignType::ProductLaunch,
            CampaignType::BrandAwareness,
            CampaignType::DiscountSale,
            CampaignType::GeneralPromotion,
        ]
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            CampaignType::Seasonal => &["seasonal", "holiday", "festive"],
            CampaignType::FlashSale => &["flash sale", "flash"],
            CampaignType::ProductLaunch => &["product launch", "launch", "new product"],
            CampaignType::BrandAwareness => &["brand awareness", "awareness"],
            CampaignType::DiscountSale => &["discount", "sale", "promo", "discount/sale"],
            CampaignType::GeneralPromotion => &["general", "general promotion", "promotion"],
            CampaignType::Unknown => &[],
        }
    }
}

/// Creative format of a social post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentFormat {
    Post,
    Video,
    Image,
    Carousel,
    Story,
    Reel,
    Igtv,
    FeedPost,
    #[default]
    Unknown,
}

impl Vocabulary for ContentFormat {
    const UNKNOWN: Self = ContentFormat::Unknown;

    fn variants() -> &'static [Self] {
        &[
            ContentFormat::Post,
            ContentFormat::Video,
            ContentFormat::Image,
            ContentFormat::Carousel,
            ContentFormat::Story,
            ContentFormat::Reel,
            ContentFormat::Igtv,
            ContentFormat::FeedPost,
        ]
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ContentFormat::Post => &["post", "wallpost", "status"],
            ContentFormat::Video => &["video"],
            ContentFormat::Image => &["image", "photo", "picture"],
            ContentFormat::Carousel => &["carousel", "album"],
            ContentFormat::Story => &["story", "stories"],
            ContentFormat::Reel => &["reel", "reels"],
            ContentFormat::Igtv => &["igtv"],
            ContentFormat::FeedPost => &["feed", "feed post"],
            ContentFormat::Unknown => &[],
        }
    }
}

/// A date cell as authored, with the parsed value when a format matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    /// Trimmed cell text.
    pub raw: String,

    /// Parsed date, `None` if no configured format matched.
    pub parsed: Option<NaiveDate>,
}

/// Which stage produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The whole deck could not be read.
    FileError,
    /// One slide could not be read.
    ParseError,
}

/// A file- or slide-level problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub source_file: String,
    pub slide_number: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn file_error(source_file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::FileError,
            source_file: source_file.into(),
            slide_number: None,
            message: message.into(),
        }
    }

    pub fn parse_error(
        source_file: impl Into<String>,
        slide_number: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiagnosticKind::ParseError,
            source_file: source_file.into(),
            slide_number: Some(slide_number),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(DeckFormat::from_extension("PPTX"), Some(DeckFormat::Pptx));
        assert_eq!(DeckFormat::from_extension("pptm"), Some(DeckFormat::Pptx));
        assert_eq!(DeckFormat::from_extension("ppt"), Some(DeckFormat::Ppt));
        assert_eq!(DeckFormat::from_extension("key"), None);

        assert_eq!(
            DeckFormat::from_magic(&[0x50, 0x4B, 0x03, 0x04, 0, 0, 0, 0]),
            Some(DeckFormat::Pptx)
        );
        assert_eq!(
            DeckFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            Some(DeckFormat::Ppt)
        );
        assert_eq!(DeckFormat::from_magic(b"PK"), None);
    }

    #[test]
    fn test_slide_title_and_searchable_text() {
        let slide = SlideContent::new(3)
            .with_text("  ")
            .with_text("Hive Marketing")
            .with_table(vec![vec!["Reach".into(), "1,000".into()]]);

        assert_eq!(slide.title(), Some("Hive Marketing"));
        let text: Vec<&str> = slide.searchable_text().collect();
        assert_eq!(text, vec!["Hive Marketing", "Reach", "1,000"]);
        assert!(!slide.is_empty());
        assert!(SlideContent::new(1).is_empty());
    }

    #[test]
    fn test_unreadable_slide_keeps_position() {
        let mut deck = Deck::new("deck.pptx", DeckFormat::Pptx);
        deck.add_slide(SlideContent::new(1).with_text("Title"));
        deck.add_unreadable_slide(2, "bad xml");

        assert_eq!(deck.slides.len(), 2);
        assert!(deck.slides[1].is_empty());
        assert!(deck.is_unreadable(2));
        assert!(!deck.is_unreadable(1));
    }

    #[test]
    fn test_vocabulary_lookup() {
        assert_eq!(KolTier::lookup("MACRO"), KolTier::Macro);
        assert_eq!(KolTier::lookup("Micro-KOL"), KolTier::Micro);
        assert_eq!(KolTier::lookup("giga"), KolTier::Unknown);
        assert_eq!(AdType::lookup("Page Likes"), AdType::PageLikes);
        assert_eq!(CampaignType::lookup("Flash Sale"), CampaignType::FlashSale);
        assert_eq!(Platform::lookup("FB"), Platform::Facebook);
        assert_eq!(ContentFormat::lookup("Reels"), ContentFormat::Reel);
    }

    #[test]
    fn test_kol_tier_from_views() {
        assert_eq!(KolTier::from_views(2_000_000), KolTier::Mega);
        assert_eq!(KolTier::from_views(100_000), KolTier::Macro);
        assert_eq!(KolTier::from_views(10_000), KolTier::Micro);
        assert_eq!(KolTier::from_views(9_999), KolTier::Nano);
    }

    #[test]
    fn test_dashboard_keys_round_trip() {
        for d in DashboardType::ALL {
            assert_eq!(DashboardType::from_key(d.key()), Some(d));
        }
        assert_eq!(Platform::from_key("TikTok"), Some(Platform::TikTok));
        assert_eq!(Platform::from_key("myspace"), None);
    }

    #[test]
    fn test_validation_status_serializes_uppercase() {
        let json = serde_json::to_string(&ValidationStatus::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
        assert!(ValidationStatus::Warning.is_valid());
        assert!(!ValidationStatus::Pending.is_valid());
    }
}
