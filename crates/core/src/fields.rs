//! Declarative field mappings: which slide labels feed which record fields.

use crate::normalize::{contains_phrase, edit_distance_within, label_key};
use crate::types::DashboardType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typos tolerated when a header matches no pattern outright.
const HEADER_TYPO_TOLERANCE: usize = 1;

/// Shortest pattern that may be matched with a typo.
const MIN_FUZZY_PATTERN_CHARS: usize = 5;

/// Labels of ratios computed from other fields ("Engagement Rate",
/// "Cost per Click"). They never feed a stored field.
const DERIVED_LABEL_WORDS: &[&str] = &["rate", "ratio", "per", "avg", "average"];

/// Every typed field a record schema can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Platform,
    PostTitle,
    PostDate,
    ReachViews,
    Engagement,
    Likes,
    Shares,
    Comments,
    Saved,
    ContentFormat,
    Hashtags,
    CommunityName,
    KolName,
    VideoTitle,
    VideoDate,
    Views,
    KolTier,
    AdType,
    AdCount,
    Impressions,
    Reach,
    Clicks,
    PageLikes,
    ProfileVisits,
    Follows,
    Spend,
    Conversions,
    Revenue,
    CampaignType,
    Tags,
}

/// Which parser reads a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    /// Integer counts (reach, likes, ...).
    Count,
    /// Money and other fractional amounts.
    Amount,
    Date,
    List,
    Enum(EnumKind),
}

impl ValueKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Count | ValueKind::Amount)
    }
}

/// Closed vocabularies an enum field is parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumKind {
    Platform,
    KolTier,
    AdType,
    CampaignType,
    ContentFormat,
}

impl Field {
    /// Snake-case field name used in configuration and messages.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Platform => "platform",
            Field::PostTitle => "post_title",
            Field::PostDate => "post_date",
            Field::ReachViews => "reach_views",
            Field::Engagement => "engagement",
            Field::Likes => "likes",
            Field::Shares => "shares",
            Field::Comments => "comments",
            Field::Saved => "saved",
            Field::ContentFormat => "content_format",
            Field::Hashtags => "hashtags",
            Field::CommunityName => "community_name",
            Field::KolName => "kol_name",
            Field::VideoTitle => "video_title",
            Field::VideoDate => "video_date",
            Field::Views => "views",
            Field::KolTier => "kol_tier",
            Field::AdType => "ad_type",
            Field::AdCount => "ad_count",
            Field::Impressions => "impressions",
            Field::Reach => "reach",
            Field::Clicks => "clicks",
            Field::PageLikes => "page_likes",
            Field::ProfileVisits => "profile_visits",
            Field::Follows => "follows",
            Field::Spend => "spend",
            Field::Conversions => "conversions",
            Field::Revenue => "revenue",
            Field::CampaignType => "campaign_type",
            Field::Tags => "tags",
        }
    }

    /// Parse a snake-case field name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name.trim())
    }

    /// The parser that reads this field.
    pub fn kind(&self) -> ValueKind {
        match self {
            Field::PostTitle | Field::CommunityName | Field::KolName | Field::VideoTitle => {
                ValueKind::Text
            }
            Field::PostDate | Field::VideoDate => ValueKind::Date,
            Field::ReachViews
            | Field::Engagement
            | Field::Likes
            | Field::Shares
            | Field::Comments
            | Field::Saved
            | Field::Views
            | Field::AdCount
            | Field::Impressions
            | Field::Reach
            | Field::Clicks
            | Field::PageLikes
            | Field::ProfileVisits
            | Field::Follows
            | Field::Conversions => ValueKind::Count,
            Field::Spend | Field::Revenue => ValueKind::Amount,
            Field::Hashtags | Field::Tags => ValueKind::List,
            Field::Platform => ValueKind::Enum(EnumKind::Platform),
            Field::KolTier => ValueKind::Enum(EnumKind::KolTier),
            Field::AdType => ValueKind::Enum(EnumKind::AdType),
            Field::CampaignType => ValueKind::Enum(EnumKind::CampaignType),
            Field::ContentFormat => ValueKind::Enum(EnumKind::ContentFormat),
        }
    }

    pub const ALL: [Field; 30] = [
        Field::Platform,
        Field::PostTitle,
        Field::PostDate,
        Field::ReachViews,
        Field::Engagement,
        Field::Likes,
        Field::Shares,
        Field::Comments,
        Field::Saved,
        Field::ContentFormat,
        Field::Hashtags,
        Field::CommunityName,
        Field::KolName,
        Field::VideoTitle,
        Field::VideoDate,
        Field::Views,
        Field::KolTier,
        Field::AdType,
        Field::AdCount,
        Field::Impressions,
        Field::Reach,
        Field::Clicks,
        Field::PageLikes,
        Field::ProfileVisits,
        Field::Follows,
        Field::Spend,
        Field::Conversions,
        Field::Revenue,
        Field::CampaignType,
        Field::Tags,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `(target_field, candidate_source_patterns, value_parser)` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub field: Field,

    /// Header or label spellings, compared as label keys.
    pub patterns: Vec<String>,

    pub parser: ValueKind,

    /// Column index used when a table has no header row.
    pub position: Option<usize>,
}

impl FieldSpec {
    pub fn new(field: Field, patterns: &[&str], position: Option<usize>) -> Self {
        Self {
            field,
            patterns: patterns.iter().map(|p| label_key(p)).collect(),
            parser: field.kind(),
            position,
        }
    }
}

/// How strongly a header matched a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchStrength {
    Typo,
    /// Pattern found inside the header; longer patterns rank higher.
    Contained(usize),
    Exact,
}

/// Ordered field specs for one dashboard type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    specs: Vec<FieldSpec>,
}

impl FieldMapping {
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        Self { specs }
    }

    /// Built-in mapping for a dashboard type.
    pub fn for_dashboard(dashboard: DashboardType) -> Self {
        use Field::*;
        let s = FieldSpec::new;
        let specs = match dashboard {
            DashboardType::SocialMedia => vec![
                s(PostTitle, &["post title", "title", "post", "content", "caption"], Some(0)),
                s(PostDate, &["post date", "date", "posted", "published", "posting date"], Some(1)),
                s(ReachViews, &["reach/views", "reach", "views", "view count", "reach/view"], Some(2)),
                s(Engagement, &["engagement", "engagements", "total engagement"], Some(3)),
                s(Likes, &["likes", "like count", "reactions"], Some(4)),
                s(Shares, &["shares", "share count", "shared"], Some(5)),
                s(Comments, &["comments", "comment count"], Some(6)),
                s(Saved, &["saved", "saves", "save count"], Some(7)),
                s(Platform, &["platform", "channel", "network"], None),
                s(ContentFormat, &["format", "post type", "content type"], None),
                s(Hashtags, &["hashtags", "hashtag"], None),
            ],
            DashboardType::CommunityMarketing => vec![
                s(PostTitle, &["post title", "title", "post", "content"], Some(0)),
                s(PostDate, &["post date", "date", "posted"], Some(1)),
                s(ReachViews, &["reach/views", "reach", "views"], Some(2)),
                s(Engagement, &["engagement", "engagements", "total engagement"], Some(3)),
                s(Likes, &["likes", "reactions"], Some(4)),
                s(Shares, &["shares", "shared"], Some(5)),
                s(Comments, &["comments"], Some(6)),
                s(Saved, &["saved", "saves"], Some(7)),
                s(CommunityName, &["community", "community name", "group", "hive"], None),
            ],
            DashboardType::KolEngagement => vec![
                s(KolName, &["kol", "kol name", "influencer", "creator", "talent"], Some(0)),
                s(VideoTitle, &["video title", "title", "video", "content"], Some(1)),
                s(VideoDate, &["video date", "date", "posted", "post date"], Some(2)),
                s(Views, &["views", "video views", "view count", "reach/views"], Some(3)),
                s(Likes, &["likes", "like count"], Some(4)),
                s(Shares, &["shares", "share count"], Some(5)),
                s(Comments, &["comments", "comment count"], Some(6)),
                s(Saved, &["saved", "saves"], Some(7)),
                s(KolTier, &["tier", "kol tier", "influencer tier"], None),
                s(Platform, &["platform", "channel"], None),
            ],
            DashboardType::PerformanceMarketing => vec![
                s(AdType, &["ad type", "objective", "campaign objective", "type"], Some(0)),
                s(AdCount, &["ad count", "ads", "no of ads", "number of ads"], Some(1)),
                s(Impressions, &["impressions", "impr"], Some(2)),
                s(Reach, &["reach"], Some(3)),
                s(Clicks, &["clicks", "link clicks"], Some(4)),
                s(PageLikes, &["page likes"], Some(5)),
                s(ProfileVisits, &["profile visits"], Some(6)),
                s(Follows, &["follows", "followers", "new followers"], Some(7)),
                s(Spend, &["spend", "amount spent", "cost", "budget"], Some(8)),
                s(Conversions, &["conversions", "purchases", "results"], Some(9)),
                s(Revenue, &["revenue", "sales", "conversion value"], Some(10)),
                s(Platform, &["platform", "channel"], None),
            ],
            DashboardType::PromotionPosts => vec![
                s(PostTitle, &["post title", "title", "post", "promotion"], Some(0)),
                s(PostDate, &["post date", "date", "posted"], Some(1)),
                s(Reach, &["reach", "reach/views", "views"], Some(2)),
                s(Engagement, &["engagement", "engagements"], Some(3)),
                s(Likes, &["likes", "reactions"], Some(4)),
                s(Shares, &["shares"], Some(5)),
                s(Comments, &["comments"], Some(6)),
                s(Saved, &["saved", "saves"], Some(7)),
                s(CampaignType, &["campaign type", "campaign", "promotion type"], None),
                s(Tags, &["tags", "products", "hashtags"], None),
            ],
        };
        Self { specs }
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn spec(&self, field: Field) -> Option<&FieldSpec> {
        self.specs.iter().find(|s| s.field == field)
    }

    pub(crate) fn spec_mut(&mut self, field: Field) -> Option<&mut FieldSpec> {
        self.specs.iter_mut().find(|s| s.field == field)
    }

    pub(crate) fn push(&mut self, spec: FieldSpec) {
        self.specs.push(spec);
    }

    /// Field a header or label refers to, if any.
    pub fn resolve(&self, label: &str) -> Option<Field> {
        self.resolve_among(label, |_| true)
    }

    /// Like [`resolve`](Self::resolve), restricted to specs accepted by `filter`.
    pub fn resolve_among(&self, label: &str, filter: impl Fn(&FieldSpec) -> bool) -> Option<Field> {
        let key = label_key(label);
        if key.is_empty() || DERIVED_LABEL_WORDS.iter().any(|w| contains_phrase(&key, w)) {
            return None;
        }

        let mut best: Option<(MatchStrength, Field)> = None;
        for spec in self.specs.iter().filter(|s| filter(s)) {
            for pattern in &spec.patterns {
                let strength = if *pattern == key {
                    Some(MatchStrength::Exact)
                } else if contains_phrase(&key, pattern) {
                    Some(MatchStrength::Contained(pattern.len()))
                } else if pattern.chars().count() >= MIN_FUZZY_PATTERN_CHARS
                    && edit_distance_within(&key, pattern, HEADER_TYPO_TOLERANCE).is_some()
                {
                    Some(MatchStrength::Typo)
                } else {
                    None
                };
                // Earlier specs win ties.
                if let Some(strength) = strength {
                    if best.map_or(true, |(b, _)| strength > b) {
                        best = Some((strength, spec.field));
                    }
                }
            }
        }
        best.map(|(_, field)| field)
    }

    /// Map each header cell to a field. Each field is claimed by at most one
    /// column, the strongest match first.
    pub fn resolve_headers(&self, headers: &[String]) -> Vec<Option<Field>> {
        let mut columns: Vec<Option<Field>> = Vec::with_capacity(headers.len());
        for header in headers {
            let field = self.resolve_among(header, |s| !columns.contains(&Some(s.field)));
            columns.push(field);
        }
        columns
    }
}
