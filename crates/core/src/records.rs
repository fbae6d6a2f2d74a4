//! Typed analytics records, one schema per dashboard type.

use crate::fields::Field;
use crate::types::{
    AdType, CampaignType, ContentFormat, DashboardType, DateValue, KolTier, Platform,
    ValidationStatus,
};
use crate::values::Number;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance and validation state shared by every record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BaseRecord {
    pub source_file: String,
    pub slide_number: usize,

    /// Table data row the record came from; `None` for free-text records.
    pub row_index: Option<usize>,

    pub extraction_timestamp: DateTime<Utc>,

    /// Always recomputed from the error and warning counts.
    pub confidence_score: f64,
    pub validation_status: ValidationStatus,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
}

impl BaseRecord {
    pub fn new(source_file: impl Into<String>, slide_number: usize, row_index: Option<usize>) -> Self {
        Self {
            source_file: source_file.into(),
            slide_number,
            row_index,
            ..Default::default()
        }
    }
}

/// A parsed value ready to be stored in a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Number),
    Date(DateValue),
    List(Vec<String>),
    Platform(Platform),
    KolTier(KolTier),
    AdType(AdType),
    CampaignType(CampaignType),
    ContentFormat(ContentFormat),
}

fn ratio_percent(numerator: Option<i64>, denominator: Option<i64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0 => Some(n as f64 / d as f64 * 100.0),
        _ => None,
    }
}

fn sum_present(values: &[Option<i64>]) -> Option<i64> {
    if values.iter().all(Option::is_none) {
        return None;
    }
    Some(values.iter().flatten().sum())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SocialMediaData {
    pub base: BaseRecord,
    pub platform: Platform,
    pub post_title: String,
    pub post_date: Option<DateValue>,
    pub reach_views: Option<i64>,
    pub engagement: Option<i64>,
    pub likes: Option<i64>,
    pub shares: Option<i64>,
    pub comments: Option<i64>,
    pub saved: Option<i64>,
    pub content_format: ContentFormat,
    pub hashtags: Vec<String>,
}

impl SocialMediaData {
    /// Engagement as a percentage of reach.
    pub fn engagement_rate(&self) -> Option<f64> {
        ratio_percent(self.engagement, self.reach_views)
    }

    pub fn total_interactions(&self) -> Option<i64> {
        sum_present(&[self.likes, self.shares, self.comments, self.saved])
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommunityMarketingData {
    pub base: BaseRecord,
    pub community_name: Option<String>,
    pub post_title: String,
    pub post_date: Option<DateValue>,
    pub reach_views: Option<i64>,
    pub engagement: Option<i64>,
    pub likes: Option<i64>,
    pub shares: Option<i64>,
    pub comments: Option<i64>,
    pub saved: Option<i64>,
}

impl CommunityMarketingData {
    pub fn engagement_rate(&self) -> Option<f64> {
        ratio_percent(self.engagement, self.reach_views)
    }

    pub fn total_interactions(&self) -> Option<i64> {
        sum_present(&[self.likes, self.shares, self.comments, self.saved])
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KolEngagementData {
    pub base: BaseRecord,
    pub kol_name: Option<String>,
    pub platform: Platform,
    pub video_title: String,
    pub video_date: Option<DateValue>,
    pub views: Option<i64>,
    pub likes: Option<i64>,
    pub shares: Option<i64>,
    pub comments: Option<i64>,
    pub saved: Option<i64>,

    /// Tier stated on the slide, if any.
    pub kol_tier: Option<KolTier>,
}

impl KolEngagementData {
    /// The stated tier, or one derived from the view count.
    pub fn tier(&self) -> KolTier {
        match self.kol_tier {
            Some(tier) if tier != KolTier::Unknown => tier,
            _ => self.views.map_or(KolTier::Unknown, KolTier::from_views),
        }
    }

    pub fn total_interactions(&self) -> Option<i64> {
        sum_present(&[self.likes, self.shares, self.comments, self.saved])
    }

    /// Interactions as a percentage of views.
    pub fn engagement_rate(&self) -> Option<f64> {
        ratio_percent(self.total_interactions(), self.views)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMarketingData {
    pub base: BaseRecord,
    pub platform: Platform,
    pub ad_type: AdType,
    pub ad_count: Option<i64>,
    pub impressions: Option<i64>,
    pub reach: Option<i64>,
    pub clicks: Option<i64>,
    pub page_likes: Option<i64>,
    pub profile_visits: Option<i64>,
    pub follows: Option<i64>,
    pub spend: Option<f64>,
    pub conversions: Option<i64>,
    pub revenue: Option<f64>,
}

impl PerformanceMarketingData {
    /// Click-through rate in percent.
    pub fn ctr(&self) -> Option<f64> {
        ratio_percent(self.clicks, self.impressions)
    }

    /// Cost per click.
    pub fn cpc(&self) -> Option<f64> {
        match (self.spend, self.clicks) {
            (Some(spend), Some(clicks)) if clicks != 0 => Some(spend / clicks as f64),
            _ => None,
        }
    }

    /// Cost per conversion.
    pub fn cpa(&self) -> Option<f64> {
        match (self.spend, self.conversions) {
            (Some(spend), Some(conversions)) if conversions != 0 => {
                Some(spend / conversions as f64)
            }
            _ => None,
        }
    }

    /// Return on ad spend in percent: `(revenue - spend) / spend * 100`.
    pub fn roi(&self) -> Option<f64> {
        match (self.revenue, self.spend) {
            (Some(revenue), Some(spend)) if spend != 0.0 => {
                Some((revenue - spend) / spend * 100.0)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PromotionPostsData {
    pub base: BaseRecord,
    pub campaign_type: CampaignType,
    pub post_title: String,
    pub post_date: Option<DateValue>,
    pub reach: Option<i64>,
    pub engagement: Option<i64>,
    pub likes: Option<i64>,
    pub shares: Option<i64>,
    pub comments: Option<i64>,
    pub saved: Option<i64>,
    pub tags: Vec<String>,
}

impl PromotionPostsData {
    pub fn engagement_rate(&self) -> Option<f64> {
        ratio_percent(self.engagement, self.reach)
    }

    pub fn total_interactions(&self) -> Option<i64> {
        sum_present(&[self.likes, self.shares, self.comments, self.saved])
    }
}

/// One extracted record of any dashboard type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dashboard_type", rename_all = "snake_case")]
pub enum ExtractedRecord {
    SocialMedia(SocialMediaData),
    CommunityMarketing(CommunityMarketingData),
    KolEngagement(KolEngagementData),
    PerformanceMarketing(PerformanceMarketingData),
    PromotionPosts(PromotionPostsData),
}

/// Mutable slot for a numeric field, erasing the count/amount distinction.
enum NumberSlot<'a> {
    Count(&'a mut Option<i64>),
    Amount(&'a mut Option<f64>),
}

impl ExtractedRecord {
    /// An empty record of the given type.
    pub fn empty(dashboard: DashboardType, base: BaseRecord) -> Self {
        match dashboard {
            DashboardType::SocialMedia => Self::SocialMedia(SocialMediaData {
                base,
                ..Default::default()
            }),
            DashboardType::CommunityMarketing => Self::CommunityMarketing(CommunityMarketingData {
                base,
                ..Default::default()
            }),
            DashboardType::KolEngagement => Self::KolEngagement(KolEngagementData {
                base,
                ..Default::default()
            }),
            DashboardType::PerformanceMarketing => {
                Self::PerformanceMarketing(PerformanceMarketingData {
                    base,
                    ..Default::default()
                })
            }
            DashboardType::PromotionPosts => Self::PromotionPosts(PromotionPostsData {
                base,
                ..Default::default()
            }),
        }
    }

    pub fn dashboard_type(&self) -> DashboardType {
        match self {
            Self::SocialMedia(_) => DashboardType::SocialMedia,
            Self::CommunityMarketing(_) => DashboardType::CommunityMarketing,
            Self::KolEngagement(_) => DashboardType::KolEngagement,
            Self::PerformanceMarketing(_) => DashboardType::PerformanceMarketing,
            Self::PromotionPosts(_) => DashboardType::PromotionPosts,
        }
    }

    pub fn base(&self) -> &BaseRecord {
        match self {
            Self::SocialMedia(r) => &r.base,
            Self::CommunityMarketing(r) => &r.base,
            Self::KolEngagement(r) => &r.base,
            Self::PerformanceMarketing(r) => &r.base,
            Self::PromotionPosts(r) => &r.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseRecord {
        match self {
            Self::SocialMedia(r) => &mut r.base,
            Self::CommunityMarketing(r) => &mut r.base,
            Self::KolEngagement(r) => &mut r.base,
            Self::PerformanceMarketing(r) => &mut r.base,
            Self::PromotionPosts(r) => &mut r.base,
        }
    }

    /// Fields carried by a dashboard type's schema.
    pub fn schema(dashboard: DashboardType) -> &'static [Field] {
        use Field::*;
        match dashboard {
            DashboardType::SocialMedia => &[
                Platform, PostTitle, PostDate, ReachViews, Engagement, Likes, Shares, Comments,
                Saved, ContentFormat, Hashtags,
            ],
            DashboardType::CommunityMarketing => &[
                CommunityName, PostTitle, PostDate, ReachViews, Engagement, Likes, Shares,
                Comments, Saved,
            ],
            DashboardType::KolEngagement => &[
                KolName, Platform, VideoTitle, VideoDate, Views, Likes, Shares, Comments, Saved,
                KolTier,
            ],
            DashboardType::PerformanceMarketing => &[
                Platform, AdType, AdCount, Impressions, Reach, Clicks, PageLikes, ProfileVisits,
                Follows, Spend, Conversions, Revenue,
            ],
            DashboardType::PromotionPosts => &[
                CampaignType, PostTitle, PostDate, Reach, Engagement, Likes, Shares, Comments,
                Saved, Tags,
            ],
        }
    }

    fn number_slot(&mut self, field: Field) -> Option<NumberSlot<'_>> {
        use NumberSlot::{Amount, Count};
        let slot = match (self, field) {
            (Self::SocialMedia(r), Field::ReachViews) => Count(&mut r.reach_views),
            (Self::SocialMedia(r), Field::Engagement) => Count(&mut r.engagement),
            (Self::SocialMedia(r), Field::Likes) => Count(&mut r.likes),
            (Self::SocialMedia(r), Field::Shares) => Count(&mut r.shares),
            (Self::SocialMedia(r), Field::Comments) => Count(&mut r.comments),
            (Self::SocialMedia(r), Field::Saved) => Count(&mut r.saved),

            (Self::CommunityMarketing(r), Field::ReachViews) => Count(&mut r.reach_views),
            (Self::CommunityMarketing(r), Field::Engagement) => Count(&mut r.engagement),
            (Self::CommunityMarketing(r), Field::Likes) => Count(&mut r.likes),
            (Self::CommunityMarketing(r), Field::Shares) => Count(&mut r.shares),
            (Self::CommunityMarketing(r), Field::Comments) => Count(&mut r.comments),
            (Self::CommunityMarketing(r), Field::Saved) => Count(&mut r.saved),

            (Self::KolEngagement(r), Field::Views) => Count(&mut r.views),
            (Self::KolEngagement(r), Field::Likes) => Count(&mut r.likes),
            (Self::KolEngagement(r), Field::Shares) => Count(&mut r.shares),
            (Self::KolEngagement(r), Field::Comments) => Count(&mut r.comments),
            (Self::KolEngagement(r), Field::Saved) => Count(&mut r.saved),

            (Self::PerformanceMarketing(r), Field::AdCount) => Count(&mut r.ad_count),
            (Self::PerformanceMarketing(r), Field::Impressions) => Count(&mut r.impressions),
            (Self::PerformanceMarketing(r), Field::Reach) => Count(&mut r.reach),
            (Self::PerformanceMarketing(r), Field::Clicks) => Count(&mut r.clicks),
            (Self::PerformanceMarketing(r), Field::PageLikes) => Count(&mut r.page_likes),
            (Self::PerformanceMarketing(r), Field::ProfileVisits) => Count(&mut r.profile_visits),
            (Self::PerformanceMarketing(r), Field::Follows) => Count(&mut r.follows),
            (Self::PerformanceMarketing(r), Field::Spend) => Amount(&mut r.spend),
            (Self::PerformanceMarketing(r), Field::Conversions) => Count(&mut r.conversions),
            (Self::PerformanceMarketing(r), Field::Revenue) => Amount(&mut r.revenue),

            (Self::PromotionPosts(r), Field::Reach) => Count(&mut r.reach),
            (Self::PromotionPosts(r), Field::Engagement) => Count(&mut r.engagement),
            (Self::PromotionPosts(r), Field::Likes) => Count(&mut r.likes),
            (Self::PromotionPosts(r), Field::Shares) => Count(&mut r.shares),
            (Self::PromotionPosts(r), Field::Comments) => Count(&mut r.comments),
            (Self::PromotionPosts(r), Field::Saved) => Count(&mut r.saved),

            _ => return None,
        };
        Some(slot)
    }

    /// Store a value. Returns `false` if the field is not part of this
    /// record's schema or the value has the wrong shape.
    pub fn set(&mut self, field: Field, value: FieldValue) -> bool {
        if let FieldValue::Number(n) = value {
            return match self.number_slot(field) {
                Some(NumberSlot::Count(slot)) => match n.as_count() {
                    Some(count) => {
                        *slot = Some(count);
                        true
                    }
                    None => false,
                },
                Some(NumberSlot::Amount(slot)) => {
                    *slot = Some(n.as_f64());
                    true
                }
                None => false,
            };
        }

        match (self, field, value) {
            (Self::SocialMedia(r), Field::Platform, FieldValue::Platform(p)) => r.platform = p,
            (Self::SocialMedia(r), Field::PostTitle, FieldValue::Text(t)) => r.post_title = t,
            (Self::SocialMedia(r), Field::PostDate, FieldValue::Date(d)) => r.post_date = Some(d),
            (Self::SocialMedia(r), Field::ContentFormat, FieldValue::ContentFormat(c)) => {
                r.content_format = c
            }
            (Self::SocialMedia(r), Field::Hashtags, FieldValue::List(l)) => r.hashtags = l,

            (Self::CommunityMarketing(r), Field::CommunityName, FieldValue::Text(t)) => {
                r.community_name = Some(t)
            }
            (Self::CommunityMarketing(r), Field::PostTitle, FieldValue::Text(t)) => r.post_title = t,
            (Self::CommunityMarketing(r), Field::PostDate, FieldValue::Date(d)) => {
                r.post_date = Some(d)
            }

            (Self::KolEngagement(r), Field::KolName, FieldValue::Text(t)) => r.kol_name = Some(t),
            (Self::KolEngagement(r), Field::Platform, FieldValue::Platform(p)) => r.platform = p,
            (Self::KolEngagement(r), Field::VideoTitle, FieldValue::Text(t)) => r.video_title = t,
            (Self::KolEngagement(r), Field::VideoDate, FieldValue::Date(d)) => {
                r.video_date = Some(d)
            }
            (Self::KolEngagement(r), Field::KolTier, FieldValue::KolTier(t)) => r.kol_tier = Some(t),

            (Self::PerformanceMarketing(r), Field::Platform, FieldValue::Platform(p)) => {
                r.platform = p
            }
            (Self::PerformanceMarketing(r), Field::AdType, FieldValue::AdType(a)) => r.ad_type = a,

            (Self::PromotionPosts(r), Field::CampaignType, FieldValue::CampaignType(c)) => {
                r.campaign_type = c
            }
            (Self::PromotionPosts(r), Field::PostTitle, FieldValue::Text(t)) => r.post_title = t,
            (Self::PromotionPosts(r), Field::PostDate, FieldValue::Date(d)) => r.post_date = Some(d),
            (Self::PromotionPosts(r), Field::Tags, FieldValue::List(l)) => r.tags = l,

            _ => return false,
        }
        true
    }

    /// Current numeric value of a field.
    pub fn number(&self, field: Field) -> Option<f64> {
        let count = match (self, field) {
            (Self::SocialMedia(r), Field::ReachViews) => r.reach_views,
            (Self::SocialMedia(r), Field::Engagement) => r.engagement,
            (Self::SocialMedia(r), Field::Likes) => r.likes,
            (Self::SocialMedia(r), Field::Shares) => r.shares,
            (Self::SocialMedia(r), Field::Comments) => r.comments,
            (Self::SocialMedia(r), Field::Saved) => r.saved,

            (Self::CommunityMarketing(r), Field::ReachViews) => r.reach_views,
            (Self::CommunityMarketing(r), Field::Engagement) => r.engagement,
            (Self::CommunityMarketing(r), Field::Likes) => r.likes,
            (Self::CommunityMarketing(r), Field::Shares) => r.shares,
            (Self::CommunityMarketing(r), Field::Comments) => r.comments,
            (Self::CommunityMarketing(r), Field::Saved) => r.saved,

            (Self::KolEngagement(r), Field::Views) => r.views,
            (Self::KolEngagement(r), Field::Likes) => r.likes,
            (Self::KolEngagement(r), Field::Shares) => r.shares,
            (Self::KolEngagement(r), Field::Comments) => r.comments,
            (Self::KolEngagement(r), Field::Saved) => r.saved,

            (Self::PerformanceMarketing(r), Field::AdCount) => r.ad_count,
            (Self::PerformanceMarketing(r), Field::Impressions) => r.impressions,
            (Self::PerformanceMarketing(r), Field::Reach) => r.reach,
            (Self::PerformanceMarketing(r), Field::Clicks) => r.clicks,
            (Self::PerformanceMarketing(r), Field::PageLikes) => r.page_likes,
            (Self::PerformanceMarketing(r), Field::ProfileVisits) => r.profile_visits,
            (Self::PerformanceMarketing(r), Field::Follows) => r.follows,
            (Self::PerformanceMarketing(r), Field::Conversions) => r.conversions,
            (Self::PerformanceMarketing(r), Field::Spend) => return r.spend,
            (Self::PerformanceMarketing(r), Field::Revenue) => return r.revenue,

            (Self::PromotionPosts(r), Field::Reach) => r.reach,
            (Self::PromotionPosts(r), Field::Engagement) => r.engagement,
            (Self::PromotionPosts(r), Field::Likes) => r.likes,
            (Self::PromotionPosts(r), Field::Shares) => r.shares,
            (Self::PromotionPosts(r), Field::Comments) => r.comments,
            (Self::PromotionPosts(r), Field::Saved) => r.saved,

            _ => None,
        };
        count.map(|v| v as f64)
    }

    /// Current date value of a field.
    pub fn date(&self, field: Field) -> Option<&DateValue> {
        match (self, field) {
            (Self::SocialMedia(r), Field::PostDate) => r.post_date.as_ref(),
            (Self::CommunityMarketing(r), Field::PostDate) => r.post_date.as_ref(),
            (Self::KolEngagement(r), Field::VideoDate) => r.video_date.as_ref(),
            (Self::PromotionPosts(r), Field::PostDate) => r.post_date.as_ref(),
            _ => None,
        }
    }

    /// Whether a field holds a meaningful value.
    ///
    /// Enumerations count as absent while they are `Unknown`; titles count
    /// as absent while empty.
    pub fn is_present(&self, field: Field) -> bool {
        if self.number(field).is_some() || self.date(field).is_some() {
            return true;
        }
        match (self, field) {
            (Self::SocialMedia(r), Field::Platform) => r.platform != Platform::Unknown,
            (Self::SocialMedia(r), Field::PostTitle) => !r.post_title.is_empty(),
            (Self::SocialMedia(r), Field::ContentFormat) => r.content_format != ContentFormat::Unknown,
            (Self::SocialMedia(r), Field::Hashtags) => !r.hashtags.is_empty(),
            (Self::CommunityMarketing(r), Field::CommunityName) => r.community_name.is_some(),
            (Self::CommunityMarketing(r), Field::PostTitle) => !r.post_title.is_empty(),
            (Self::KolEngagement(r), Field::KolName) => r.kol_name.is_some(),
            (Self::KolEngagement(r), Field::Platform) => r.platform != Platform::Unknown,
            (Self::KolEngagement(r), Field::VideoTitle) => !r.video_title.is_empty(),
            (Self::KolEngagement(r), Field::KolTier) => {
                matches!(r.kol_tier, Some(t) if t != KolTier::Unknown)
            }
            (Self::PerformanceMarketing(r), Field::Platform) => r.platform != Platform::Unknown,
            (Self::PerformanceMarketing(r), Field::AdType) => r.ad_type != AdType::Unknown,
            (Self::PromotionPosts(r), Field::CampaignType) => {
                r.campaign_type != CampaignType::Unknown
            }
            (Self::PromotionPosts(r), Field::PostTitle) => !r.post_title.is_empty(),
            (Self::PromotionPosts(r), Field::Tags) => !r.tags.is_empty(),
            _ => false,
        }
    }

    /// Clamp a numeric field into `[min, max]`. Returns whether it changed.
    pub fn clamp(&mut self, field: Field, min: f64, max: f64) -> bool {
        match self.number_slot(field) {
            Some(NumberSlot::Count(Some(v))) => {
                let clamped = (*v as f64).clamp(min, max).round() as i64;
                let changed = clamped != *v;
                *v = clamped;
                changed
            }
            Some(NumberSlot::Amount(Some(v))) => {
                let clamped = v.clamp(min, max);
                let changed = clamped != *v;
                *v = clamped;
                changed
            }
            _ => false,
        }
    }

    pub fn as_social_media(&self) -> Option<&SocialMediaData> {
        match self {
            Self::SocialMedia(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_community_marketing(&self) -> Option<&CommunityMarketingData> {
        match self {
            Self::CommunityMarketing(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_kol_engagement(&self) -> Option<&KolEngagementData> {
        match self {
            Self::KolEngagement(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_performance_marketing(&self) -> Option<&PerformanceMarketingData> {
        match self {
            Self::PerformanceMarketing(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_promotion_posts(&self) -> Option<&PromotionPostsData> {
        match self {
            Self::PromotionPosts(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn social(reach: Option<i64>, engagement: Option<i64>) -> SocialMediaData {
        SocialMediaData {
            reach_views: reach,
            engagement,
            ..Default::default()
        }
    }

    #[test]
    fn test_engagement_rate() {
        assert_eq!(social(Some(1000), Some(50)).engagement_rate(), Some(5.0));
        assert_eq!(social(None, Some(50)).engagement_rate(), None);
        assert_eq!(social(Some(0), Some(50)).engagement_rate(), None);
        assert_eq!(social(Some(1000), None).engagement_rate(), None);
    }

    #[test]
    fn test_total_interactions_sums_present_values() {
        let mut record = social(Some(1000), Some(50));
        assert_eq!(record.total_interactions(), None);
        record.likes = Some(30);
        record.comments = Some(10);
        assert_eq!(record.total_interactions(), Some(40));
    }

    #[test]
    fn test_kol_tier_prefers_explicit_value() {
        let mut kol = KolEngagementData {
            views: Some(250_000),
            ..Default::default()
        };
        assert_eq!(kol.tier(), KolTier::Macro);
        kol.kol_tier = Some(KolTier::Mega);
        assert_eq!(kol.tier(), KolTier::Mega);
        kol.kol_tier = Some(KolTier::Unknown);
        assert_eq!(kol.tier(), KolTier::Macro);
        kol.views = None;
        assert_eq!(kol.tier(), KolTier::Unknown);
    }

    #[test]
    fn test_performance_ratios() {
        let perf = PerformanceMarketingData {
            impressions: Some(10_000),
            clicks: Some(200),
            spend: Some(500.0),
            conversions: Some(25),
            revenue: Some(1500.0),
            ..Default::default()
        };
        assert_eq!(perf.ctr(), Some(2.0));
        assert_eq!(perf.cpc(), Some(2.5));
        assert_eq!(perf.cpa(), Some(20.0));
        assert_eq!(perf.roi(), Some(200.0));

        let empty = PerformanceMarketingData {
            spend: Some(0.0),
            revenue: Some(10.0),
            ..Default::default()
        };
        assert_eq!(empty.roi(), None);
        assert_eq!(empty.ctr(), None);
    }

    #[test]
    fn test_set_respects_schema() {
        let mut record = ExtractedRecord::empty(DashboardType::SocialMedia, BaseRecord::default());
        assert!(record.set(Field::Likes, FieldValue::Number(Number::Int(30))));
        assert!(record.set(Field::Platform, FieldValue::Platform(Platform::Facebook)));
        assert!(!record.set(Field::Spend, FieldValue::Number(Number::Float(1.0))));
        assert!(!record.set(Field::Likes, FieldValue::Text("thirty".into())));

        assert_eq!(record.number(Field::Likes), Some(30.0));
        assert!(record.is_present(Field::Platform));
        assert!(!record.is_present(Field::ReachViews));
    }

    #[test]
    fn test_undetected_content_format_is_unknown() {
        let record = ExtractedRecord::empty(DashboardType::SocialMedia, BaseRecord::default());
        assert!(!record.is_present(Field::ContentFormat));

        let social = record.as_social_media().unwrap();
        assert_eq!(social.content_format, ContentFormat::Unknown);
        let json = serde_json::to_value(social).unwrap();
        assert_eq!(json["content_format"], "Unknown");
    }

    #[test]
    fn test_clamp() {
        let mut record =
            ExtractedRecord::empty(DashboardType::PerformanceMarketing, BaseRecord::default());
        record.set(Field::Spend, FieldValue::Number(Number::Float(250_000.0)));
        record.set(Field::Clicks, FieldValue::Number(Number::Int(-3)));

        assert!(record.clamp(Field::Spend, 0.0, 100_000.0));
        assert!(record.clamp(Field::Clicks, 0.0, 1_000_000.0));
        assert!(!record.clamp(Field::Impressions, 0.0, 10.0));

        let perf = record.as_performance_marketing().unwrap();
        assert_eq!(perf.spend, Some(100_000.0));
        assert_eq!(perf.clicks, Some(0));
    }

    #[test]
    fn test_record_serializes_with_type_tag() {
        let record = ExtractedRecord::empty(DashboardType::KolEngagement, BaseRecord::new("a.pptx", 4, Some(2)));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["dashboard_type"], "kol_engagement");
        assert_eq!(json["base"]["slide_number"], 4);
        assert_eq!(json["base"]["validation_status"], "PENDING");

        let back: ExtractedRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
