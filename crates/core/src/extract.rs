//! Field extraction: classified slide content into typed records.
//!
//! Records come from three sources on a slide:
//!
//! - **Tables with a header row.** Each header is resolved to a field through
//!   the dashboard's [`FieldMapping`]; every data row becomes one record.
//! - **Headerless tables.** Columns are assigned by the fixed positions of the
//!   mapping. For social media posts the platform's metric order decides the
//!   metric columns.
//! - **Labelled values.** Label/value tables (`Reach | 41,607 | Engagement |
//!   3,775`) and `Label: value` lines. These describe the whole slide: they
//!   become one record when there are no table rows, and otherwise fill
//!   fields the rows leave empty.

use crate::classify::{detect_vocabulary, Classification};
use crate::config::Config;
use crate::fields::{EnumKind, Field, FieldMapping, ValueKind};
use crate::normalize::clean_title;
use crate::records::{BaseRecord, ExtractedRecord, FieldValue};
use crate::types::{
    AdType, CampaignType, ContentFormat, DashboardType, KolTier, Platform, SlideContent,
};
use crate::values::{parse_date, parse_enum, parse_list, parse_number, parse_text, Parsed};
use regex::Regex;
use std::sync::LazyLock;

/// Regex for `Label: value` segments.
static LABELLED_VALUE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([^:=]{1,40}?)\s*[:=]\s*(\S.*?)\s*$").unwrap());

/// Regex for hashtags in free text.
static HASHTAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#[\p{L}\p{N}_]+").unwrap());

/// Minimum resolved headers for a row to count as a header row.
const MIN_HEADER_FIELDS: usize = 2;

/// First column of platform metrics in headerless post tables.
const METRIC_COLUMN_OFFSET: usize = 2;

/// A raw value found for a field, before parsing.
#[derive(Debug, Clone)]
struct RawValue {
    field: Field,
    text: String,
}

/// Maps classified slides into typed records.
pub struct FieldExtractor<'a> {
    config: &'a Config,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Extract every record a slide carries. Returns an empty list when the
    /// slide has no usable rows or labelled values.
    ///
    /// Returned records hold extraction warnings but have not been
    /// validated or scored.
    pub fn extract(
        &self,
        slide: &SlideContent,
        classification: &Classification,
        source_file: &str,
    ) -> Vec<ExtractedRecord> {
        let dashboard = classification.dashboard;
        let mapping = self.config.mapping(dashboard);

        let mut labelled = self.labelled_lines(slide, mapping);
        let mut rows: Vec<Vec<RawValue>> = Vec::new();

        for table in &slide.tables {
            if let Some(pairs) = label_value_pairs(table, mapping) {
                labelled.extend(pairs);
                continue;
            }
            rows.extend(self.table_rows(table, dashboard, classification.platform, mapping));
        }

        let records: Vec<ExtractedRecord> = if rows.is_empty() {
            if labelled.is_empty() {
                log::debug!("Slide {}: no rows or labelled values", slide.slide_number);
                return Vec::new();
            }
            let base = BaseRecord::new(source_file, slide.slide_number, None);
            vec![self.build(dashboard, base, &labelled, &[], slide, classification)]
        } else {
            rows.iter()
                .enumerate()
                .map(|(i, row)| {
                    let base = BaseRecord::new(source_file, slide.slide_number, Some(i));
                    self.build(dashboard, base, row, &labelled, slide, classification)
                })
                .collect()
        };

        log::debug!(
            "Slide {}: {} {} record(s)",
            slide.slide_number,
            records.len(),
            dashboard
        );
        records
    }

    /// `Label: value` segments of every text block. Lines may hold several
    /// segments separated by `|` or `;`.
    fn labelled_lines(&self, slide: &SlideContent, mapping: &FieldMapping) -> Vec<RawValue> {
        let mut values = Vec::new();
        for block in &slide.text_blocks {
            for segment in block.lines().flat_map(|line| line.split(['|', ';'])) {
                let Some(caps) = LABELLED_VALUE_REGEX.captures(segment) else {
                    continue;
                };
                if let Some(field) = mapping.resolve(&caps[1]) {
                    values.push(RawValue {
                        field,
                        text: caps[2].to_string(),
                    });
                }
            }
        }
        values
    }

    /// Data rows of a grid table, as raw values per field.
    fn table_rows(
        &self,
        table: &[Vec<String>],
        dashboard: DashboardType,
        platform: Platform,
        mapping: &FieldMapping,
    ) -> Vec<Vec<RawValue>> {
        let Some(first) = table.first() else {
            return Vec::new();
        };

        let (columns, data) = match header_columns(first, mapping) {
            Some(columns) => (columns, &table[1..]),
            None => {
                let width = table.iter().map(Vec::len).max().unwrap_or(0);
                (self.positional_columns(dashboard, platform, mapping, width), table)
            }
        };

        data.iter()
            .filter_map(|row| {
                let values: Vec<RawValue> = row
                    .iter()
                    .zip(&columns)
                    .filter_map(|(cell, field)| {
                        let field = (*field)?;
                        (!cell.trim().is_empty()).then(|| RawValue {
                            field,
                            text: cell.clone(),
                        })
                    })
                    .collect();
                (!values.is_empty()).then_some(values)
            })
            .collect()
    }

    /// Column assignment for tables without a header row.
    fn positional_columns(
        &self,
        dashboard: DashboardType,
        platform: Platform,
        mapping: &FieldMapping,
        width: usize,
    ) -> Vec<Option<Field>> {
        let mut columns = vec![None; width];
        for spec in mapping.specs() {
            if let Some(position) = spec.position {
                if position < width {
                    columns[position] = Some(spec.field);
                }
            }
        }

        if dashboard == DashboardType::SocialMedia {
            let metrics = self
                .config
                .platform(platform)
                .map(|p| p.metrics.as_slice())
                .unwrap_or_default();
            for (i, metric) in metrics.iter().enumerate() {
                let column = METRIC_COLUMN_OFFSET + i;
                if column < width {
                    columns[column] = mapping.resolve(metric);
                }
            }
        }
        columns
    }

    /// Assemble one record from primary values, falling back to slide-level
    /// defaults and detection for fields left empty.
    fn build(
        &self,
        dashboard: DashboardType,
        base: BaseRecord,
        primary: &[RawValue],
        defaults: &[RawValue],
        slide: &SlideContent,
        classification: &Classification,
    ) -> ExtractedRecord {
        let mut record = ExtractedRecord::empty(dashboard, base);
        let mut warnings = Vec::new();
        let mut stored: Vec<Field> = Vec::new();

        for raw in primary.iter().chain(defaults) {
            if !stored.contains(&raw.field) && self.apply(&mut record, raw, &mut warnings) {
                stored.push(raw.field);
            }
        }

        self.fill_fallbacks(&mut record, &stored, slide, classification);
        record.base_mut().validation_warnings.extend(warnings);
        record
    }

    /// Parse and store one raw value. Returns whether a value was stored.
    fn apply(&self, record: &mut ExtractedRecord, raw: &RawValue, warnings: &mut Vec<String>) -> bool {
        let stored = match self.parse(raw.field, &raw.text) {
            Parsed::Value(value) => record.set(raw.field, value),
            Parsed::Empty => return false,
            Parsed::Invalid => false,
        };
        if !stored {
            warnings.push(format!("Unparsable value for {}: '{}'", raw.field, raw.text.trim()));
        }
        stored
    }

    fn parse(&self, field: Field, raw: &str) -> Parsed<FieldValue> {
        match field.kind() {
            ValueKind::Text => map(parse_text(raw), FieldValue::Text),
            ValueKind::Count | ValueKind::Amount => map(parse_number(raw), FieldValue::Number),
            ValueKind::Date => map(parse_date(raw, self.config.date_formats()), FieldValue::Date),
            ValueKind::List => map(parse_list(raw, self.config.list_delimiter()), FieldValue::List),
            ValueKind::Enum(kind) => match kind {
                EnumKind::Platform => map(parse_enum::<Platform>(raw), FieldValue::Platform),
                EnumKind::KolTier => map(parse_enum::<KolTier>(raw), FieldValue::KolTier),
                EnumKind::AdType => map(parse_enum::<AdType>(raw), FieldValue::AdType),
                EnumKind::CampaignType => {
                    map(parse_enum::<CampaignType>(raw), FieldValue::CampaignType)
                }
                EnumKind::ContentFormat => {
                    map(parse_enum::<ContentFormat>(raw), FieldValue::ContentFormat)
                }
            },
        }
    }

    fn fill_fallbacks(
        &self,
        record: &mut ExtractedRecord,
        stored: &[Field],
        slide: &SlideContent,
        classification: &Classification,
    ) {
        let title_field = match record.dashboard_type() {
            DashboardType::KolEngagement => Some(Field::VideoTitle),
            DashboardType::PerformanceMarketing => None,
            _ => Some(Field::PostTitle),
        };
        if let Some(field) = title_field {
            if !record.is_present(field) {
                let title = clean_title(slide.title().unwrap_or_default());
                record.set(field, FieldValue::Text(title));
            }
        }

        let schema = ExtractedRecord::schema(record.dashboard_type());
        if schema.contains(&Field::Platform) && !record.is_present(Field::Platform) {
            record.set(Field::Platform, FieldValue::Platform(classification.platform));
        }

        match record.dashboard_type() {
            DashboardType::SocialMedia => {
                if !stored.contains(&Field::ContentFormat) {
                    if let Some(format) = detect_vocabulary::<ContentFormat>(slide) {
                        record.set(Field::ContentFormat, FieldValue::ContentFormat(format));
                    }
                }
                if !stored.contains(&Field::Hashtags) {
                    let tags = hashtags(slide);
                    if !tags.is_empty() {
                        record.set(Field::Hashtags, FieldValue::List(tags));
                    }
                }
            }
            DashboardType::PerformanceMarketing => {
                if !record.is_present(Field::AdType) {
                    if let Some(ad_type) = detect_vocabulary::<AdType>(slide) {
                        record.set(Field::AdType, FieldValue::AdType(ad_type));
                    }
                }
            }
            DashboardType::PromotionPosts => {
                if !record.is_present(Field::CampaignType) {
                    if let Some(campaign) = detect_vocabulary::<CampaignType>(slide) {
                        record.set(Field::CampaignType, FieldValue::CampaignType(campaign));
                    }
                }
            }
            DashboardType::CommunityMarketing | DashboardType::KolEngagement => {}
        }
    }
}

fn map<T>(parsed: Parsed<T>, f: impl FnOnce(T) -> FieldValue) -> Parsed<FieldValue> {
    match parsed {
        Parsed::Value(v) => Parsed::Value(f(v)),
        Parsed::Empty => Parsed::Empty,
        Parsed::Invalid => Parsed::Invalid,
    }
}

/// Resolve a header row. `None` unless at least two cells name distinct
/// fields and no cell is a number.
fn header_columns(row: &[String], mapping: &FieldMapping) -> Option<Vec<Option<Field>>> {
    if row.iter().any(|cell| matches!(parse_number(cell), Parsed::Value(_))) {
        return None;
    }
    let columns = mapping.resolve_headers(row);
    let resolved = columns.iter().flatten().count();
    (resolved >= MIN_HEADER_FIELDS).then_some(columns)
}

/// Pairs of a label/value table, or `None` when the table is a grid.
///
/// Every row must alternate label and value cells: each label resolves to a
/// field and no value cell reads as a label.
fn label_value_pairs(table: &[Vec<String>], mapping: &FieldMapping) -> Option<Vec<RawValue>> {
    let mut pairs = Vec::new();
    for row in table {
        if row.is_empty() || row.len() % 2 != 0 {
            return None;
        }
        for pair in row.chunks(2) {
            let field = mapping.resolve(&pair[0])?;
            if mapping.resolve(&pair[1]).is_some() {
                return None;
            }
            pairs.push(RawValue {
                field,
                text: pair[1].clone(),
            });
        }
    }
    (!pairs.is_empty()).then_some(pairs)
}

fn hashtags(slide: &SlideContent) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for block in &slide.text_blocks {
        for m in HASHTAG_REGEX.find_iter(block) {
            let tag = m.as_str().to_string();
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classifier, MatchMethod};
    use chrono::NaiveDate;

    fn config() -> Config {
        Config::from_yaml_str(include_str!("../../../config/dashboard_config.yaml")).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn classification(dashboard: DashboardType, platform: Platform) -> Classification {
        Classification {
            dashboard,
            platform,
            matched_keyword: String::new(),
            method: MatchMethod::Exact,
        }
    }

    #[test]
    fn test_headerless_facebook_row() {
        let config = config();
        let slide = SlideContent::new(3)
            .with_text("TF Value-Mart FB Page Wallposts Performance")
            .with_table(vec![row(&["Post A", "3/1/2024", "1000", "50", "30", "5", "10", "5"])]);
        let class = Classifier::new(&config).classify(&slide).unwrap();

        let records = FieldExtractor::new(&config).extract(&slide, &class, "deck.pptx");
        assert_eq!(records.len(), 1);

        let social = records[0].as_social_media().unwrap();
        assert_eq!(social.platform, Platform::Facebook);
        assert_eq!(social.post_title, "Post A");
        assert_eq!(
            social.post_date.as_ref().unwrap().parsed,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(social.reach_views, Some(1000));
        assert_eq!(social.engagement, Some(50));
        assert_eq!(social.engagement_rate(), Some(5.0));
        assert_eq!(social.total_interactions(), Some(50));
        assert_eq!(social.base.row_index, Some(0));
        assert!(social.base.validation_warnings.is_empty());
    }

    #[test]
    fn test_header_row_with_reordered_columns() {
        let config = config();
        let slide = SlideContent::new(4).with_text("IG Wallposts").with_table(vec![
            row(&["Date", "Post Title", "Likes", "Reach/Views", "Engagement Rate"]),
            row(&["12 Mar 2024", "Ramadan teaser", "1.2K", "41,607", "3%"]),
            row(&["", "", "", "", ""]),
            row(&["13 Mar 2024", "Menu reveal", "n/a", "lots", "-"]),
        ]);
        let records = FieldExtractor::new(&config).extract(
            &slide,
            &classification(DashboardType::SocialMedia, Platform::Instagram),
            "deck.pptx",
        );
        assert_eq!(records.len(), 2);

        let first = records[0].as_social_media().unwrap();
        assert_eq!(first.post_title, "Ramadan teaser");
        assert_eq!(first.likes, Some(1200));
        assert_eq!(first.reach_views, Some(41_607));
        assert_eq!(first.engagement, None);
        assert_eq!(first.platform, Platform::Instagram);

        let second = records[1].as_social_media().unwrap();
        assert_eq!(second.likes, None);
        assert_eq!(second.reach_views, None);
        assert_eq!(
            second.base.validation_warnings,
            vec!["Unparsable value for reach_views: 'lots'"]
        );
        assert_eq!(second.base.row_index, Some(1));
    }

    #[test]
    fn test_label_value_table_yields_one_record() {
        let config = config();
        let slide = SlideContent::new(5).with_text("Hive Marketing").with_table(vec![
            row(&["Reach", "41,607", "Engagement", "3,775"]),
            row(&["Likes", "2,100", "Comments", "85"]),
        ]);
        let records = FieldExtractor::new(&config).extract(
            &slide,
            &classification(DashboardType::CommunityMarketing, Platform::Unknown),
            "deck.pptx",
        );
        assert_eq!(records.len(), 1);
        let community = records[0].as_community_marketing().unwrap();
        assert_eq!(community.reach_views, Some(41_607));
        assert_eq!(community.engagement, Some(3_775));
        assert_eq!(community.comments, Some(85));
        assert_eq!(community.post_title, "Hive Marketing");
        assert_eq!(community.base.row_index, None);
    }

    #[test]
    fn test_labelled_lines_and_defaults() {
        let config = config();
        let slide = SlideContent::new(6)
            .with_text("KOL Engagement")
            .with_text("Platform: TikTok | Tier: Micro")
            .with_table(vec![
                row(&["KOL Name", "Video Title", "Views", "Likes"]),
                row(&["Aina", "Taste test", "12,500", "900"]),
            ]);
        let records = FieldExtractor::new(&config).extract(
            &slide,
            &classification(DashboardType::KolEngagement, Platform::Unknown),
            "deck.pptx",
        );
        assert_eq!(records.len(), 1);
        let kol = records[0].as_kol_engagement().unwrap();
        assert_eq!(kol.kol_name.as_deref(), Some("Aina"));
        assert_eq!(kol.platform, Platform::TikTok);
        assert_eq!(kol.kol_tier, Some(KolTier::Micro));
        assert_eq!(kol.views, Some(12_500));
    }

    #[test]
    fn test_no_data_yields_no_records() {
        let config = config();
        let slide = SlideContent::new(7).with_text("Promotion Posts").with_text("Overview");
        let records = FieldExtractor::new(&config).extract(
            &slide,
            &classification(DashboardType::PromotionPosts, Platform::Unknown),
            "deck.pptx",
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_fallback_detection() {
        let config = config();
        let slide = SlideContent::new(8)
            .with_text("Promotion Posts: Flash Sale #payday #deals")
            .with_text("Reach: 12K");
        let records = FieldExtractor::new(&config).extract(
            &slide,
            &classification(DashboardType::PromotionPosts, Platform::Unknown),
            "deck.pptx",
        );
        let promo = records[0].as_promotion_posts().unwrap();
        assert_eq!(promo.reach, Some(12_000));
        assert_eq!(promo.campaign_type, CampaignType::FlashSale);

        let slide = SlideContent::new(9)
            .with_text("FB Page Wallposts #ramadan #valuemart")
            .with_text("Reach: 500");
        let records = FieldExtractor::new(&config).extract(
            &slide,
            &classification(DashboardType::SocialMedia, Platform::Facebook),
            "deck.pptx",
        );
        let social = records[0].as_social_media().unwrap();
        assert_eq!(social.hashtags, vec!["#ramadan", "#valuemart"]);
        assert_eq!(social.post_title, "FB Page Wallposts #ramadan #valuemart");
    }

    #[test]
    fn test_tiktok_metric_order() {
        let config = config();
        let slide = SlideContent::new(10)
            .with_text("TikTok Posts")
            .with_table(vec![row(&["Dance clip", "3/2/2024", "25,000", "1,200"])]);
        let records = FieldExtractor::new(&config).extract(
            &slide,
            &classification(DashboardType::SocialMedia, Platform::TikTok),
            "deck.pptx",
        );
        let social = records[0].as_social_media().unwrap();
        assert_eq!(social.reach_views, Some(25_000));
        assert_eq!(social.engagement, Some(1_200));
    }
}
