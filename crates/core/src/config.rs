//! Configuration document and the validated, immutable run configuration.
//!
//! The YAML document is deserialized into [`ConfigDocument`] and then
//! resolved into a [`Config`]: built-in field mappings and rule sets are
//! merged with any overrides, names are checked, and a fingerprint of the
//! resolved settings is computed for cache keys.

use crate::error::{Error, Result};
use crate::fields::{Field, FieldMapping, FieldSpec};
use crate::normalize::label_key;
use crate::records::ExtractedRecord;
use crate::types::{DashboardType, Platform};
use crate::validate::{ConsistencyRule, RangeRule, RuleSet};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;
const DEFAULT_FUZZY_THRESHOLD: usize = 2;
const DEFAULT_LIST_DELIMITER: &str = ",";
const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m/%d/%y",
    "%Y-%m-%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Raw configuration document as written in YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub dashboard_config: DashboardConfigDocument,

    #[serde(default)]
    pub global_settings: GlobalSettingsDocument,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfigDocument {
    pub social_media: Option<DashboardSection>,
    pub community_marketing: Option<DashboardSection>,
    pub kol_engagement: Option<DashboardSection>,
    pub performance_marketing: Option<DashboardSection>,
    pub promotion_posts: Option<DashboardSection>,

    /// Per-platform keyword and metric lists keyed by platform name.
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformSection>,
}

impl DashboardConfigDocument {
    fn section(&self, dashboard: DashboardType) -> Option<&DashboardSection> {
        match dashboard {
            DashboardType::SocialMedia => self.social_media.as_ref(),
            DashboardType::CommunityMarketing => self.community_marketing.as_ref(),
            DashboardType::KolEngagement => self.kol_engagement.as_ref(),
            DashboardType::PerformanceMarketing => self.performance_marketing.as_ref(),
            DashboardType::PromotionPosts => self.promotion_posts.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSection {
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Overrides for the built-in field mapping.
    #[serde(default)]
    pub fields: Vec<FieldOverride>,

    /// Overrides for the built-in validation rules.
    #[serde(default)]
    pub validation: Option<ValidationSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOverride {
    pub field: String,

    /// Replaces the built-in patterns when non-empty.
    #[serde(default)]
    pub patterns: Vec<String>,

    #[serde(default)]
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSection {
    /// Replaces the built-in required list when present.
    #[serde(default)]
    pub required: Option<Vec<String>>,

    #[serde(default)]
    pub ranges: Vec<RangeSection>,

    #[serde(default)]
    pub consistency: Vec<ConsistencySection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeSection {
    pub field: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencySection {
    pub components: Vec<String>,
    pub total: String,
    #[serde(default)]
    pub tolerance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformSection {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettingsDocument {
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    #[serde(default)]
    pub data_quality: DataQualitySection,

    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: usize,

    #[serde(default = "default_list_delimiter")]
    pub list_delimiter: String,
}

impl Default for GlobalSettingsDocument {
    fn default() -> Self {
        Self {
            date_formats: default_date_formats(),
            data_quality: DataQualitySection::default(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            list_delimiter: default_list_delimiter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualitySection {
    #[serde(default = "default_min_confidence")]
    pub min_confidence_score: f64,

    #[serde(default)]
    pub auto_correction: bool,
}

impl Default for DataQualitySection {
    fn default() -> Self {
        Self {
            min_confidence_score: DEFAULT_MIN_CONFIDENCE,
            auto_correction: false,
        }
    }
}

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect()
}

fn default_fuzzy_threshold() -> usize {
    DEFAULT_FUZZY_THRESHOLD
}

fn default_list_delimiter() -> String {
    DEFAULT_LIST_DELIMITER.to_string()
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

/// Keywords and metric order for one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub keywords: Vec<String>,
    pub metrics: Vec<String>,
}

/// Everything the pipeline needs to know about one dashboard type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardProfile {
    pub dashboard: DashboardType,
    pub keywords: Vec<String>,
    pub mapping: FieldMapping,
    pub rules: RuleSet,
}

/// Validated configuration for one run. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Indexed in [`DashboardType::ALL`] order.
    dashboards: [DashboardProfile; 5],
    platforms: Vec<PlatformProfile>,
    date_formats: Vec<String>,
    min_confidence: f64,
    auto_correction: bool,
    fuzzy_threshold: usize,
    list_delimiter: String,

    #[serde(skip)]
    fingerprint: String,
}

fn parse_field(name: &str, context: &str) -> Result<Field> {
    Field::from_name(name)
        .ok_or_else(|| Error::Config(format!("{}: unknown field '{}'", context, name)))
}

fn parse_schema_field(name: &str, dashboard: DashboardType, context: &str) -> Result<Field> {
    let field = parse_field(name, context)?;
    if !ExtractedRecord::schema(dashboard).contains(&field) {
        return Err(Error::Config(format!(
            "{}: field '{}' is not part of the {} schema",
            context,
            name,
            dashboard.key()
        )));
    }
    Ok(field)
}

fn build_mapping(dashboard: DashboardType, overrides: &[FieldOverride]) -> Result<FieldMapping> {
    let mut mapping = FieldMapping::for_dashboard(dashboard);
    let context = format!("dashboard_config.{}.fields", dashboard.key());

    for entry in overrides {
        let field = parse_schema_field(&entry.field, dashboard, &context)?;
        let patterns: Vec<String> = entry
            .patterns
            .iter()
            .map(|p| label_key(p))
            .filter(|p| !p.is_empty())
            .collect();

        if let Some(spec) = mapping.spec_mut(field) {
            if !patterns.is_empty() {
                spec.patterns = patterns;
            }
            if entry.position.is_some() {
                spec.position = entry.position;
            }
            continue;
        }
        let mut spec = FieldSpec::new(field, &[], entry.position);
        spec.patterns = patterns;
        mapping.push(spec);
    }
    Ok(mapping)
}

fn build_rules(dashboard: DashboardType, section: Option<&ValidationSection>) -> Result<RuleSet> {
    let mut rules = RuleSet::for_dashboard(dashboard);
    let Some(section) = section else {
        return Ok(rules);
    };
    let context = format!("dashboard_config.{}.validation", dashboard.key());

    if let Some(required) = &section.required {
        rules.required = required
            .iter()
            .map(|name| parse_schema_field(name, dashboard, &context))
            .collect::<Result<_>>()?;
    }

    for range in &section.ranges {
        let field = parse_schema_field(&range.field, dashboard, &context)?;
        if !field.kind().is_numeric() {
            return Err(Error::Config(format!("{}: '{}' is not numeric", context, range.field)));
        }
        if !range.min.is_finite() || !range.max.is_finite() {
            return Err(Error::Config(format!(
                "{}: range for '{}' needs finite bounds",
                context, range.field
            )));
        }
        if range.min > range.max {
            return Err(Error::Config(format!(
                "{}: range for '{}' has min > max",
                context, range.field
            )));
        }
        rules.set_range(RangeRule {
            field,
            min: range.min,
            max: range.max,
        });
    }

    for rule in &section.consistency {
        let components = rule
            .components
            .iter()
            .map(|name| parse_schema_field(name, dashboard, &context))
            .collect::<Result<Vec<_>>>()?;
        let total = parse_schema_field(&rule.total, dashboard, &context)?;
        if components.is_empty() {
            return Err(Error::Config(format!("{}: consistency rule without components", context)));
        }
        if !rule.tolerance.is_finite() || rule.tolerance < 0.0 {
            return Err(Error::Config(format!(
                "{}: tolerance must be a finite non-negative number, got {}",
                context, rule.tolerance
            )));
        }
        rules.consistency.push(ConsistencyRule {
            components,
            total,
            tolerance: rule.tolerance,
        });
    }

    Ok(rules)
}

fn build_platforms(sections: &BTreeMap<String, PlatformSection>) -> Result<Vec<PlatformProfile>> {
    for name in sections.keys() {
        if Platform::from_key(name).is_none() {
            return Err(Error::Config(format!(
                "dashboard_config.platforms: unknown platform '{}'",
                name
            )));
        }
    }

    let to_strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    Ok(Platform::ALL
        .into_iter()
        .map(|platform| {
            let section = sections
                .iter()
                .find(|(name, _)| Platform::from_key(name) == Some(platform))
                .map(|(_, s)| s);
            let keywords = match section {
                Some(s) if !s.keywords.is_empty() => s.keywords.clone(),
                _ => to_strings(platform.default_keywords()),
            };
            let metrics = match section {
                Some(s) if !s.metrics.is_empty() => s.metrics.clone(),
                _ => to_strings(platform.default_metrics()),
            };
            PlatformProfile {
                platform,
                keywords,
                metrics,
            }
        })
        .collect())
}

fn check_date_format(format: &str) -> Result<()> {
    if format.trim().is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::Config(format!(
            "global_settings.date_formats: invalid format '{}'",
            format
        )));
    }
    Ok(())
}

impl Config {
    /// Parse and validate a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let document: ConfigDocument = serde_saphyr::from_str(yaml)
            .map_err(|e| Error::Config(format!("malformed configuration: {}", e)))?;
        Self::from_document(document)
    }

    /// Load a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&yaml)?;
        log::info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Validate a document and resolve it into a run configuration.
    pub fn from_document(document: ConfigDocument) -> Result<Self> {
        let mut profiles = Vec::with_capacity(DashboardType::ALL.len());
        for dashboard in DashboardType::ALL {
            let section = document.dashboard_config.section(dashboard).ok_or_else(|| {
                Error::Config(format!("missing section dashboard_config.{}", dashboard.key()))
            })?;
            let keywords: Vec<String> = section
                .keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                return Err(Error::Config(format!(
                    "dashboard_config.{}.keywords must not be empty",
                    dashboard.key()
                )));
            }
            profiles.push(DashboardProfile {
                dashboard,
                keywords,
                mapping: build_mapping(dashboard, &section.fields)?,
                rules: build_rules(dashboard, section.validation.as_ref())?,
            });
        }
        let dashboards: [DashboardProfile; 5] = profiles
            .try_into()
            .map_err(|_| Error::Config("dashboard profile count mismatch".to_string()))?;

        let settings = document.global_settings;
        let quality = settings.data_quality;
        if !quality.min_confidence_score.is_finite()
            || !(0.0..=1.0).contains(&quality.min_confidence_score)
        {
            return Err(Error::Config(format!(
                "global_settings.data_quality.min_confidence_score must be within [0, 1], got {}",
                quality.min_confidence_score
            )));
        }
        for format in &settings.date_formats {
            check_date_format(format)?;
        }
        let date_formats = if settings.date_formats.is_empty() {
            default_date_formats()
        } else {
            settings.date_formats
        };

        let mut config = Self {
            dashboards,
            platforms: build_platforms(&document.dashboard_config.platforms)?,
            date_formats,
            min_confidence: quality.min_confidence_score,
            auto_correction: quality.auto_correction,
            fuzzy_threshold: settings.fuzzy_threshold,
            list_delimiter: settings.list_delimiter,
            fingerprint: String::new(),
        };
        config.fingerprint = config.compute_fingerprint()?;
        Ok(config)
    }

    fn compute_fingerprint(&self) -> Result<String> {
        // Only Vec and struct fields are serialized, so the JSON is canonical.
        let canonical = serde_json::to_vec(self)
            .map_err(|e| Error::Config(format!("cannot serialize configuration: {}", e)))?;
        let digest = Sha256::digest(&canonical);
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// A document carrying every default, with one placeholder keyword per
    /// dashboard type.
    pub fn default_document() -> ConfigDocument {
        let section = |keyword: &str| {
            Some(DashboardSection {
                keywords: vec![keyword.to_string()],
                ..Default::default()
            })
        };
        ConfigDocument {
            dashboard_config: DashboardConfigDocument {
                social_media: section("Social Media"),
                community_marketing: section("Community Marketing"),
                kol_engagement: section("KOL Engagement"),
                performance_marketing: section("Performance Marketing"),
                promotion_posts: section("Promotion Posts"),
                platforms: BTreeMap::new(),
            },
            global_settings: GlobalSettingsDocument::default(),
        }
    }

    pub fn dashboard(&self, dashboard: DashboardType) -> &DashboardProfile {
        &self.dashboards[dashboard as usize]
    }

    /// Profiles in classification priority order.
    pub fn dashboards(&self) -> &[DashboardProfile] {
        &self.dashboards
    }

    pub fn keywords(&self, dashboard: DashboardType) -> &[String] {
        &self.dashboard(dashboard).keywords
    }

    pub fn mapping(&self, dashboard: DashboardType) -> &FieldMapping {
        &self.dashboard(dashboard).mapping
    }

    pub fn rules(&self, dashboard: DashboardType) -> &RuleSet {
        &self.dashboard(dashboard).rules
    }

    pub fn platforms(&self) -> &[PlatformProfile] {
        &self.platforms
    }

    pub fn platform(&self, platform: Platform) -> Option<&PlatformProfile> {
        self.platforms.iter().find(|p| p.platform == platform)
    }

    pub fn date_formats(&self) -> &[String] {
        &self.date_formats
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn auto_correction(&self) -> bool {
        self.auto_correction
    }

    pub fn fuzzy_threshold(&self) -> usize {
        self.fuzzy_threshold
    }

    pub fn list_delimiter(&self) -> &str {
        &self.list_delimiter
    }

    /// Hex SHA-256 of the resolved settings. Any change to the document that
    /// affects extraction changes the fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
