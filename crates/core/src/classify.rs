//! Dashboard type and platform classification of slide content.
//!
//! Matching runs in two passes. The exact pass looks for each keyword as a
//! case-insensitive substring of the slide text. Platform aliases of three
//! characters or fewer (`fb`, `ig`) must match whole words. Only when no
//! dashboard type matches exactly does the fuzzy pass run, comparing each
//! keyword against the text and its word windows with a bounded edit
//! distance. Both passes walk dashboard types in priority order and the
//! first hit wins.

use crate::config::Config;
use crate::normalize::{contains_phrase, fold, fuzzy_distance, label_key};
use crate::types::{DashboardType, Platform, SlideContent, Vocabulary};
use serde::{Deserialize, Serialize};

/// Keywords this short never match fuzzily. Platform aliases this short
/// also match whole words only.
const SHORT_KEYWORD_CHARS: usize = 3;

/// How a keyword matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum MatchMethod {
    Exact,
    Fuzzy { distance: usize },
}

/// Outcome of classifying one slide. Unmatched slides have no classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub dashboard: DashboardType,
    pub platform: Platform,
    pub matched_keyword: String,
    pub method: MatchMethod,
}

/// A keyword prepared for matching.
#[derive(Debug, Clone)]
struct Keyword {
    original: String,
    folded: String,
    key: String,
    whole_word: bool,
}

impl Keyword {
    fn dashboard(original: &str) -> Self {
        Self {
            original: original.to_string(),
            folded: fold(original),
            key: label_key(original),
            whole_word: false,
        }
    }

    fn platform(original: &str) -> Self {
        let mut keyword = Self::dashboard(original);
        keyword.whole_word = keyword.is_short();
        keyword
    }

    fn is_short(&self) -> bool {
        self.folded.chars().count() <= SHORT_KEYWORD_CHARS
    }

    fn matches_exactly(&self, text: &SlideText) -> bool {
        if self.folded.is_empty() {
            return false;
        }
        if self.whole_word {
            contains_phrase(&text.key, &self.key)
        } else {
            text.folded.contains(&self.folded)
        }
    }

    /// Edit distance when within `threshold`. Keywords must be long enough
    /// that the threshold cannot swallow them.
    fn fuzzy(&self, text: &SlideText, threshold: usize) -> Option<usize> {
        if self.is_short() || self.folded.chars().count() <= threshold * 2 {
            return None;
        }
        fuzzy_distance(&text.folded, &self.folded, threshold)
    }
}

/// One searchable string of a slide in both comparison forms.
struct SlideText {
    folded: String,
    key: String,
}

impl SlideText {
    fn new(raw: &str) -> Self {
        Self {
            folded: fold(raw),
            key: label_key(raw),
        }
    }
}

fn slide_texts(slide: &SlideContent) -> Vec<SlideText> {
    slide
        .searchable_text()
        .filter(|t| !t.trim().is_empty())
        .map(SlideText::new)
        .collect()
}

/// Classifies slides against configured keywords.
#[derive(Debug, Clone)]
pub struct Classifier {
    dashboards: Vec<(DashboardType, Vec<Keyword>)>,
    platforms: Vec<(Platform, Vec<Keyword>)>,
    fuzzy_threshold: usize,
}

impl Classifier {
    pub fn new(config: &Config) -> Self {
        let dashboards = config
            .dashboards()
            .iter()
            .map(|p| (p.dashboard, p.keywords.iter().map(|k| Keyword::dashboard(k)).collect()))
            .collect();
        let platforms = config
            .platforms()
            .iter()
            .map(|p| (p.platform, p.keywords.iter().map(|k| Keyword::platform(k)).collect()))
            .collect();
        Self {
            dashboards,
            platforms,
            fuzzy_threshold: config.fuzzy_threshold(),
        }
    }

    /// Classify a slide, or `None` when no dashboard type matches.
    pub fn classify(&self, slide: &SlideContent) -> Option<Classification> {
        let texts = slide_texts(slide);
        if texts.is_empty() {
            return None;
        }

        let (dashboard, keyword, method) = self
            .exact_dashboard(&texts)
            .or_else(|| self.fuzzy_dashboard(&texts))?;

        log::debug!(
            "Slide {} classified as {} via '{}' ({:?})",
            slide.slide_number,
            dashboard,
            keyword.original,
            method
        );

        Some(Classification {
            dashboard,
            platform: self.detect_platform_in(&texts),
            matched_keyword: keyword.original.clone(),
            method,
        })
    }

    fn exact_dashboard(&self, texts: &[SlideText]) -> Option<(DashboardType, &Keyword, MatchMethod)> {
        self.dashboards.iter().find_map(|(dashboard, keywords)| {
            keywords
                .iter()
                .find(|k| texts.iter().any(|t| k.matches_exactly(t)))
                .map(|k| (*dashboard, k, MatchMethod::Exact))
        })
    }

    fn fuzzy_dashboard(&self, texts: &[SlideText]) -> Option<(DashboardType, &Keyword, MatchMethod)> {
        self.dashboards.iter().find_map(|(dashboard, keywords)| {
            keywords
                .iter()
                .filter_map(|k| {
                    texts
                        .iter()
                        .filter_map(|t| k.fuzzy(t, self.fuzzy_threshold))
                        .min()
                        .map(|d| (k, d))
                })
                .min_by_key(|(_, d)| *d)
                .map(|(k, distance)| (*dashboard, k, MatchMethod::Fuzzy { distance }))
        })
    }

    /// Platform a slide refers to, `Unknown` when none is mentioned.
    pub fn detect_platform(&self, slide: &SlideContent) -> Platform {
        self.detect_platform_in(&slide_texts(slide))
    }

    // Earlier text (the title) takes precedence over later cells.
    fn detect_platform_in(&self, texts: &[SlideText]) -> Platform {
        for text in texts {
            for (platform, keywords) in &self.platforms {
                if keywords.iter().any(|k| k.matches_exactly(text)) {
                    return *platform;
                }
            }
        }
        for text in texts {
            for (platform, keywords) in &self.platforms {
                if keywords.iter().any(|k| k.fuzzy(text, self.fuzzy_threshold).is_some()) {
                    return *platform;
                }
            }
        }
        Platform::Unknown
    }
}

/// Find a vocabulary term mentioned in the slide's text blocks.
///
/// The longest matching alias wins, so "feed post" beats "post".
pub fn detect_vocabulary<T: Vocabulary>(slide: &SlideContent) -> Option<T> {
    let keys: Vec<String> = slide.text_blocks.iter().map(|t| label_key(t)).collect();
    let mut best: Option<(usize, T)> = None;
    for variant in T::variants() {
        for alias in variant.aliases() {
            let alias_key = label_key(alias);
            if keys.iter().any(|k| contains_phrase(k, &alias_key))
                && best.map_or(true, |(len, _)| alias_key.len() > len)
            {
                best = Some((alias_key.len(), *variant));
            }
        }
    }
    best.map(|(_, variant)| variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdType, CampaignType, ContentFormat};

    fn config() -> Config {
        Config::from_yaml_str(include_str!("../../../config/dashboard_config.yaml")).unwrap()
    }

    #[test]
    fn test_facebook_wallposts_slide() {
        let classifier = Classifier::new(&config());
        let slide = SlideContent::new(1).with_text("TF Value-Mart FB Page Wallposts Performance");

        let result = classifier.classify(&slide).unwrap();
        assert_eq!(result.dashboard, DashboardType::SocialMedia);
        assert_eq!(result.platform, Platform::Facebook);
        assert_eq!(result.method, MatchMethod::Exact);
    }

    #[test]
    fn test_exact_match_is_case_insensitive_and_checks_cells() {
        let classifier = Classifier::new(&config());
        let slide = SlideContent::new(2)
            .with_text("March")
            .with_table(vec![vec!["kol engagement".into(), "".into()]]);
        let result = classifier.classify(&slide).unwrap();
        assert_eq!(result.dashboard, DashboardType::KolEngagement);
    }

    #[test]
    fn test_priority_order_breaks_ties() {
        let classifier = Classifier::new(&config());
        let slide = SlideContent::new(3)
            .with_text("Promotion Posts")
            .with_text("Hive Marketing");
        let result = classifier.classify(&slide).unwrap();
        assert_eq!(result.dashboard, DashboardType::CommunityMarketing);
    }

    #[test]
    fn test_fuzzy_match_tolerates_typos() {
        let classifier = Classifier::new(&config());
        let slide = SlideContent::new(4).with_text("Hive Markting - March");
        let result = classifier.classify(&slide).unwrap();
        assert_eq!(result.dashboard, DashboardType::CommunityMarketing);
        assert_eq!(result.method, MatchMethod::Fuzzy { distance: 1 });
    }

    #[test]
    fn test_unmatched_and_empty_slides() {
        let classifier = Classifier::new(&config());
        assert!(classifier.classify(&SlideContent::new(5).with_text("Thank you!")).is_none());
        assert!(classifier.classify(&SlideContent::new(6)).is_none());
    }

    #[test]
    fn test_short_platform_aliases_need_word_boundaries() {
        let classifier = Classifier::new(&config());
        let slide = SlideContent::new(7).with_text("Digital campaign recap");
        assert_eq!(classifier.detect_platform(&slide), Platform::Unknown);

        let slide = SlideContent::new(8).with_text("IG Wallposts");
        assert_eq!(classifier.detect_platform(&slide), Platform::Instagram);
    }

    #[test]
    fn test_short_dashboard_keywords_match_as_substrings() {
        let mut document = Config::default_document();
        if let Some(section) = document.dashboard_config.kol_engagement.as_mut() {
            section.keywords = vec!["KOL".into()];
        }
        let classifier = Classifier::new(&Config::from_document(document).unwrap());

        let slide = SlideContent::new(7).with_text("KOLs Performance");
        let result = classifier.classify(&slide).unwrap();
        assert_eq!(result.dashboard, DashboardType::KolEngagement);
        assert_eq!(result.matched_keyword, "KOL");
        assert_eq!(result.method, MatchMethod::Exact);
    }

    #[test]
    fn test_title_platform_wins_over_cells() {
        let classifier = Classifier::new(&config());
        let slide = SlideContent::new(9)
            .with_text("TikTok Posts")
            .with_table(vec![vec!["Shared from Facebook".into()]]);
        assert_eq!(classifier.detect_platform(&slide), Platform::TikTok);
    }

    #[test]
    fn test_detect_vocabulary_prefers_longest_alias() {
        let slide = SlideContent::new(1).with_text("Feed Post highlights");
        assert_eq!(detect_vocabulary::<ContentFormat>(&slide), Some(ContentFormat::FeedPost));

        let slide = SlideContent::new(1).with_text("Flash Sale weekend");
        assert_eq!(detect_vocabulary::<CampaignType>(&slide), Some(CampaignType::FlashSale));

        let slide = SlideContent::new(1).with_text("Nothing relevant");
        assert_eq!(detect_vocabulary::<AdType>(&slide), None);
    }
}
