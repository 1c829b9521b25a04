//! Canonical region names shared by boundary files and statistics feeds.
//!
//! Boundary files carry official names ("경기도 수원시", "서울특별시") while
//! the feeds key their values by short forms ("수원시", "서울"). The
//! normalizer maps both onto one key.

use crate::config::NamesConfig;
use std::collections::HashMap;

/// Maps administrative names onto canonical lookup keys.
///
/// Built once from configuration and never mutated, so every lookup is pure.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    /// Sorted longest-first so overlapping prefixes never strip partially
    prefixes: Vec<String>,
    synonyms: HashMap<String, String>,
    province_slugs: HashMap<String, String>,
}

impl NameNormalizer {
    pub fn new<I, S>(prefixes: I, synonyms: HashMap<String, String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        prefixes.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        prefixes.dedup();

        Self {
            prefixes,
            synonyms,
            province_slugs: HashMap::new(),
        }
    }

    /// Attach the province -> boundary-file slug table
    pub fn with_province_slugs(mut self, slugs: HashMap<String, String>) -> Self {
        self.province_slugs = slugs;
        self
    }

    pub fn from_config(config: &NamesConfig) -> Self {
        Self::new(config.prefixes.iter().cloned(), config.synonyms.clone())
            .with_province_slugs(config.province_slugs.clone())
    }

    /// Canonical key for a raw administrative name.
    ///
    /// The synonym table wins; otherwise the longest matching province
    /// prefix is stripped. A name that consists only of a prefix is returned
    /// unchanged rather than collapsing to an empty key.
    pub fn normalize(&self, full_name: &str) -> String {
        let trimmed = full_name.trim();
        if let Some(short) = self.synonyms.get(trimmed) {
            return short.clone();
        }

        for prefix in &self.prefixes {
            if let Some(rest) = trimmed.strip_prefix(prefix.as_str()) {
                let rest = rest.trim_start();
                if rest.is_empty() {
                    break;
                }
                return rest.to_string();
            }
        }

        full_name.to_string()
    }

    /// Short province key for either the official or the short form
    pub fn canonical_province(&self, name: &str) -> String {
        let name = name.trim();
        self.synonyms
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Slug of the district boundary file for a province (`경기` -> `gyeonggi`)
    pub fn province_slug(&self, name: &str) -> String {
        let key = self.canonical_province(name);
        self.province_slugs
            .get(&key)
            .cloned()
            .unwrap_or_else(|| key.to_lowercase())
    }

    /// Prefixes in matching order
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> NameNormalizer {
        NameNormalizer::from_config(&NamesConfig::default())
    }

    #[test]
    fn test_synonym_pairs_share_key() {
        let n = normalizer();
        let config = NamesConfig::default();
        for (official, short) in &config.synonyms {
            assert_eq!(n.normalize(official), n.normalize(short), "{official} vs {short}");
        }
        assert_eq!(n.normalize("서울특별시"), "서울");
    }

    #[test]
    fn test_strips_province_prefix() {
        let n = normalizer();
        assert_eq!(n.normalize("경기도 수원시"), "수원시");
        assert_eq!(n.normalize("전라남도 여수시"), "여수시");
        assert_eq!(n.normalize("제주특별자치도  제주시"), "제주시");
    }

    #[test]
    fn test_leading_whitespace_before_prefix() {
        let n = normalizer();
        assert_eq!(n.normalize(" 경기도 수원시"), "수원시");
        assert_eq!(n.normalize("\t전라남도 여수시 "), "여수시");
    }

    #[test]
    fn test_unknown_name_unchanged() {
        let n = normalizer();
        assert_eq!(n.normalize("성남시"), "성남시");
        assert_eq!(n.normalize(""), "");
    }

    #[test]
    fn test_longest_prefix_wins() {
        // "경기" alone would leave "도 수원시" behind
        let n = NameNormalizer::new(["경기", "경기도", "전라", "전라남도"], HashMap::new());
        assert_eq!(n.prefixes()[0].chars().count(), 4);
        assert_eq!(n.normalize("경기도 수원시"), "수원시");
        assert_eq!(n.normalize("전라남도 순천시"), "순천시");
        assert_eq!(n.normalize("경기 화성시"), "화성시");
    }

    #[test]
    fn test_prefix_only_name_is_kept() {
        let n = NameNormalizer::new(["경기도"], HashMap::new());
        assert_eq!(n.normalize("경기도"), "경기도");
    }

    #[test]
    fn test_province_slug() {
        let n = normalizer();
        assert_eq!(n.province_slug("경기"), "gyeonggi");
        assert_eq!(n.province_slug("경기도"), "gyeonggi");
        assert_eq!(n.province_slug("Atlantis"), "atlantis");
        assert_eq!(n.canonical_province("제주특별자치도"), "제주");
    }
}
