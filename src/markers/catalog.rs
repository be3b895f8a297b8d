//! Marker catalog: relation categories mapped to keyword sets.
//!
//! The catalog is injected configuration, not a hardcoded table: alternate
//! language or domain sets can be supplied from a TOML file without touching
//! detection logic. The built-in set is the Chinese discourse-marker table
//! the pipeline ships with.

use crate::error::{LectographError, Result};
use crate::model::RelationType;
use std::collections::BTreeMap;

/// One catalog keyword with its normalized form precomputed for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Keyword as written in the catalog, reported back in occurrences.
    pub keyword: String,
    /// Case-normalized form used for comparison.
    pub normalized: String,
    pub category: RelationType,
}

/// Static lookup table from relation categories to keyword sets.
///
/// Pure lookup, no state. Validated at construction: a keyword mapped to two
/// categories is rejected with a `ConfigError` here, never at detection time.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerCatalog {
    /// Entries sorted by normalized character length, longest first, so the
    /// detector can prefer the longest match at each scan position.
    entries: Vec<CatalogEntry>,
}

impl MarkerCatalog {
    /// Builds a catalog from a category → keywords map.
    pub fn from_map(map: BTreeMap<RelationType, Vec<String>>) -> Result<Self> {
        let mut entries: Vec<CatalogEntry> = Vec::new();
        for (category, keywords) in map {
            for keyword in keywords {
                let normalized = normalize(&keyword);
                if normalized.is_empty() {
                    return Err(LectographError::config(
                        "markers",
                        format!("empty keyword in category {category}"),
                    ));
                }
                if let Some(existing) = entries.iter().find(|e| e.normalized == normalized) {
                    if existing.category != category {
                        return Err(LectographError::config(
                            "markers",
                            format!(
                                "keyword '{keyword}' mapped to both {} and {category}",
                                existing.category
                            ),
                        ));
                    }
                    // Same keyword, same category: harmless duplicate.
                    continue;
                }
                entries.push(CatalogEntry {
                    keyword,
                    normalized,
                    category,
                });
            }
        }
        entries.sort_by(|a, b| {
            b.normalized
                .chars()
                .count()
                .cmp(&a.normalized.chars().count())
                .then_with(|| a.normalized.cmp(&b.normalized))
        });
        Ok(Self { entries })
    }

    /// Parses a catalog from TOML of the form `CATEGORY = ["keyword", ...]`.
    ///
    /// Keywords match case-insensitively but are not diacritic-folded:
    /// "café" will not match "cafe". Catalogs for languages where that
    /// matters should list pre-folded keyword variants.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let map: BTreeMap<RelationType, Vec<String>> = toml::from_str(input)?;
        Self::from_map(map)
    }

    /// Entries ordered longest-normalized-keyword first.
    pub fn entries_longest_first(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Category for an exact (already normalized) keyword, if known.
    pub fn category_of(&self, normalized_keyword: &str) -> Option<RelationType> {
        self.entries
            .iter()
            .find(|e| e.normalized == normalized_keyword)
            .map(|e| e.category)
    }

    /// All keywords registered under one category.
    pub fn keywords(&self, category: RelationType) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |e| e.category == category)
            .map(|e| e.keyword.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MarkerCatalog {
    /// The built-in Chinese discourse-marker set.
    fn default() -> Self {
        let map = BTreeMap::from([
            (
                RelationType::Contrast,
                words(&[
                    "但是",
                    "然而",
                    "不过",
                    "可是",
                    "反过来说",
                    "相反",
                    "相对而言",
                    "与此相反",
                ]),
            ),
            (
                RelationType::Addition,
                words(&[
                    "而且", "并且", "还有", "另外", "此外", "再者", "同时", "以及",
                ]),
            ),
            (
                RelationType::Causality,
                words(&[
                    "所以", "因此", "因为", "由于", "导致", "结果", "因而", "从而",
                ]),
            ),
            (
                RelationType::ReferenceBack,
                words(&[
                    "回过头来讲",
                    "前面说到",
                    "刚才提到",
                    "之前讲过",
                    "如前所述",
                    "正如我说的",
                ]),
            ),
            (
                RelationType::Summary,
                words(&[
                    "总之",
                    "综上所述",
                    "总的来说",
                    "概括来说",
                    "归纳起来",
                    "简而言之",
                ]),
            ),
            (
                RelationType::Example,
                words(&["比如", "例如", "譬如", "比方说", "举例来说", "就像"]),
            ),
        ]);
        // The built-in table has no cross-category duplicates.
        Self::from_map(map).unwrap_or(Self {
            entries: Vec::new(),
        })
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Case-normalizes a string for marker comparison.
///
/// Unicode-aware lowercasing; CJK markers pass through unchanged. Diacritic
/// folding is left to catalogs that need it (supply pre-folded keywords).
pub fn normalize(input: &str) -> String {
    input.to_lowercase()
}
