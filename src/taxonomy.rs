//! Static reference data: job titles, categories, dimensions, percentile
//! tiers and category baselines.
//!
//! Everything here is loaded from TOML so that new dimensions, titles or
//! categories are data changes. The default table ships in `taxonomy.toml`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EngineError, Result};

const BUILTIN_TAXONOMY: &str = include_str!("../taxonomy.toml");

pub const GENERAL_CATEGORY: &str = "general";

const SENIORITY_PREFIXES: &[&str] = &[
    "head of", "senior", "sr.", "sr", "junior", "jr.", "jr", "lead", "staff", "principal",
    "associate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionFamily {
    /// 0-3
    Level,
    /// 1-10
    Scale,
}

impl DimensionFamily {
    pub fn range(&self) -> std::ops::RangeInclusive<i32> {
        match self {
            DimensionFamily::Level => 0..=3,
            DimensionFamily::Scale => 1..=10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DimensionDef {
    pub key: String,
    pub label: String,
    pub family: DimensionFamily,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TierEntry {
    pub level: i32,
    pub percentile: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierTable {
    pub family: DimensionFamily,
    pub entries: Vec<TierEntry>,
}

impl TierTable {
    pub fn percentile_for(&self, level: i32) -> Option<u8> {
        self.entries
            .iter()
            .find(|entry| entry.level == level)
            .map(|entry| entry.percentile)
    }

    /// Closest tier percentile; ties go to the better (lower) tier.
    pub fn snap(&self, percentile: f64) -> u8 {
        let mut best: Option<u8> = None;
        for entry in &self.entries {
            let candidate = entry.percentile;
            best = match best {
                None => Some(candidate),
                Some(current) => {
                    let current_gap = (current as f64 - percentile).abs();
                    let candidate_gap = (candidate as f64 - percentile).abs();
                    if candidate_gap < current_gap
                        || (candidate_gap == current_gap && candidate < current)
                    {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best.unwrap_or_else(|| percentile.round().clamp(0.0, 100.0) as u8)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Threshold {
    pub min_score: f64,
    pub percentile: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryBaseline {
    pub category: String,
    /// Overall score assumed for a person with no reliable data.
    pub default_average: f64,
    /// Dimension tier assumed for a person with no reliable data.
    pub default_percentile: u8,
    pub thresholds: Vec<Threshold>,
}

impl CategoryBaseline {
    pub fn percentile_for_score(&self, score: f64) -> u8 {
        self.thresholds
            .iter()
            .filter(|threshold| score >= threshold.min_score)
            .map(|threshold| threshold.percentile)
            .min()
            .unwrap_or(100)
    }
}

/// How far a cold-start percentile is pulled toward the category baseline.
///
/// Under `reliability_floor` reviews the personal value gets weight
/// `n / (n + prior_weight)` and the baseline the remainder. At or above the
/// floor the personal value is used as is.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BlendPolicy {
    pub reliability_floor: u32,
    pub prior_weight: f64,
}

impl BlendPolicy {
    pub fn personal_weight(&self, review_count: u32) -> f64 {
        if review_count >= self.reliability_floor {
            return 1.0;
        }
        let n = review_count as f64;
        if n + self.prior_weight <= 0.0 {
            return 1.0;
        }
        n / (n + self.prior_weight)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TitleDef {
    canonical: String,
    category: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    blend: BlendPolicy,
    tiers: Vec<TierTable>,
    dimensions: Vec<DimensionDef>,
    titles: Vec<TitleDef>,
    baselines: Vec<CategoryBaseline>,
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    pub blend: BlendPolicy,
    tiers: HashMap<DimensionFamily, TierTable>,
    dimensions: Vec<DimensionDef>,
    titles: Vec<TitleDef>,
    /// normalized alias or canonical title -> index into `titles`
    title_index: HashMap<String, usize>,
    baselines: HashMap<String, CategoryBaseline>,
    general: CategoryBaseline,
}

impl Taxonomy {
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TAXONOMY)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Taxonomy(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TaxonomyFile =
            toml::from_str(content).map_err(|e| EngineError::Taxonomy(e.to_string()))?;

        let mut tiers = HashMap::new();
        for table in file.tiers {
            if tiers.insert(table.family, table).is_some() {
                return Err(EngineError::Taxonomy(
                    "duplicate tier table for a dimension family".to_string(),
                ));
            }
        }

        for dimension in &file.dimensions {
            if !tiers.contains_key(&dimension.family) {
                return Err(EngineError::Taxonomy(format!(
                    "dimension '{}' has no tier table for its family",
                    dimension.key
                )));
            }
        }

        let baselines: HashMap<String, CategoryBaseline> = file
            .baselines
            .into_iter()
            .map(|baseline| (baseline.category.clone(), baseline))
            .collect();
        let general = baselines.get(GENERAL_CATEGORY).cloned().ok_or_else(|| {
            EngineError::Taxonomy(format!("missing '{GENERAL_CATEGORY}' baseline"))
        })?;

        let mut title_index = HashMap::new();
        for (index, title) in file.titles.iter().enumerate() {
            title_index.insert(clean_title(&title.canonical), index);
            for alias in &title.aliases {
                title_index.insert(clean_title(alias), index);
            }
        }

        Ok(Self {
            blend: file.blend,
            tiers,
            dimensions: file.dimensions,
            titles: file.titles,
            title_index,
            baselines,
            general,
        })
    }

    /// Map a free-text job title onto a job category.
    pub fn normalize_job_title(&self, raw_title: &str) -> String {
        let cleaned = clean_title(raw_title);
        if let Some(title) = self.known_title(&cleaned) {
            return title.category.clone();
        }

        let stripped = strip_seniority(&cleaned);
        if stripped.is_empty() {
            return GENERAL_CATEGORY.to_string();
        }
        let words: Vec<&str> = stripped.split_whitespace().collect();

        self.titles
            .iter()
            .find(|title| {
                title
                    .keywords
                    .iter()
                    .any(|keyword| contains_words(&words, keyword))
            })
            .map(|title| title.category.clone())
            .unwrap_or_else(|| GENERAL_CATEGORY.to_string())
    }

    /// Canonical title for display, if the title is known.
    pub fn canonical_title(&self, raw_title: &str) -> Option<&str> {
        self.known_title(&clean_title(raw_title))
            .map(|title| title.canonical.as_str())
    }

    /// Exact alias match wins over seniority stripping ("chief of staff").
    fn known_title(&self, cleaned: &str) -> Option<&TitleDef> {
        self.title_index
            .get(cleaned)
            .or_else(|| self.title_index.get(&strip_seniority(cleaned)))
            .map(|&index| &self.titles[index])
    }

    pub fn category_baseline(&self, category: &str) -> &CategoryBaseline {
        self.baselines.get(category).unwrap_or(&self.general)
    }

    pub fn dimension(&self, key: &str) -> Option<&DimensionDef> {
        self.dimensions.iter().find(|dimension| dimension.key == key)
    }

    pub fn tiers(&self, family: DimensionFamily) -> Option<&TierTable> {
        self.tiers.get(&family)
    }
}

fn clean_title(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['-', '/', ','], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-word match of a one- or multi-word keyword.
fn contains_words(words: &[&str], keyword: &str) -> bool {
    let needle: Vec<&str> = keyword.split_whitespace().collect();
    !needle.is_empty() && words.windows(needle.len()).any(|window| window == needle.as_slice())
}

fn strip_seniority(title: &str) -> String {
    let mut current = title.to_string();
    loop {
        let before = current.clone();
        for prefix in SENIORITY_PREFIXES {
            if let Some(rest) = current.strip_prefix(prefix) {
                if rest.is_empty() || rest.starts_with(' ') {
                    current = rest.trim_start().to_string();
                    break;
                }
            }
        }
        if current == before {
            break;
        }
    }

    // "software engineer ii", "engineer 3"
    let mut words: Vec<&str> = current.split_whitespace().collect();
    while let Some(last) = words.last() {
        let is_level = matches!(*last, "i" | "ii" | "iii" | "iv" | "v")
            || last.chars().all(|c| c.is_ascii_digit());
        if is_level && words.len() > 1 {
            words.pop();
        } else {
            break;
        }
    }
    words.join(" ")
}
