//! Color-naming taxonomy: reference table, hierarchy levels, ordinal maps.
//!
//! The taxonomy is a flat list of color-name entries, each anchored to an
//! RGB reference point and carrying a name at four nesting levels (finest
//! "xkcd" name down to the broad color family). It is loaded once at
//! initialization and immutable afterwards.

use std::collections::HashMap;

use hue_quant::Rgb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw taxonomy record as it appears in the source JSON.
///
/// RGB channels arrive as JSON numbers; they are validated (finite,
/// 0..=255) before an entry is accepted.
#[derive(Debug, Deserialize)]
struct RawTaxonomyRecord {
    xkcd_color: String,
    xkcd_r: f64,
    xkcd_g: f64,
    xkcd_b: f64,
    design_color: String,
    common_color: String,
    color_family: String,
}

impl RawTaxonomyRecord {
    fn validate(self) -> Option<TaxonomyEntry> {
        let channel = |v: f64| -> Option<u8> {
            if v.is_finite() && (0.0..=255.0).contains(&v) {
                Some(v.round() as u8)
            } else {
                None
            }
        };
        let rgb = [
            channel(self.xkcd_r)?,
            channel(self.xkcd_g)?,
            channel(self.xkcd_b)?,
        ];
        if self.xkcd_color.is_empty()
            || self.design_color.is_empty()
            || self.common_color.is_empty()
            || self.color_family.is_empty()
        {
            return None;
        }
        Some(TaxonomyEntry {
            rgb,
            xkcd: self.xkcd_color,
            design: self.design_color,
            common: self.common_color,
            family: self.color_family,
        })
    }
}

/// One entry of the color-naming taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyEntry {
    /// RGB reference point for this name.
    pub rgb: [u8; 3],
    /// Finest-grained name (xkcd survey color name).
    pub xkcd: String,
    /// Designer-vocabulary name.
    pub design: String,
    /// Common-language name.
    pub common: String,
    /// Broad color family.
    pub family: String,
}

/// One of the four granularities of color naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevel {
    Xkcd,
    Design,
    Common,
    Family,
}

impl HierarchyLevel {
    /// All levels, finest first. Iteration order matches [`Self::ordinal`].
    pub const ALL: [HierarchyLevel; 4] = [
        HierarchyLevel::Xkcd,
        HierarchyLevel::Design,
        HierarchyLevel::Common,
        HierarchyLevel::Family,
    ];

    /// Dense 0-based index of this level, for per-level array storage.
    #[inline]
    pub fn ordinal(self) -> usize {
        match self {
            HierarchyLevel::Xkcd => 0,
            HierarchyLevel::Design => 1,
            HierarchyLevel::Common => 2,
            HierarchyLevel::Family => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HierarchyLevel::Xkcd => "xkcd",
            HierarchyLevel::Design => "design",
            HierarchyLevel::Common => "common",
            HierarchyLevel::Family => "family",
        }
    }

    /// The taxonomy name an entry carries at this level.
    #[inline]
    pub fn name_of(self, entry: &TaxonomyEntry) -> &str {
        match self {
            HierarchyLevel::Xkcd => &entry.xkcd,
            HierarchyLevel::Design => &entry.design,
            HierarchyLevel::Common => &entry.common,
            HierarchyLevel::Family => &entry.family,
        }
    }
}

impl std::str::FromStr for HierarchyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xkcd" => Ok(HierarchyLevel::Xkcd),
            "design" => Ok(HierarchyLevel::Design),
            "common" => Ok(HierarchyLevel::Common),
            "family" => Ok(HierarchyLevel::Family),
            other => Err(format!(
                "unknown hierarchy level '{other}' (expected xkcd, design, common, or family)"
            )),
        }
    }
}

impl std::fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural error from nearest-entry matching.
///
/// These indicate a programming-contract violation: downstream of the
/// validation done at load and extraction time, neither condition is
/// reachable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("taxonomy table is empty")]
    EmptyTable,

    #[error("query color has a non-finite channel")]
    MalformedQuery,
}

/// The loaded taxonomy table.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: Vec<TaxonomyEntry>,
}

impl Taxonomy {
    /// Parse the taxonomy from its JSON source.
    ///
    /// Malformed rows (wrong shape, non-finite or out-of-range channels,
    /// empty names) are dropped with a logged count, never silently
    /// included. An entirely empty result is an error: the matcher cannot
    /// operate on an empty table.
    pub fn from_json(bytes: &[u8]) -> Result<Self, crate::error::LoadError> {
        let raw: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
        let total = raw.len();

        let entries: Vec<TaxonomyEntry> = raw
            .into_iter()
            .filter_map(|value| {
                serde_json::from_value::<RawTaxonomyRecord>(value)
                    .ok()
                    .and_then(RawTaxonomyRecord::validate)
            })
            .collect();

        let dropped = total - entries.len();
        if dropped > 0 {
            tracing::warn!(dropped, total, "dropped malformed taxonomy rows");
        }
        if entries.is_empty() {
            return Err(crate::error::LoadError::EmptyTaxonomy);
        }
        tracing::info!(entries = entries.len(), "loaded taxonomy table");

        Ok(Self { entries })
    }

    /// Build a taxonomy directly from entries. Used by tests and tools
    /// that synthesize tables.
    pub fn from_entries(entries: Vec<TaxonomyEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry minimizing squared Euclidean distance in RGB space.
    ///
    /// Exhaustive scan over the table; ties resolve to the first entry in
    /// table order as an artifact of the sequential scan. Acceptable at
    /// current taxonomy sizes (hundreds of entries); a spatial index could
    /// replace this behind the same signature if tables grow.
    pub fn nearest(&self, color: Rgb) -> Result<&TaxonomyEntry, MatchError> {
        if self.entries.is_empty() {
            return Err(MatchError::EmptyTable);
        }
        if !color.is_valid() {
            return Err(MatchError::MalformedQuery);
        }

        let mut best = &self.entries[0];
        let mut best_dist = f32::INFINITY;
        for entry in &self.entries {
            let anchor = Rgb::from_u8(entry.rgb[0], entry.rgb[1], entry.rgb[2]);
            let dist = color.distance_squared(anchor);
            if dist < best_dist {
                best_dist = dist;
                best = entry;
            }
        }
        Ok(best)
    }
}

/// Dense ordinal mapping between a level's distinct names and `0..n`.
///
/// Names are indexed in first-occurrence order over the taxonomy table,
/// giving a bijection between observed distinct names and dense indices.
#[derive(Debug, Clone)]
pub struct LevelIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl LevelIndex {
    /// Build the ordinal mapping for one level of a taxonomy.
    pub fn build(taxonomy: &Taxonomy, level: HierarchyLevel) -> Self {
        let mut names = Vec::new();
        let mut positions = HashMap::new();
        for entry in taxonomy.entries() {
            let name = level.name_of(entry);
            if !positions.contains_key(name) {
                positions.insert(name.to_string(), names.len());
                names.push(name.to_string());
            }
        }
        Self { names, positions }
    }

    /// Number of distinct names at this level.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Dense index of a name, if observed.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Name at a dense index.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rgb: [u8; 3], xkcd: &str, design: &str, common: &str, family: &str) -> TaxonomyEntry {
        TaxonomyEntry {
            rgb,
            xkcd: xkcd.to_string(),
            design: design.to_string(),
            common: common.to_string(),
            family: family.to_string(),
        }
    }

    fn sample_taxonomy() -> Taxonomy {
        Taxonomy::from_entries(vec![
            entry([220, 20, 60], "crimson", "crimson", "red", "red"),
            entry([255, 99, 71], "tomato", "tomato", "red", "red"),
            entry([34, 139, 34], "forest green", "forest", "green", "green"),
            entry([0, 0, 205], "medium blue", "medium blue", "blue", "blue"),
        ])
    }

    #[test]
    fn test_from_json_parses_valid_rows() {
        let json = br#"[
            {"xkcd_color": "crimson", "xkcd_r": 220, "xkcd_g": 20, "xkcd_b": 60,
             "design_color": "crimson", "common_color": "red", "color_family": "red"},
            {"xkcd_color": "sky", "xkcd_r": 135.4, "xkcd_g": 206.0, "xkcd_b": 235.0,
             "design_color": "sky", "common_color": "blue", "color_family": "blue"}
        ]"#;
        let taxonomy = Taxonomy::from_json(json).unwrap();
        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.entries()[0].rgb, [220, 20, 60]);
        // Fractional channel rounds
        assert_eq!(taxonomy.entries()[1].rgb, [135, 206, 235]);
    }

    #[test]
    fn test_from_json_drops_malformed_rows() {
        let json = br#"[
            {"xkcd_color": "crimson", "xkcd_r": 220, "xkcd_g": 20, "xkcd_b": 60,
             "design_color": "crimson", "common_color": "red", "color_family": "red"},
            {"xkcd_color": "bad", "xkcd_r": 999, "xkcd_g": 0, "xkcd_b": 0,
             "design_color": "bad", "common_color": "bad", "color_family": "bad"},
            {"xkcd_color": "missing fields"},
            {"xkcd_color": "", "xkcd_r": 1, "xkcd_g": 2, "xkcd_b": 3,
             "design_color": "x", "common_color": "y", "color_family": "z"}
        ]"#;
        let taxonomy = Taxonomy::from_json(json).unwrap();
        assert_eq!(taxonomy.len(), 1);
        assert_eq!(taxonomy.entries()[0].xkcd, "crimson");
    }

    #[test]
    fn test_from_json_all_rows_malformed_is_error() {
        let json = br#"[{"xkcd_color": "nope"}]"#;
        let err = Taxonomy::from_json(json).unwrap_err();
        assert!(matches!(err, crate::error::LoadError::EmptyTaxonomy));
    }

    #[test]
    fn test_from_json_invalid_document_is_error() {
        let err = Taxonomy::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, crate::error::LoadError::TaxonomyParse(_)));
    }

    #[test]
    fn test_nearest_exact_and_approximate() {
        let taxonomy = sample_taxonomy();
        let hit = taxonomy.nearest(Rgb::from_u8(220, 20, 60)).unwrap();
        assert_eq!(hit.xkcd, "crimson");

        let near_green = taxonomy.nearest(Rgb::from_u8(40, 130, 40)).unwrap();
        assert_eq!(near_green.family, "green");
    }

    #[test]
    fn test_nearest_tie_breaks_to_first_entry() {
        let taxonomy = Taxonomy::from_entries(vec![
            entry([100, 0, 0], "a", "a", "a", "a"),
            entry([0, 0, 100], "b", "b", "b", "b"),
        ]);
        // Equidistant from both anchors
        let hit = taxonomy.nearest(Rgb::from_u8(50, 0, 50)).unwrap();
        assert_eq!(hit.xkcd, "a");
    }

    #[test]
    fn test_nearest_empty_table() {
        let taxonomy = Taxonomy::from_entries(vec![]);
        assert_eq!(
            taxonomy.nearest(Rgb::from_u8(0, 0, 0)).unwrap_err(),
            MatchError::EmptyTable
        );
    }

    #[test]
    fn test_nearest_malformed_query() {
        let taxonomy = sample_taxonomy();
        assert_eq!(
            taxonomy.nearest(Rgb::new(f32::NAN, 0.0, 0.0)).unwrap_err(),
            MatchError::MalformedQuery
        );
    }

    #[test]
    fn test_level_index_is_bijection_in_first_occurrence_order() {
        let taxonomy = sample_taxonomy();
        for level in HierarchyLevel::ALL {
            let index = LevelIndex::build(&taxonomy, level);
            for (i, name) in index.names().iter().enumerate() {
                assert_eq!(index.index_of(name), Some(i));
                assert_eq!(index.name_at(i), Some(name.as_str()));
            }
            assert_eq!(index.name_at(index.len()), None);
        }

        // At the common level, "red" appears twice but is indexed once,
        // before "green" and "blue".
        let common = LevelIndex::build(&taxonomy, HierarchyLevel::Common);
        assert_eq!(common.names(), &["red", "green", "blue"]);
    }

    #[test]
    fn test_level_serde_names() {
        for level in HierarchyLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
            let back: HierarchyLevel = serde_json::from_str(&json).unwrap();
            assert_eq!(back, level);
        }
        assert_eq!("family".parse::<HierarchyLevel>().unwrap(), HierarchyLevel::Family);
        assert!("coarse".parse::<HierarchyLevel>().is_err());
    }
}
