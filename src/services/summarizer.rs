//! Cluster composition summaries for visualization.
//!
//! Aggregates the family-level distribution vector of every clustered
//! image into its cluster's accumulator, then normalizes per cluster into
//! fraction breakdowns with a representative color per family. Advisory
//! only; has no effect on cluster labels.

use std::collections::BTreeMap;

use crate::models::messages::{ClusterFamilySummary, FamilyPart};
use crate::models::taxonomy::{HierarchyLevel, LevelIndex};
use crate::services::clustering::NOISE;
use crate::services::distribution::DistributionCache;

/// Fallback when a family has no computed representative color.
const FALLBACK_COLOR: &str = "#808080";

/// Summarize per-cluster family composition.
///
/// Noise points (label [`NOISE`]) belong to no cluster and are skipped.
/// Clusters whose accumulated weight is not positive are omitted from the
/// output entirely, which also protects the normalization against
/// division by zero. Surviving clusters report fractions summing to 1,
/// sorted descending.
pub fn summarize(labels: &[i32], cache: &DistributionCache) -> Vec<ClusterFamilySummary> {
    let family_vectors = cache.vectors(HierarchyLevel::Family);
    let family_index = cache.level_index(HierarchyLevel::Family);
    let family_palette = cache.family_palette();

    let mut accumulators: BTreeMap<i32, Vec<f32>> = BTreeMap::new();
    for (image, &label) in labels.iter().enumerate() {
        if label == NOISE {
            continue;
        }
        let acc = accumulators
            .entry(label)
            .or_insert_with(|| vec![0.0; family_index.len()]);
        for (slot, &weight) in family_vectors[image].iter().enumerate() {
            acc[slot] += weight;
        }
    }

    accumulators
        .into_iter()
        .filter_map(|(cluster_id, acc)| {
            let total: f32 = acc.iter().sum();
            if total <= 0.0 {
                return None;
            }
            let mut parts = build_parts(&acc, total, family_index, family_palette);
            parts.sort_by(|a, b| {
                b.fraction
                    .partial_cmp(&a.fraction)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            Some(ClusterFamilySummary { cluster_id, parts })
        })
        .collect()
}

fn build_parts(
    acc: &[f32],
    total: f32,
    family_index: &LevelIndex,
    family_palette: &std::collections::HashMap<String, String>,
) -> Vec<FamilyPart> {
    acc.iter()
        .enumerate()
        .filter(|&(_, &weight)| weight > 0.0)
        .map(|(slot, &weight)| {
            let name = family_index.name_at(slot).unwrap_or_default().to_string();
            let color = family_palette
                .get(&name)
                .cloned()
                .unwrap_or_else(|| FALLBACK_COLOR.to_string());
            FamilyPart {
                name,
                fraction: weight / total,
                color,
            }
        })
        .collect()
}
