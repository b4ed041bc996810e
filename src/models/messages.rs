//! Message boundary with the external UI collaborator.
//!
//! The pipeline is driven exclusively through these types: two request
//! kinds in, three response kinds out. Field names and shapes are part of
//! the boundary contract; any transport that can carry JSON can carry
//! them.

use serde::{Deserialize, Serialize};

use super::taxonomy::HierarchyLevel;

/// Clustering algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// DBSCAN-style neighborhood expansion; unreachable points are noise.
    Density,
    /// k-means-style fixed-k partitioning; every point gets a cluster.
    Partition,
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "density" => Ok(Algorithm::Density),
            "partition" => Ok(Algorithm::Partition),
            other => Err(format!(
                "unknown algorithm '{other}' (expected density or partition)"
            )),
        }
    }
}

/// Inbound request from the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Load the corpus and precompute distribution vectors.
    Init { desired_palette_size: u32 },

    /// Cluster the cached vectors of one hierarchy level.
    RunCluster {
        level: HierarchyLevel,
        algorithm: Algorithm,
        /// Neighborhood radius (eps) for the density algorithm.
        radius: f32,
        /// Minimum neighbor count (minPts) for the density algorithm.
        min_neighbors: u32,
        /// Cluster count for the partition algorithm; clamped to
        /// `[1, image_count]` before running.
        k: u32,
        /// Monotonic token echoed unmodified in the result so the
        /// collaborator can discard stale completions.
        run_id: u64,
    },
}

/// Composition of one cluster by color family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterFamilySummary {
    pub cluster_id: i32,
    /// Family parts sorted descending by fraction; fractions sum to 1.
    pub parts: Vec<FamilyPart>,
}

/// One family's share of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyPart {
    pub name: String,
    pub fraction: f32,
    /// Representative color for the family as a `#rrggbb` hex string.
    pub color: String,
}

/// Outbound response to the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Emitted repeatedly during decode and distribution build, and once
    /// with a descriptive phase string on terminal failure.
    Progress { phase: String, done: u32, total: u32 },

    /// Emitted once after initialization completes.
    Ready {
        image_count: u32,
        image_urls: Vec<String>,
    },

    /// Result of one clustering request. `labels` is in original
    /// image-index order; `-1` denotes noise.
    ClusterResult {
        labels: Vec<i32>,
        level: HierarchyLevel,
        run_id: u64,
        family_summary: Vec<ClusterFamilySummary>,
    },
}
