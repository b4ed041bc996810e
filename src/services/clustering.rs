//! Clustering engine: Hellinger embedding + density / partition modes.
//!
//! Distribution vectors are frequency-like, so raw Euclidean distance
//! over-weights heavy names. Both algorithms therefore run on the
//! element-wise square root of the cached vectors (a Hellinger embedding),
//! which turns Euclidean distance into an approximation of the Hellinger
//! distance between the underlying distributions. The transform is
//! mandatory and precedes both algorithms.
//!
//! Both algorithms are brute-force over the full pairwise geometry, which
//! is fine at corpus sizes of a few thousand images and dimensionalities
//! of a few hundred names.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::messages::Algorithm;
use crate::models::taxonomy::HierarchyLevel;
use crate::services::distribution::DistributionCache;

/// Noise label for points not reachable from any dense seed.
pub const NOISE: i32 = -1;

/// Marker for points not yet visited during expansion.
const UNVISITED: i32 = -2;

const KMEANS_MAX_ITERATIONS: usize = 100;

#[inline]
fn distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Element-wise square-root transform of the cached vectors.
pub fn hellinger_embed(vectors: &[Vec<f32>]) -> Vec<Vec<f32>> {
    vectors
        .iter()
        .map(|v| v.iter().map(|&x| x.max(0.0).sqrt()).collect())
        .collect()
}

/// Density-based clustering with DBSCAN semantics.
///
/// A point with at least `min_neighbors` other points within `radius`
/// seeds a cluster; neighborhoods are expanded transitively through other
/// dense points. Points reachable from no dense seed are labeled
/// [`NOISE`].
pub fn dbscan(points: &[Vec<f32>], radius: f32, min_neighbors: usize) -> Vec<i32> {
    let n = points.len();
    let radius_sq = radius * radius;

    let neighbors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && distance_squared(&points[i], &points[j]) <= radius_sq)
                .collect()
        })
        .collect();

    let mut labels = vec![UNVISITED; n];
    let mut cluster = 0i32;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }
        if neighbors[i].len() < min_neighbors {
            labels[i] = NOISE;
            continue;
        }

        labels[i] = cluster;
        let mut queue: VecDeque<usize> = neighbors[i].iter().copied().collect();
        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                // Border point: joins the cluster but does not expand it
                labels[j] = cluster;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster;
            if neighbors[j].len() >= min_neighbors {
                queue.extend(neighbors[j].iter().copied());
            }
        }
        cluster += 1;
    }

    labels
}

/// Partition-based clustering: k-means with k-means++ seeding.
///
/// `k` is clamped to `[1, points.len()]`; every point receives a
/// non-negative label. Deterministic for a given `seed`.
pub fn kmeans(points: &[Vec<f32>], k: usize, seed: u64) -> Vec<i32> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let clamped = k.clamp(1, n);
    if clamped != k {
        tracing::debug!(requested = k, clamped, "clamped k to valid range");
    }
    let k = clamped;

    let mut rng = StdRng::seed_from_u64(seed);

    // k-means++ seeding: subsequent centroids picked with probability
    // proportional to squared distance from the nearest existing centroid.
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].clone());
    let mut nearest_sq: Vec<f32> = points
        .iter()
        .map(|p| distance_squared(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f32 = nearest_sq.iter().sum();
        let chosen = if total <= f32::EPSILON {
            // All remaining points coincide with a centroid
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen::<f32>() * total;
            let mut chosen = n - 1;
            for (i, &d) in nearest_sq.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        let centroid = points[chosen].clone();
        for (i, p) in points.iter().enumerate() {
            nearest_sq[i] = nearest_sq[i].min(distance_squared(p, &centroid));
        }
        centroids.push(centroid);
    }

    // Lloyd iterations
    let dims = points[0].len();
    let mut labels = vec![0i32; n];
    for _ in 0..KMEANS_MAX_ITERATIONS {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let mut best = 0usize;
            let mut best_dist = f32::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist = distance_squared(p, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            if labels[i] != best as i32 {
                labels[i] = best as i32;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![vec![0.0f64; dims]; k];
        let mut counts = vec![0usize; k];
        for (i, p) in points.iter().enumerate() {
            let c = labels[i] as usize;
            counts[c] += 1;
            for (axis, &v) in p.iter().enumerate() {
                sums[c][axis] += v as f64;
            }
        }
        for c in 0..k {
            if counts[c] == 0 {
                // Empty cluster keeps its previous centroid
                continue;
            }
            for axis in 0..dims {
                centroids[c][axis] = (sums[c][axis] / counts[c] as f64) as f32;
            }
        }
    }

    labels
}

/// Run one clustering request against the cache.
///
/// Applies the Hellinger embedding to the selected level's vectors, then
/// dispatches on the algorithm. Returns one label per image in original
/// image-index order.
pub fn run(
    cache: &DistributionCache,
    level: HierarchyLevel,
    algorithm: Algorithm,
    radius: f32,
    min_neighbors: u32,
    k: u32,
    seed: u64,
) -> Vec<i32> {
    let embedded = hellinger_embed(cache.vectors(level));
    match algorithm {
        Algorithm::Density => dbscan(&embedded, radius, min_neighbors as usize),
        Algorithm::Partition => kmeans(&embedded, k as usize, seed),
    }
}
