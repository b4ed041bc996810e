//! Distribution vector cache and family representative palette.
//!
//! For every decoded image and every hierarchy level, the builder
//! accumulates each valid palette color's proportion into its nearest
//! taxonomy entry's name and projects the totals into the level's dense
//! ordinal vector. This is the most expensive precomputation step; it runs
//! exactly once per corpus load, and the resulting cache is read-only so
//! later clustering requests are bounded by clustering cost alone.
//!
//! Palette proportions are not normalized per image, so distribution
//! vectors are weight vectors rather than strict probability
//! distributions. That is observed extractor behavior, preserved
//! deliberately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use hue_quant::Rgb;
use rayon::prelude::*;

use crate::error::LoadError;
use crate::models::taxonomy::{HierarchyLevel, LevelIndex, Taxonomy};
use crate::services::corpus_loader::DecodedImage;

/// Immutable per-corpus cache of distribution vectors.
///
/// One dense vector per (image, level) pair, indexed by the level's
/// ordinal name mapping. Built once after load; shared read-only across
/// arbitrarily many clustering calls.
#[derive(Debug)]
pub struct DistributionCache {
    level_indexes: [LevelIndex; 4],
    /// `vectors[level.ordinal()][image_index]`
    vectors: [Vec<Vec<f32>>; 4],
    family_palette: HashMap<String, String>,
    image_count: usize,
}

impl DistributionCache {
    /// The cached vectors of one level, in image-index order.
    pub fn vectors(&self, level: HierarchyLevel) -> &[Vec<f32>] {
        &self.vectors[level.ordinal()]
    }

    /// The ordinal name mapping of one level.
    pub fn level_index(&self, level: HierarchyLevel) -> &LevelIndex {
        &self.level_indexes[level.ordinal()]
    }

    /// Representative hex color per family name.
    pub fn family_palette(&self) -> &HashMap<String, String> {
        &self.family_palette
    }

    pub fn image_count(&self) -> usize {
        self.image_count
    }
}

/// Average RGB of all taxonomy entries sharing a family, as hex.
///
/// Purely a visualization aid; independent of per-image data.
fn build_family_palette(taxonomy: &Taxonomy) -> HashMap<String, String> {
    let mut sums: HashMap<&str, ([f64; 3], u32)> = HashMap::new();
    for entry in taxonomy.entries() {
        let (acc, count) = sums.entry(&entry.family).or_insert(([0.0; 3], 0));
        for axis in 0..3 {
            acc[axis] += entry.rgb[axis] as f64;
        }
        *count += 1;
    }
    sums.into_iter()
        .map(|(family, (acc, count))| {
            let n = count as f64;
            let rgb = Rgb::new(
                (acc[0] / n) as f32,
                (acc[1] / n) as f32,
                (acc[2] / n) as f32,
            );
            (family.to_string(), rgb.to_hex())
        })
        .collect()
}

/// Per-image distribution vectors, one per level.
fn image_distributions(
    image: &DecodedImage,
    taxonomy: &Taxonomy,
    level_indexes: &[LevelIndex; 4],
    palette_size: usize,
) -> Result<[Vec<f32>; 4], LoadError> {
    let palette = hue_quant::quantize(&image.rgba, palette_size).map_err(|source| {
        LoadError::Palette {
            name: image.name.clone(),
            source,
        }
    })?;

    let valid_count = palette.iter().filter(|c| c.is_valid()).count();
    let dropped = palette.len() - valid_count;
    if dropped > 0 {
        tracing::warn!(image = %image.name, dropped, "dropped malformed palette entries");
    }
    if valid_count == 0 {
        tracing::warn!(
            image = %image.name,
            "no valid palette entries, image contributes an all-zero distribution"
        );
    }

    let mut vectors: [Vec<f32>; 4] =
        std::array::from_fn(|i| vec![0.0f32; level_indexes[i].len()]);

    for color in palette.iter().filter(|c| c.is_valid()) {
        let entry = taxonomy.nearest(color.rgb)?;
        for level in HierarchyLevel::ALL {
            let ordinal = level.ordinal();
            // Names come from the same table the index was built from, so
            // the lookup cannot miss.
            if let Some(slot) = level_indexes[ordinal].index_of(level.name_of(entry)) {
                vectors[ordinal][slot] += color.proportion;
            }
        }
    }

    Ok(vectors)
}

/// Build the distribution cache for a corpus.
///
/// Per-image work (palette extraction and taxonomy matching) runs in
/// parallel; the cache stores results in original image-index order.
/// `progress` is called with `(done, total)` per image and may be invoked
/// from multiple threads.
pub fn build(
    taxonomy: &Taxonomy,
    images: &[DecodedImage],
    palette_size: usize,
    progress: impl Fn(u32, u32) + Sync,
) -> Result<DistributionCache, LoadError> {
    let level_indexes: [LevelIndex; 4] =
        std::array::from_fn(|i| LevelIndex::build(taxonomy, HierarchyLevel::ALL[i]));

    let total = images.len() as u32;
    let counter = AtomicU32::new(0);

    let per_image: Vec<[Vec<f32>; 4]> = images
        .par_iter()
        .map(|image| {
            let result = image_distributions(image, taxonomy, &level_indexes, palette_size);
            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done, total);
            result
        })
        .collect::<Result<_, _>>()?;

    let mut vectors: [Vec<Vec<f32>>; 4] =
        std::array::from_fn(|_| Vec::with_capacity(images.len()));
    for image_vectors in per_image {
        for (ordinal, vector) in image_vectors.into_iter().enumerate() {
            vectors[ordinal].push(vector);
        }
    }

    tracing::info!(
        images = images.len(),
        xkcd_names = level_indexes[0].len(),
        families = level_indexes[3].len(),
        "distribution cache built"
    );

    Ok(DistributionCache {
        level_indexes,
        vectors,
        family_palette: build_family_palette(taxonomy),
        image_count: images.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::taxonomy::TaxonomyEntry;

    fn entry(rgb: [u8; 3], xkcd: &str, common: &str, family: &str) -> TaxonomyEntry {
        TaxonomyEntry {
            rgb,
            xkcd: xkcd.to_string(),
            design: xkcd.to_string(),
            common: common.to_string(),
            family: family.to_string(),
        }
    }

    fn sample_taxonomy() -> Taxonomy {
        Taxonomy::from_entries(vec![
            entry([255, 0, 0], "bright red", "red", "red"),
            entry([200, 30, 30], "dull red", "red", "red"),
            entry([0, 255, 0], "bright green", "green", "green"),
            entry([0, 0, 255], "bright blue", "blue", "blue"),
        ])
    }

    /// A solid-color image of `n` pixels.
    fn solid_image(name: &str, rgb: [u8; 3], n: usize) -> DecodedImage {
        let mut rgba = Vec::with_capacity(n * 4);
        for _ in 0..n {
            rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        DecodedImage {
            name: name.to_string(),
            width: n as u32,
            height: 1,
            rgba,
        }
    }

    #[test]
    fn test_solid_image_maps_to_single_name() {
        let taxonomy = sample_taxonomy();
        let images = vec![solid_image("0.png", [250, 10, 10], 8)];
        let cache = build(&taxonomy, &images, 4, |_, _| {}).unwrap();

        let family = cache.vectors(HierarchyLevel::Family);
        assert_eq!(family.len(), 1);
        // Families indexed in first-occurrence order: red, green, blue
        assert_eq!(family[0].len(), 3);
        assert!((family[0][0] - 1.0).abs() < 1e-5);
        assert_eq!(family[0][1], 0.0);
        assert_eq!(family[0][2], 0.0);

        // At the xkcd level the same mass lands on "bright red"
        let xkcd = cache.vectors(HierarchyLevel::Xkcd);
        let idx = cache
            .level_index(HierarchyLevel::Xkcd)
            .index_of("bright red")
            .unwrap();
        assert!((xkcd[0][idx] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_vector_mass_equals_palette_mass() {
        let taxonomy = sample_taxonomy();
        // Two-color image: 3/4 red-ish, 1/4 blue-ish
        let mut rgba = Vec::new();
        for _ in 0..12 {
            rgba.extend_from_slice(&[240, 20, 20, 255]);
        }
        for _ in 0..4 {
            rgba.extend_from_slice(&[10, 10, 250, 255]);
        }
        let images = vec![DecodedImage {
            name: "mix.png".to_string(),
            width: 16,
            height: 1,
            rgba,
        }];
        let cache = build(&taxonomy, &images, 4, |_, _| {}).unwrap();

        for level in HierarchyLevel::ALL {
            let sum: f32 = cache.vectors(level)[0].iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "level {level}: sum {sum}");
        }
        let family = &cache.vectors(HierarchyLevel::Family)[0];
        assert!((family[0] - 0.75).abs() < 1e-4);
        assert!((family[2] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_transparent_image_contributes_all_zero() {
        let taxonomy = sample_taxonomy();
        let images = vec![DecodedImage {
            name: "ghost.png".to_string(),
            width: 2,
            height: 1,
            rgba: vec![10, 20, 30, 0, 40, 50, 60, 0],
        }];
        let cache = build(&taxonomy, &images, 4, |_, _| {}).unwrap();
        for level in HierarchyLevel::ALL {
            assert!(cache.vectors(level)[0].iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_cache_order_matches_image_order() {
        let taxonomy = sample_taxonomy();
        let images = vec![
            solid_image("0.png", [255, 0, 0], 4),
            solid_image("1.png", [0, 255, 0], 4),
            solid_image("2.png", [0, 0, 255], 4),
        ];
        let cache = build(&taxonomy, &images, 2, |_, _| {}).unwrap();
        let family = cache.vectors(HierarchyLevel::Family);
        assert!(family[0][0] > 0.9); // red
        assert!(family[1][1] > 0.9); // green
        assert!(family[2][2] > 0.9); // blue
        assert_eq!(cache.image_count(), 3);
    }

    #[test]
    fn test_family_palette_averages_entries() {
        let taxonomy = sample_taxonomy();
        let cache = build(&taxonomy, &[], 4, |_, _| {}).unwrap();
        let palette = cache.family_palette();
        // red family: average of (255,0,0) and (200,30,30)
        assert_eq!(palette.get("red").unwrap(), "#e40f0f");
        assert_eq!(palette.get("green").unwrap(), "#00ff00");
        assert_eq!(palette.get("blue").unwrap(), "#0000ff");
    }

    #[test]
    fn test_progress_events_cover_all_images() {
        let taxonomy = sample_taxonomy();
        let images = vec![
            solid_image("0.png", [255, 0, 0], 2),
            solid_image("1.png", [0, 0, 255], 2),
        ];
        let seen = std::sync::Mutex::new(Vec::new());
        build(&taxonomy, &images, 2, |done, total| {
            seen.lock().unwrap().push((done, total));
        })
        .unwrap();
        let mut events = seen.lock().unwrap().clone();
        events.sort_unstable();
        assert_eq!(events, vec![(1, 2), (2, 2)]);
    }
}
