//! Error types for the pipeline.
//!
//! Two failure taxonomies exist at this boundary: [`LoadError`] covers
//! terminal initialization failures (nothing is retained, the whole load
//! aborts), and [`ClusterError`] covers per-request failures (the request
//! is rejected, cached state stays valid for subsequent requests).
//! Data-quality problems (malformed taxonomy rows, bad palette entries)
//! are not errors at all: they are dropped and counted where they occur.

use thiserror::Error;

use crate::models::taxonomy::MatchError;

/// Terminal failure during pipeline initialization.
///
/// Any of these aborts the load; no partial state is retained. The
/// [`phase`](LoadError::phase) name is what the external collaborator sees
/// in the failure notification.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] std::io::Error),

    #[error("archive contains no image entries")]
    EmptyArchive,

    #[error("failed to decode image {name}: {source}")]
    ImageDecode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("taxonomy parse error: {0}")]
    TaxonomyParse(#[from] serde_json::Error),

    #[error("taxonomy table has no valid entries")]
    EmptyTaxonomy,

    #[error("palette extraction failed for {name}: {source}")]
    Palette {
        name: String,
        #[source]
        source: hue_quant::QuantizeError,
    },

    #[error("taxonomy match error: {0}")]
    Match(#[from] MatchError),
}

impl LoadError {
    /// Name of the initialization stage this error belongs to, used as the
    /// phase string in failure notifications.
    pub fn phase(&self) -> &'static str {
        match self {
            LoadError::Fetch { .. } | LoadError::Read { .. } => "fetching",
            LoadError::Archive(_) | LoadError::EmptyArchive => "unpacking",
            LoadError::ImageDecode { .. } => "decoding",
            LoadError::TaxonomyParse(_) | LoadError::EmptyTaxonomy => "parsing taxonomy",
            LoadError::Palette { .. } | LoadError::Match(_) => "analyzing",
        }
    }
}

/// Failure of a single clustering request.
///
/// These do not corrupt the distribution cache; the pipeline stays usable
/// for subsequent valid requests.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Clustering was requested before initialization completed.
    #[error("distribution cache not ready")]
    NotReady,

    /// The blocking clustering task panicked or was cancelled.
    #[error("clustering task failed: {0}")]
    TaskFailed(String),
}
