pub mod clustering;
pub mod corpus_loader;
pub mod distribution;
pub mod summarizer;

pub use corpus_loader::{ArchiveEntry, DecodedImage};
pub use distribution::DistributionCache;
