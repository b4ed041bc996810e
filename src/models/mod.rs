pub mod messages;
pub mod taxonomy;

pub use messages::{Algorithm, ClusterFamilySummary, FamilyPart, Request, Response};
pub use taxonomy::{HierarchyLevel, LevelIndex, MatchError, Taxonomy, TaxonomyEntry};
