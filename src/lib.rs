//! Huescope
//!
//! Background pipeline for exploring a photo collection by clustering
//! images according to their dominant-color composition, measured against
//! a four-level color-naming taxonomy.
//!
//! The pipeline loads a compressed image archive and a taxonomy table,
//! extracts a dominant-color palette per image, maps palette colors onto
//! taxonomy names at four hierarchy levels, caches per-image distribution
//! vectors, and answers clustering requests over those cached vectors.
//! The UI is an external collaborator across a message-passing boundary
//! ([`worker::PipelineWorker`]); this library exposes the modules behind
//! that boundary for integration testing.

pub mod error;
pub mod models;
pub mod services;
pub mod worker;
