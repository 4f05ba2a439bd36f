//! # Loreweave Core
//!
//! Domain types, traits, and error definitions for the Loreweave context
//! engine. This crate has **no framework dependencies**: it defines the
//! domain model that the store, knowledge and context crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Collaborators are traits here; implementations live in their own crates:
//! - [`Store`] — storage primitives for a project tree
//! - [`EntityCardRepository`] — authority metadata for card-backed chunks
//!
//! Everything else is plain data with serde derives.

pub mod card;
pub mod chunk;
pub mod error;
pub mod index;
pub mod kb;
pub mod project;
pub mod retrieval;
pub mod scene;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use card::{Authority, Card, EntityCardRepository};
pub use chunk::{Chunk, PunctuationProfile, SourceKind, SourceLocator, TextFeatures};
pub use error::{Error, KnowledgeError, Result, StoreError};
pub use index::Bm25Index;
pub use kb::{AssetKind, KbId, ReindexTarget};
pub use project::{Bucket, BudgetOverride, CapsOverride, Project};
pub use retrieval::{QueryFilters, ScoredResult, WeightedSource};
pub use scene::{ChapterMeta, Constraints, ScenePlan};
pub use store::{Store, read_record_as};
