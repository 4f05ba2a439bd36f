//! Knowledge bases for Loreweave: chunking, BM25 indexing and weighted
//! multi-source retrieval.
//!
//! The pure pieces (sanitizer, chunkers, features, tokenizer, index builder,
//! ranker, merger) are plain functions. [`KnowledgeBase`] wires them to a
//! [`loreweave_core::Store`].

pub mod authority;
pub mod chunker;
pub mod features;
pub mod index;
pub mod ingest;
pub mod merge;
pub mod ranker;
pub mod sanitize;
pub mod service;
pub mod style;
pub mod tokenizer;

pub use authority::StoreCardRepository;
pub use chunker::{LineChunk, chunk_lines, chunk_text};
pub use features::text_features;
pub use index::{build_index, is_current, source_version};
pub use merge::merge;
pub use ranker::rank;
pub use sanitize::{SanitizeWarning, sanitize};
pub use service::{
    AssetText, GLOBAL_PROJECT, KnowledgeBase, KnowledgeConfig, ReindexReport, UploadReceipt,
};
pub use style::{StyleGuide, StyleProfile, StyleStats};
pub use tokenizer::{CjkBigramTokenizer, Tokenizer};
