//! Token-budgeted context manifests for the Loreweave writing pipeline.
//!
//! # Buckets
//!
//! | Bucket | Measured over | Degradation |
//! |--------|---------------|-------------|
//! | system_rules | fixed blocks | never trimmed |
//! | cards | cast cards | payloads trimmed to core fields |
//! | canon | canon facts + issues | (with current_draft) prefer summaries |
//! | summaries | scene summaries | style examples dropped when over |
//! | current_draft | chapter draft text | evidence reduced, summary preferred |
//! | world | world facts | none |
//! | output_reserve | its own limit | none |

pub mod assembler;
pub mod budget;
pub mod manifest;
pub mod summary;
pub mod token;

pub use assembler::ManifestAssembler;
pub use budget::{BudgetManager, BudgetReport};
pub use manifest::{
    CanonBundle, CompressionStep, ContextManifest, EvidenceChunks, FixedBlocks, TokenBudgets,
};
pub use summary::{ChapterSummaries, make_summaries};
pub use token::estimate_tokens;
