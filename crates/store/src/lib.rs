//! Storage backends for Loreweave.

pub mod demo;
pub mod file_store;
pub mod in_memory;
pub mod path;

pub use demo::{DEMO_PROJECT_ID, seed_demo_project};
pub use file_store::FileStore;
pub use in_memory::InMemoryStore;
