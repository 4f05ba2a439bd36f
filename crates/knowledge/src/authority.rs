//! Authority lookup for card-backed chunks.

use async_trait::async_trait;
use loreweave_core::card::is_card_path;
use loreweave_core::{Authority, Card, EntityCardRepository, Store, read_record_as};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves `cards/*.yaml` locators by reading the card through the store.
///
/// Any other path, a missing card, a malformed card or a store failure all
/// resolve to `None`, i.e. a neutral multiplier.
pub struct StoreCardRepository<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> StoreCardRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store + ?Sized + 'static> EntityCardRepository for StoreCardRepository<S> {
    async fn authority(&self, project_id: &str, path: &str) -> Option<Authority> {
        if !is_card_path(path) {
            return None;
        }
        match read_record_as::<Card, S>(self.store.as_ref(), project_id, path).await {
            Ok(Some(card)) => Some(card.authority()),
            Ok(None) => {
                debug!(project = project_id, path, "Card not found, neutral authority");
                None
            }
            Err(e) => {
                warn!(project = project_id, path, error = %e, "Card lookup failed, neutral authority");
                None
            }
        }
    }
}
