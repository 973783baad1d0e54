//! # External Resources
//!
//! Blocks such as `form` embed an entity stored elsewhere. Resolving it is
//! the only asynchronous work the editor does.
//!
//! ```text
//!   begin(block, "A") ─► ticket #1 ─┐
//!   begin(block, "B") ─► ticket #2 ─┼─► resolver (network, any order)
//!                                   │
//!   complete(#1, ..) ◄──────────────┤   discarded: block now waits on #2
//!   complete(#2, ..) ◄──────────────┘   applied
//! ```
//!
//! Cancellation is semantic: a fetch is never aborted, its result is just
//! dropped when its ticket is no longer the block's latest one.

use crate::errors::ResourceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use stepcraft_blocks::{BlockId, ExternalResource, ResourceState};
use tracing::{debug, warn};

/// Resolves a resource identifier to its definition
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// `Ok(None)` means the resource does not exist
    async fn resolve(&self, reference: &str) -> Result<Option<ExternalResource>, ResourceError>;
}

/// A binary asset chosen by the author
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Hosts uploaded assets and returns where they can be fetched from
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, asset: Asset) -> Result<String, ResourceError>;
}

/// Identifies one fetch for one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTicket {
    pub block_id: BlockId,
    pub reference: String,
    pub token: u64,
}

pub type FetchOutcome = Result<Option<ExternalResource>, ResourceError>;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub outcome: FetchOutcome,
}

/// Run one fetch. Errors end up in the completion, never in the caller.
pub async fn fetch(resolver: &dyn ResourceResolver, ticket: FetchTicket) -> FetchCompletion {
    debug!(block_id = %ticket.block_id, reference = %ticket.reference, token = ticket.token, "Fetching resource");
    let outcome = resolver.resolve(&ticket.reference).await;
    FetchCompletion { ticket, outcome }
}

/// Run a fetch on the tokio runtime and deliver the completion over `tx`
#[cfg(feature = "async")]
pub fn spawn_fetch(
    resolver: std::sync::Arc<dyn ResourceResolver>,
    ticket: FetchTicket,
    tx: tokio::sync::mpsc::UnboundedSender<FetchCompletion>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let completion = fetch(resolver.as_ref(), ticket).await;
        if tx.send(completion).is_err() {
            debug!("Fetch completed after the session went away");
        }
    })
}

#[derive(Debug)]
struct Tracked {
    token: u64,
    state: ResourceState,
}

/// Latest fetch ticket and render state per block
#[derive(Debug, Default)]
pub struct ResourceTracker {
    entries: HashMap<BlockId, Tracked>,
    next_token: u64,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start resolving `reference` for a block. Any fetch already in flight
    /// for that block becomes stale.
    pub fn begin(&mut self, block_id: &BlockId, reference: &str) -> FetchTicket {
        self.next_token += 1;
        let token = self.next_token;
        if let Some(previous) = self.entries.get(block_id) {
            if previous.state.is_loading() {
                debug!(block_id = %block_id, stale = previous.token, "Superseding in-flight fetch");
            }
        }

        self.entries.insert(
            block_id.clone(),
            Tracked {
                token,
                state: ResourceState::Loading {
                    reference: reference.to_string(),
                },
            },
        );
        FetchTicket {
            block_id: block_id.clone(),
            reference: reference.to_string(),
            token,
        }
    }

    /// Apply a fetch result. Returns false when it was discarded as stale.
    pub fn complete(&mut self, ticket: &FetchTicket, outcome: FetchOutcome) -> bool {
        let Some(entry) = self.entries.get_mut(&ticket.block_id) else {
            debug!(block_id = %ticket.block_id, "Discarding fetch for a forgotten block");
            return false;
        };
        if entry.token != ticket.token || entry.state.reference() != ticket.reference {
            debug!(
                block_id = %ticket.block_id,
                reference = %ticket.reference,
                token = ticket.token,
                current = entry.token,
                "Discarding stale fetch"
            );
            return false;
        }
        if !entry.state.is_loading() {
            debug!(block_id = %ticket.block_id, token = ticket.token, "Discarding duplicate fetch result");
            return false;
        }

        entry.state = match outcome {
            Ok(Some(resource)) => ResourceState::Resolved(resource),
            Ok(None) => ResourceState::Unavailable {
                reference: ticket.reference.clone(),
                reason: "not found".to_string(),
            },
            Err(e) => {
                warn!(block_id = %ticket.block_id, reference = %ticket.reference, error = %e, "Resource unavailable");
                ResourceState::Unavailable {
                    reference: ticket.reference.clone(),
                    reason: e.to_string(),
                }
            }
        };
        true
    }

    pub fn state(&self, block_id: &BlockId) -> Option<&ResourceState> {
        self.entries.get(block_id).map(|e| &e.state)
    }

    /// Fetch an unavailable resource again
    pub fn retry(&mut self, block_id: &BlockId) -> Option<FetchTicket> {
        let reference = match &self.entries.get(block_id)?.state {
            ResourceState::Unavailable { reference, .. } => reference.clone(),
            _ => return None,
        };
        Some(self.begin(block_id, &reference))
    }

    pub fn forget(&mut self, block_id: &BlockId) {
        self.entries.remove(block_id);
    }

    /// Align tracking with a block's current reference. Returns a ticket
    /// when a new fetch is needed.
    pub fn sync(&mut self, block_id: &BlockId, reference: Option<&str>) -> Option<FetchTicket> {
        match reference {
            None => {
                self.forget(block_id);
                None
            }
            Some(reference) => match self.entries.get(block_id) {
                Some(entry) if entry.state.reference() == reference => None,
                _ => Some(self.begin(block_id, reference)),
            },
        }
    }

    pub fn loading(&self) -> usize {
        self.entries.values().filter(|e| e.state.is_loading()).count()
    }

    /// Drop tracking for every block `keep` rejects
    pub fn retain(&mut self, mut keep: impl FnMut(&BlockId) -> bool) {
        let before = self.entries.len();
        self.entries.retain(|id, _| keep(id));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!(dropped, "Forgot resources of removed blocks");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Resolver backed by a map, for hosts that preload definitions and for tests
#[derive(Debug, Default)]
pub struct MemoryResolver {
    resources: RwLock<HashMap<String, ExternalResource>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, resource: ExternalResource) {
        if let Ok(mut resources) = self.resources.write() {
            resources.insert(resource.id.clone(), resource);
        }
    }
}

#[async_trait]
impl ResourceResolver for MemoryResolver {
    async fn resolve(&self, reference: &str) -> Result<Option<ExternalResource>, ResourceError> {
        let resources = self
            .resources
            .read()
            .map_err(|_| ResourceError::Fetch("resolver lock poisoned".to_string()))?;
        Ok(resources.get(reference).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str) -> ExternalResource {
        ExternalResource {
            id: id.to_string(),
            name: format!("Form {}", id),
            fields: Vec::new(),
            definition: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_complete_resolves() {
        let mut tracker = ResourceTracker::new();
        let block = BlockId::from("b1");
        let ticket = tracker.begin(&block, "A");
        assert!(tracker.state(&block).unwrap().is_loading());

        assert!(tracker.complete(&ticket, Ok(Some(resource("A")))));
        assert!(matches!(tracker.state(&block), Some(ResourceState::Resolved(r)) if r.id == "A"));
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut tracker = ResourceTracker::new();
        let block = BlockId::from("b1");
        let first = tracker.begin(&block, "A");
        let second = tracker.begin(&block, "B");

        assert!(tracker.complete(&second, Ok(Some(resource("B")))));
        assert!(!tracker.complete(&first, Ok(Some(resource("A")))));
        assert_eq!(tracker.state(&block).unwrap().reference(), "B");
    }

    #[test]
    fn test_stale_completion_while_newer_still_loading() {
        let mut tracker = ResourceTracker::new();
        let block = BlockId::from("b1");
        let first = tracker.begin(&block, "A");
        tracker.begin(&block, "B");

        assert!(!tracker.complete(&first, Ok(Some(resource("A")))));
        assert_eq!(
            tracker.state(&block),
            Some(&ResourceState::Loading {
                reference: "B".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_completion_is_discarded() {
        let mut tracker = ResourceTracker::new();
        let block = BlockId::from("b1");
        let ticket = tracker.begin(&block, "A");

        assert!(tracker.complete(&ticket, Ok(Some(resource("A")))));
        assert!(!tracker.complete(&ticket, Err(ResourceError::Fetch("offline".to_string()))));
        assert!(matches!(tracker.state(&block), Some(ResourceState::Resolved(_))));
    }

    #[test]
    fn test_not_found_and_retry() {
        let mut tracker = ResourceTracker::new();
        let block = BlockId::from("b1");
        let ticket = tracker.begin(&block, "A");
        tracker.complete(&ticket, Ok(None));
        assert!(matches!(tracker.state(&block), Some(ResourceState::Unavailable { .. })));

        let retry = tracker.retry(&block).unwrap();
        assert_eq!(retry.reference, "A");
        assert!(retry.token > ticket.token);
        assert!(tracker.retry(&block).is_none());
    }

    #[test]
    fn test_sync() {
        let mut tracker = ResourceTracker::new();
        let block = BlockId::from("b1");

        assert!(tracker.sync(&block, Some("A")).is_some());
        assert!(tracker.sync(&block, Some("A")).is_none());
        assert!(tracker.sync(&block, Some("B")).is_some());
        assert!(tracker.sync(&block, None).is_none());
        assert!(tracker.state(&block).is_none());
    }

    #[test]
    fn test_retain_drops_removed_blocks() {
        let mut tracker = ResourceTracker::new();
        let kept = BlockId::from("kept");
        let gone = BlockId::from("gone");
        tracker.begin(&kept, "A");
        let ticket = tracker.begin(&gone, "B");

        tracker.retain(|id| id == &kept);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.state(&gone).is_none());
        assert!(!tracker.complete(&ticket, Ok(Some(resource("B")))));
    }

    #[test]
    fn test_forgotten_block_discards() {
        let mut tracker = ResourceTracker::new();
        let block = BlockId::from("b1");
        let ticket = tracker.begin(&block, "A");
        tracker.forget(&block);
        assert!(!tracker.complete(&ticket, Err(ResourceError::Fetch("offline".to_string()))));
    }
}
