//! Document store seam.
//!
//! A [`DocumentStore`] persists ordered records per [`EntityKind`] and
//! announces every committed change on a broadcast channel. Live queries are
//! built on top of that by [`EntityAdapter::subscribe`].

pub mod adapter;
pub mod memory;

pub use adapter::{EntityAdapter, Subscription};
pub use memory::MemoryStore;

use crate::error::CollectionResult;
use crate::types::{EntityKind, EntityPatch, NewEntity, OrderAssignment, OrderedEntity};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Capacity of change-notification channels. Lagging subscribers re-fetch,
/// so this only bounds memory.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A collection as read at one revision.
///
/// Every committed change to a collection bumps its revision, so a snapshot
/// with a higher revision is never older than one with a lower revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSnapshot {
    pub revision: u64,
    /// Ordered by `order` then `name`.
    pub items: Vec<OrderedEntity>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// All records of `kind` together with the collection's revision.
    async fn snapshot(&self, kind: EntityKind) -> CollectionResult<CollectionSnapshot>;

    /// All records of `kind`, ordered by `order` then `name`.
    async fn fetch(&self, kind: EntityKind) -> CollectionResult<Vec<OrderedEntity>> {
        Ok(self.snapshot(kind).await?.items)
    }

    /// Receiver of committed changes, one message per mutated kind.
    fn changes(&self) -> broadcast::Receiver<EntityKind>;

    /// Persist a new record and return its generated id. A missing `order`
    /// is stored as `0`.
    async fn insert(&self, kind: EntityKind, data: &NewEntity) -> CollectionResult<String>;

    /// Merge the set fields of `patch` and refresh `updated_at`.
    async fn update_fields(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &EntityPatch,
    ) -> CollectionResult<()>;

    /// Hard delete. Removing an absent id succeeds.
    async fn remove(&self, kind: EntityKind, id: &str) -> CollectionResult<()>;

    /// Apply every assignment or none of them.
    async fn batch_update_order(
        &self,
        kind: EntityKind,
        items: &[OrderAssignment],
    ) -> CollectionResult<()>;
}

/// Store-side ordering of a fetched collection: `order` ascending, then `name`.
pub fn sort_for_query(items: &mut [OrderedEntity]) {
    items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
}
