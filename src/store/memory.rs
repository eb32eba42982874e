//! In-process document store.
//!
//! Keeps every collection in a `RwLock`ed map and broadcasts changes like the
//! SQLite store does. Failure injection and a write counter make it the
//! store of choice for exercising manager behavior in tests.

use super::{CHANGE_CHANNEL_CAPACITY, CollectionSnapshot, DocumentStore, sort_for_query};
use crate::db::now_ms;
use crate::error::{CollectionError, CollectionResult};
use crate::types::{EntityKind, EntityPatch, NewEntity, OrderAssignment, OrderedEntity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Collection {
    revision: u64,
    records: Vec<OrderedEntity>,
}

#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<HashMap<EntityKind, Collection>>,
    changes: broadcast::Sender<EntityKind>,
    /// Number of upcoming write calls that fail with a store error.
    failing_writes: AtomicUsize,
    failing_fetches: AtomicBool,
    write_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
            failing_writes: AtomicUsize::new(0),
            failing_fetches: AtomicBool::new(false),
            write_calls: AtomicUsize::new(0),
        }
    }

    /// Place records verbatim (ids, orders and timestamps untouched).
    ///
    /// Useful for reproducing states the manager would never produce itself,
    /// such as gapped or duplicated orders. Does not count as a write call.
    pub async fn put_raw(&self, kind: EntityKind, records: Vec<OrderedEntity>) {
        {
            let mut collections = self.collections.write().await;
            let collection = collections.entry(kind).or_default();
            for record in records {
                collection.records.retain(|existing| existing.id != record.id);
                collection.records.push(record);
            }
            collection.revision += 1;
        }
        self.notify(kind);
    }

    /// Make the next `count` write calls fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn set_fetch_failure(&self, failing: bool) {
        self.failing_fetches.store(failing, Ordering::SeqCst);
    }

    /// Write calls that reached the store, including injected failures.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn begin_write(&self) -> CollectionResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CollectionError::store("injected write failure"));
        }
        Ok(())
    }

    fn notify(&self, kind: EntityKind) {
        // No receivers is fine.
        let _ = self.changes.send(kind);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn snapshot(&self, kind: EntityKind) -> CollectionResult<CollectionSnapshot> {
        if self.failing_fetches.load(Ordering::SeqCst) {
            return Err(CollectionError::store("injected fetch failure"));
        }
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(&kind) else {
            return Ok(CollectionSnapshot::default());
        };
        let mut items = collection.records.clone();
        sort_for_query(&mut items);
        Ok(CollectionSnapshot {
            revision: collection.revision,
            items,
        })
    }

    fn changes(&self) -> broadcast::Receiver<EntityKind> {
        self.changes.subscribe()
    }

    async fn insert(&self, kind: EntityKind, data: &NewEntity) -> CollectionResult<String> {
        self.begin_write()?;
        if data.name.trim().is_empty() {
            return Err(CollectionError::validation("name"));
        }

        let now = now_ms();
        let id = Uuid::now_v7().to_string();
        let record = OrderedEntity {
            id: id.clone(),
            name: data.name.clone(),
            description: data.description.clone(),
            value: data.value.clone(),
            order: data.order.unwrap_or(0),
            color: data.color.clone(),
            icon_name: data.icon_name.clone(),
            is_completion_status: data.is_completion_status,
            created_at: now,
            updated_at: now,
        };

        {
            let mut collections = self.collections.write().await;
            let collection = collections.entry(kind).or_default();
            collection.records.push(record);
            collection.revision += 1;
        }
        self.notify(kind);
        Ok(id)
    }

    async fn update_fields(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &EntityPatch,
    ) -> CollectionResult<()> {
        self.begin_write()?;
        {
            let mut collections = self.collections.write().await;
            let collection = collections
                .get_mut(&kind)
                .ok_or_else(|| CollectionError::not_found(kind.as_str(), id))?;
            let record = collection
                .records
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or_else(|| CollectionError::not_found(kind.as_str(), id))?;

            if let Some(name) = &patch.name {
                record.name = name.clone();
            }
            if let Some(value) = &patch.value {
                record.value = Some(value.clone());
            }
            if let Some(description) = &patch.description {
                record.description = Some(description.clone());
            }
            if let Some(order) = patch.order {
                record.order = order;
            }
            if let Some(color) = &patch.color {
                record.color = Some(color.clone());
            }
            if let Some(icon_name) = &patch.icon_name {
                record.icon_name = Some(icon_name.clone());
            }
            if let Some(flag) = patch.is_completion_status {
                record.is_completion_status = flag;
            }
            record.updated_at = now_ms();
            collection.revision += 1;
        }
        self.notify(kind);
        Ok(())
    }

    async fn remove(&self, kind: EntityKind, id: &str) -> CollectionResult<()> {
        self.begin_write()?;
        let removed = {
            let mut collections = self.collections.write().await;
            match collections.get_mut(&kind) {
                Some(collection) => {
                    let before = collection.records.len();
                    collection.records.retain(|item| item.id != id);
                    let removed = collection.records.len() != before;
                    if removed {
                        collection.revision += 1;
                    }
                    removed
                }
                None => false,
            }
        };
        if removed {
            self.notify(kind);
        }
        Ok(())
    }

    async fn batch_update_order(
        &self,
        kind: EntityKind,
        items: &[OrderAssignment],
    ) -> CollectionResult<()> {
        self.begin_write()?;
        {
            let mut collections = self.collections.write().await;
            let collection = collections.entry(kind).or_default();
            let records = &mut collection.records;

            // Validate the whole batch before touching anything.
            if let Some(missing) = items
                .iter()
                .find(|a| !records.iter().any(|record| record.id == a.id))
            {
                return Err(CollectionError::not_found(kind.as_str(), missing.id.clone()));
            }

            let now = now_ms();
            for assignment in items {
                if let Some(record) = records.iter_mut().find(|r| r.id == assignment.id) {
                    record.order = assignment.order;
                    record.updated_at = now;
                }
            }
            collection.revision += 1;
        }
        self.notify(kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_sorts_by_order_then_name() {
        let store = MemoryStore::new();
        store
            .insert(EntityKind::Priority, &NewEntity::named("b").with_order(1))
            .await
            .unwrap();
        store
            .insert(EntityKind::Priority, &NewEntity::named("a").with_order(1))
            .await
            .unwrap();
        store
            .insert(EntityKind::Priority, &NewEntity::named("z").with_order(0))
            .await
            .unwrap();

        let names: Vec<_> = store
            .fetch(EntityKind::Priority)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }

    #[tokio::test]
    async fn test_batch_with_unknown_id_applies_nothing() {
        let store = MemoryStore::new();
        let a = store
            .insert(EntityKind::Status, &NewEntity::named("a").with_order(0))
            .await
            .unwrap();

        let result = store
            .batch_update_order(
                EntityKind::Status,
                &[OrderAssignment::new(&a, 5), OrderAssignment::new("ghost", 0)],
            )
            .await;
        assert!(matches!(result, Err(CollectionError::NotFound { .. })));

        let items = store.fetch(EntityKind::Status).await.unwrap();
        assert_eq!(items[0].order, 0);
    }

    #[tokio::test]
    async fn test_injected_failures_are_counted_and_consumed() {
        let store = MemoryStore::new();
        store.fail_next_writes(1);

        let first = store
            .insert(EntityKind::Category, &NewEntity::named("x"))
            .await;
        assert!(matches!(first, Err(CollectionError::Store(_))));

        let second = store
            .insert(EntityKind::Category, &NewEntity::named("x"))
            .await;
        assert!(second.is_ok());
        assert_eq!(store.write_calls(), 2);
    }

    #[tokio::test]
    async fn test_revision_bumps_on_every_commit() {
        let store = MemoryStore::new();
        assert_eq!(store.snapshot(EntityKind::Status).await.unwrap().revision, 0);

        let id = store
            .insert(EntityKind::Status, &NewEntity::named("Open"))
            .await
            .unwrap();
        store
            .batch_update_order(EntityKind::Status, &[OrderAssignment::new(&id, 3)])
            .await
            .unwrap();
        store.remove(EntityKind::Status, "ghost").await.unwrap();

        let snapshot = store.snapshot(EntityKind::Status).await.unwrap();
        assert_eq!(snapshot.revision, 2);
        assert_eq!(snapshot.items[0].order, 3);
        assert_eq!(store.snapshot(EntityKind::Priority).await.unwrap().revision, 0);
    }

    #[tokio::test]
    async fn test_remove_absent_id_succeeds() {
        let store = MemoryStore::new();
        assert!(store.remove(EntityKind::Category, "nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_changes_are_broadcast() {
        let store = MemoryStore::new();
        let mut rx = store.changes();
        store
            .insert(EntityKind::Category, &NewEntity::named("x"))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), EntityKind::Category);
    }
}
