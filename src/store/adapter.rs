//! Per-kind bridge to a [`DocumentStore`].

use super::{CollectionSnapshot, DocumentStore};
use crate::error::{CollectionError, CollectionResult};
use crate::types::{EntityKind, EntityPatch, NewEntity, OrderAssignment};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Store operations scoped to one entity kind.
pub struct EntityAdapter<S: DocumentStore> {
    store: Arc<S>,
    kind: EntityKind,
}

impl<S: DocumentStore> Clone for EntityAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            kind: self.kind,
        }
    }
}

impl<S: DocumentStore> EntityAdapter<S> {
    pub fn new(store: Arc<S>, kind: EntityKind) -> Self {
        Self { store, kind }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Start a live query.
    ///
    /// `on_data` receives a snapshot of the collection once right away and
    /// again after every change to this kind; `on_error` receives fetch
    /// failures. Must be called from within a tokio runtime.
    pub fn subscribe<D, E>(&self, on_data: D, on_error: E) -> Subscription
    where
        D: Fn(CollectionSnapshot) + Send + Sync + 'static,
        E: Fn(CollectionError) + Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let kind = self.kind;
        // Register before the first fetch so no commit falls in between.
        let mut changes = store.changes();

        let handle = tokio::spawn(async move {
            deliver(store.as_ref(), kind, &on_data, &on_error).await;
            loop {
                match changes.recv().await {
                    Ok(changed) if changed == kind => {
                        deliver(store.as_ref(), kind, &on_data, &on_error).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(%kind, skipped, "Subscription lagged, re-fetching");
                        deliver(store.as_ref(), kind, &on_data, &on_error).await;
                    }
                    Err(RecvError::Closed) => {
                        debug!(%kind, "Store closed, ending subscription");
                        break;
                    }
                }
            }
        });

        Subscription {
            kind,
            handle: Some(handle),
        }
    }

    /// Read the collection and its revision once.
    pub async fn snapshot(&self) -> CollectionResult<CollectionSnapshot> {
        self.store.snapshot(self.kind).await
    }

    pub async fn insert(&self, data: &NewEntity) -> CollectionResult<String> {
        if data.name.trim().is_empty() {
            return Err(CollectionError::validation("name"));
        }
        self.store.insert(self.kind, data).await
    }

    pub async fn update_fields(&self, id: &str, patch: &EntityPatch) -> CollectionResult<()> {
        if patch.name.as_ref().is_some_and(|name| name.trim().is_empty()) {
            return Err(CollectionError::validation("name"));
        }
        self.store.update_fields(self.kind, id, patch).await
    }

    pub async fn remove(&self, id: &str) -> CollectionResult<()> {
        self.store.remove(self.kind, id).await
    }

    pub async fn batch_update_order(&self, items: &[OrderAssignment]) -> CollectionResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.store.batch_update_order(self.kind, items).await
    }
}

async fn deliver<S, D, E>(store: &S, kind: EntityKind, on_data: &D, on_error: &E)
where
    S: DocumentStore,
    D: Fn(CollectionSnapshot),
    E: Fn(CollectionError),
{
    match store.snapshot(kind).await {
        Ok(snapshot) => {
            debug!(
                %kind,
                revision = snapshot.revision,
                count = snapshot.items.len(),
                "Delivering collection snapshot"
            );
            on_data(snapshot);
        }
        Err(err) => {
            warn!(%kind, error = %err, "Live query failed");
            on_error(err);
        }
    }
}

/// Handle to a live query. Dropping it unsubscribes.
pub struct Subscription {
    kind: EntityKind,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop delivering updates. Safe to call any number of times.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(kind = %self.kind, "Unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
