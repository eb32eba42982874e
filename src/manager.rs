//! Live ordered collections.
//!
//! An [`OrderedCollection`] owns the sorted view of one entity kind. The view
//! is only ever replaced wholesale with a store snapshot, either by the
//! subscription or by the refresh that follows each confirmed write. A
//! snapshot older than the one on display is dropped, so a mutation's effect
//! is visible to the next call on the same collection.

use crate::error::{CollectionError, CollectionResult};
use crate::normalizer::{MovePlan, next_order, plan_move};
use crate::store::{CollectionSnapshot, DocumentStore, EntityAdapter, Subscription};
use crate::types::{EntityKind, EntityPatch, MoveDirection, NewEntity, OrderedEntity, slugify};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

/// What callers see of a collection at a point in time.
#[derive(Debug, Clone)]
pub struct CollectionState {
    pub items: Arc<Vec<OrderedEntity>>,
    /// Store revision the items were read at.
    pub revision: u64,
    /// True until the first delivery or failure.
    pub is_loading: bool,
    pub error: Option<CollectionError>,
}

impl Default for CollectionState {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            revision: 0,
            is_loading: true,
            error: None,
        }
    }
}

/// Replace the state with `snapshot` unless it is older than what is shown.
fn publish(tx: &watch::Sender<CollectionState>, snapshot: CollectionSnapshot) -> bool {
    tx.send_if_modified(|state| {
        if !state.is_loading && snapshot.revision < state.revision {
            return false;
        }
        *state = CollectionState {
            items: Arc::new(snapshot.items),
            revision: snapshot.revision,
            is_loading: false,
            error: None,
        };
        true
    })
}

fn publish_error(tx: &watch::Sender<CollectionState>, err: CollectionError) {
    tx.send_modify(|state| {
        state.is_loading = false;
        state.error = Some(err);
    });
}

pub struct OrderedCollection<S: DocumentStore> {
    adapter: EntityAdapter<S>,
    state: watch::Receiver<CollectionState>,
    publisher: Arc<watch::Sender<CollectionState>>,
    /// Held from validation until the view shows the write.
    writes: Mutex<()>,
    subscription: Subscription,
}

impl<S: DocumentStore> OrderedCollection<S> {
    /// Start a live collection for `kind`. Must be called within a tokio runtime.
    pub fn new(store: Arc<S>, kind: EntityKind) -> Self {
        let adapter = EntityAdapter::new(store, kind);
        let (tx, state) = watch::channel(CollectionState::default());
        let publisher = Arc::new(tx);

        let data_tx = Arc::clone(&publisher);
        let error_tx = Arc::clone(&publisher);
        let subscription = adapter.subscribe(
            move |snapshot| {
                if !publish(&data_tx, snapshot) {
                    debug!(%kind, "Dropped stale delivery");
                }
            },
            move |err| publish_error(&error_tx, err),
        );

        Self {
            adapter,
            state,
            publisher,
            writes: Mutex::new(()),
            subscription,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.adapter.kind()
    }

    /// Current records, sorted by order then name.
    pub fn list(&self) -> Vec<OrderedEntity> {
        self.state.borrow().items.as_ref().clone()
    }

    pub fn snapshot(&self) -> CollectionState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Last read failure, cleared by the next successful delivery.
    pub fn error(&self) -> Option<CollectionError> {
        self.state.borrow().error.clone()
    }

    /// A receiver that observes every state replacement from now on.
    pub fn watch(&self) -> watch::Receiver<CollectionState> {
        self.state.clone()
    }

    /// Wait for the first delivery (or failure) and return that state.
    pub async fn ready(&self) -> CollectionResult<CollectionState> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|state| !state.is_loading)
            .await
            .map_err(|_| CollectionError::store("subscription closed"))?;
        Ok(state.clone())
    }

    /// Stop receiving updates. The last state stays readable.
    pub fn close(&mut self) {
        self.subscription.unsubscribe();
    }

    /// Read the store now and show the result.
    pub async fn refresh(&self) -> CollectionResult<()> {
        match self.adapter.snapshot().await {
            Ok(snapshot) => {
                publish(&self.publisher, snapshot);
                Ok(())
            }
            Err(err) => {
                publish_error(&self.publisher, err.clone());
                Err(err)
            }
        }
    }

    /// Records to validate a mutation against. Reads the store first if the
    /// view has not loaded or its last read failed.
    async fn current_items(&self) -> CollectionResult<Arc<Vec<OrderedEntity>>> {
        let stale = {
            let state = self.state.borrow();
            state.is_loading || state.error.is_some()
        };
        if stale {
            self.refresh().await?;
        }
        Ok(Arc::clone(&self.state.borrow().items))
    }

    /// Bring the view up to a confirmed write. The write stands even if the
    /// read fails; the next mutation retries the read before validating.
    async fn catch_up(&self) {
        if let Err(err) = self.refresh().await {
            warn!(kind = %self.kind(), error = %err, "Write committed but view refresh failed");
        }
    }

    /// Validate and insert a record, returning its id.
    pub async fn add(&self, data: NewEntity) -> CollectionResult<String> {
        let kind = self.kind();
        let _guard = self.writes.lock().await;
        let items = self.current_items().await?;
        let prepared = prepare_new(kind, data, &items).inspect_err(|err| {
            warn!(%kind, error = %err, "Rejected add");
        })?;

        let id = self.adapter.insert(&prepared).await?;
        info!(%kind, %id, name = %prepared.name, order = ?prepared.order, "Added");
        self.catch_up().await;
        Ok(id)
    }

    /// Validate and merge a partial update into a known record.
    pub async fn update(&self, id: &str, patch: EntityPatch) -> CollectionResult<()> {
        let kind = self.kind();
        let _guard = self.writes.lock().await;
        let items = self.current_items().await?;
        let prepared = prepare_patch(kind, id, patch, &items).inspect_err(|err| {
            warn!(%kind, %id, error = %err, "Rejected update");
        })?;

        self.adapter.update_fields(id, &prepared).await?;
        info!(%kind, %id, "Updated");
        self.catch_up().await;
        Ok(())
    }

    /// Delete a known record. Remaining orders are left as they are.
    pub async fn remove(&self, id: &str) -> CollectionResult<()> {
        let kind = self.kind();
        let _guard = self.writes.lock().await;
        let items = self.current_items().await?;
        if !items.iter().any(|item| item.id == id) {
            warn!(%kind, %id, "Rejected remove of unknown record");
            return Err(CollectionError::not_found(kind.as_str(), id));
        }

        self.adapter.remove(id).await?;
        info!(%kind, %id, "Removed");
        self.catch_up().await;
        Ok(())
    }

    /// Move a record one step and persist the renumbered collection.
    ///
    /// Returns `false` without touching the store when there is nothing to
    /// do: unknown id, first record moved up, last record moved down.
    pub async fn move_entity(&self, id: &str, direction: MoveDirection) -> CollectionResult<bool> {
        let kind = self.kind();
        let _guard = self.writes.lock().await;
        let items = self.current_items().await?;
        match plan_move(&items, id, direction) {
            MovePlan::NoOp => {
                debug!(%kind, %id, %direction, "Move is a no-op");
                Ok(false)
            }
            MovePlan::Reorder(assignments) => {
                self.adapter.batch_update_order(&assignments).await?;
                info!(%kind, %id, %direction, count = assignments.len(), "Reordered");
                self.catch_up().await;
                Ok(true)
            }
        }
    }
}

fn lowercase_trimmed(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Reject `candidate` if another record (not `except_id`) already uses it.
fn ensure_unique<F>(
    kind: EntityKind,
    field: &'static str,
    candidate: &str,
    items: &[OrderedEntity],
    except_id: Option<&str>,
    extract: F,
) -> CollectionResult<()>
where
    F: Fn(&OrderedEntity) -> Option<&str>,
{
    let needle = lowercase_trimmed(candidate);
    let clash = items
        .iter()
        .filter(|item| Some(item.id.as_str()) != except_id)
        .filter_map(|item| extract(item))
        .any(|existing| lowercase_trimmed(existing) == needle);

    if clash {
        return Err(CollectionError::duplicate(kind.as_str(), field, candidate));
    }
    Ok(())
}

/// Resolve the value slug for a new record: an explicit non-empty value wins,
/// otherwise it is derived from the name.
fn resolve_value(name: &str, explicit: Option<&str>) -> CollectionResult<String> {
    let value = match explicit {
        Some(v) if !v.is_empty() => v.trim().to_string(),
        _ => slugify(name),
    };
    if value.is_empty() {
        return Err(CollectionError::validation("value"));
    }
    Ok(value)
}

/// Normalize and validate a new record against the current collection.
pub fn prepare_new(
    kind: EntityKind,
    data: NewEntity,
    items: &[OrderedEntity],
) -> CollectionResult<NewEntity> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err(CollectionError::validation("name"));
    }
    ensure_unique(kind, "name", &name, items, None, |item| Some(item.name.as_str()))?;

    let value = if kind.has_value() {
        let value = resolve_value(&name, data.value.as_deref())?;
        ensure_unique(kind, "value", &value, items, None, |item| item.value.as_deref())?;
        Some(value)
    } else {
        None
    };

    Ok(NewEntity {
        order: Some(data.order.unwrap_or_else(|| next_order(items))),
        description: data.description.filter(|_| kind.has_description()),
        is_completion_status: kind.has_completion_flag() && data.is_completion_status,
        name,
        value,
        color: data.color,
        icon_name: data.icon_name,
    })
}

/// Normalize and validate a patch for record `id`.
///
/// A new name without an explicit value re-derives the value slug.
pub fn prepare_patch(
    kind: EntityKind,
    id: &str,
    patch: EntityPatch,
    items: &[OrderedEntity],
) -> CollectionResult<EntityPatch> {
    if !items.iter().any(|item| item.id == id) {
        return Err(CollectionError::not_found(kind.as_str(), id));
    }

    let name = match patch.name.as_deref().map(str::trim) {
        Some("") => return Err(CollectionError::validation("name")),
        Some(name) => {
            ensure_unique(kind, "name", name, items, Some(id), |item| Some(item.name.as_str()))?;
            Some(name.to_string())
        }
        None => None,
    };

    let value = if kind.has_value() {
        let value = match (patch.value.as_deref().map(str::trim), name.as_deref()) {
            (Some(v), _) if !v.is_empty() => Some(v.to_string()),
            (_, Some(name)) => Some(slugify(name)),
            (Some(_), None) => return Err(CollectionError::validation("value")),
            (None, None) => None,
        };
        if let Some(value) = &value {
            ensure_unique(kind, "value", value, items, Some(id), |item| item.value.as_deref())?;
        }
        value
    } else {
        None
    };

    Ok(EntityPatch {
        name,
        value,
        description: patch.description.filter(|_| kind.has_description()),
        order: patch.order,
        color: patch.color,
        icon_name: patch.icon_name,
        is_completion_status: patch.is_completion_status.filter(|_| kind.has_completion_flag()),
    })
}

/// The three ordered taxonomies over one store.
pub struct Taxonomies<S: DocumentStore> {
    pub categories: OrderedCollection<S>,
    pub priorities: OrderedCollection<S>,
    pub statuses: OrderedCollection<S>,
}

impl<S: DocumentStore> Taxonomies<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            categories: OrderedCollection::new(Arc::clone(&store), EntityKind::Category),
            priorities: OrderedCollection::new(Arc::clone(&store), EntityKind::Priority),
            statuses: OrderedCollection::new(store, EntityKind::Status),
        }
    }

    pub fn get(&self, kind: EntityKind) -> &OrderedCollection<S> {
        match kind {
            EntityKind::Category => &self.categories,
            EntityKind::Priority => &self.priorities,
            EntityKind::Status => &self.statuses,
        }
    }

    /// Wait until all three collections have loaded.
    pub async fn ready(&self) -> CollectionResult<()> {
        for kind in EntityKind::ALL {
            self.get(kind).ready().await?;
        }
        Ok(())
    }
}
