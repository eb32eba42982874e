//! Default taxonomies for a fresh store.

use crate::error::CollectionResult;
use crate::manager::{OrderedCollection, Taxonomies};
use crate::store::DocumentStore;
use crate::types::{EntityKind, NewEntity};
use serde::Serialize;
use tracing::info;

/// Defaults for one kind, in display order.
pub fn defaults_for(kind: EntityKind) -> Vec<NewEntity> {
    match kind {
        EntityKind::Category => Vec::new(),
        EntityKind::Priority => ["Low", "Medium", "High"]
            .into_iter()
            .map(NewEntity::named)
            .collect(),
        EntityKind::Status => vec![
            NewEntity::named("To Do"),
            NewEntity::named("In Progress"),
            NewEntity::named("Done").completion(),
        ],
    }
}

/// Records added per kind by a seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub categories: usize,
    pub priorities: usize,
    pub statuses: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.categories + self.priorities + self.statuses
    }
}

async fn seed_collection<S: DocumentStore>(collection: &OrderedCollection<S>) -> CollectionResult<usize> {
    let state = collection.ready().await?;
    if !state.items.is_empty() {
        return Ok(0);
    }

    let mut added = 0;
    for (order, data) in (0u32..).zip(defaults_for(collection.kind())) {
        collection.add(data.with_order(order)).await?;
        added += 1;
    }
    if added > 0 {
        info!(kind = %collection.kind(), added, "Seeded defaults");
    }
    Ok(added)
}

/// Fill empty collections with the defaults. Non-empty collections are left alone.
pub async fn seed_defaults<S: DocumentStore>(taxonomies: &Taxonomies<S>) -> CollectionResult<SeedReport> {
    Ok(SeedReport {
        categories: seed_collection(&taxonomies.categories).await?,
        priorities: seed_collection(&taxonomies.priorities).await?,
        statuses: seed_collection(&taxonomies.statuses).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(defaults_for(EntityKind::Category).is_empty());

        let priorities: Vec<_> = defaults_for(EntityKind::Priority)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(priorities, vec!["Low", "Medium", "High"]);

        let statuses = defaults_for(EntityKind::Status);
        let done: Vec<_> = statuses.iter().filter(|s| s.is_completion_status).collect();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].name, "Done");
    }
}
