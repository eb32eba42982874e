//! Read-side views over an ordered collection.

use crate::normalizer::{boundary_flags, display_sequence};
use crate::types::OrderedEntity;
use serde::Serialize;
use std::collections::HashMap;

/// A record as shown in a list, with move-button availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedRow {
    #[serde(flatten)]
    pub entity: OrderedEntity,
    pub is_first: bool,
    pub is_last: bool,
}

fn matches_search(entity: &OrderedEntity, needle: &str) -> bool {
    let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(needle));
    hit(Some(&entity.name)) || hit(entity.description.as_deref()) || hit(entity.value.as_deref())
}

/// Rows in display sequence, optionally filtered by a case-insensitive search.
///
/// `is_first` / `is_last` refer to the whole collection, not the filtered
/// rows, so a hidden neighbor still enables the move.
pub fn project(items: &[OrderedEntity], search: Option<&str>) -> Vec<ProjectedRow> {
    let seq = display_sequence(items);
    let len = seq.len();
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    seq.into_iter()
        .enumerate()
        .filter(|(_, entity)| needle.as_deref().is_none_or(|n| matches_search(entity, n)))
        .map(|(index, entity)| {
            let (is_first, is_last) = boundary_flags(index, len);
            ProjectedRow {
                entity: entity.clone(),
                is_first,
                is_last,
            }
        })
        .collect()
}

/// Map each name to its order, for sorting tasks by priority.
pub fn rank_by_name(items: &[OrderedEntity]) -> HashMap<String, u32> {
    items
        .iter()
        .map(|item| (item.name.clone(), item.order))
        .collect()
}
