//! Move planning for ordered collections.
//!
//! Everything here is pure: given the current records and a move request it
//! computes the order assignment to persist, or reports that nothing should
//! be written. A planned move always renumbers the whole collection to
//! `0..n-1`, so gaps left by deletions or ad-hoc orders at creation time are
//! repaired by the next move.

use crate::types::{MoveDirection, OrderAssignment, OrderedEntity};

/// Outcome of planning a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePlan {
    /// Unknown id, boundary move, or a collection too small to reorder.
    NoOp,
    /// New order for every record of the collection.
    Reorder(Vec<OrderAssignment>),
}

impl MovePlan {
    pub fn is_noop(&self) -> bool {
        matches!(self, MovePlan::NoOp)
    }
}

/// Records in display sequence: by `order`, ties broken by `id`.
pub fn display_sequence(items: &[OrderedEntity]) -> Vec<&OrderedEntity> {
    let mut seq: Vec<&OrderedEntity> = items.iter().collect();
    seq.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    seq
}

/// Dense `0..n-1` assignment following the given sequence.
pub fn renumber(seq: &[&OrderedEntity]) -> Vec<OrderAssignment> {
    seq.iter()
        .enumerate()
        .map(|(index, item)| OrderAssignment::new(item.id.clone(), index as u32))
        .collect()
}

/// Order for a record appended at the end: `max + 1`, or `0` when empty.
pub fn next_order(items: &[OrderedEntity]) -> u32 {
    items
        .iter()
        .map(|item| item.order)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Plan moving `id` one step in `direction`.
///
/// The neighbor is the adjacent record in display sequence. With distinct
/// orders that is the record holding the greatest smaller (`Up`) or least
/// greater (`Down`) order, and swapping positions is the same as swapping the
/// two order values and re-sorting.
pub fn plan_move(items: &[OrderedEntity], id: &str, direction: MoveDirection) -> MovePlan {
    let mut seq = display_sequence(items);

    let Some(current) = seq.iter().position(|item| item.id == id) else {
        return MovePlan::NoOp;
    };

    let neighbor = match direction {
        MoveDirection::Up => current.checked_sub(1),
        MoveDirection::Down => Some(current + 1).filter(|&n| n < seq.len()),
    };
    let Some(neighbor) = neighbor else {
        return MovePlan::NoOp;
    };

    seq.swap(current, neighbor);
    MovePlan::Reorder(renumber(&seq))
}

/// `(is_first, is_last)` for the record at `index` of a display sequence of
/// `len` records.
///
/// Agrees with [`plan_move`]: a move is a no-op exactly when the matching
/// flag is set.
pub fn boundary_flags(index: usize, len: usize) -> (bool, bool) {
    (index == 0, index + 1 >= len)
}
