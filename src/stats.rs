//! Task statistics over status and priority names.

use crate::normalizer::display_sequence;
use crate::types::OrderedEntity;
use serde::Serialize;

/// How many tasks reference one taxonomy record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyCount {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub by_status: Vec<TaxonomyCount>,
}

/// Count tasks per record, matching on exact name.
///
/// Records come out in display order; records no task references are
/// omitted, as are task names with no matching record.
pub fn count_by_name<'a, I>(items: &[OrderedEntity], task_names: I) -> Vec<TaxonomyCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = task_names.into_iter().collect();
    display_sequence(items)
        .into_iter()
        .map(|item| TaxonomyCount {
            id: item.id.clone(),
            name: item.name.clone(),
            color: item.color.clone(),
            count: names.iter().filter(|n| **n == item.name).count(),
        })
        .filter(|c| c.count > 0)
        .collect()
}

/// Summarize tasks by their status names.
///
/// A task is completed when the first status carrying its name is flagged as
/// a completion status. Unknown names count as active.
pub fn completion_summary<'a, I>(statuses: &[OrderedEntity], task_statuses: I) -> CompletionSummary
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = task_statuses.into_iter().collect();
    let is_completed = |name: &str| {
        statuses
            .iter()
            .find(|status| status.name == name)
            .is_some_and(|status| status.is_completion_status)
    };

    let total = names.len();
    let completed = names.iter().filter(|name| is_completed(name)).count();

    CompletionSummary {
        total,
        completed,
        active: total - completed,
        by_status: count_by_name(statuses, names),
    }
}

/// Tasks per priority, in priority order. Zero counts are omitted.
pub fn priority_breakdown<'a, I>(priorities: &[OrderedEntity], task_priorities: I) -> Vec<TaxonomyCount>
where
    I: IntoIterator<Item = &'a str>,
{
    count_by_name(priorities, task_priorities)
}

/// Everything the `stats` command reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    #[serde(flatten)]
    pub completion: CompletionSummary,
    pub by_priority: Vec<TaxonomyCount>,
}

impl TaskStats {
    pub fn collect<'a, S, P>(
        statuses: &[OrderedEntity],
        priorities: &[OrderedEntity],
        task_statuses: S,
        task_priorities: P,
    ) -> Self
    where
        S: IntoIterator<Item = &'a str>,
        P: IntoIterator<Item = &'a str>,
    {
        Self {
            completion: completion_summary(statuses, task_statuses),
            by_priority: priority_breakdown(priorities, task_priorities),
        }
    }
}
