//! STEP filtering and ordering over in-memory items.
//!
//! Every set criterion must hold (AND across dimensions). Within one STEP
//! dimension the listed values are alternatives (OR). An item whose STEP
//! field is unset never matches a non-empty list for that dimension.

use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};

use crate::model::{Item, ItemStatus, ItemType};

/// Filter criteria. The default filter matches every item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFilter {
    pub venture_id: Option<String>,
    pub project_id: Option<String>,
    pub item_type: Option<ItemType>,
    #[serde(default)]
    pub s_sextant: Vec<u8>,
    #[serde(default)]
    pub t_time: Vec<u8>,
    #[serde(default)]
    pub e_effort: Vec<u8>,
    #[serde(default)]
    pub p_priority: Vec<u8>,
    pub status: Option<ItemStatus>,
    pub assigned_to: Option<String>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
}

impl StepFilter {
    /// Whether `item` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        eq_if_set(self.venture_id.as_deref(), item.venture_id.as_deref())
            && eq_if_set(self.project_id.as_deref(), item.project_id.as_deref())
            && self.item_type.is_none_or(|t| t == item.item_type)
            && in_set(&self.s_sextant, item.s_sextant)
            && in_set(&self.t_time, item.t_time)
            && in_set(&self.e_effort, item.e_effort)
            && in_set(&self.p_priority, item.p_priority)
            && self.status.is_none_or(|s| s == item.status)
            && eq_if_set(self.assigned_to.as_deref(), item.assigned_to.as_deref())
            && self.matches_search(item)
    }

    fn matches_search(&self, item: &Item) -> bool {
        let Some(needle) = self.search.as_deref().filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        item.title.to_lowercase().contains(&needle)
            || item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    /// Keep the matching items, preserving input order.
    #[must_use]
    pub fn apply(&self, items: impl IntoIterator<Item = Item>) -> Vec<Item> {
        items.into_iter().filter(|i| self.matches(i)).collect()
    }

    /// True when no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn eq_if_set(wanted: Option<&str>, actual: Option<&str>) -> bool {
    wanted.is_none_or(|w| actual == Some(w))
}

fn in_set(values: &[u8], field: Option<u8>) -> bool {
    values.is_empty() || field.is_some_and(|v| values.contains(&v))
}

/// Order items for a work list: priority high→low, then sextant 1→6, then
/// oldest first. Unset priority or sextant sorts after any set value.
pub fn sort_by_step(items: &mut [Item]) {
    items.sort_by(compare_step);
}

fn compare_step(a: &Item, b: &Item) -> Ordering {
    // Some(Reverse(p)) < None puts high priorities first and unset last.
    let priority = |i: &Item| (i.p_priority.is_none(), i.p_priority.map(Reverse));
    let sextant = |i: &Item| (i.s_sextant.is_none(), i.s_sextant);

    priority(a)
        .cmp(&priority(b))
        .then_with(|| sextant(a).cmp(&sextant(b)))
        .then_with(|| a.created_at.cmp(&b.created_at))
}
