//! Item model for Venturer.
//!
//! Items are the atomic unit of work: a task, a note or an idea. Each item
//! carries the four STEP prioritization fields:
//!
//! | Field        | Range | Meaning                               |
//! |--------------|-------|---------------------------------------|
//! | `s_sextant`  | 1-6   | urgency/importance sextant            |
//! | `t_time`     | 1-3   | duration bucket (short/medium/long)   |
//! | `e_effort`   | 1-3   | energy bucket (low/medium/high)       |
//! | `p_priority` | 1-3   | importance bucket (low/medium/high)   |
//!
//! Any STEP field may be unset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};
use crate::error::{Error, Result};

string_enum! {
    /// Kind of item.
    pub enum ItemType {
        Task => "task",
        Note => "note",
        Idea => "idea",
    }
}

impl Default for ItemType {
    fn default() -> Self {
        Self::Task
    }
}

string_enum! {
    /// Work status of an item.
    pub enum ItemStatus {
        Todo => "todo",
        InProgress => "in_progress",
        Blocked => "blocked",
        Completed => "completed",
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl ItemStatus {
    /// Whether the item still counts toward someone's workload.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Inclusive range of the sextant dimension.
pub const SEXTANT_RANGE: (u8, u8) = (1, 6);

/// Inclusive range of the time, effort and priority dimensions.
pub const LEVEL_RANGE: (u8, u8) = (1, 3);

/// A task, note or idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub status: ItemStatus,
    pub venture_id: Option<String>,
    pub project_id: Option<String>,
    pub milestone_id: Option<String>,
    pub workstream_id: Option<String>,
    /// Parent item for subtasks
    pub parent_id: Option<String>,
    /// Assignee email
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub s_sextant: Option<u8>,
    pub t_time: Option<u8>,
    pub e_effort: Option<u8>,
    pub p_priority: Option<u8>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

impl Item {
    /// Create a new open task with no STEP values.
    pub fn new(title: String, created_by: String) -> Self {
        let now = now_millis();
        Self {
            id: new_id("item"),
            title,
            description: None,
            item_type: ItemType::Task,
            status: ItemStatus::Todo,
            venture_id: None,
            project_id: None,
            milestone_id: None,
            workstream_id: None,
            parent_id: None,
            assigned_to: None,
            due_date: None,
            s_sextant: None,
            t_time: None,
            e_effort: None,
            p_priority: None,
            created_by,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Place the item in a venture and (optionally) a project.
    #[must_use]
    pub fn in_scope(mut self, venture_id: Option<&str>, project_id: Option<&str>) -> Self {
        self.venture_id = venture_id.map(ToString::to_string);
        self.project_id = project_id.map(ToString::to_string);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    #[must_use]
    pub fn assigned(mut self, email: &str) -> Self {
        self.assigned_to = Some(email.to_string());
        self
    }

    /// Set all four STEP fields at once.
    #[must_use]
    pub fn with_step(
        mut self,
        sextant: Option<u8>,
        time: Option<u8>,
        effort: Option<u8>,
        priority: Option<u8>,
    ) -> Self {
        self.s_sextant = sextant;
        self.t_time = time;
        self.e_effort = effort;
        self.p_priority = priority;
        self
    }

    /// Check every STEP field is inside its range.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStep` naming the first offending field.
    pub fn validate_step(&self) -> Result<()> {
        check_level("sextant", self.s_sextant, SEXTANT_RANGE)?;
        check_level("time", self.t_time, LEVEL_RANGE)?;
        check_level("effort", self.e_effort, LEVEL_RANGE)?;
        check_level("priority", self.p_priority, LEVEL_RANGE)
    }

    /// Whether this item is a task that is not yet completed.
    #[must_use]
    pub fn is_open_task(&self) -> bool {
        self.item_type == ItemType::Task && self.status.is_open()
    }

    /// Whether the item is past due relative to `today`.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date.is_some_and(|d| d < today)
    }
}

/// Check a single optional STEP level against an inclusive range.
///
/// # Errors
///
/// Returns `Error::InvalidStep` when the value lies outside the range.
pub fn check_level(field: &'static str, value: Option<u8>, range: (u8, u8)) -> Result<()> {
    match value {
        Some(v) if v < range.0 || v > range.1 => Err(Error::InvalidStep {
            field,
            value: i64::from(v),
            expected: if range == SEXTANT_RANGE { "1-6" } else { "1-3" },
        }),
        _ => Ok(()),
    }
}

/// Partial update for an item. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub item_type: Option<ItemType>,
    pub status: Option<ItemStatus>,
    pub venture_id: Option<String>,
    pub project_id: Option<String>,
    pub milestone_id: Option<String>,
    pub workstream_id: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub s_sextant: Option<u8>,
    pub t_time: Option<u8>,
    pub e_effort: Option<u8>,
    pub p_priority: Option<u8>,
}

impl ItemUpdate {
    /// True when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check the STEP fields present in this update.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStep` for the first out-of-range field.
    pub fn validate_step(&self) -> Result<()> {
        check_level("sextant", self.s_sextant, SEXTANT_RANGE)?;
        check_level("time", self.t_time, LEVEL_RANGE)?;
        check_level("effort", self.e_effort, LEVEL_RANGE)?;
        check_level("priority", self.p_priority, LEVEL_RANGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_defaults() {
        let item = Item::new("Write brief".into(), "ana@acme.io".into());
        assert!(item.id.starts_with("item_"));
        assert_eq!(item.item_type, ItemType::Task);
        assert_eq!(item.status, ItemStatus::Todo);
        assert!(item.s_sextant.is_none());
        assert!(item.is_open_task());
    }

    #[test]
    fn test_enum_from_str_and_display() {
        let status: ItemStatus = "in_progress".parse().unwrap();
        assert_eq!(status, ItemStatus::InProgress);
        assert_eq!(status.to_string(), "in_progress");
        assert_eq!("idea".parse::<ItemType>().unwrap(), ItemType::Idea);

        let err = "doing".parse::<ItemStatus>().unwrap_err();
        assert_eq!(err, "Unknown ItemStatus: doing");
    }

    #[test]
    fn test_validate_step_ranges() {
        let ok = Item::new("a".into(), "u".into()).with_step(Some(6), Some(1), Some(3), Some(2));
        assert!(ok.validate_step().is_ok());

        let bad = Item::new("a".into(), "u".into()).with_step(Some(7), None, None, None);
        assert!(matches!(
            bad.validate_step(),
            Err(Error::InvalidStep { field: "sextant", value: 7, .. })
        ));

        let bad = Item::new("a".into(), "u".into()).with_step(None, None, Some(0), None);
        assert!(matches!(
            bad.validate_step(),
            Err(Error::InvalidStep { field: "effort", .. })
        ));
    }

    #[test]
    fn test_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut item = Item::new("a".into(), "u".into());
        item.due_date = NaiveDate::from_ymd_opt(2026, 3, 9);
        assert!(item.is_overdue(today));

        item.status = ItemStatus::Completed;
        assert!(!item.is_overdue(today));
    }

    #[test]
    fn test_item_serializes_type_field() {
        let item = Item::new("a".into(), "u".into()).with_type(ItemType::Idea);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "idea");
        assert_eq!(json["status"], "todo");
    }
}
