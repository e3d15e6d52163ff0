//! Project template model.
//!
//! A template is a reusable snapshot of a project's milestones and tasks
//! (with their subtasks). Templates are stored as JSON documents and can be
//! exported and imported as files.

use serde::{Deserialize, Serialize};

use super::item::{check_level, ItemType, LEVEL_RANGE, SEXTANT_RANGE};
use super::{new_id, now_millis};
use crate::error::Result;

/// A subtask inside a template task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSubtask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A task inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s_sextant: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_time: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_effort: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_priority: Option<u8>,
    /// Index into the template's `milestones`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_index: Option<usize>,
    #[serde(default)]
    pub subtasks: Vec<TemplateSubtask>,
}

impl TemplateTask {
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
}

/// A milestone inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMilestone {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Days after project start when the milestone falls due
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_days: Option<i64>,
}

/// A reusable project snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TemplateTask>,
    #[serde(default)]
    pub milestones: Vec<TemplateMilestone>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl ProjectTemplate {
    pub fn new(name: String, created_by: String) -> Self {
        let now = now_millis();
        Self {
            id: new_id("tpl"),
            name,
            description: None,
            category: None,
            tasks: Vec::new(),
            milestones: Vec::new(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total number of items (tasks plus subtasks) applying this template creates.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.tasks.iter().map(|t| 1 + t.subtasks.len()).sum()
    }

    /// Check the STEP fields of every task.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStep` for the first task out of range.
    pub fn validate_step(&self) -> Result<()> {
        self.tasks.iter().try_for_each(TemplateTask::validate_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_count_includes_subtasks() {
        let mut tpl = ProjectTemplate::new("Launch".into(), "ana@acme.io".into());
        tpl.tasks.push(TemplateTask {
            title: "Press kit".into(),
            description: None,
            item_type: ItemType::Task,
            s_sextant: Some(2),
            t_time: None,
            e_effort: None,
            p_priority: Some(3),
            milestone_index: None,
            subtasks: vec![
                TemplateSubtask { title: "Logo".into(), description: None },
                TemplateSubtask { title: "Bios".into(), description: None },
            ],
        });
        assert_eq!(tpl.item_count(), 3);
    }

    #[test]
    fn test_validate_step_rejects_out_of_range_task() {
        let mut tpl = ProjectTemplate::new("Launch".into(), "ana@acme.io".into());
        tpl.tasks.push(serde_json::from_str(r#"{"title":"Ok","s_sextant":6}"#).unwrap());
        assert!(tpl.validate_step().is_ok());

        tpl.tasks.push(serde_json::from_str(r#"{"title":"Bad","p_priority":0}"#).unwrap());
        let err = tpl.validate_step().unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::InvalidStep { field: "priority", value: 0, .. }
        ));
    }

    #[test]
    fn test_task_defaults_when_fields_missing() {
        let task: TemplateTask = serde_json::from_str(r#"{"title":"Kickoff"}"#).unwrap();
        assert_eq!(task.item_type, ItemType::Task);
        assert!(task.subtasks.is_empty());
        assert!(task.p_priority.is_none());
    }
}
