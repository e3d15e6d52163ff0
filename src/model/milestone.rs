//! Milestone and workstream models.
//!
//! Both subdivide a project: milestones along time, workstreams along
//! areas of responsibility.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};

string_enum! {
    pub enum MilestoneStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

impl Default for MilestoneStatus {
    fn default() -> Self {
        Self::Pending
    }
}

string_enum! {
    pub enum WorkstreamStatus {
        Active => "active",
        Paused => "paused",
        Completed => "completed",
    }
}

impl Default for WorkstreamStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A dated checkpoint within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: MilestoneStatus,
    /// Ordering within the project (0-based)
    #[serde(default)]
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Milestone {
    pub fn new(project_id: String, title: String) -> Self {
        let now = now_millis();
        Self {
            id: new_id("ms"),
            project_id,
            title,
            description: None,
            due_date: None,
            status: MilestoneStatus::Pending,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_due_date(mut self, due: Option<NaiveDate>) -> Self {
        self.due_date = due;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: i64) -> Self {
        self.position = position;
        self
    }
}

/// A parallel stream of work within a project, optionally led by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workstream {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Email of the lead
    pub lead: Option<String>,
    #[serde(default)]
    pub status: WorkstreamStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Workstream {
    pub fn new(project_id: String, name: String) -> Self {
        let now = now_millis();
        Self {
            id: new_id("ws"),
            project_id,
            name,
            description: None,
            lead: None,
            status: WorkstreamStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a milestone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<MilestoneStatus>,
    pub position: Option<i64>,
}

/// Partial update for a workstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkstreamUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub lead: Option<String>,
    pub status: Option<WorkstreamStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_milestone_defaults() {
        let ms = Milestone::new("proj_1".into(), "Beta".into()).with_position(2);
        assert!(ms.id.starts_with("ms_"));
        assert_eq!(ms.status, MilestoneStatus::Pending);
        assert_eq!(ms.position, 2);
    }

    #[test]
    fn test_new_workstream_defaults() {
        let ws = Workstream::new("proj_1".into(), "Marketing".into());
        assert!(ws.id.starts_with("ws_"));
        assert_eq!(ws.status, WorkstreamStatus::Active);
        assert!(ws.lead.is_none());
    }
}
