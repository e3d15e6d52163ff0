//! Project model for Venturer.
//!
//! Projects belong to a venture and group milestones, workstreams and items.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};

string_enum! {
    /// Project status values.
    pub enum ProjectStatus {
        Planning => "planning",
        Active => "active",
        OnHold => "on_hold",
        Completed => "completed",
        Archived => "archived",
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Planning
    }
}

/// A project in Venturer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (`proj_` prefix)
    pub id: String,

    /// Venture this project belongs to
    pub venture_id: String,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Current status
    #[serde(default)]
    pub status: ProjectStatus,

    /// Planned start
    pub start_date: Option<NaiveDate>,

    /// Target completion
    pub target_date: Option<NaiveDate>,

    /// Email of the creating user
    pub created_by: String,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Project {
    /// Create a new project with default values.
    pub fn new(venture_id: String, name: String, created_by: String) -> Self {
        let now = now_millis();
        Self {
            id: new_id("proj"),
            venture_id,
            name,
            description: None,
            status: ProjectStatus::Planning,
            start_date: None,
            target_date: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set the planned date range.
    #[must_use]
    pub fn with_dates(mut self, start: Option<NaiveDate>, target: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.target_date = target;
        self
    }
}

/// Partial update for a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project() {
        let project = Project::new(
            "ven_123".to_string(),
            "Website relaunch".to_string(),
            "ana@acme.io".to_string(),
        );

        assert!(project.id.starts_with("proj_"));
        assert_eq!(project.venture_id, "ven_123");
        assert_eq!(project.status, ProjectStatus::Planning);
        assert!(project.start_date.is_none());
    }

    #[test]
    fn test_project_status_round_trip() {
        for status in ProjectStatus::ALL {
            assert_eq!(status.as_str().parse::<ProjectStatus>().unwrap(), *status);
        }
        assert_eq!(ProjectStatus::OnHold.to_string(), "on_hold");
    }
}
