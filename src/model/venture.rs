//! Venture model for Venturer.
//!
//! Ventures are the top-level container, analogous to a business unit or
//! initiative. Projects, items and teams hang off a venture.

use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};

string_enum! {
    /// Venture lifecycle status.
    pub enum VentureStatus {
        Active => "active",
        Paused => "paused",
        Archived => "archived",
    }
}

impl Default for VentureStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A venture in Venturer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venture {
    /// Unique identifier (`ven_` prefix)
    pub id: String,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Current status
    #[serde(default)]
    pub status: VentureStatus,

    /// Email of the owning user (tenant boundary)
    pub owner: String,

    /// Team collaborating on this venture
    pub team_id: Option<String>,

    /// Display color (hex)
    pub color: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Venture {
    /// Create a new venture with default values.
    pub fn new(name: String, owner: String) -> Self {
        let now = now_millis();
        Self {
            id: new_id("ven"),
            name,
            description: None,
            status: VentureStatus::Active,
            owner,
            team_id: None,
            color: None,
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

    /// Attach a team.
    #[must_use]
    pub fn with_team(mut self, team_id: &str) -> Self {
        self.team_id = Some(team_id.to_string());
        self
    }
}

/// Partial update for a venture. Only `Some` fields are written; an empty
/// string clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VentureUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<VentureStatus>,
    pub team_id: Option<String>,
    pub color: Option<String>,
}
