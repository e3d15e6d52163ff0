//! Team and team membership models.

use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};

string_enum! {
    /// Role of a member within a team.
    pub enum TeamRole {
        Lead => "lead",
        Member => "member",
        Viewer => "viewer",
    }
}

impl Default for TeamRole {
    fn default() -> Self {
        Self::Member
    }
}

impl TeamRole {
    /// Whether members with this role can be assigned work.
    #[must_use]
    pub const fn takes_assignments(&self) -> bool {
        !matches!(self, Self::Viewer)
    }
}

/// A group of users collaborating on ventures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Email of the owning user
    pub owner: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Team {
    pub fn new(name: String, owner: String) -> Self {
        let now = now_millis();
        Self {
            id: new_id("team"),
            name,
            description: None,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Membership of one user in one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub team_id: String,
    pub user_email: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: TeamRole,
    pub joined_at: i64,
}

impl TeamMember {
    pub fn new(team_id: &str, user_email: &str, role: TeamRole) -> Self {
        Self {
            id: new_id("tm"),
            team_id: team_id.to_string(),
            user_email: user_email.to_string(),
            display_name: None,
            role,
            joined_at: now_millis(),
        }
    }

    /// Name to show in listings: display name, else the email.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_label_falls_back_to_email() {
        let mut member = TeamMember::new("team_1", "bo@acme.io", TeamRole::Member);
        assert_eq!(member.label(), "bo@acme.io");
        member.display_name = Some("Bo".into());
        assert_eq!(member.label(), "Bo");
    }

    #[test]
    fn test_viewer_takes_no_assignments() {
        assert!(TeamRole::Lead.takes_assignments());
        assert!(!TeamRole::Viewer.takes_assignments());
    }
}
