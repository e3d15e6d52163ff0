//! Team capacity estimate.
//!
//! Each open task assigned to a member costs `effort * 5 + time * 3` hours,
//! with unset levels counted as 1. Utilization is the total against a fixed
//! 40-hour week, capped at 100%.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Item, TeamMember};
use crate::storage::{ItemQuery, SqliteStorage};

/// Hours in one working week.
pub const WEEKLY_CAPACITY_HOURS: f64 = 40.0;

const HOURS_PER_EFFORT_LEVEL: u32 = 5;
const HOURS_PER_TIME_LEVEL: u32 = 3;

/// Load band derived from utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Available,
    Busy,
    Overloaded,
}

impl LoadStatus {
    #[must_use]
    pub fn from_utilization(pct: f64) -> Self {
        if pct > 90.0 {
            Self::Overloaded
        } else if pct > 70.0 {
            Self::Busy
        } else {
            Self::Available
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Overloaded => "overloaded",
        }
    }
}

/// Capacity of one team member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberCapacity {
    pub email: String,
    pub name: Option<String>,
    pub active_tasks: usize,
    pub estimated_hours: u32,
    /// Percent of the weekly capacity, 0-100
    pub utilization: f64,
    pub status: LoadStatus,
}

/// Estimated hours for one task.
#[must_use]
pub fn task_hours(item: &Item) -> u32 {
    u32::from(item.e_effort.unwrap_or(1)) * HOURS_PER_EFFORT_LEVEL
        + u32::from(item.t_time.unwrap_or(1)) * HOURS_PER_TIME_LEVEL
}

/// Capacity of `email` given the items assigned to them.
///
/// Only open tasks count; notes, ideas and completed work are ignored.
#[must_use]
pub fn member_capacity(email: &str, name: Option<&str>, items: &[Item]) -> MemberCapacity {
    let open: Vec<&Item> = items
        .iter()
        .filter(|i| i.assigned_to.as_deref() == Some(email) && i.is_open_task())
        .collect();

    let hours: u32 = open.iter().map(|i| task_hours(i)).sum();
    let utilization = (f64::from(hours) / WEEKLY_CAPACITY_HOURS * 100.0).min(100.0);

    MemberCapacity {
        email: email.to_string(),
        name: name.map(ToString::to_string),
        active_tasks: open.len(),
        estimated_hours: hours,
        utilization,
        status: LoadStatus::from_utilization(utilization),
    }
}

/// Capacity of every member of a team who can take assignments.
///
/// # Errors
///
/// Returns an error if the team doesn't exist or a query fails.
pub fn team_capacity(storage: &SqliteStorage, team_id: &str) -> Result<Vec<MemberCapacity>> {
    if storage.get_team(team_id)?.is_none() {
        return Err(Error::not_found("Team", team_id));
    }

    let members: Vec<TeamMember> = storage
        .list_team_members(team_id)?
        .into_iter()
        .filter(|m| m.role.takes_assignments())
        .collect();

    let mut result = Vec::with_capacity(members.len());
    for member in &members {
        let items = storage.list_items(&ItemQuery::assignee(&member.user_email))?;
        result.push(member_capacity(
            &member.user_email,
            member.display_name.as_deref(),
            &items,
        ));
    }

    tracing::debug!(team_id, members = result.len(), "computed team capacity");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemStatus, ItemType, Team, TeamRole};

    fn assigned(email: &str, effort: Option<u8>, time: Option<u8>) -> Item {
        Item::new("t".into(), "u".into())
            .assigned(email)
            .with_step(None, time, effort, None)
    }

    #[test]
    fn test_task_hours() {
        assert_eq!(task_hours(&assigned("a", Some(2), Some(3))), 19);
        assert_eq!(task_hours(&assigned("a", None, None)), 8);
    }

    #[test]
    fn test_zero_tasks_is_available() {
        let cap = member_capacity("bo@acme.io", None, &[]);
        assert_eq!(cap.active_tasks, 0);
        assert!(cap.utilization.abs() < f64::EPSILON);
        assert_eq!(cap.status, LoadStatus::Available);
    }

    #[test]
    fn test_only_open_tasks_of_member_count() {
        let mut done = assigned("bo@acme.io", Some(3), Some(3));
        done.status = ItemStatus::Completed;
        let note = assigned("bo@acme.io", Some(3), Some(3)).with_type(ItemType::Note);
        let other = assigned("cy@acme.io", Some(3), Some(3));
        let open = assigned("bo@acme.io", Some(2), Some(3));

        let cap = member_capacity("bo@acme.io", Some("Bo"), &[done, note, other, open]);
        assert_eq!(cap.active_tasks, 1);
        assert_eq!(cap.estimated_hours, 19);
        assert_eq!(cap.status, LoadStatus::Available);
    }

    #[test]
    fn test_bands_and_cap() {
        // 2 tasks * 19h = 38h => 95%
        let items = vec![
            assigned("bo@acme.io", Some(2), Some(3)),
            assigned("bo@acme.io", Some(2), Some(3)),
        ];
        let cap = member_capacity("bo@acme.io", None, &items);
        assert_eq!(cap.status, LoadStatus::Overloaded);

        // 24h => 60%, 32h => 80%
        let items: Vec<Item> = (0..3).map(|_| assigned("bo@acme.io", None, None)).collect();
        assert_eq!(member_capacity("bo@acme.io", None, &items).status, LoadStatus::Available);
        let items: Vec<Item> = (0..4).map(|_| assigned("bo@acme.io", None, None)).collect();
        assert_eq!(member_capacity("bo@acme.io", None, &items).status, LoadStatus::Busy);

        let items: Vec<Item> = (0..10).map(|_| assigned("bo@acme.io", Some(3), Some(3))).collect();
        let cap = member_capacity("bo@acme.io", None, &items);
        assert!((cap.utilization - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_team_capacity_skips_viewers() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let team = Team::new("Core".into(), "ana@acme.io".into());
        storage.create_team(&team, "ana@acme.io").unwrap();
        storage
            .add_team_member(&TeamMember::new(&team.id, "vi@acme.io", TeamRole::Viewer), "ana@acme.io")
            .unwrap();

        let item = assigned("ana@acme.io", Some(1), Some(1));
        storage.create_item(&item, "ana@acme.io").unwrap();

        let caps = team_capacity(&storage, &team.id).unwrap();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].email, "ana@acme.io");
        assert_eq!(caps[0].estimated_hours, 8);

        assert!(team_capacity(&storage, "team_missing").is_err());
    }
}
