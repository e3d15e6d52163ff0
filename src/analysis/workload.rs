//! Per-member workload summary sent along with a task for analysis.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Item, ItemStatus, ItemType};
use crate::storage::{ItemQuery, SqliteStorage};

/// Workload of one candidate assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberWorkload {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub active_tasks: usize,
    /// Percent of assigned tasks completed, 0 when none are assigned
    #[serde(default)]
    pub completion_rate: f64,
}

impl TeamMemberWorkload {
    /// Summarize the tasks in `items` assigned to `email`.
    #[must_use]
    pub fn from_items(email: &str, name: Option<&str>, items: &[Item]) -> Self {
        let assigned: Vec<&Item> = items
            .iter()
            .filter(|i| i.item_type == ItemType::Task && i.assigned_to.as_deref() == Some(email))
            .collect();
        let completed = assigned
            .iter()
            .filter(|i| i.status == ItemStatus::Completed)
            .count();

        #[allow(clippy::cast_precision_loss)]
        let completion_rate = if assigned.is_empty() {
            0.0
        } else {
            (completed as f64 / assigned.len() as f64 * 100.0).round()
        };

        Self {
            email: email.to_string(),
            name: name.map(ToString::to_string),
            active_tasks: assigned.len() - completed,
            completion_rate,
        }
    }
}

/// Workloads of everyone who could take `item`.
///
/// Candidates are the members of the item's venture team (viewers excluded)
/// or, when the venture has no team, every user with an assignment.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn candidates_for(storage: &SqliteStorage, item: &Item) -> Result<Vec<TeamMemberWorkload>> {
    let team_id = match item.venture_id.as_deref() {
        Some(vid) => storage.get_venture(vid)?.and_then(|v| v.team_id),
        None => None,
    };

    let people: Vec<(String, Option<String>)> = match team_id {
        Some(tid) => storage
            .list_team_members(&tid)?
            .into_iter()
            .filter(|m| m.role.takes_assignments())
            .map(|m| (m.user_email, m.display_name))
            .collect(),
        None => {
            let all = storage.list_items(&ItemQuery::default())?;
            all.iter()
                .filter_map(|i| i.assigned_to.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|email| (email, None))
                .collect()
        }
    };

    let mut workloads = Vec::with_capacity(people.len());
    for (email, name) in people {
        let items = storage.list_items(&ItemQuery::assignee(&email))?;
        workloads.push(TeamMemberWorkload::from_items(&email, name.as_deref(), &items));
    }
    Ok(workloads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Team, TeamMember, TeamRole, Venture};

    const ANA: &str = "ana@acme.io";

    #[test]
    fn test_from_items() {
        let mut done = Item::new("a".into(), ANA.into()).assigned(ANA);
        done.status = ItemStatus::Completed;
        let open = Item::new("b".into(), ANA.into()).assigned(ANA);
        let idea = Item::new("c".into(), ANA.into())
            .assigned(ANA)
            .with_type(ItemType::Idea);
        let other = Item::new("d".into(), ANA.into()).assigned("bo@acme.io");

        let w = TeamMemberWorkload::from_items(ANA, Some("Ana"), &[done, open, idea, other]);
        assert_eq!(w.active_tasks, 1);
        assert!((w.completion_rate - 50.0).abs() < f64::EPSILON);

        let empty = TeamMemberWorkload::from_items("cy@acme.io", None, &[]);
        assert_eq!(empty.active_tasks, 0);
        assert!(empty.completion_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_serializes_camel_case() {
        let w = TeamMemberWorkload::from_items(ANA, None, &[]);
        let json = serde_json::to_value(&w).unwrap();
        assert!(json.get("activeTasks").is_some());
        assert!(json.get("completionRate").is_some());
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_candidates_prefer_venture_team() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let team = Team::new("Core".into(), ANA.into());
        storage.create_team(&team, ANA).unwrap();
        storage
            .add_team_member(&TeamMember::new(&team.id, "vi@acme.io", TeamRole::Viewer), ANA)
            .unwrap();

        let venture = Venture::new("Acme".into(), ANA.into()).with_team(&team.id);
        storage.create_venture(&venture, ANA).unwrap();

        let outsider = Item::new("x".into(), ANA.into()).assigned("zed@else.io");
        storage.create_item(&outsider, ANA).unwrap();

        let item = Item::new("y".into(), ANA.into()).in_scope(Some(&venture.id), None);
        storage.create_item(&item, ANA).unwrap();

        let found = candidates_for(&storage, &item).unwrap();
        let emails: Vec<&str> = found.iter().map(|w| w.email.as_str()).collect();
        assert_eq!(emails, vec![ANA]);

        let loose = Item::new("z".into(), ANA.into());
        let found = candidates_for(&storage, &loose).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email, "zed@else.io");
        assert_eq!(found[0].active_tasks, 1);
    }
}
