//! Audit event storage and retrieval.
//!
//! Every mutation writes one or more events so `vt history` can show who
//! changed what.

use rusqlite::{Connection, Result};
use serde::Serialize;

/// Event types for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Hierarchy events
    VentureCreated,
    VentureUpdated,
    VentureDeleted,
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,
    MilestoneCreated,
    MilestoneUpdated,
    MilestoneDeleted,
    WorkstreamCreated,
    WorkstreamUpdated,
    WorkstreamDeleted,

    // Item events
    ItemCreated,
    ItemUpdated,
    ItemCompleted,
    ItemAssigned,
    ItemDeleted,

    // Association events
    AssociationCreated,
    AssociationDeleted,

    // Team events
    TeamCreated,
    TeamDeleted,
    MemberAdded,
    MemberUpdated,
    MemberRemoved,

    // Template events
    TemplateCreated,
    TemplateApplied,
    TemplateDeleted,

    // Account events
    UserCreated,
    UserInvited,
    UserUpdated,
    SessionIssued,
    PlanChanged,
}

impl EventType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VentureCreated => "venture_created",
            Self::VentureUpdated => "venture_updated",
            Self::VentureDeleted => "venture_deleted",
            Self::ProjectCreated => "project_created",
            Self::ProjectUpdated => "project_updated",
            Self::ProjectDeleted => "project_deleted",
            Self::MilestoneCreated => "milestone_created",
            Self::MilestoneUpdated => "milestone_updated",
            Self::MilestoneDeleted => "milestone_deleted",
            Self::WorkstreamCreated => "workstream_created",
            Self::WorkstreamUpdated => "workstream_updated",
            Self::WorkstreamDeleted => "workstream_deleted",
            Self::ItemCreated => "item_created",
            Self::ItemUpdated => "item_updated",
            Self::ItemCompleted => "item_completed",
            Self::ItemAssigned => "item_assigned",
            Self::ItemDeleted => "item_deleted",
            Self::AssociationCreated => "association_created",
            Self::AssociationDeleted => "association_deleted",
            Self::TeamCreated => "team_created",
            Self::TeamDeleted => "team_deleted",
            Self::MemberAdded => "member_added",
            Self::MemberUpdated => "member_updated",
            Self::MemberRemoved => "member_removed",
            Self::TemplateCreated => "template_created",
            Self::TemplateApplied => "template_applied",
            Self::TemplateDeleted => "template_deleted",
            Self::UserCreated => "user_created",
            Self::UserInvited => "user_invited",
            Self::UserUpdated => "user_updated",
            Self::SessionIssued => "session_issued",
            Self::PlanChanged => "plan_changed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        const ALL: &[EventType] = &[
            EventType::VentureCreated,
            EventType::VentureUpdated,
            EventType::VentureDeleted,
            EventType::ProjectCreated,
            EventType::ProjectUpdated,
            EventType::ProjectDeleted,
            EventType::MilestoneCreated,
            EventType::MilestoneUpdated,
            EventType::MilestoneDeleted,
            EventType::WorkstreamCreated,
            EventType::WorkstreamUpdated,
            EventType::WorkstreamDeleted,
            EventType::ItemCreated,
            EventType::ItemUpdated,
            EventType::ItemCompleted,
            EventType::ItemAssigned,
            EventType::ItemDeleted,
            EventType::AssociationCreated,
            EventType::AssociationDeleted,
            EventType::TeamCreated,
            EventType::TeamDeleted,
            EventType::MemberAdded,
            EventType::MemberUpdated,
            EventType::MemberRemoved,
            EventType::TemplateCreated,
            EventType::TemplateApplied,
            EventType::TemplateDeleted,
            EventType::UserCreated,
            EventType::UserInvited,
            EventType::UserUpdated,
            EventType::SessionIssued,
            EventType::PlanChanged,
        ];
        ALL.iter().copied().find(|e| e.as_str() == s)
    }
}

/// An audit event record.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub event_type: EventType,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: i64,
}

impl Event {
    /// Create a new event (id will be assigned by database).
    #[must_use]
    pub fn new(entity_type: &str, entity_id: &str, event_type: EventType, actor: &str) -> Self {
        Self {
            id: 0,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event_type,
            actor: actor.to_string(),
            old_value: None,
            new_value: None,
            comment: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Add old/new values for field change tracking.
    #[must_use]
    pub fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// Insert an event into the database.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(conn: &Connection, event: &Event) -> Result<i64> {
    conn.execute(
        "INSERT INTO events (entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            event.entity_type,
            event.entity_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get events for an entity, newest first.
///
/// Rows with an event type this build does not know are skipped.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_events(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
    limit: Option<u32>,
) -> Result<Vec<Event>> {
    let limit = limit.unwrap_or(100);
    let mut stmt = conn.prepare(
        "SELECT id, entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3",
    )?;

    let rows = stmt.query_map(rusqlite::params![entity_type, entity_id, limit], |row| {
        let raw: String = row.get(3)?;
        Ok(EventType::parse(&raw).map(|event_type| Event {
            id: row.get(0).unwrap_or_default(),
            entity_type: row.get(1).unwrap_or_default(),
            entity_id: row.get(2).unwrap_or_default(),
            event_type,
            actor: row.get(4).unwrap_or_default(),
            old_value: row.get(5).ok().flatten(),
            new_value: row.get(6).ok().flatten(),
            comment: row.get(7).ok().flatten(),
            created_at: row.get(8).unwrap_or_default(),
        }))
    })?;

    let mut events = Vec::new();
    for row in rows {
        if let Some(event) = row? {
            events.push(event);
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_event_insert_and_get() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let event = Event::new("item", "item_123", EventType::ItemCreated, "ana@acme.io")
            .with_comment("Created from template");

        let id = insert_event(&conn, &event).unwrap();
        assert!(id > 0);

        let events = get_events(&conn, "item", "item_123", Some(10)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor, "ana@acme.io");
        assert_eq!(events[0].event_type, EventType::ItemCreated);
        assert_eq!(events[0].comment.as_deref(), Some("Created from template"));
    }

    #[test]
    fn test_event_type_round_trip() {
        assert_eq!(EventType::parse("template_applied"), Some(EventType::TemplateApplied));
        assert_eq!(EventType::parse("session_created"), None);
    }
}
