//! SQLite storage implementation.
//!
//! This module provides the record store for Venturer. Every entity type gets
//! the same contract: create, get, list/filter, partial update, delete, and
//! (for items) bulk create. Writes follow the `MutationContext` pattern for
//! transaction discipline and audit logging.

use crate::error::{Error, Result};
use crate::model::{
    now_millis, Association, EntityKind, EntityRef, Item, ItemStatus, ItemUpdate, Milestone,
    MilestoneUpdate, Plan, Project, ProjectTemplate, ProjectUpdate, RelationshipType,
    SubscriptionStatus, Team, TeamMember, TeamRole, User, UserSubscription, Venture,
    VentureStatus, VentureUpdate, Workstream, WorkstreamUpdate,
};
use crate::storage::events::{get_events, insert_event, Event, EventType};
use crate::storage::schema::apply_schema;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// Passed to mutation closures to record audit events, which are written
/// inside the same transaction just before commit.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }

    /// Record an event carrying a free-form comment.
    pub fn record_comment(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        comment: &str,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor).with_comment(comment),
        );
    }
}

/// Dynamic `UPDATE ... SET` builder.
///
/// `updated_at` is always the first clause.
struct SetClauses {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
    touched: Vec<&'static str>,
}

impl SetClauses {
    fn new(now: i64) -> Self {
        Self {
            clauses: vec!["updated_at = ?".to_string()],
            params: vec![Box::new(now)],
            touched: Vec::new(),
        }
    }

    fn set<T: ToSql + 'static>(&mut self, column: &'static str, value: Option<T>) {
        if let Some(v) = value {
            self.clauses.push(format!("{column} = ?"));
            self.params.push(Box::new(v));
            self.touched.push(column);
        }
    }

    /// Nullable text column: an empty string writes NULL.
    fn set_text(&mut self, column: &'static str, value: Option<&String>) {
        self.set(column, value.map(|v| (!v.is_empty()).then(|| v.clone())));
    }

    fn summary(&self) -> String {
        self.touched.join(", ")
    }

    fn execute(mut self, tx: &Transaction, table: &str, id: &str) -> Result<usize> {
        let sql = format!("UPDATE {table} SET {} WHERE id = ?", self.clauses.join(", "));
        self.params.push(Box::new(id.to_string()));
        let param_refs: Vec<&dyn ToSql> = self.params.iter().map(|p| p.as_ref()).collect();
        Ok(tx.execute(&sql, param_refs.as_slice())?)
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        tracing::debug!(op, events = ctx.events.len(), "mutation committed");

        Ok(result)
    }

    /// Audit trail for one record, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_events(
        &self,
        entity_type: &str,
        entity_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Event>> {
        Ok(get_events(&self.conn, entity_type, entity_id, limit)?)
    }

    /// All record IDs of one kind, for "did you mean" suggestions.
    ///
    /// Unknown kinds yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn record_ids(&self, kind: &str) -> Result<Vec<String>> {
        let table = match kind {
            "venture" => "ventures",
            "project" => "projects",
            "milestone" => "milestones",
            "workstream" => "workstreams",
            "item" | "task" => "items",
            "association" => "associations",
            "team" => "teams",
            "template" => "project_templates",
            _ => return Ok(Vec::new()),
        };
        let mut stmt = self.conn.prepare(&format!("SELECT id FROM {table}"))?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    // ==================
    // Venture Operations
    // ==================

    /// Create a new venture.
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced team is missing or the insert fails.
    pub fn create_venture(&mut self, venture: &Venture, actor: &str) -> Result<()> {
        self.mutate("create_venture", actor, |tx, ctx| {
            if let Some(team_id) = &venture.team_id {
                ensure_exists(tx, "teams", "Team", team_id)?;
            }
            tx.execute(
                "INSERT INTO ventures (id, name, description, status, owner, team_id, color, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    venture.id,
                    venture.name,
                    venture.description,
                    venture.status,
                    venture.owner,
                    venture.team_id,
                    venture.color,
                    venture.created_at,
                    venture.updated_at,
                ],
            )?;

            ctx.record_event("venture", &venture.id, EventType::VentureCreated);
            Ok(())
        })
    }

    /// Get a venture by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_venture(&self, id: &str) -> Result<Option<Venture>> {
        let venture = self
            .conn
            .query_row(
                &format!("SELECT {VENTURE_COLUMNS} FROM ventures WHERE id = ?1"),
                [id],
                map_venture_row,
            )
            .optional()?;
        Ok(venture)
    }

    /// List ventures visible to `user`: owned ones plus those of teams the user
    /// belongs to. `None` lists every venture.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_ventures(
        &self,
        user: Option<&str>,
        status: Option<VentureStatus>,
    ) -> Result<Vec<Venture>> {
        let mut sql = format!("SELECT {VENTURE_COLUMNS} FROM ventures WHERE 1 = 1");
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(email) = user {
            sql.push_str(
                " AND (owner = ? OR team_id IN (SELECT team_id FROM team_members WHERE user_email = ?))",
            );
            params.push(Box::new(email.to_string()));
            params.push(Box::new(email.to_string()));
        }
        if let Some(st) = status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(st));
        }
        sql.push_str(" ORDER BY updated_at DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), map_venture_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Apply a partial update to a venture.
    ///
    /// # Errors
    ///
    /// Returns an error if the venture doesn't exist or the update fails.
    pub fn update_venture(&mut self, id: &str, update: &VentureUpdate, actor: &str) -> Result<()> {
        self.mutate("update_venture", actor, |tx, ctx| {
            if let Some(team_id) = update.team_id.as_deref().filter(|t| !t.is_empty()) {
                ensure_exists(tx, "teams", "Team", team_id)?;
            }

            let mut set = SetClauses::new(now_millis());
            set.set("name", update.name.clone());
            set.set_text("description", update.description.as_ref());
            set.set("status", update.status);
            set.set_text("team_id", update.team_id.as_ref());
            set.set_text("color", update.color.as_ref());

            let summary = set.summary();
            if set.execute(tx, "ventures", id)? == 0 {
                return Err(Error::not_found("Venture", id));
            }

            ctx.record_comment("venture", id, EventType::VentureUpdated, &summary);
            Ok(())
        })
    }

    /// Delete a venture. Its projects, their contents and any items scoped to
    /// the venture go with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the venture doesn't exist or deletion fails.
    pub fn delete_venture(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_venture", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM ventures WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::not_found("Venture", id));
            }

            ctx.record_event("venture", id, EventType::VentureDeleted);
            Ok(())
        })
    }

    // ==================
    // Project Operations
    // ==================

    /// Create a new project inside an existing venture.
    ///
    /// # Errors
    ///
    /// Returns an error if the venture is missing or the insert fails.
    pub fn create_project(&mut self, project: &Project, actor: &str) -> Result<()> {
        self.mutate("create_project", actor, |tx, ctx| {
            insert_project(tx, project)?;
            ctx.record_event("project", &project.id, EventType::ProjectCreated);
            Ok(())
        })
    }

    /// Get a project by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                [id],
                map_project_row,
            )
            .optional()?;
        Ok(project)
    }

    /// List projects, optionally restricted to one venture.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self, venture_id: Option<&str>) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             WHERE ?1 IS NULL OR venture_id = ?1
             ORDER BY created_at ASC"
        ))?;

        let projects = stmt
            .query_map([venture_id], map_project_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    /// Apply a partial update to a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project doesn't exist or the update fails.
    pub fn update_project(&mut self, id: &str, update: &ProjectUpdate, actor: &str) -> Result<()> {
        self.mutate("update_project", actor, |tx, ctx| {
            let mut set = SetClauses::new(now_millis());
            set.set("name", update.name.clone());
            set.set_text("description", update.description.as_ref());
            set.set("status", update.status);
            set.set("start_date", update.start_date);
            set.set("target_date", update.target_date);

            let summary = set.summary();
            if set.execute(tx, "projects", id)? == 0 {
                return Err(Error::not_found("Project", id));
            }

            ctx.record_comment("project", id, EventType::ProjectUpdated, &summary);
            Ok(())
        })
    }

    /// Delete a project together with its milestones, workstreams and items.
    ///
    /// # Errors
    ///
    /// Returns an error if the project doesn't exist or deletion fails.
    pub fn delete_project(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_project", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::not_found("Project", id));
            }

            ctx.record_event("project", id, EventType::ProjectDeleted);
            Ok(())
        })
    }

    /// Create a project together with its milestones and items in one
    /// transaction. Items must be ordered parents-first.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is written in that case.
    pub fn create_project_bundle(
        &mut self,
        project: &Project,
        milestones: &[Milestone],
        items: &[Item],
        template_id: Option<&str>,
        actor: &str,
    ) -> Result<()> {
        for item in items {
            item.validate_step()?;
        }

        self.mutate("create_project_bundle", actor, |tx, ctx| {
            insert_project(tx, project)?;
            ctx.record_event("project", &project.id, EventType::ProjectCreated);

            for milestone in milestones {
                insert_milestone(tx, milestone)?;
                ctx.record_event("milestone", &milestone.id, EventType::MilestoneCreated);
            }
            for item in items {
                insert_item(tx, item)?;
                ctx.record_event("item", &item.id, EventType::ItemCreated);
            }

            if let Some(tpl) = template_id {
                ctx.record_comment("template", tpl, EventType::TemplateApplied, &project.id);
            }
            Ok(())
        })
    }

    // ====================
    // Milestone Operations
    // ====================

    /// Create a milestone.
    ///
    /// # Errors
    ///
    /// Returns an error if the project is missing or the insert fails.
    pub fn create_milestone(&mut self, milestone: &Milestone, actor: &str) -> Result<()> {
        self.mutate("create_milestone", actor, |tx, ctx| {
            insert_milestone(tx, milestone)?;
            ctx.record_event("milestone", &milestone.id, EventType::MilestoneCreated);
            Ok(())
        })
    }

    /// Get a milestone by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_milestone(&self, id: &str) -> Result<Option<Milestone>> {
        let milestone = self
            .conn
            .query_row(
                &format!("SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = ?1"),
                [id],
                map_milestone_row,
            )
            .optional()?;
        Ok(milestone)
    }

    /// List a project's milestones in position order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_milestones(&self, project_id: &str) -> Result<Vec<Milestone>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones
             WHERE project_id = ?1
             ORDER BY position ASC, created_at ASC"
        ))?;

        let milestones = stmt
            .query_map([project_id], map_milestone_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(milestones)
    }

    /// Apply a partial update to a milestone.
    ///
    /// # Errors
    ///
    /// Returns an error if the milestone doesn't exist or the update fails.
    pub fn update_milestone(
        &mut self,
        id: &str,
        update: &MilestoneUpdate,
        actor: &str,
    ) -> Result<()> {
        self.mutate("update_milestone", actor, |tx, ctx| {
            let mut set = SetClauses::new(now_millis());
            set.set("title", update.title.clone());
            set.set_text("description", update.description.as_ref());
            set.set("due_date", update.due_date);
            set.set("status", update.status);
            set.set("position", update.position);

            let summary = set.summary();
            if set.execute(tx, "milestones", id)? == 0 {
                return Err(Error::not_found("Milestone", id));
            }

            ctx.record_comment("milestone", id, EventType::MilestoneUpdated, &summary);
            Ok(())
        })
    }

    /// Delete a milestone. Items pointing at it are kept and lose the link.
    ///
    /// # Errors
    ///
    /// Returns an error if the milestone doesn't exist or deletion fails.
    pub fn delete_milestone(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_milestone", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM milestones WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::not_found("Milestone", id));
            }

            ctx.record_event("milestone", id, EventType::MilestoneDeleted);
            Ok(())
        })
    }

    // =====================
    // Workstream Operations
    // =====================

    /// Create a workstream.
    ///
    /// # Errors
    ///
    /// Returns an error if the project is missing or the insert fails.
    pub fn create_workstream(&mut self, workstream: &Workstream, actor: &str) -> Result<()> {
        self.mutate("create_workstream", actor, |tx, ctx| {
            ensure_exists(tx, "projects", "Project", &workstream.project_id)?;
            tx.execute(
                "INSERT INTO workstreams (id, project_id, name, description, lead, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    workstream.id,
                    workstream.project_id,
                    workstream.name,
                    workstream.description,
                    workstream.lead,
                    workstream.status,
                    workstream.created_at,
                    workstream.updated_at,
                ],
            )?;

            ctx.record_event("workstream", &workstream.id, EventType::WorkstreamCreated);
            Ok(())
        })
    }

    /// Get a workstream by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_workstream(&self, id: &str) -> Result<Option<Workstream>> {
        let workstream = self
            .conn
            .query_row(
                &format!("SELECT {WORKSTREAM_COLUMNS} FROM workstreams WHERE id = ?1"),
                [id],
                map_workstream_row,
            )
            .optional()?;
        Ok(workstream)
    }

    /// List a project's workstreams.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_workstreams(&self, project_id: &str) -> Result<Vec<Workstream>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WORKSTREAM_COLUMNS} FROM workstreams
             WHERE project_id = ?1
             ORDER BY created_at ASC"
        ))?;

        let workstreams = stmt
            .query_map([project_id], map_workstream_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(workstreams)
    }

    /// Apply a partial update to a workstream.
    ///
    /// # Errors
    ///
    /// Returns an error if the workstream doesn't exist or the update fails.
    pub fn update_workstream(
        &mut self,
        id: &str,
        update: &WorkstreamUpdate,
        actor: &str,
    ) -> Result<()> {
        self.mutate("update_workstream", actor, |tx, ctx| {
            let mut set = SetClauses::new(now_millis());
            set.set("name", update.name.clone());
            set.set_text("description", update.description.as_ref());
            set.set_text("lead", update.lead.as_ref());
            set.set("status", update.status);

            let summary = set.summary();
            if set.execute(tx, "workstreams", id)? == 0 {
                return Err(Error::not_found("Workstream", id));
            }

            ctx.record_comment("workstream", id, EventType::WorkstreamUpdated, &summary);
            Ok(())
        })
    }

    /// Delete a workstream. Items pointing at it are kept and lose the link.
    ///
    /// # Errors
    ///
    /// Returns an error if the workstream doesn't exist or deletion fails.
    pub fn delete_workstream(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_workstream", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM workstreams WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::not_found("Workstream", id));
            }

            ctx.record_event("workstream", id, EventType::WorkstreamDeleted);
            Ok(())
        })
    }

    // ===============
    // Item Operations
    // ===============

    /// Create a new item.
    ///
    /// # Errors
    ///
    /// Returns an error if a STEP field is out of range, a referenced record
    /// is missing, or the insert fails.
    pub fn create_item(&mut self, item: &Item, actor: &str) -> Result<()> {
        item.validate_step()?;

        self.mutate("create_item", actor, |tx, ctx| {
            insert_item(tx, item)?;
            ctx.record_event("item", &item.id, EventType::ItemCreated);
            if let Some(assignee) = &item.assigned_to {
                ctx.record_change("item", &item.id, EventType::ItemAssigned, None, Some(assignee.clone()));
            }
            Ok(())
        })
    }

    /// Create many items in a single transaction.
    ///
    /// Either every item is written or none is. Items must be ordered
    /// parents-first.
    ///
    /// # Errors
    ///
    /// Returns an error if any item fails validation or insertion.
    pub fn bulk_create_items(&mut self, items: &[Item], actor: &str) -> Result<usize> {
        for item in items {
            item.validate_step()?;
        }

        self.mutate("bulk_create_items", actor, |tx, ctx| {
            for item in items {
                insert_item(tx, item)?;
                ctx.record_event("item", &item.id, EventType::ItemCreated);
            }
            Ok(items.len())
        })
    }

    /// Get an item by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_item(&self, id: &str) -> Result<Option<Item>> {
        fetch_item(&self.conn, id)
    }

    /// List items matching a query, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let mut sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE 1 = 1");
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        let eq_filters = [
            ("venture_id", &query.venture_id),
            ("project_id", &query.project_id),
            ("milestone_id", &query.milestone_id),
            ("workstream_id", &query.workstream_id),
            ("parent_id", &query.parent_id),
            ("assigned_to", &query.assigned_to),
        ];
        for (column, value) in eq_filters {
            if let Some(v) = value {
                sql.push_str(&format!(" AND {column} = ?"));
                params.push(Box::new(v.clone()));
            }
        }

        if query.roots_only {
            sql.push_str(" AND parent_id IS NULL");
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status));
        }

        sql.push_str(" ORDER BY created_at ASC, rowid ASC");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), map_item_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Apply a partial update to an item and return the result.
    ///
    /// Moving into `completed` stamps `completed_at`; moving out of it clears
    /// the stamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the item doesn't exist, a STEP value is out of
    /// range, or a referenced record is missing.
    pub fn update_item(&mut self, id: &str, update: &ItemUpdate, actor: &str) -> Result<Item> {
        update.validate_step()?;

        self.mutate("update_item", actor, |tx, ctx| write_item_update(tx, ctx, id, update))
    }

    /// Apply an analysis suggestion: a field update plus new subtasks.
    ///
    /// Both writes share one transaction, so a failure leaves the item as it
    /// was.
    ///
    /// # Errors
    ///
    /// Returns an error if the item doesn't exist, a STEP value is out of
    /// range, or a subtask fails to insert.
    pub fn apply_suggestion(
        &mut self,
        id: &str,
        update: &ItemUpdate,
        subtasks: &[Item],
        actor: &str,
    ) -> Result<Item> {
        update.validate_step()?;
        for item in subtasks {
            item.validate_step()?;
        }

        self.mutate("apply_suggestion", actor, |tx, ctx| {
            let item = write_item_update(tx, ctx, id, update)?;
            for child in subtasks {
                insert_item(tx, child)?;
                ctx.record_event("item", &child.id, EventType::ItemCreated);
            }
            Ok(item)
        })
    }

    /// Mark an item completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the item doesn't exist.
    pub fn complete_item(&mut self, id: &str, actor: &str) -> Result<Item> {
        let update = ItemUpdate {
            status: Some(ItemStatus::Completed),
            ..ItemUpdate::default()
        };
        self.update_item(id, &update, actor)
    }

    /// Delete an item. Its subtasks and any associations touching it go too.
    ///
    /// # Errors
    ///
    /// Returns an error if the item doesn't exist or deletion fails.
    pub fn delete_item(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_item", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM items WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::not_found("Item", id));
            }

            ctx.record_event("item", id, EventType::ItemDeleted);
            Ok(())
        })
    }

    // ======================
    // Association Operations
    // ======================

    /// Create an association between two existing entities.
    ///
    /// Rejects self-links, exact duplicates, and hierarchy links that would
    /// close a cycle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidArgument`, `DuplicateAssociation` or
    /// `CycleDetected` accordingly.
    pub fn create_association(&mut self, assoc: &Association, actor: &str) -> Result<()> {
        let from = assoc.from_ref();
        let to = assoc.to_ref();
        if from == to {
            return Err(Error::InvalidArgument(format!(
                "An entity cannot be linked to itself: {from}"
            )));
        }

        self.mutate("create_association", actor, |tx, ctx| {
            ensure_entity_exists(tx, &from)?;
            ensure_entity_exists(tx, &to)?;

            let duplicate: bool = tx.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM associations
                    WHERE from_entity_type = ?1 AND from_entity_id = ?2
                      AND to_entity_type = ?3 AND to_entity_id = ?4
                      AND relationship_type = ?5)",
                rusqlite::params![
                    assoc.from_entity_type,
                    assoc.from_entity_id,
                    assoc.to_entity_type,
                    assoc.to_entity_id,
                    assoc.relationship_type,
                ],
                |row| row.get(0),
            )?;
            if duplicate {
                return Err(Error::DuplicateAssociation {
                    from: from.to_string(),
                    relationship: assoc.relationship_type.to_string(),
                    to: to.to_string(),
                });
            }

            if let Some((parent, child)) = assoc.hierarchy_edge() {
                if reaches(&hierarchy_children(tx)?, &child, &parent) {
                    return Err(Error::CycleDetected {
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
            }

            tx.execute(
                "INSERT INTO associations (id, from_entity_type, from_entity_id, to_entity_type, to_entity_id,
                                           relationship_type, note, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    assoc.id,
                    assoc.from_entity_type,
                    assoc.from_entity_id,
                    assoc.to_entity_type,
                    assoc.to_entity_id,
                    assoc.relationship_type,
                    assoc.note,
                    assoc.created_by,
                    assoc.created_at,
                ],
            )?;

            ctx.record_comment(
                "association",
                &assoc.id,
                EventType::AssociationCreated,
                &format!("{from} {} {to}", assoc.relationship_type),
            );
            Ok(())
        })
    }

    /// Get an association by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_association(&self, id: &str) -> Result<Option<Association>> {
        let assoc = self
            .conn
            .query_row(
                &format!("SELECT {ASSOCIATION_COLUMNS} FROM associations WHERE id = ?1"),
                [id],
                map_association_row,
            )
            .optional()?;
        Ok(assoc)
    }

    /// Associations whose source is `entity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn outgoing_associations(&self, entity: &EntityRef) -> Result<Vec<Association>> {
        self.associations_where("from_entity_type = ?1 AND from_entity_id = ?2", entity)
    }

    /// Associations whose target is `entity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn incoming_associations(&self, entity: &EntityRef) -> Result<Vec<Association>> {
        self.associations_where("to_entity_type = ?1 AND to_entity_id = ?2", entity)
    }

    fn associations_where(&self, clause: &str, entity: &EntityRef) -> Result<Vec<Association>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ASSOCIATION_COLUMNS} FROM associations WHERE {clause} ORDER BY created_at ASC"
        ))?;
        let rows = stmt
            .query_map(rusqlite::params![entity.kind, entity.id], map_association_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete an association.
    ///
    /// # Errors
    ///
    /// Returns an error if the association doesn't exist.
    pub fn delete_association(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_association", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM associations WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::not_found("Association", id));
            }

            ctx.record_event("association", id, EventType::AssociationDeleted);
            Ok(())
        })
    }

    // ===============
    // Team Operations
    // ===============

    /// Create a team. The owner joins it as lead.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_team(&mut self, team: &Team, actor: &str) -> Result<()> {
        self.mutate("create_team", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO teams (id, name, description, owner, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    team.id,
                    team.name,
                    team.description,
                    team.owner,
                    team.created_at,
                    team.updated_at,
                ],
            )?;

            let owner = TeamMember::new(&team.id, &team.owner, TeamRole::Lead);
            insert_team_member(tx, &owner)?;

            ctx.record_event("team", &team.id, EventType::TeamCreated);
            ctx.record_change("team", &team.id, EventType::MemberAdded, None, Some(team.owner.clone()));
            Ok(())
        })
    }

    /// Get a team by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_team(&self, id: &str) -> Result<Option<Team>> {
        let team = self
            .conn
            .query_row(
                "SELECT id, name, description, owner, created_at, updated_at FROM teams WHERE id = ?1",
                [id],
                map_team_row,
            )
            .optional()?;
        Ok(team)
    }

    /// List teams, optionally only those `member` belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_teams(&self, member: Option<&str>) -> Result<Vec<Team>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, owner, created_at, updated_at FROM teams
             WHERE ?1 IS NULL
                OR owner = ?1
                OR id IN (SELECT team_id FROM team_members WHERE user_email = ?1)
             ORDER BY name ASC",
        )?;
        let teams = stmt
            .query_map([member], map_team_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    /// Delete a team and its memberships. Ventures keep existing without a team.
    ///
    /// # Errors
    ///
    /// Returns an error if the team doesn't exist.
    pub fn delete_team(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_team", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM teams WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::not_found("Team", id));
            }

            ctx.record_event("team", id, EventType::TeamDeleted);
            Ok(())
        })
    }

    /// Add a member to a team.
    ///
    /// # Errors
    ///
    /// Returns an error if the team is missing or the user is already a member.
    pub fn add_team_member(&mut self, member: &TeamMember, actor: &str) -> Result<()> {
        self.mutate("add_team_member", actor, |tx, ctx| {
            ensure_exists(tx, "teams", "Team", &member.team_id)?;
            if fetch_team_member(tx, &member.team_id, &member.user_email)?.is_some() {
                return Err(Error::InvalidArgument(format!(
                    "{} is already a member of {}",
                    member.user_email, member.team_id
                )));
            }

            insert_team_member(tx, member)?;
            ctx.record_change(
                "team",
                &member.team_id,
                EventType::MemberAdded,
                None,
                Some(member.user_email.clone()),
            );
            Ok(())
        })
    }

    /// Remove a member from a team.
    ///
    /// # Errors
    ///
    /// Returns an error if the membership doesn't exist.
    pub fn remove_team_member(&mut self, team_id: &str, email: &str, actor: &str) -> Result<()> {
        self.mutate("remove_team_member", actor, |tx, ctx| {
            let affected = tx.execute(
                "DELETE FROM team_members WHERE team_id = ?1 AND user_email = ?2",
                [team_id, email],
            )?;
            if affected == 0 {
                return Err(Error::not_found("Team member", email));
            }

            ctx.record_change("team", team_id, EventType::MemberRemoved, Some(email.to_string()), None);
            Ok(())
        })
    }

    /// Change a member's role.
    ///
    /// # Errors
    ///
    /// Returns an error if the membership doesn't exist.
    pub fn set_member_role(
        &mut self,
        team_id: &str,
        email: &str,
        role: TeamRole,
        actor: &str,
    ) -> Result<()> {
        self.mutate("set_member_role", actor, |tx, ctx| {
            let old = fetch_team_member(tx, team_id, email)?
                .ok_or_else(|| Error::not_found("Team member", email))?;
            tx.execute(
                "UPDATE team_members SET role = ?1 WHERE team_id = ?2 AND user_email = ?3",
                rusqlite::params![role, team_id, email],
            )?;

            ctx.record_change(
                "team",
                team_id,
                EventType::MemberUpdated,
                Some(format!("{email}:{}", old.role)),
                Some(format!("{email}:{role}")),
            );
            Ok(())
        })
    }

    /// Members of a team, leads first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_team_members(&self, team_id: &str) -> Result<Vec<TeamMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, team_id, user_email, display_name, role, joined_at FROM team_members
             WHERE team_id = ?1
             ORDER BY CASE role WHEN 'lead' THEN 0 WHEN 'member' THEN 1 ELSE 2 END, joined_at ASC",
        )?;
        let members = stmt
            .query_map([team_id], map_team_member_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(members)
    }

    // ===================
    // Template Operations
    // ===================

    /// Store a template.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStep` if a task's STEP value is out of range, or an
    /// error if serialization or the insert fails.
    pub fn create_template(&mut self, template: &ProjectTemplate, actor: &str) -> Result<()> {
        template.validate_step()?;
        let tasks = serde_json::to_string(&template.tasks)?;
        let milestones = serde_json::to_string(&template.milestones)?;

        self.mutate("create_template", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO project_templates (id, name, description, category, tasks, milestones,
                                                created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    template.id,
                    template.name,
                    template.description,
                    template.category,
                    tasks,
                    milestones,
                    template.created_by,
                    template.created_at,
                    template.updated_at,
                ],
            )?;

            ctx.record_event("template", &template.id, EventType::TemplateCreated);
            Ok(())
        })
    }

    /// Get a template by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored JSON is corrupt.
    pub fn get_template(&self, id: &str) -> Result<Option<ProjectTemplate>> {
        let template = self
            .conn
            .query_row(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM project_templates WHERE id = ?1"),
                [id],
                map_template_row,
            )
            .optional()?;
        Ok(template)
    }

    /// List templates, optionally by category.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_templates(&self, category: Option<&str>) -> Result<Vec<ProjectTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM project_templates
             WHERE ?1 IS NULL OR category = ?1
             ORDER BY name ASC"
        ))?;
        let templates = stmt
            .query_map([category], map_template_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    /// Delete a template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template doesn't exist.
    pub fn delete_template(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_template", actor, |tx, ctx| {
            let affected = tx.execute("DELETE FROM project_templates WHERE id = ?1", [id])?;
            if affected == 0 {
                return Err(Error::not_found("Template", id));
            }

            ctx.record_event("template", id, EventType::TemplateDeleted);
            Ok(())
        })
    }

    // ===============
    // User Operations
    // ===============

    /// Create a user account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the email is already registered.
    pub fn create_user(&mut self, user: &User, actor: &str) -> Result<()> {
        self.mutate("create_user", actor, |tx, ctx| {
            if fetch_user(tx, &user.email)?.is_some() {
                return Err(Error::InvalidArgument(format!(
                    "User already exists: {}",
                    user.email
                )));
            }

            tx.execute(
                "INSERT INTO users (id, email, full_name, role, status, invited_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    user.id,
                    user.email,
                    user.full_name,
                    user.role,
                    user.status,
                    user.invited_by,
                    user.created_at,
                    user.updated_at,
                ],
            )?;

            let event = if user.invited_by.is_some() {
                EventType::UserInvited
            } else {
                EventType::UserCreated
            };
            ctx.record_event("user", &user.email, event);
            Ok(())
        })
    }

    /// Get a user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_user(&self, email: &str) -> Result<Option<User>> {
        fetch_user(&self.conn, email)
    }

    /// List all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY email ASC"
        ))?;
        let users = stmt
            .query_map([], map_user_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Store a session token hash for `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is missing or the insert fails.
    pub fn create_user_session(
        &mut self,
        email: &str,
        token_hash: &str,
        expires_at: i64,
        actor: &str,
    ) -> Result<()> {
        self.mutate("create_user_session", actor, |tx, ctx| {
            if fetch_user(tx, email)?.is_none() {
                return Err(Error::not_found("User", email));
            }
            tx.execute(
                "INSERT INTO user_sessions (token_hash, user_email, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![token_hash, email.to_lowercase(), now_millis(), expires_at],
            )?;

            ctx.record_event("user", email, EventType::SessionIssued);
            Ok(())
        })
    }

    /// Resolve a session token hash to its user's email, if still valid at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn session_user(&self, token_hash: &str, now: i64) -> Result<Option<String>> {
        let email = self
            .conn
            .query_row(
                "SELECT user_email FROM user_sessions WHERE token_hash = ?1 AND expires_at > ?2",
                rusqlite::params![token_hash, now],
                |row| row.get(0),
            )
            .optional()?;
        Ok(email)
    }

    /// Drop sessions that expired before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn purge_expired_sessions(&mut self, now: i64) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM user_sessions WHERE expires_at <= ?1", [now])?)
    }

    /// A user's subscription; users without a stored row are on the free plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_subscription(&self, email: &str) -> Result<UserSubscription> {
        let email = email.to_lowercase();
        let sub = self
            .conn
            .query_row(
                "SELECT id, user_email, plan, status, renews_at, created_at, updated_at
                 FROM user_subscriptions WHERE user_email = ?1",
                [&email],
                map_subscription_row,
            )
            .optional()?;
        Ok(sub.unwrap_or_else(|| UserSubscription::free(&email)))
    }

    /// Set a user's plan, creating the subscription row if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is missing or the upsert fails.
    pub fn set_plan(
        &mut self,
        email: &str,
        plan: Plan,
        status: SubscriptionStatus,
        actor: &str,
    ) -> Result<UserSubscription> {
        let current = self.get_subscription(email)?;

        self.mutate("set_plan", actor, |tx, ctx| {
            if fetch_user(tx, email)?.is_none() {
                return Err(Error::not_found("User", email));
            }

            let now = now_millis();
            tx.execute(
                "INSERT INTO user_subscriptions (id, user_email, plan, status, renews_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(user_email) DO UPDATE SET
                    plan = excluded.plan,
                    status = excluded.status,
                    updated_at = excluded.updated_at",
                rusqlite::params![current.id, current.user_email, plan, status, current.renews_at, now],
            )?;

            ctx.record_change(
                "user",
                &current.user_email,
                EventType::PlanChanged,
                Some(current.plan.to_string()),
                Some(plan.to_string()),
            );

            Ok(UserSubscription {
                plan,
                status,
                updated_at: now,
                ..current.clone()
            })
        })
    }
}

// ==================
// Transaction helpers
// ==================

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Fail with `NotFound` unless `id` exists in `table`.
fn ensure_exists(conn: &Connection, table: &str, kind: &'static str, id: &str) -> Result<()> {
    let found: bool = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
        [id],
        |row| row.get(0),
    )?;
    if found {
        Ok(())
    } else {
        Err(Error::not_found(kind, id))
    }
}

fn ensure_entity_exists(conn: &Connection, entity: &EntityRef) -> Result<()> {
    match entity.kind {
        EntityKind::Task => ensure_exists(conn, "items", "Item", &entity.id),
        EntityKind::Milestone => ensure_exists(conn, "milestones", "Milestone", &entity.id),
        EntityKind::Workstream => ensure_exists(conn, "workstreams", "Workstream", &entity.id),
    }
}

fn ensure_item_refs(
    conn: &Connection,
    venture_id: Option<&str>,
    project_id: Option<&str>,
    milestone_id: Option<&str>,
    workstream_id: Option<&str>,
    parent_id: Option<&str>,
) -> Result<()> {
    if let Some(id) = venture_id {
        ensure_exists(conn, "ventures", "Venture", id)?;
    }
    if let Some(id) = project_id {
        ensure_exists(conn, "projects", "Project", id)?;
    }
    if let Some(id) = milestone_id {
        ensure_exists(conn, "milestones", "Milestone", id)?;
    }
    if let Some(id) = workstream_id {
        ensure_exists(conn, "workstreams", "Workstream", id)?;
    }
    if let Some(id) = parent_id {
        ensure_exists(conn, "items", "Item", id)?;
    }
    Ok(())
}

fn insert_project(tx: &Transaction, project: &Project) -> Result<()> {
    ensure_exists(tx, "ventures", "Venture", &project.venture_id)?;
    tx.execute(
        "INSERT INTO projects (id, venture_id, name, description, status, start_date, target_date,
                               created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            project.id,
            project.venture_id,
            project.name,
            project.description,
            project.status,
            project.start_date,
            project.target_date,
            project.created_by,
            project.created_at,
            project.updated_at,
        ],
    )?;
    Ok(())
}

fn insert_milestone(tx: &Transaction, milestone: &Milestone) -> Result<()> {
    ensure_exists(tx, "projects", "Project", &milestone.project_id)?;
    tx.execute(
        "INSERT INTO milestones (id, project_id, title, description, due_date, status, position,
                                 created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            milestone.id,
            milestone.project_id,
            milestone.title,
            milestone.description,
            milestone.due_date,
            milestone.status,
            milestone.position,
            milestone.created_at,
            milestone.updated_at,
        ],
    )?;
    Ok(())
}

fn write_item_update(
    tx: &Transaction,
    ctx: &mut MutationContext,
    id: &str,
    update: &ItemUpdate,
) -> Result<Item> {
    let old = fetch_item(tx, id)?.ok_or_else(|| Error::not_found("Item", id))?;
    if update.is_empty() {
        return Ok(old);
    }
    ensure_item_refs(
        tx,
        non_empty(update.venture_id.as_deref()),
        non_empty(update.project_id.as_deref()),
        non_empty(update.milestone_id.as_deref()),
        non_empty(update.workstream_id.as_deref()),
        None,
    )?;

    let now = now_millis();
    let mut set = SetClauses::new(now);
    set.set("title", update.title.clone());
    set.set_text("description", update.description.as_ref());
    set.set("item_type", update.item_type);
    set.set("status", update.status);
    set.set_text("venture_id", update.venture_id.as_ref());
    set.set_text("project_id", update.project_id.as_ref());
    set.set_text("milestone_id", update.milestone_id.as_ref());
    set.set_text("workstream_id", update.workstream_id.as_ref());
    set.set_text("assigned_to", update.assigned_to.as_ref());
    set.set("due_date", update.due_date);
    set.set("s_sextant", update.s_sextant);
    set.set("t_time", update.t_time);
    set.set("e_effort", update.e_effort);
    set.set("p_priority", update.p_priority);

    let status_change = update.status.filter(|s| *s != old.status);
    if let Some(status) = status_change {
        let completed_at = (status == ItemStatus::Completed).then_some(now);
        set.set("completed_at", Some(completed_at));
    }

    let summary = set.summary();
    set.execute(tx, "items", id)?;

    ctx.record_comment("item", id, EventType::ItemUpdated, &summary);
    if let Some(status) = status_change {
        let event = if status == ItemStatus::Completed {
            EventType::ItemCompleted
        } else {
            EventType::ItemUpdated
        };
        ctx.record_change(
            "item",
            id,
            event,
            Some(old.status.to_string()),
            Some(status.to_string()),
        );
    }
    if let Some(assignee) = &update.assigned_to {
        if old.assigned_to.as_deref() != non_empty(Some(assignee)) {
            ctx.record_change(
                "item",
                id,
                EventType::ItemAssigned,
                old.assigned_to.clone(),
                non_empty(Some(assignee)).map(ToString::to_string),
            );
        }
    }

    fetch_item(tx, id)?.ok_or_else(|| Error::not_found("Item", id))
}

fn insert_item(tx: &Transaction, item: &Item) -> Result<()> {
    ensure_item_refs(
        tx,
        item.venture_id.as_deref(),
        item.project_id.as_deref(),
        item.milestone_id.as_deref(),
        item.workstream_id.as_deref(),
        item.parent_id.as_deref(),
    )?;
    tx.execute(
        &format!(
            "INSERT INTO items ({ITEM_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
        ),
        rusqlite::params![
            item.id,
            item.title,
            item.description,
            item.item_type,
            item.status,
            item.venture_id,
            item.project_id,
            item.milestone_id,
            item.workstream_id,
            item.parent_id,
            item.assigned_to,
            item.due_date,
            item.s_sextant,
            item.t_time,
            item.e_effort,
            item.p_priority,
            item.created_by,
            item.created_at,
            item.updated_at,
            item.completed_at,
        ],
    )?;
    Ok(())
}

fn insert_team_member(tx: &Transaction, member: &TeamMember) -> Result<()> {
    tx.execute(
        "INSERT INTO team_members (id, team_id, user_email, display_name, role, joined_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            member.id,
            member.team_id,
            member.user_email,
            member.display_name,
            member.role,
            member.joined_at,
        ],
    )?;
    Ok(())
}

fn fetch_item(conn: &Connection, id: &str) -> Result<Option<Item>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
            [id],
            map_item_row,
        )
        .optional()?;
    Ok(item)
}

fn fetch_user(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            [email.to_lowercase()],
            map_user_row,
        )
        .optional()?;
    Ok(user)
}

fn fetch_team_member(conn: &Connection, team_id: &str, email: &str) -> Result<Option<TeamMember>> {
    let member = conn
        .query_row(
            "SELECT id, team_id, user_email, display_name, role, joined_at FROM team_members
             WHERE team_id = ?1 AND user_email = ?2",
            [team_id, email],
            map_team_member_row,
        )
        .optional()?;
    Ok(member)
}

/// Parent to children adjacency over every `parent_of`/`child_of` edge.
fn hierarchy_children(conn: &Connection) -> Result<HashMap<EntityRef, Vec<EntityRef>>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSOCIATION_COLUMNS} FROM associations
         WHERE relationship_type IN ('parent_of', 'child_of')"
    ))?;

    let mut children: HashMap<EntityRef, Vec<EntityRef>> = HashMap::new();
    for assoc in stmt.query_map([], map_association_row)? {
        if let Some((parent, child)) = assoc?.hierarchy_edge() {
            children.entry(parent).or_default().push(child);
        }
    }
    Ok(children)
}

/// Breadth-first reachability from `start` to `target`.
fn reaches(
    children: &HashMap<EntityRef, Vec<EntityRef>>,
    start: &EntityRef,
    target: &EntityRef,
) -> bool {
    let mut queue = VecDeque::from([start.clone()]);
    let mut seen = HashSet::new();

    while let Some(node) = queue.pop_front() {
        if node == *target {
            return true;
        }
        if !seen.insert(node.clone()) {
            continue;
        }
        if let Some(next) = children.get(&node) {
            queue.extend(next.iter().cloned());
        }
    }
    false
}

// ==================
// Row mapping
// ==================

const VENTURE_COLUMNS: &str =
    "id, name, description, status, owner, team_id, color, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, venture_id, name, description, status, start_date, target_date, \
     created_by, created_at, updated_at";

const MILESTONE_COLUMNS: &str =
    "id, project_id, title, description, due_date, status, position, created_at, updated_at";

const WORKSTREAM_COLUMNS: &str =
    "id, project_id, name, description, lead, status, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, title, description, item_type, status, venture_id, project_id, \
     milestone_id, workstream_id, parent_id, assigned_to, due_date, s_sextant, t_time, e_effort, \
     p_priority, created_by, created_at, updated_at, completed_at";

const ASSOCIATION_COLUMNS: &str = "id, from_entity_type, from_entity_id, to_entity_type, \
     to_entity_id, relationship_type, note, created_by, created_at";

const TEMPLATE_COLUMNS: &str =
    "id, name, description, category, tasks, milestones, created_by, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, email, full_name, role, status, invited_by, created_at, updated_at";

fn map_venture_row(row: &Row) -> rusqlite::Result<Venture> {
    Ok(Venture {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        owner: row.get(4)?,
        team_id: row.get(5)?,
        color: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_project_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        venture_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        start_date: row.get(5)?,
        target_date: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn map_milestone_row(row: &Row) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        due_date: row.get(4)?,
        status: row.get(5)?,
        position: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_workstream_row(row: &Row) -> rusqlite::Result<Workstream> {
    Ok(Workstream {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        lead: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_item_row(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        item_type: row.get(3)?,
        status: row.get(4)?,
        venture_id: row.get(5)?,
        project_id: row.get(6)?,
        milestone_id: row.get(7)?,
        workstream_id: row.get(8)?,
        parent_id: row.get(9)?,
        assigned_to: row.get(10)?,
        due_date: row.get(11)?,
        s_sextant: row.get(12)?,
        t_time: row.get(13)?,
        e_effort: row.get(14)?,
        p_priority: row.get(15)?,
        created_by: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
        completed_at: row.get(19)?,
    })
}

fn map_association_row(row: &Row) -> rusqlite::Result<Association> {
    Ok(Association {
        id: row.get(0)?,
        from_entity_type: row.get(1)?,
        from_entity_id: row.get(2)?,
        to_entity_type: row.get(3)?,
        to_entity_id: row.get(4)?,
        relationship_type: row.get::<_, RelationshipType>(5)?,
        note: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_team_row(row: &Row) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_team_member_row(row: &Row) -> rusqlite::Result<TeamMember> {
    Ok(TeamMember {
        id: row.get(0)?,
        team_id: row.get(1)?,
        user_email: row.get(2)?,
        display_name: row.get(3)?,
        role: row.get(4)?,
        joined_at: row.get(5)?,
    })
}

/// Decode a JSON TEXT column.
fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_template_row(row: &Row) -> rusqlite::Result<ProjectTemplate> {
    Ok(ProjectTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        tasks: json_column(row, 4)?,
        milestones: json_column(row, 5)?,
        created_by: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: row.get(3)?,
        status: row.get(4)?,
        invited_by: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_subscription_row(row: &Row) -> rusqlite::Result<UserSubscription> {
    Ok(UserSubscription {
        id: row.get(0)?,
        user_email: row.get(1)?,
        plan: row.get(2)?,
        status: row.get(3)?,
        renews_at: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

// ==================
// Data Structures
// ==================

/// SQL-level filter for `list_items`. Unset fields don't restrict.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub venture_id: Option<String>,
    pub project_id: Option<String>,
    pub milestone_id: Option<String>,
    pub workstream_id: Option<String>,
    pub parent_id: Option<String>,
    /// Only items without a parent
    pub roots_only: bool,
    pub assigned_to: Option<String>,
    pub status: Option<ItemStatus>,
    pub limit: Option<u32>,
}

impl ItemQuery {
    #[must_use]
    pub fn venture(id: &str) -> Self {
        Self {
            venture_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn project(id: &str) -> Self {
        Self {
            project_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn assignee(email: &str) -> Self {
        Self {
            assigned_to: Some(email.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn children_of(parent_id: &str) -> Self {
        Self {
            parent_id: Some(parent_id.to_string()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemType, ProjectStatus, TemplateTask, UserRole};

    const ACTOR: &str = "ana@acme.io";

    fn seeded() -> (SqliteStorage, Venture, Project) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let venture = Venture::new("Acme".into(), ACTOR.into());
        storage.create_venture(&venture, ACTOR).unwrap();
        let project = Project::new(venture.id.clone(), "Launch".into(), ACTOR.into());
        storage.create_project(&project, ACTOR).unwrap();
        (storage, venture, project)
    }

    fn task(project: &Project, title: &str) -> Item {
        Item::new(title.into(), ACTOR.into())
            .in_scope(Some(&project.venture_id), Some(&project.id))
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_venture_crud() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let venture = Venture::new("Acme".into(), ACTOR.into()).with_description("Main line");
        storage.create_venture(&venture, ACTOR).unwrap();

        let loaded = storage.get_venture(&venture.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Acme");
        assert_eq!(loaded.description.as_deref(), Some("Main line"));

        let update = VentureUpdate {
            status: Some(VentureStatus::Paused),
            description: Some(String::new()),
            ..VentureUpdate::default()
        };
        storage.update_venture(&venture.id, &update, ACTOR).unwrap();
        let loaded = storage.get_venture(&venture.id).unwrap().unwrap();
        assert_eq!(loaded.status, VentureStatus::Paused);
        assert!(loaded.description.is_none());

        assert_eq!(storage.list_ventures(Some(ACTOR), None).unwrap().len(), 1);
        assert!(storage.list_ventures(Some("bo@acme.io"), None).unwrap().is_empty());

        storage.delete_venture(&venture.id, ACTOR).unwrap();
        assert!(storage.get_venture(&venture.id).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_record_is_not_found() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let update = ProjectUpdate {
            status: Some(ProjectStatus::Active),
            ..ProjectUpdate::default()
        };
        let err = storage.update_project("proj_missing", &update, ACTOR).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "Project", .. }));
    }

    #[test]
    fn test_project_requires_venture() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let project = Project::new("ven_missing".into(), "Orphan".into(), ACTOR.into());
        let err = storage.create_project(&project, ACTOR).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "Venture", .. }));
    }

    #[test]
    fn test_venture_delete_cascades() {
        let (mut storage, venture, project) = seeded();
        let milestone = Milestone::new(project.id.clone(), "Beta".into());
        storage.create_milestone(&milestone, ACTOR).unwrap();
        let item = task(&project, "Write copy");
        storage.create_item(&item, ACTOR).unwrap();

        storage.delete_venture(&venture.id, ACTOR).unwrap();

        assert!(storage.get_project(&project.id).unwrap().is_none());
        assert!(storage.get_milestone(&milestone.id).unwrap().is_none());
        assert!(storage.get_item(&item.id).unwrap().is_none());
    }

    #[test]
    fn test_milestone_delete_keeps_items() {
        let (mut storage, _, project) = seeded();
        let milestone = Milestone::new(project.id.clone(), "Beta".into());
        storage.create_milestone(&milestone, ACTOR).unwrap();
        let mut item = task(&project, "Ship");
        item.milestone_id = Some(milestone.id.clone());
        storage.create_item(&item, ACTOR).unwrap();

        storage.delete_milestone(&milestone.id, ACTOR).unwrap();

        let item = storage.get_item(&item.id).unwrap().unwrap();
        assert!(item.milestone_id.is_none());
    }

    #[test]
    fn test_apply_suggestion_is_all_or_nothing() {
        let (mut storage, _, project) = seeded();
        let parent = task(&project, "Launch");
        storage.create_item(&parent, ACTOR).unwrap();

        let update = ItemUpdate {
            p_priority: Some(3),
            ..ItemUpdate::default()
        };
        let good = task(&project, "Draft").with_parent(&parent.id);
        let mut orphan = task(&project, "Review");
        orphan.milestone_id = Some("ms_missing".into());

        assert!(storage
            .apply_suggestion(&parent.id, &update, &[good.clone(), orphan], ACTOR)
            .is_err());
        let unchanged = storage.get_item(&parent.id).unwrap().unwrap();
        assert!(unchanged.p_priority.is_none());
        assert!(storage.get_item(&good.id).unwrap().is_none());

        let updated = storage
            .apply_suggestion(&parent.id, &update, &[good.clone()], ACTOR)
            .unwrap();
        assert_eq!(updated.p_priority, Some(3));
        assert_eq!(
            storage.get_item(&good.id).unwrap().unwrap().parent_id.as_deref(),
            Some(parent.id.as_str())
        );
    }

    #[test]
    fn test_item_step_validation() {
        let (mut storage, _, project) = seeded();
        let bad = task(&project, "Bad").with_step(Some(9), None, None, None);
        assert!(matches!(
            storage.create_item(&bad, ACTOR),
            Err(Error::InvalidStep { field: "sextant", .. })
        ));

        let item = task(&project, "Good");
        storage.create_item(&item, ACTOR).unwrap();
        let update = ItemUpdate {
            p_priority: Some(4),
            ..ItemUpdate::default()
        };
        assert!(storage.update_item(&item.id, &update, ACTOR).is_err());
    }

    #[test]
    fn test_item_completion_stamps_and_clears() {
        let (mut storage, _, project) = seeded();
        let item = task(&project, "Ship");
        storage.create_item(&item, ACTOR).unwrap();

        let done = storage.complete_item(&item.id, ACTOR).unwrap();
        assert_eq!(done.status, ItemStatus::Completed);
        assert!(done.completed_at.is_some());

        let reopen = ItemUpdate {
            status: Some(ItemStatus::InProgress),
            ..ItemUpdate::default()
        };
        let reopened = storage.update_item(&item.id, &reopen, ACTOR).unwrap();
        assert!(reopened.completed_at.is_none());

        let events = storage.get_events("item", &item.id, None).unwrap();
        assert!(events.iter().any(|e| e.event_type == EventType::ItemCompleted));
    }

    #[test]
    fn test_item_assignment_and_clear() {
        let (mut storage, _, project) = seeded();
        let item = task(&project, "Review");
        storage.create_item(&item, ACTOR).unwrap();

        let assign = ItemUpdate {
            assigned_to: Some("bo@acme.io".into()),
            ..ItemUpdate::default()
        };
        let updated = storage.update_item(&item.id, &assign, ACTOR).unwrap();
        assert_eq!(updated.assigned_to.as_deref(), Some("bo@acme.io"));

        let clear = ItemUpdate {
            assigned_to: Some(String::new()),
            ..ItemUpdate::default()
        };
        let updated = storage.update_item(&item.id, &clear, ACTOR).unwrap();
        assert!(updated.assigned_to.is_none());
    }

    #[test]
    fn test_bulk_create_is_atomic() {
        let (mut storage, _, project) = seeded();
        let parent = task(&project, "Parent");
        let child = task(&project, "Child").with_parent(&parent.id);
        let count = storage
            .bulk_create_items(&[parent.clone(), child.clone()], ACTOR)
            .unwrap();
        assert_eq!(count, 2);

        let children = storage.list_items(&ItemQuery::children_of(&parent.id)).unwrap();
        assert_eq!(children.len(), 1);

        let ok = task(&project, "Fine");
        let orphan = task(&project, "Orphan").with_parent("item_missing");
        assert!(storage.bulk_create_items(&[ok.clone(), orphan], ACTOR).is_err());
        assert!(storage.get_item(&ok.id).unwrap().is_none());
    }

    #[test]
    fn test_item_delete_cascades_to_subtasks() {
        let (mut storage, _, project) = seeded();
        let parent = task(&project, "Parent");
        let child = task(&project, "Child").with_parent(&parent.id);
        storage.bulk_create_items(&[parent.clone(), child.clone()], ACTOR).unwrap();

        storage.delete_item(&parent.id, ACTOR).unwrap();
        assert!(storage.get_item(&child.id).unwrap().is_none());
    }

    #[test]
    fn test_list_items_filters() {
        let (mut storage, _, project) = seeded();
        let a = task(&project, "A").assigned("bo@acme.io");
        let b = task(&project, "B").with_type(ItemType::Note);
        storage.bulk_create_items(&[a.clone(), b], ACTOR).unwrap();

        assert_eq!(storage.list_items(&ItemQuery::project(&project.id)).unwrap().len(), 2);
        let mine = storage.list_items(&ItemQuery::assignee("bo@acme.io")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, a.id);
    }

    #[test]
    fn test_association_directions() {
        let (mut storage, _, project) = seeded();
        let a = task(&project, "A");
        let b = task(&project, "B");
        storage.bulk_create_items(&[a.clone(), b.clone()], ACTOR).unwrap();

        let ra = EntityRef::new(EntityKind::Task, &a.id);
        let rb = EntityRef::new(EntityKind::Task, &b.id);
        let assoc = Association::new(&ra, &rb, RelationshipType::Blocks, ACTOR);
        storage.create_association(&assoc, ACTOR).unwrap();

        let out_a = storage.outgoing_associations(&ra).unwrap();
        let in_a = storage.incoming_associations(&ra).unwrap();
        let out_b = storage.outgoing_associations(&rb).unwrap();
        let in_b = storage.incoming_associations(&rb).unwrap();
        assert_eq!(out_a.len(), 1);
        assert!(in_a.is_empty());
        assert!(out_b.is_empty());
        assert_eq!(in_b.len(), 1);
        assert_eq!(in_b[0].relationship_type.inverse_label(), "blocked_by");
    }

    #[test]
    fn test_association_rejections() {
        let (mut storage, _, project) = seeded();
        let a = task(&project, "A");
        let b = task(&project, "B");
        storage.bulk_create_items(&[a.clone(), b.clone()], ACTOR).unwrap();
        let ra = EntityRef::new(EntityKind::Task, &a.id);
        let rb = EntityRef::new(EntityKind::Task, &b.id);

        let self_link = Association::new(&ra, &ra, RelationshipType::RelatesTo, ACTOR);
        assert!(matches!(
            storage.create_association(&self_link, ACTOR),
            Err(Error::InvalidArgument(_))
        ));

        let first = Association::new(&ra, &rb, RelationshipType::Blocks, ACTOR);
        storage.create_association(&first, ACTOR).unwrap();
        let again = Association::new(&ra, &rb, RelationshipType::Blocks, ACTOR);
        assert!(matches!(
            storage.create_association(&again, ACTOR),
            Err(Error::DuplicateAssociation { .. })
        ));

        let missing = EntityRef::new(EntityKind::Milestone, "ms_missing");
        let dangling = Association::new(&ra, &missing, RelationshipType::Aids, ACTOR);
        assert!(matches!(
            storage.create_association(&dangling, ACTOR),
            Err(Error::NotFound { kind: "Milestone", .. })
        ));
    }

    #[test]
    fn test_hierarchy_cycle_rejected() {
        let (mut storage, _, project) = seeded();
        let a = task(&project, "A");
        let b = task(&project, "B");
        let c = task(&project, "C");
        storage
            .bulk_create_items(&[a.clone(), b.clone(), c.clone()], ACTOR)
            .unwrap();
        let ra = EntityRef::new(EntityKind::Task, &a.id);
        let rb = EntityRef::new(EntityKind::Task, &b.id);
        let rc = EntityRef::new(EntityKind::Task, &c.id);

        storage
            .create_association(&Association::new(&ra, &rb, RelationshipType::ParentOf, ACTOR), ACTOR)
            .unwrap();
        // c child_of b  ==  b parent_of c
        storage
            .create_association(&Association::new(&rc, &rb, RelationshipType::ChildOf, ACTOR), ACTOR)
            .unwrap();

        let closing = Association::new(&rc, &ra, RelationshipType::ParentOf, ACTOR);
        assert!(matches!(
            storage.create_association(&closing, ACTOR),
            Err(Error::CycleDetected { .. })
        ));

        // Non-hierarchical links may point back freely
        let back = Association::new(&rc, &ra, RelationshipType::Blocks, ACTOR);
        assert!(storage.create_association(&back, ACTOR).is_ok());
    }

    #[test]
    fn test_deleting_endpoint_removes_associations() {
        let (mut storage, _, project) = seeded();
        let a = task(&project, "A");
        let b = task(&project, "B");
        storage.bulk_create_items(&[a.clone(), b.clone()], ACTOR).unwrap();
        let ra = EntityRef::new(EntityKind::Task, &a.id);
        let rb = EntityRef::new(EntityKind::Task, &b.id);
        storage
            .create_association(&Association::new(&ra, &rb, RelationshipType::DependsOn, ACTOR), ACTOR)
            .unwrap();

        storage.delete_project(&project.id, ACTOR).unwrap();
        assert!(storage.outgoing_associations(&ra).unwrap().is_empty());
    }

    #[test]
    fn test_team_membership() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let team = Team::new("Core".into(), ACTOR.into());
        storage.create_team(&team, ACTOR).unwrap();

        let members = storage.list_team_members(&team.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, TeamRole::Lead);

        let bo = TeamMember::new(&team.id, "bo@acme.io", TeamRole::Member);
        storage.add_team_member(&bo, ACTOR).unwrap();
        assert!(storage.add_team_member(&bo, ACTOR).is_err());

        storage
            .set_member_role(&team.id, "bo@acme.io", TeamRole::Viewer, ACTOR)
            .unwrap();
        let members = storage.list_team_members(&team.id).unwrap();
        assert_eq!(members[1].role, TeamRole::Viewer);

        assert_eq!(storage.list_teams(Some("bo@acme.io")).unwrap().len(), 1);
        storage.remove_team_member(&team.id, "bo@acme.io", ACTOR).unwrap();
        assert!(storage.list_teams(Some("bo@acme.io")).unwrap().is_empty());
    }

    #[test]
    fn test_team_venture_visibility() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let team = Team::new("Core".into(), ACTOR.into());
        storage.create_team(&team, ACTOR).unwrap();
        storage
            .add_team_member(&TeamMember::new(&team.id, "bo@acme.io", TeamRole::Member), ACTOR)
            .unwrap();

        let venture = Venture::new("Acme".into(), ACTOR.into()).with_team(&team.id);
        storage.create_venture(&venture, ACTOR).unwrap();

        assert_eq!(storage.list_ventures(Some("bo@acme.io"), None).unwrap().len(), 1);
    }

    #[test]
    fn test_template_round_trip() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut tpl = ProjectTemplate::new("Launch".into(), ACTOR.into());
        tpl.category = Some("marketing".into());
        tpl.tasks.push(TemplateTask {
            title: "Press kit".into(),
            description: None,
            item_type: ItemType::Task,
            s_sextant: Some(2),
            t_time: None,
            e_effort: None,
            p_priority: Some(3),
            milestone_index: None,
            subtasks: Vec::new(),
        });
        storage.create_template(&tpl, ACTOR).unwrap();

        let loaded = storage.get_template(&tpl.id).unwrap().unwrap();
        assert_eq!(loaded.tasks, tpl.tasks);
        assert_eq!(storage.list_templates(Some("marketing")).unwrap().len(), 1);
        assert!(storage.list_templates(Some("ops")).unwrap().is_empty());

        storage.delete_template(&tpl.id, ACTOR).unwrap();
        assert!(storage.get_template(&tpl.id).unwrap().is_none());
    }

    #[test]
    fn test_template_step_validation() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut tpl = ProjectTemplate::new("Launch".into(), ACTOR.into());
        tpl.tasks.push(TemplateTask {
            title: "Press kit".into(),
            description: None,
            item_type: ItemType::Task,
            s_sextant: Some(9),
            t_time: None,
            e_effort: None,
            p_priority: None,
            milestone_index: None,
            subtasks: Vec::new(),
        });
        assert!(matches!(
            storage.create_template(&tpl, ACTOR),
            Err(Error::InvalidStep { field: "sextant", value: 9, .. })
        ));
        assert!(storage.get_template(&tpl.id).unwrap().is_none());
    }

    #[test]
    fn test_users_sessions_and_plans() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_user(&User::new("Ana@Acme.io"), ACTOR).unwrap();
        assert!(storage.create_user(&User::new("ana@acme.io"), ACTOR).is_err());

        let invited = User::invited("bo@acme.io", UserRole::User, ACTOR);
        storage.create_user(&invited, ACTOR).unwrap();
        assert_eq!(storage.list_users().unwrap().len(), 2);

        let now = now_millis();
        storage
            .create_user_session("ana@acme.io", "hash-1", now + 1_000, ACTOR)
            .unwrap();
        assert_eq!(
            storage.session_user("hash-1", now).unwrap().as_deref(),
            Some("ana@acme.io")
        );
        assert!(storage.session_user("hash-1", now + 2_000).unwrap().is_none());
        assert!(storage.session_user("nope", now).unwrap().is_none());
        assert_eq!(storage.purge_expired_sessions(now + 2_000).unwrap(), 1);

        assert_eq!(storage.get_subscription("ana@acme.io").unwrap().plan, Plan::Free);
        let sub = storage
            .set_plan("ana@acme.io", Plan::Pro, SubscriptionStatus::Active, ACTOR)
            .unwrap();
        assert_eq!(sub.plan, Plan::Pro);
        assert_eq!(storage.get_subscription("ana@acme.io").unwrap().plan, Plan::Pro);
    }

    #[test]
    fn test_project_bundle_records_template_event() {
        let (mut storage, venture, _) = seeded();
        let project = Project::new(venture.id.clone(), "From template".into(), ACTOR.into());
        let milestone = Milestone::new(project.id.clone(), "Kickoff".into());
        let item = Item::new("Plan".into(), ACTOR.into())
            .in_scope(Some(&venture.id), Some(&project.id));

        storage
            .create_project_bundle(&project, &[milestone], &[item], Some("tpl_1"), ACTOR)
            .unwrap();

        assert_eq!(storage.list_milestones(&project.id).unwrap().len(), 1);
        let events = storage.get_events("template", "tpl_1", None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].comment.as_deref(), Some(project.id.as_str()));
    }

    #[test]
    fn test_record_ids() {
        let (storage, venture, _) = seeded();
        assert_eq!(storage.record_ids("venture").unwrap(), vec![venture.id]);
        assert!(storage.record_ids("unknown").unwrap().is_empty());
    }
}
