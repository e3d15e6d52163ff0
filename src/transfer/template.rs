//! Project templates: snapshot, apply, and the JSON file envelope.
//!
//! # File Format
//!
//! ```json
//! {"version":"1.0","exportedAt":"2026-03-01T10:00:00+00:00","template":{"name":"Launch","tasks":[...],"milestones":[...]}}
//! ```

use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    Item, ItemType, Milestone, Project, ProjectTemplate, TemplateMilestone, TemplateSubtask,
    TemplateTask,
};
use crate::storage::{ItemQuery, SqliteStorage};
use crate::transfer::file::atomic_write;

/// Envelope format version written by this build.
pub const TEMPLATE_FORMAT_VERSION: &str = "1.0";

/// Suffix appended to the name of an imported template.
pub const IMPORTED_SUFFIX: &str = " (Imported)";

/// On-disk wrapper around an exported template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEnvelope {
    pub version: String,
    pub exported_at: String,
    pub template: ProjectTemplate,
}

/// Template body as read from a file. Only `name` is required.
#[derive(Debug, Deserialize)]
struct ImportedBody {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tasks: Vec<TemplateTask>,
    #[serde(default)]
    milestones: Vec<TemplateMilestone>,
}

// ======================
// Snapshot / Apply
// ======================

/// Build a template from a project's milestones, root items and subtasks.
///
/// Milestone due dates become offsets from the project start when both
/// dates are known.
///
/// # Errors
///
/// Returns an error if the project doesn't exist or a query fails.
pub fn snapshot(
    storage: &SqliteStorage,
    project_id: &str,
    name: &str,
    created_by: &str,
) -> Result<ProjectTemplate> {
    let project = storage
        .get_project(project_id)?
        .ok_or_else(|| Error::not_found("Project", project_id))?;
    let milestones = storage.list_milestones(project_id)?;

    let mut template = ProjectTemplate::new(name.to_string(), created_by.to_string());
    template.description = project.description.clone();
    template.milestones = milestones
        .iter()
        .map(|m| TemplateMilestone {
            title: m.title.clone(),
            description: m.description.clone(),
            offset_days: project
                .start_date
                .zip(m.due_date)
                .map(|(start, due)| (due - start).num_days()),
        })
        .collect();

    let roots = storage.list_items(&ItemQuery {
        project_id: Some(project_id.to_string()),
        roots_only: true,
        ..ItemQuery::default()
    })?;

    for root in roots {
        let subtasks = storage
            .list_items(&ItemQuery::children_of(&root.id))?
            .into_iter()
            .map(|child| TemplateSubtask {
                title: child.title,
                description: child.description,
            })
            .collect();

        template.tasks.push(TemplateTask {
            milestone_index: root
                .milestone_id
                .as_ref()
                .and_then(|mid| milestones.iter().position(|m| &m.id == mid)),
            title: root.title,
            description: root.description,
            item_type: root.item_type,
            s_sextant: root.s_sextant,
            t_time: root.t_time,
            e_effort: root.e_effort,
            p_priority: root.p_priority,
            subtasks,
        });
    }

    Ok(template)
}

/// Records to create when applying a template.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub project: Project,
    pub milestones: Vec<Milestone>,
    /// Parents precede their subtasks.
    pub items: Vec<Item>,
}

/// Expand a template into a new project under `venture_id`.
///
/// # Errors
///
/// Returns `InvalidTemplate` if a task points at a milestone index the
/// template doesn't have.
pub fn instantiate(
    template: &ProjectTemplate,
    venture_id: &str,
    project_name: &str,
    start_date: Option<NaiveDate>,
    created_by: &str,
) -> Result<Blueprint> {
    let mut project = Project::new(
        venture_id.to_string(),
        project_name.to_string(),
        created_by.to_string(),
    )
    .with_dates(start_date, None);
    project.description = template.description.clone();

    let milestones: Vec<Milestone> = template
        .milestones
        .iter()
        .zip(0_i64..)
        .map(|(tm, position)| {
            let mut m = Milestone::new(project.id.clone(), tm.title.clone())
                .with_position(position)
                .with_due_date(
                    start_date
                        .zip(tm.offset_days)
                        .map(|(start, days)| start + Duration::days(days)),
                );
            m.description = tm.description.clone();
            m
        })
        .collect();

    let mut items = Vec::with_capacity(template.item_count());
    for task in &template.tasks {
        let milestone_id = match task.milestone_index {
            Some(idx) => Some(
                milestones
                    .get(idx)
                    .map(|m| m.id.clone())
                    .ok_or_else(|| {
                        Error::InvalidTemplate(format!(
                            "task '{}' refers to milestone {idx}, but the template has {}",
                            task.title,
                            milestones.len()
                        ))
                    })?,
            ),
            None => None,
        };

        let mut parent = Item::new(task.title.clone(), created_by.to_string())
            .with_type(task.item_type)
            .in_scope(Some(venture_id), Some(&project.id))
            .with_step(task.s_sextant, task.t_time, task.e_effort, task.p_priority);
        parent.description = task.description.clone();
        parent.milestone_id = milestone_id;

        let children: Vec<Item> = task
            .subtasks
            .iter()
            .map(|sub| {
                let mut child = Item::new(sub.title.clone(), created_by.to_string())
                    .with_type(ItemType::Task)
                    .in_scope(Some(venture_id), Some(&project.id))
                    .with_parent(&parent.id);
                child.description = sub.description.clone();
                child.milestone_id = parent.milestone_id.clone();
                child
            })
            .collect();

        items.push(parent);
        items.extend(children);
    }

    Ok(Blueprint {
        project,
        milestones,
        items,
    })
}

/// Create a project from a stored template in one transaction.
///
/// # Errors
///
/// Returns an error if the template or venture doesn't exist, the template
/// is inconsistent, or any insert fails.
pub fn apply(
    storage: &mut SqliteStorage,
    template_id: &str,
    venture_id: &str,
    project_name: &str,
    start_date: Option<NaiveDate>,
    actor: &str,
) -> Result<Blueprint> {
    let template = storage
        .get_template(template_id)?
        .ok_or_else(|| Error::not_found("Template", template_id))?;

    let blueprint = instantiate(&template, venture_id, project_name, start_date, actor)?;
    storage.create_project_bundle(
        &blueprint.project,
        &blueprint.milestones,
        &blueprint.items,
        Some(&template.id),
        actor,
    )?;

    tracing::info!(
        template = %template.id,
        project = %blueprint.project.id,
        items = blueprint.items.len(),
        "applied template"
    );
    Ok(blueprint)
}

// ======================
// Export / Import
// ======================

/// Wrap a template in the export envelope.
#[must_use]
pub fn envelope(template: &ProjectTemplate) -> TemplateEnvelope {
    TemplateEnvelope {
        version: TEMPLATE_FORMAT_VERSION.to_string(),
        exported_at: chrono::Utc::now().to_rfc3339(),
        template: template.clone(),
    }
}

/// Write a template to `path` as a pretty-printed envelope.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn export_to_file(template: &ProjectTemplate, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&envelope(template))?;
    atomic_write(path, &json)
}

/// Parse an envelope into a new template owned by `created_by`.
///
/// The result gets a fresh ID and the name `"<name> (Imported)"`; tasks and
/// milestones are kept exactly.
///
/// # Errors
///
/// Returns `InvalidTemplate` if the text isn't JSON, lacks the `version` or
/// `template` keys, the template body is malformed, or a task has a STEP
/// value out of range.
pub fn parse_envelope(text: &str, created_by: &str) -> Result<ProjectTemplate> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::InvalidTemplate(e.to_string()))?;

    let version = value
        .get("version")
        .ok_or_else(|| Error::InvalidTemplate("missing \"version\" key".to_string()))?;
    let body = value
        .get("template")
        .ok_or_else(|| Error::InvalidTemplate("missing \"template\" key".to_string()))?;

    if version.as_str() != Some(TEMPLATE_FORMAT_VERSION) {
        tracing::warn!(%version, "importing template with unrecognized format version");
    }

    let body: ImportedBody = serde_json::from_value(body.clone())
        .map_err(|e| Error::InvalidTemplate(e.to_string()))?;

    for (index, task) in body.tasks.iter().enumerate() {
        task.validate_step()
            .map_err(|e| Error::InvalidTemplate(format!("task {}: {e}", index + 1)))?;
    }

    let mut template = ProjectTemplate::new(
        format!("{}{IMPORTED_SUFFIX}", body.name),
        created_by.to_string(),
    );
    template.description = body.description;
    template.category = body.category;
    template.tasks = body.tasks;
    template.milestones = body.milestones;
    Ok(template)
}

/// Read an exported template file and store it as a new template.
///
/// # Errors
///
/// Returns an error if the file can't be read, isn't a valid envelope, or
/// the insert fails.
pub fn import_from_file(
    storage: &mut SqliteStorage,
    path: &Path,
    actor: &str,
) -> Result<ProjectTemplate> {
    let text = std::fs::read_to_string(path)?;
    let template = parse_envelope(&text, actor)?;
    storage.create_template(&template, actor)?;
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Venture;
    use tempfile::TempDir;

    const ACTOR: &str = "ana@acme.io";

    fn sample_template() -> ProjectTemplate {
        let mut tpl = ProjectTemplate::new("Launch".into(), ACTOR.into());
        tpl.category = Some("marketing".into());
        tpl.milestones = vec![
            TemplateMilestone {
                title: "Beta".into(),
                description: None,
                offset_days: Some(14),
            },
            TemplateMilestone {
                title: "GA".into(),
                description: Some("General availability".into()),
                offset_days: Some(30),
            },
        ];
        tpl.tasks = vec![TemplateTask {
            title: "Press kit".into(),
            description: Some("Everything journalists need".into()),
            item_type: ItemType::Task,
            s_sextant: Some(2),
            t_time: Some(2),
            e_effort: None,
            p_priority: Some(3),
            milestone_index: Some(1),
            subtasks: vec![
                TemplateSubtask {
                    title: "Logo pack".into(),
                    description: None,
                },
                TemplateSubtask {
                    title: "Founder bios".into(),
                    description: None,
                },
            ],
        }];
        tpl
    }

    fn storage_with_venture() -> (SqliteStorage, Venture) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let venture = Venture::new("Acme".into(), ACTOR.into());
        storage.create_venture(&venture, ACTOR).unwrap();
        (storage, venture)
    }

    #[test]
    fn test_export_import_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("launch.json");
        let tpl = sample_template();

        export_to_file(&tpl, &path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], "1.0");
        assert!(raw["exportedAt"].is_string());

        let (mut storage, _) = storage_with_venture();
        let imported = import_from_file(&mut storage, &path, ACTOR).unwrap();
        assert_ne!(imported.id, tpl.id);
        assert_eq!(imported.name, "Launch (Imported)");
        assert_eq!(imported.tasks, tpl.tasks);
        assert_eq!(imported.milestones, tpl.milestones);
        assert!(storage.get_template(&imported.id).unwrap().is_some());
    }

    #[test]
    fn test_import_requires_keys() {
        let err = parse_envelope(r#"{"template":{"name":"x"}}"#, ACTOR).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
        assert!(err.to_string().starts_with("Invalid template file"));

        let err = parse_envelope(r#"{"version":"1.0"}"#, ACTOR).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));

        let err = parse_envelope("not json", ACTOR).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
    }

    #[test]
    fn test_import_rejects_out_of_range_step() {
        let text = r#"{
            "version": "1.0",
            "template": {
                "name": "Launch",
                "tasks": [
                    {"title": "Fine", "s_sextant": 2},
                    {"title": "Press kit", "s_sextant": 9, "p_priority": 0}
                ]
            }
        }"#;
        let err = parse_envelope(text, ACTOR).unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
        assert!(err.to_string().contains("task 2"));

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad-step.json");
        std::fs::write(&path, text).unwrap();
        let (mut storage, _) = storage_with_venture();
        assert!(import_from_file(&mut storage, &path, ACTOR).is_err());
        assert!(storage.list_templates(None).unwrap().is_empty());
    }

    #[test]
    fn test_instantiate_layout() {
        let tpl = sample_template();
        let start = NaiveDate::from_ymd_opt(2026, 3, 1);
        let bp = instantiate(&tpl, "ven_1", "Spring launch", start, ACTOR).unwrap();

        assert_eq!(bp.project.name, "Spring launch");
        assert_eq!(bp.milestones.len(), 2);
        assert_eq!(bp.milestones[1].position, 1);
        assert_eq!(bp.milestones[1].due_date, NaiveDate::from_ymd_opt(2026, 3, 31));

        assert_eq!(bp.items.len(), 3);
        let parent = &bp.items[0];
        assert_eq!(parent.milestone_id.as_deref(), Some(bp.milestones[1].id.as_str()));
        assert_eq!(parent.p_priority, Some(3));
        assert!(bp.items[1..]
            .iter()
            .all(|c| c.parent_id.as_deref() == Some(parent.id.as_str())));
    }

    #[test]
    fn test_instantiate_rejects_bad_milestone_index() {
        let mut tpl = sample_template();
        tpl.tasks[0].milestone_index = Some(9);
        assert!(matches!(
            instantiate(&tpl, "ven_1", "x", None, ACTOR),
            Err(Error::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_apply_then_snapshot_reproduces_template() {
        let (mut storage, venture) = storage_with_venture();
        let tpl = sample_template();
        storage.create_template(&tpl, ACTOR).unwrap();

        let start = NaiveDate::from_ymd_opt(2026, 3, 1);
        let bp = apply(&mut storage, &tpl.id, &venture.id, "Spring", start, ACTOR).unwrap();

        let snap = snapshot(&storage, &bp.project.id, "Copy", ACTOR).unwrap();
        assert_eq!(snap.milestones, tpl.milestones);
        assert_eq!(snap.tasks, tpl.tasks);
    }
}
