//! Project management commands.
//!
//! - `vt project create <name> --venture <id>` - Create a project
//! - `vt project list` - List projects
//! - `vt project show <id>` - Project with milestones, workstreams and item counts
//! - `vt project update <id>` - Update a project
//! - `vt project delete <id>` - Delete a project and everything under it

use serde::Serialize;

use super::{format_millis, not_found, parse_enum, parse_opt_date, print_json, truncate, Context};
use crate::cli::ProjectCommands;
use crate::error::Result;
use crate::model::{ItemStatus, Milestone, Project, ProjectStatus, ProjectUpdate, Workstream};
use crate::storage::{ItemQuery, SqliteStorage};

#[derive(Serialize)]
struct ProjectListOutput {
    projects: Vec<Project>,
    count: usize,
}

#[derive(Serialize)]
struct ProjectDetail {
    #[serde(flatten)]
    project: Project,
    milestones: Vec<Milestone>,
    workstreams: Vec<Workstream>,
    item_count: usize,
    completed_count: usize,
}

/// Execute a project command.
///
/// # Errors
///
/// Returns an error if the database is missing, a referenced record doesn't
/// exist, or an argument doesn't parse.
pub fn execute(command: &ProjectCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;

    match command {
        ProjectCommands::Create {
            name,
            venture,
            description,
            start,
            target,
        } => {
            let mut project = Project::new(venture.clone(), name.clone(), ctx.actor())
                .with_dates(parse_opt_date(start.as_deref())?, parse_opt_date(target.as_deref())?);
            if let Some(desc) = description {
                project = project.with_description(desc);
            }
            execute_create(&mut storage, ctx, &project)
        }
        ProjectCommands::List { venture } => execute_list(&storage, ctx, venture.as_deref()),
        ProjectCommands::Show { id } => execute_show(&storage, ctx, id),
        ProjectCommands::Update {
            id,
            name,
            description,
            status,
            start,
            target,
        } => {
            let update = ProjectUpdate {
                name: name.clone(),
                description: description.clone(),
                status: status
                    .as_deref()
                    .map(|s| parse_enum::<ProjectStatus>("project status", s))
                    .transpose()?,
                start_date: parse_opt_date(start.as_deref())?,
                target_date: parse_opt_date(target.as_deref())?,
            };
            execute_update(&mut storage, ctx, id, &update)
        }
        ProjectCommands::Delete { id } => execute_delete(&mut storage, ctx, id),
    }
}

fn execute_create(storage: &mut SqliteStorage, ctx: &Context<'_>, project: &Project) -> Result<()> {
    if storage.get_venture(&project.venture_id)?.is_none() {
        return Err(not_found(storage, "Venture", &project.venture_id));
    }
    storage.create_project(project, &ctx.actor())?;

    if crate::is_silent() {
        println!("{}", project.id);
        return Ok(());
    }

    if ctx.json {
        print_json(project)?;
    } else {
        println!("Created project: {}", project.name);
        println!("  ID: {}", project.id);
        println!("  Venture: {}", project.venture_id);
    }
    Ok(())
}

fn execute_list(storage: &SqliteStorage, ctx: &Context<'_>, venture: Option<&str>) -> Result<()> {
    let projects = storage.list_projects(venture)?;

    if crate::is_silent() {
        for p in &projects {
            println!("{}", p.id);
        }
        return Ok(());
    }

    if ctx.json {
        return print_json(&ProjectListOutput {
            count: projects.len(),
            projects,
        });
    }

    if projects.is_empty() {
        println!("No projects found.");
        println!("\nCreate one with: vt project create <name> --venture <id>");
        return Ok(());
    }

    println!("Projects ({} found):", projects.len());
    println!();
    for p in &projects {
        let target = p
            .target_date
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        println!(
            "  {:<18} {:<32} {:<10} {:<10} {}",
            p.id,
            truncate(&p.name, 32),
            p.status,
            target,
            p.venture_id
        );
    }
    Ok(())
}

fn execute_show(storage: &SqliteStorage, ctx: &Context<'_>, id: &str) -> Result<()> {
    let project = storage
        .get_project(id)?
        .ok_or_else(|| not_found(storage, "Project", id))?;
    let milestones = storage.list_milestones(&project.id)?;
    let workstreams = storage.list_workstreams(&project.id)?;
    let items = storage.list_items(&ItemQuery::project(&project.id))?;
    let completed_count = items
        .iter()
        .filter(|i| i.status == ItemStatus::Completed)
        .count();

    if ctx.json {
        return print_json(&ProjectDetail {
            item_count: items.len(),
            completed_count,
            project,
            milestones,
            workstreams,
        });
    }

    println!("{}", project.name);
    println!("  ID: {}", project.id);
    println!("  Venture: {}", project.venture_id);
    println!("  Status: {}", project.status);
    if let Some(start) = project.start_date {
        println!("  Start: {start}");
    }
    if let Some(target) = project.target_date {
        println!("  Target: {target}");
    }
    if let Some(desc) = &project.description {
        println!("  Description: {desc}");
    }
    println!("  Items: {completed_count}/{} completed", items.len());
    println!("  Created: {}", format_millis(project.created_at));

    if !milestones.is_empty() {
        println!();
        println!("Milestones:");
        for m in &milestones {
            let due = m.due_date.map_or_else(|| "-".to_string(), |d| d.to_string());
            println!("  {}. {:<32} {:<12} {due}  [{}]", m.position, truncate(&m.title, 32), m.status, m.id);
        }
    }
    if !workstreams.is_empty() {
        println!();
        println!("Workstreams:");
        for w in &workstreams {
            println!(
                "  {:<32} {:<10} {}  [{}]",
                truncate(&w.name, 32),
                w.status,
                w.lead.as_deref().unwrap_or("-"),
                w.id
            );
        }
    }
    Ok(())
}

fn execute_update(
    storage: &mut SqliteStorage,
    ctx: &Context<'_>,
    id: &str,
    update: &ProjectUpdate,
) -> Result<()> {
    if storage.get_project(id)?.is_none() {
        return Err(not_found(storage, "Project", id));
    }
    storage.update_project(id, update, &ctx.actor())?;

    if crate::is_silent() {
        println!("{id}");
        return Ok(());
    }

    let project = storage
        .get_project(id)?
        .ok_or_else(|| not_found(storage, "Project", id))?;
    if ctx.json {
        print_json(&project)?;
    } else {
        println!("Updated project: {}", project.name);
    }
    Ok(())
}

fn execute_delete(storage: &mut SqliteStorage, ctx: &Context<'_>, id: &str) -> Result<()> {
    let project = storage
        .get_project(id)?
        .ok_or_else(|| not_found(storage, "Project", id))?;
    storage.delete_project(id, &ctx.actor())?;

    if crate::is_silent() {
        println!("{id}");
    } else if ctx.json {
        print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
    } else {
        println!("Deleted project: {} ({id})", project.name);
    }
    Ok(())
}
