//! Milestone commands.

use super::{not_found, parse_date, parse_enum, parse_opt_date, print_json, truncate, Context};
use crate::cli::MilestoneCommands;
use crate::error::Result;
use crate::model::{Milestone, MilestoneStatus, MilestoneUpdate};
use crate::storage::SqliteStorage;

/// Execute a milestone command.
///
/// # Errors
///
/// Returns an error if the database is missing, the project or milestone
/// doesn't exist, or an argument doesn't parse.
pub fn execute(command: &MilestoneCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;

    match command {
        MilestoneCommands::Create {
            title,
            project,
            description,
            due,
            position,
        } => {
            if storage.get_project(project)?.is_none() {
                return Err(not_found(&storage, "Project", project));
            }
            // Append after the last existing milestone unless told otherwise.
            let position = match position {
                Some(p) => *p,
                None => storage
                    .list_milestones(project)?
                    .iter()
                    .map(|m| m.position + 1)
                    .max()
                    .unwrap_or(0),
            };
            let mut milestone = Milestone::new(project.clone(), title.clone())
                .with_due_date(parse_opt_date(due.as_deref())?)
                .with_position(position);
            milestone.description = description.clone();

            storage.create_milestone(&milestone, &ctx.actor())?;
            output_one(ctx, &milestone, "Created")
        }
        MilestoneCommands::List { project } => {
            let milestones = storage.list_milestones(project)?;
            if crate::is_silent() {
                for m in &milestones {
                    println!("{}", m.id);
                }
            } else if ctx.json {
                print_json(&serde_json::json!({
                    "milestones": milestones,
                    "count": milestones.len(),
                }))?;
            } else if milestones.is_empty() {
                println!("No milestones in {project}.");
            } else {
                for m in &milestones {
                    let due = m.due_date.map_or_else(|| "-".to_string(), |d| d.to_string());
                    println!(
                        "  {:>2}. {:<18} {:<32} {:<12} {due}",
                        m.position,
                        m.id,
                        truncate(&m.title, 32),
                        m.status
                    );
                }
            }
            Ok(())
        }
        MilestoneCommands::Show { id } => {
            let milestone = get(&storage, id)?;
            if ctx.json {
                return print_json(&milestone);
            }
            println!("{}", milestone.title);
            println!("  ID: {}", milestone.id);
            println!("  Project: {}", milestone.project_id);
            println!("  Status: {}", milestone.status);
            println!("  Position: {}", milestone.position);
            if let Some(due) = milestone.due_date {
                println!("  Due: {due}");
            }
            if let Some(desc) = &milestone.description {
                println!("  Description: {desc}");
            }
            Ok(())
        }
        MilestoneCommands::Update {
            id,
            title,
            description,
            due,
            status,
            position,
        } => {
            get(&storage, id)?;
            let update = MilestoneUpdate {
                title: title.clone(),
                description: description.clone(),
                due_date: due.as_deref().map(parse_date).transpose()?,
                status: status
                    .as_deref()
                    .map(|s| parse_enum::<MilestoneStatus>("milestone status", s))
                    .transpose()?,
                position: *position,
            };
            storage.update_milestone(id, &update, &ctx.actor())?;
            let milestone = get(&storage, id)?;
            output_one(ctx, &milestone, "Updated")
        }
        MilestoneCommands::Delete { id } => {
            let milestone = get(&storage, id)?;
            storage.delete_milestone(id, &ctx.actor())?;
            if crate::is_silent() {
                println!("{id}");
            } else if ctx.json {
                print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
            } else {
                println!("Deleted milestone: {} ({id})", milestone.title);
            }
            Ok(())
        }
    }
}

fn get(storage: &SqliteStorage, id: &str) -> Result<Milestone> {
    storage
        .get_milestone(id)?
        .ok_or_else(|| not_found(storage, "Milestone", id))
}

fn output_one(ctx: &Context<'_>, milestone: &Milestone, verb: &str) -> Result<()> {
    if crate::is_silent() {
        println!("{}", milestone.id);
    } else if ctx.json {
        print_json(milestone)?;
    } else {
        println!("{verb} milestone: {}", milestone.title);
        println!("  ID: {}", milestone.id);
    }
    Ok(())
}
