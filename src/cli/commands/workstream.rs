//! Workstream commands.

use super::{not_found, parse_enum, print_json, truncate, Context};
use crate::cli::WorkstreamCommands;
use crate::error::Result;
use crate::model::{Workstream, WorkstreamStatus, WorkstreamUpdate};
use crate::storage::SqliteStorage;

/// Execute a workstream command.
///
/// # Errors
///
/// Returns an error if the database is missing, the project or workstream
/// doesn't exist, or an argument doesn't parse.
pub fn execute(command: &WorkstreamCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;

    match command {
        WorkstreamCommands::Create {
            name,
            project,
            description,
            lead,
        } => {
            let mut workstream = Workstream::new(project.clone(), name.clone());
            workstream.description = description.clone();
            workstream.lead = lead.as_deref().map(str::to_lowercase);

            storage.create_workstream(&workstream, &ctx.actor())?;
            output_one(ctx, &workstream, "Created")
        }
        WorkstreamCommands::List { project } => {
            let workstreams = storage.list_workstreams(project)?;
            if crate::is_silent() {
                for w in &workstreams {
                    println!("{}", w.id);
                }
            } else if ctx.json {
                print_json(&serde_json::json!({
                    "workstreams": workstreams,
                    "count": workstreams.len(),
                }))?;
            } else if workstreams.is_empty() {
                println!("No workstreams in {project}.");
            } else {
                for w in &workstreams {
                    println!(
                        "  {:<18} {:<32} {:<10} {}",
                        w.id,
                        truncate(&w.name, 32),
                        w.status,
                        w.lead.as_deref().unwrap_or("-")
                    );
                }
            }
            Ok(())
        }
        WorkstreamCommands::Show { id } => {
            let workstream = get(&storage, id)?;
            if ctx.json {
                return print_json(&workstream);
            }
            println!("{}", workstream.name);
            println!("  ID: {}", workstream.id);
            println!("  Project: {}", workstream.project_id);
            println!("  Status: {}", workstream.status);
            if let Some(lead) = &workstream.lead {
                println!("  Lead: {lead}");
            }
            if let Some(desc) = &workstream.description {
                println!("  Description: {desc}");
            }
            Ok(())
        }
        WorkstreamCommands::Update {
            id,
            name,
            description,
            lead,
            status,
        } => {
            get(&storage, id)?;
            let update = WorkstreamUpdate {
                name: name.clone(),
                description: description.clone(),
                lead: lead.as_deref().map(str::to_lowercase),
                status: status
                    .as_deref()
                    .map(|s| parse_enum::<WorkstreamStatus>("workstream status", s))
                    .transpose()?,
            };
            storage.update_workstream(id, &update, &ctx.actor())?;
            let workstream = get(&storage, id)?;
            output_one(ctx, &workstream, "Updated")
        }
        WorkstreamCommands::Delete { id } => {
            let workstream = get(&storage, id)?;
            storage.delete_workstream(id, &ctx.actor())?;
            if crate::is_silent() {
                println!("{id}");
            } else if ctx.json {
                print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
            } else {
                println!("Deleted workstream: {} ({id})", workstream.name);
            }
            Ok(())
        }
    }
}

fn get(storage: &SqliteStorage, id: &str) -> Result<Workstream> {
    storage
        .get_workstream(id)?
        .ok_or_else(|| not_found(storage, "Workstream", id))
}

fn output_one(ctx: &Context<'_>, workstream: &Workstream, verb: &str) -> Result<()> {
    if crate::is_silent() {
        println!("{}", workstream.id);
    } else if ctx.json {
        print_json(workstream)?;
    } else {
        println!("{verb} workstream: {}", workstream.name);
        println!("  ID: {}", workstream.id);
    }
    Ok(())
}
