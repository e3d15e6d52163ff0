//! Venture management commands.
//!
//! - `vt venture create <name>` - Create a venture owned by the current user
//! - `vt venture list` - Ventures the current user owns or collaborates on
//! - `vt venture show <id>` - Venture details with its projects
//! - `vt venture update <id>` - Update a venture
//! - `vt venture delete <id>` - Delete a venture and everything under it

use serde::Serialize;

use super::{not_found, parse_enum, print_json, truncate, Context};
use crate::cli::VentureCommands;
use crate::error::Result;
use crate::model::{Project, Venture, VentureStatus, VentureUpdate};
use crate::storage::SqliteStorage;

#[derive(Serialize)]
struct VentureListOutput {
    ventures: Vec<Venture>,
    count: usize,
}

#[derive(Serialize)]
struct VentureDetail {
    #[serde(flatten)]
    venture: Venture,
    projects: Vec<Project>,
}

/// Execute a venture command.
///
/// # Errors
///
/// Returns an error if the database is missing, the venture doesn't exist,
/// or the current user can't be resolved for commands that need one.
pub fn execute(command: &VentureCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;

    match command {
        VentureCommands::Create {
            name,
            description,
            team,
            color,
        } => execute_create(
            &mut storage,
            ctx,
            name,
            description.as_deref(),
            team.as_deref(),
            color.as_deref(),
        ),
        VentureCommands::List { status, all } => {
            execute_list(&storage, ctx, status.as_deref(), *all)
        }
        VentureCommands::Show { id } => execute_show(&storage, ctx, id),
        VentureCommands::Update {
            id,
            name,
            description,
            status,
            team,
            color,
        } => {
            let update = VentureUpdate {
                name: name.clone(),
                description: description.clone(),
                status: status
                    .as_deref()
                    .map(|s| parse_enum::<VentureStatus>("venture status", s))
                    .transpose()?,
                team_id: team.clone(),
                color: color.clone(),
            };
            execute_update(&mut storage, ctx, id, &update)
        }
        VentureCommands::Delete { id } => execute_delete(&mut storage, ctx, id),
    }
}

fn execute_create(
    storage: &mut SqliteStorage,
    ctx: &Context<'_>,
    name: &str,
    description: Option<&str>,
    team: Option<&str>,
    color: Option<&str>,
) -> Result<()> {
    let owner = ctx.current_user(storage)?;

    let mut venture = Venture::new(name.to_string(), owner.email.clone());
    if let Some(desc) = description {
        venture = venture.with_description(desc);
    }
    if let Some(team_id) = team {
        venture = venture.with_team(team_id);
    }
    venture.color = color.map(String::from);

    storage.create_venture(&venture, &ctx.actor())?;

    if crate::is_silent() {
        println!("{}", venture.id);
        return Ok(());
    }

    if ctx.json {
        print_json(&venture)?;
    } else {
        println!("Created venture: {}", venture.name);
        println!("  ID: {}", venture.id);
        println!("  Owner: {}", venture.owner);
        if let Some(team_id) = &venture.team_id {
            println!("  Team: {team_id}");
        }
    }
    Ok(())
}

fn execute_list(
    storage: &SqliteStorage,
    ctx: &Context<'_>,
    status: Option<&str>,
    all: bool,
) -> Result<()> {
    let status = status
        .map(|s| parse_enum::<VentureStatus>("venture status", s))
        .transpose()?;
    let user = if all { None } else { ctx.user_email() };
    let ventures = storage.list_ventures(user.as_deref(), status)?;

    if crate::is_silent() {
        for v in &ventures {
            println!("{}", v.id);
        }
        return Ok(());
    }

    if ctx.json {
        return print_json(&VentureListOutput {
            count: ventures.len(),
            ventures,
        });
    }

    if ventures.is_empty() {
        println!("No ventures found.");
        println!("\nCreate one with: vt venture create <name>");
        return Ok(());
    }

    println!("Ventures ({} found):", ventures.len());
    println!();
    for v in &ventures {
        println!(
            "  {:<18} {:<32} {:<9} {}",
            v.id,
            truncate(&v.name, 32),
            v.status,
            v.owner
        );
    }
    Ok(())
}

fn execute_show(storage: &SqliteStorage, ctx: &Context<'_>, id: &str) -> Result<()> {
    let venture = storage
        .get_venture(id)?
        .ok_or_else(|| not_found(storage, "Venture", id))?;
    let projects = storage.list_projects(Some(&venture.id))?;

    if ctx.json {
        return print_json(&VentureDetail { venture, projects });
    }

    println!("{}", venture.name);
    println!("  ID: {}", venture.id);
    println!("  Status: {}", venture.status);
    println!("  Owner: {}", venture.owner);
    if let Some(team_id) = &venture.team_id {
        println!("  Team: {team_id}");
    }
    if let Some(color) = &venture.color {
        println!("  Color: {color}");
    }
    if let Some(desc) = &venture.description {
        println!("  Description: {desc}");
    }

    println!();
    if projects.is_empty() {
        println!("No projects yet.");
    } else {
        println!("Projects ({}):", projects.len());
        for p in &projects {
            println!("  {:<18} {:<32} {}", p.id, truncate(&p.name, 32), p.status);
        }
    }
    Ok(())
}

fn execute_update(
    storage: &mut SqliteStorage,
    ctx: &Context<'_>,
    id: &str,
    update: &VentureUpdate,
) -> Result<()> {
    if storage.get_venture(id)?.is_none() {
        return Err(not_found(storage, "Venture", id));
    }
    storage.update_venture(id, update, &ctx.actor())?;

    if crate::is_silent() {
        println!("{id}");
        return Ok(());
    }

    let venture = storage
        .get_venture(id)?
        .ok_or_else(|| not_found(storage, "Venture", id))?;
    if ctx.json {
        print_json(&venture)?;
    } else {
        println!("Updated venture: {}", venture.name);
    }
    Ok(())
}

fn execute_delete(storage: &mut SqliteStorage, ctx: &Context<'_>, id: &str) -> Result<()> {
    let venture = storage
        .get_venture(id)?
        .ok_or_else(|| not_found(storage, "Venture", id))?;
    storage.delete_venture(id, &ctx.actor())?;

    if crate::is_silent() {
        println!("{id}");
    } else if ctx.json {
        print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
    } else {
        println!("Deleted venture: {} ({id})", venture.name);
    }
    Ok(())
}
