//! Team commands: membership, roles and capacity.

use serde::Serialize;

use super::{not_found, parse_enum, print_json, truncate, Context};
use crate::cli::TeamCommands;
use crate::error::Result;
use crate::model::{Team, TeamMember, TeamRole};
use crate::planning::{team_capacity, LoadStatus, MemberCapacity};
use crate::storage::SqliteStorage;

#[derive(Serialize)]
struct TeamDetail {
    #[serde(flatten)]
    team: Team,
    members: Vec<TeamMember>,
}

/// Execute a team command.
///
/// # Errors
///
/// Returns an error if the team or member doesn't exist, a role doesn't
/// parse, or the current user can't be resolved for `create`.
pub fn execute(command: &TeamCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;

    match command {
        TeamCommands::Create { name, description } => {
            let owner = ctx.current_user(&storage)?;
            let mut team = Team::new(name.clone(), owner.email);
            team.description = description.clone();
            storage.create_team(&team, &ctx.actor())?;

            if crate::is_silent() {
                println!("{}", team.id);
            } else if ctx.json {
                print_json(&team)?;
            } else {
                println!("Created team: {}", team.name);
                println!("  ID: {}", team.id);
                println!("  Lead: {}", team.owner);
            }
            Ok(())
        }
        TeamCommands::List { all } => {
            let member = if *all { None } else { ctx.user_email() };
            let teams = storage.list_teams(member.as_deref())?;

            if crate::is_silent() {
                for t in &teams {
                    println!("{}", t.id);
                }
            } else if ctx.json {
                print_json(&serde_json::json!({ "teams": teams, "count": teams.len() }))?;
            } else if teams.is_empty() {
                println!("No teams found.");
            } else {
                for t in &teams {
                    println!("  {:<18} {:<32} {}", t.id, truncate(&t.name, 32), t.owner);
                }
            }
            Ok(())
        }
        TeamCommands::Show { id } => {
            let team = get(&storage, id)?;
            let members = storage.list_team_members(&team.id)?;
            if ctx.json {
                return print_json(&TeamDetail { team, members });
            }

            println!("{}", team.name);
            println!("  ID: {}", team.id);
            println!("  Owner: {}", team.owner);
            if let Some(desc) = &team.description {
                println!("  Description: {desc}");
            }
            println!();
            println!("Members ({}):", members.len());
            for m in &members {
                println!("  {:<7} {}", m.role, m.label());
            }
            Ok(())
        }
        TeamCommands::Delete { id } => {
            let team = get(&storage, id)?;
            storage.delete_team(id, &ctx.actor())?;
            if crate::is_silent() {
                println!("{id}");
            } else if ctx.json {
                print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
            } else {
                println!("Deleted team: {} ({id})", team.name);
            }
            Ok(())
        }
        TeamCommands::AddMember {
            team,
            email,
            role,
            name,
        } => {
            let role: TeamRole = parse_enum("team role", role)?;
            let mut member = TeamMember::new(team, &email.to_lowercase(), role);
            member.display_name = name.clone();
            storage.add_team_member(&member, &ctx.actor())?;

            if crate::is_silent() {
                println!("{}", member.id);
            } else if ctx.json {
                print_json(&member)?;
            } else {
                println!("Added {} to {team} as {role}", member.user_email);
            }
            Ok(())
        }
        TeamCommands::RemoveMember { team, email } => {
            let email = email.to_lowercase();
            storage.remove_team_member(team, &email, &ctx.actor())?;
            if ctx.json {
                print_json(&serde_json::json!({ "team": team, "email": email, "removed": true }))?;
            } else if !crate::is_silent() {
                println!("Removed {email} from {team}");
            }
            Ok(())
        }
        TeamCommands::SetRole { team, email, role } => {
            let role: TeamRole = parse_enum("team role", role)?;
            let email = email.to_lowercase();
            storage.set_member_role(team, &email, role, &ctx.actor())?;
            if ctx.json {
                print_json(&serde_json::json!({ "team": team, "email": email, "role": role }))?;
            } else if !crate::is_silent() {
                println!("{email} is now {role} in {team}");
            }
            Ok(())
        }
        TeamCommands::Capacity { team } => {
            get(&storage, team)?;
            let capacity = team_capacity(&storage, team)?;
            if ctx.json {
                return print_json(&serde_json::json!({ "team": team, "members": capacity }));
            }
            print_capacity(&capacity);
            Ok(())
        }
    }
}

fn get(storage: &SqliteStorage, id: &str) -> Result<Team> {
    storage
        .get_team(id)?
        .ok_or_else(|| not_found(storage, "Team", id))
}

fn print_capacity(members: &[MemberCapacity]) {
    use colored::Colorize;

    if members.is_empty() {
        println!("No members can take assignments.");
        return;
    }

    println!("{}", "Weekly capacity (40h)".cyan().bold());
    for m in members {
        let status = match m.status {
            LoadStatus::Available => m.status.as_str().green(),
            LoadStatus::Busy => m.status.as_str().yellow(),
            LoadStatus::Overloaded => m.status.as_str().red(),
        };
        println!(
            "  {:<30} {:>3} tasks {:>4}h {:>5.1}%  {}",
            truncate(m.name.as_deref().unwrap_or(&m.email), 30),
            m.active_tasks,
            m.estimated_hours,
            m.utilization,
            status
        );
    }
}
