//! Association commands: typed links between tasks, milestones and
//! workstreams.

use serde::Serialize;

use super::{not_found, print_json, Context};
use crate::cli::AssocCommands;
use crate::error::Result;
use crate::model::{Association, EntityRef};
use crate::validate::{parse_entity_ref, parse_relationship};

#[derive(Serialize)]
struct AssocListOutput<'a> {
    entity: &'a EntityRef,
    outgoing: Vec<Association>,
    incoming: Vec<Association>,
}

/// Execute an association command.
///
/// # Errors
///
/// Returns an error if an endpoint is missing, the link is a self-link, a
/// duplicate, or would close a parent/child cycle.
pub fn execute(command: &AssocCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;

    match command {
        AssocCommands::Add {
            from,
            relationship,
            to,
            note,
        } => {
            let from = parse_entity_ref(from)?;
            let to = parse_entity_ref(to)?;
            let relationship = parse_relationship(relationship)?;
            let actor = ctx.actor();

            let mut assoc = Association::new(&from, &to, relationship, &actor);
            assoc.note = note.clone();
            storage.create_association(&assoc, &actor)?;

            if crate::is_silent() {
                println!("{}", assoc.id);
            } else if ctx.json {
                print_json(&assoc)?;
            } else {
                println!("Linked: {from} {relationship} {to}");
                println!("  ID: {}", assoc.id);
            }
            Ok(())
        }
        AssocCommands::List { entity } => {
            let entity = parse_entity_ref(entity)?;
            let outgoing = storage.outgoing_associations(&entity)?;
            let incoming = storage.incoming_associations(&entity)?;

            if ctx.json {
                return print_json(&AssocListOutput {
                    entity: &entity,
                    outgoing,
                    incoming,
                });
            }

            if outgoing.is_empty() && incoming.is_empty() {
                println!("No links for {entity}.");
                return Ok(());
            }
            println!("Links for {entity}:");
            for a in &outgoing {
                println!("  → {:<14} {}  ({})", a.relationship_type.as_str(), a.to_ref(), a.id);
            }
            // Incoming links read from this entity's side.
            for a in &incoming {
                println!("  ← {:<14} {}  ({})", a.relationship_type.inverse_label(), a.from_ref(), a.id);
            }
            Ok(())
        }
        AssocCommands::Remove { id } => {
            if storage.get_association(id)?.is_none() {
                return Err(not_found(&storage, "Association", id));
            }
            storage.delete_association(id, &ctx.actor())?;

            if crate::is_silent() {
                println!("{id}");
            } else if ctx.json {
                print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
            } else {
                println!("Removed link {id}");
            }
            Ok(())
        }
    }
}
