//! Template commands: snapshot, apply, export and import.

use std::path::Path;

use serde::Serialize;

use super::{level, not_found, parse_opt_date, print_json, truncate, Context};
use crate::cli::TemplateCommands;
use crate::error::Result;
use crate::model::ProjectTemplate;
use crate::storage::SqliteStorage;
use crate::transfer::template;

#[derive(Serialize)]
struct TemplateSummary<'a> {
    id: &'a str,
    name: &'a str,
    category: Option<&'a str>,
    milestones: usize,
    items: usize,
}

impl<'a> From<&'a ProjectTemplate> for TemplateSummary<'a> {
    fn from(t: &'a ProjectTemplate) -> Self {
        Self {
            id: &t.id,
            name: &t.name,
            category: t.category.as_deref(),
            milestones: t.milestones.len(),
            items: t.item_count(),
        }
    }
}

/// Execute a template command.
///
/// # Errors
///
/// Returns an error if a template, project or venture doesn't exist, a file
/// can't be read or written, or an imported file isn't a valid template.
pub fn execute(command: &TemplateCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;
    let actor = ctx.actor();

    match command {
        TemplateCommands::Create {
            project,
            name,
            category,
            description,
        } => {
            if storage.get_project(project)?.is_none() {
                return Err(not_found(&storage, "Project", project));
            }
            let mut tpl = template::snapshot(&storage, project, name, &actor)?;
            if category.is_some() {
                tpl.category = category.clone();
            }
            if description.is_some() {
                tpl.description = description.clone();
            }
            storage.create_template(&tpl, &actor)?;
            output_saved(ctx, &tpl, "Created")
        }
        TemplateCommands::List { category } => {
            let templates = storage.list_templates(category.as_deref())?;
            if crate::is_silent() {
                for t in &templates {
                    println!("{}", t.id);
                }
            } else if ctx.json {
                let summaries: Vec<TemplateSummary<'_>> = templates.iter().map(Into::into).collect();
                print_json(&serde_json::json!({ "templates": summaries, "count": summaries.len() }))?;
            } else if templates.is_empty() {
                println!("No templates found.");
                println!("\nCreate one with: vt template create <name> --project <id>");
            } else {
                for t in &templates {
                    println!(
                        "  {:<18} {:<32} {:<12} {} milestones, {} items",
                        t.id,
                        truncate(&t.name, 32),
                        t.category.as_deref().unwrap_or("-"),
                        t.milestones.len(),
                        t.item_count()
                    );
                }
            }
            Ok(())
        }
        TemplateCommands::Show { id } => {
            let tpl = get(&storage, id)?;
            if ctx.json {
                return print_json(&tpl);
            }
            print_template(&tpl);
            Ok(())
        }
        TemplateCommands::Apply {
            id,
            venture,
            name,
            start,
        } => {
            get(&storage, id)?;
            if storage.get_venture(venture)?.is_none() {
                return Err(not_found(&storage, "Venture", venture));
            }
            let blueprint = template::apply(
                &mut storage,
                id,
                venture,
                name,
                parse_opt_date(start.as_deref())?,
                &actor,
            )?;

            if crate::is_silent() {
                println!("{}", blueprint.project.id);
            } else if ctx.json {
                print_json(&serde_json::json!({
                    "project": blueprint.project,
                    "milestones": blueprint.milestones.len(),
                    "items": blueprint.items.len(),
                }))?;
            } else {
                println!("Created project: {}", blueprint.project.name);
                println!("  ID: {}", blueprint.project.id);
                println!(
                    "  {} milestones, {} items",
                    blueprint.milestones.len(),
                    blueprint.items.len()
                );
            }
            Ok(())
        }
        TemplateCommands::Export { id, output } => {
            let tpl = get(&storage, id)?;
            template::export_to_file(&tpl, output)?;
            output_file(ctx, &tpl, output, "Exported")
        }
        TemplateCommands::Import { file } => {
            let tpl = template::import_from_file(&mut storage, file, &actor)?;
            output_saved(ctx, &tpl, "Imported")
        }
        TemplateCommands::Delete { id } => {
            let tpl = get(&storage, id)?;
            storage.delete_template(id, &actor)?;
            if crate::is_silent() {
                println!("{id}");
            } else if ctx.json {
                print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
            } else {
                println!("Deleted template: {} ({id})", tpl.name);
            }
            Ok(())
        }
    }
}

fn get(storage: &SqliteStorage, id: &str) -> Result<ProjectTemplate> {
    storage
        .get_template(id)?
        .ok_or_else(|| not_found(storage, "Template", id))
}

fn output_saved(ctx: &Context<'_>, tpl: &ProjectTemplate, verb: &str) -> Result<()> {
    if crate::is_silent() {
        println!("{}", tpl.id);
    } else if ctx.json {
        print_json(&TemplateSummary::from(tpl))?;
    } else {
        println!("{verb} template: {}", tpl.name);
        println!("  ID: {}", tpl.id);
        println!("  {} milestones, {} items", tpl.milestones.len(), tpl.item_count());
    }
    Ok(())
}

fn output_file(ctx: &Context<'_>, tpl: &ProjectTemplate, path: &Path, verb: &str) -> Result<()> {
    if crate::is_silent() {
        println!("{}", path.display());
    } else if ctx.json {
        print_json(&serde_json::json!({ "id": tpl.id, "path": path }))?;
    } else {
        println!("{verb} {} to {}", tpl.name, path.display());
    }
    Ok(())
}

fn print_template(tpl: &ProjectTemplate) {
    println!("{}", tpl.name);
    println!("  ID: {}", tpl.id);
    if let Some(category) = &tpl.category {
        println!("  Category: {category}");
    }
    if let Some(desc) = &tpl.description {
        println!("  Description: {desc}");
    }

    if !tpl.milestones.is_empty() {
        println!();
        println!("Milestones:");
        for (i, m) in tpl.milestones.iter().enumerate() {
            let offset = m
                .offset_days
                .map_or_else(String::new, |d| format!("  (+{d}d)"));
            println!("  {i}. {}{offset}", m.title);
        }
    }

    println!();
    println!("Tasks ({}):", tpl.tasks.len());
    for task in &tpl.tasks {
        let milestone = task
            .milestone_index
            .map_or_else(String::new, |i| format!("  [milestone {i}]"));
        println!(
            "  - {} (S{} T{} E{} P{}){milestone}",
            task.title,
            level(task.s_sextant),
            level(task.t_time),
            level(task.e_effort),
            level(task.p_priority)
        );
        for sub in &task.subtasks {
            println!("      · {}", sub.title);
        }
    }
}
