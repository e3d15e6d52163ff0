//! Item commands: tasks, notes and ideas.
//!
//! - `vt item create <title>` - Create an item, optionally as a subtask
//! - `vt item list` - Filter by scope, status and STEP values, sorted by STEP
//! - `vt item show <id>` - Item with subtasks and links
//! - `vt item update <id>` - Partial update
//! - `vt item complete <ids...>` / `vt item delete <ids...>`
//! - `vt item import <file>` - Bulk create from JSONL
//! - `vt item suggest <id>` - Ask the configured model for an assignee,
//!   priority, sextant and subtasks

use std::path::Path;

use serde::Serialize;

use super::{level, not_found, parse_opt_date, print_json, truncate, Context};
use crate::analysis::{self, AnalyzeTaskRequest, TaskSuggestion};
use crate::cli::{ItemCommands, ItemCreateArgs, ItemListArgs, ItemUpdateArgs, StepArgs};
use crate::error::{Error, Result};
use crate::model::{Association, EntityKind, EntityRef, Item, ItemUpdate};
use crate::planning::{sort_by_step, StepFilter};
use crate::storage::{ItemQuery, SqliteStorage};
use crate::transfer::{import_items, ImportDefaults};
use crate::validate::{parse_level, parse_status, parse_type};

#[derive(Serialize)]
struct ItemListOutput {
    items: Vec<Item>,
    count: usize,
}

#[derive(Serialize)]
struct LinkOutput {
    id: String,
    relationship: String,
    entity: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[derive(Serialize)]
struct ItemDetail {
    #[serde(flatten)]
    item: Item,
    subtasks: Vec<Item>,
    links: Vec<LinkOutput>,
}

#[derive(Serialize)]
struct SuggestOutput {
    suggestion: TaskSuggestion,
    applied: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    created_subtasks: Vec<String>,
}

/// Execute an item command.
///
/// # Errors
///
/// Returns an error if the database is missing, a referenced record doesn't
/// exist, a STEP value is out of range, or the model call fails.
pub fn execute(command: &ItemCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;

    match command {
        ItemCommands::Create(args) => execute_create(&mut storage, ctx, args),
        ItemCommands::List(args) => execute_list(&storage, ctx, args),
        ItemCommands::Show { id } => execute_show(&storage, ctx, id),
        ItemCommands::Update(args) => execute_update(&mut storage, ctx, args),
        ItemCommands::Complete { ids } => execute_complete(&mut storage, ctx, ids),
        ItemCommands::Delete { ids } => execute_delete(&mut storage, ctx, ids),
        ItemCommands::Import {
            file,
            venture,
            project,
        } => {
            let defaults = ImportDefaults {
                venture_id: venture.clone(),
                project_id: project.clone(),
            };
            execute_import(&mut storage, ctx, file, &defaults)
        }
        ItemCommands::Suggest { id, apply } => execute_suggest(&mut storage, ctx, id, apply),
    }
}

/// Parsed STEP flags.
type Step = (Option<u8>, Option<u8>, Option<u8>, Option<u8>);

fn parse_step(args: &StepArgs) -> Result<Step> {
    let one = |field: &'static str, v: &Option<String>| {
        v.as_deref().map(|s| parse_level(field, s)).transpose()
    };
    Ok((
        one("sextant", &args.sextant)?,
        one("time", &args.time)?,
        one("effort", &args.effort)?,
        one("priority", &args.priority)?,
    ))
}

fn parse_levels(field: &'static str, values: &[String]) -> Result<Vec<u8>> {
    values.iter().map(|v| parse_level(field, v)).collect()
}

fn get(storage: &SqliteStorage, id: &str) -> Result<Item> {
    storage
        .get_item(id)?
        .ok_or_else(|| not_found(storage, "Item", id))
}

fn execute_create(storage: &mut SqliteStorage, ctx: &Context<'_>, args: &ItemCreateArgs) -> Result<()> {
    let actor = ctx.actor();
    let (sextant, time, effort, priority) = parse_step(&args.step)?;

    let mut item = Item::new(args.title.clone(), actor.clone())
        .with_type(parse_type(&args.item_type)?)
        .in_scope(args.venture.as_deref(), args.project.as_deref())
        .with_step(sextant, time, effort, priority);
    if let Some(desc) = &args.description {
        item = item.with_description(desc);
    }
    if let Some(email) = &args.assign {
        item = item.assigned(&email.to_lowercase());
    }
    item.milestone_id = args.milestone.clone();
    item.workstream_id = args.workstream.clone();
    item.due_date = parse_opt_date(args.due.as_deref())?;

    // Subtasks default to the parent's scope.
    if let Some(parent_id) = &args.parent {
        let parent = get(storage, parent_id)?;
        item = item.with_parent(&parent.id);
        item.venture_id = item.venture_id.or(parent.venture_id);
        item.project_id = item.project_id.or(parent.project_id);
        item.milestone_id = item.milestone_id.or(parent.milestone_id);
        item.workstream_id = item.workstream_id.or(parent.workstream_id);
    }

    storage.create_item(&item, &actor)?;

    if crate::is_silent() {
        println!("{}", item.id);
        return Ok(());
    }

    if ctx.json {
        print_json(&item)?;
    } else {
        println!("Created {}: {} [{}]", item.item_type, item.title, item.id);
        println!(
            "  STEP: S{} T{} E{} P{}",
            level(item.s_sextant),
            level(item.t_time),
            level(item.e_effort),
            level(item.p_priority)
        );
        if let Some(assignee) = &item.assigned_to {
            println!("  Assigned: {assignee}");
        }
    }
    Ok(())
}

fn resolve_assignee(ctx: &Context<'_>, assignee: Option<&str>) -> Result<Option<String>> {
    match assignee {
        Some("me") => ctx.user_email().map(Some).ok_or(Error::NoCurrentUser),
        Some(email) => Ok(Some(email.to_lowercase())),
        None => Ok(None),
    }
}

fn execute_list(storage: &SqliteStorage, ctx: &Context<'_>, args: &ItemListArgs) -> Result<()> {
    let query = ItemQuery {
        venture_id: args.venture.clone(),
        project_id: args.project.clone(),
        milestone_id: args.milestone.clone(),
        workstream_id: args.workstream.clone(),
        roots_only: args.roots,
        assigned_to: resolve_assignee(ctx, args.assignee.as_deref())?,
        status: args.status.as_deref().map(parse_status).transpose()?,
        ..ItemQuery::default()
    };
    let filter = StepFilter {
        item_type: args.item_type.as_deref().map(parse_type).transpose()?,
        s_sextant: parse_levels("sextant", &args.sextant)?,
        t_time: parse_levels("time", &args.time)?,
        e_effort: parse_levels("effort", &args.effort)?,
        p_priority: parse_levels("priority", &args.priority)?,
        search: args.search.clone(),
        ..StepFilter::default()
    };

    let mut items = filter.apply(storage.list_items(&query)?);
    sort_by_step(&mut items);
    items.truncate(args.limit);

    if crate::is_silent() {
        for item in &items {
            println!("{}", item.id);
        }
        return Ok(());
    }

    if crate::is_csv() {
        return write_csv(&items);
    }

    if ctx.json {
        return print_json(&ItemListOutput {
            count: items.len(),
            items,
        });
    }

    if items.is_empty() {
        println!("No items found.");
        return Ok(());
    }

    println!("Items ({} found):", items.len());
    println!();
    for item in &items {
        print_item_line(item);
    }
    Ok(())
}

fn status_icon(item: &Item) -> &'static str {
    match item.status.as_str() {
        "todo" => "○",
        "in_progress" => "●",
        "blocked" => "⊘",
        "completed" => "✓",
        _ => "?",
    }
}

fn print_item_line(item: &Item) {
    println!(
        "{} [{}] S{} T{} E{} P{}  {} ({})",
        status_icon(item),
        item.id,
        level(item.s_sextant),
        level(item.t_time),
        level(item.e_effort),
        level(item.p_priority),
        truncate(&item.title, 60),
        item.item_type
    );
    if let Some(assignee) = &item.assigned_to {
        println!("        → {assignee}");
    }
}

fn write_csv(items: &[Item]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record([
        "id", "title", "type", "status", "sextant", "time", "effort", "priority", "assigned_to",
        "due_date", "project_id",
    ])?;
    for item in items {
        let opt = |v: Option<u8>| v.map(|n| n.to_string()).unwrap_or_default();
        wtr.write_record([
            item.id.clone(),
            item.title.clone(),
            item.item_type.to_string(),
            item.status.to_string(),
            opt(item.s_sextant),
            opt(item.t_time),
            opt(item.e_effort),
            opt(item.p_priority),
            item.assigned_to.clone().unwrap_or_default(),
            item.due_date.map(|d| d.to_string()).unwrap_or_default(),
            item.project_id.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn links_for(storage: &SqliteStorage, id: &str) -> Result<Vec<LinkOutput>> {
    let me = EntityRef::new(EntityKind::Task, id);
    let outgoing = storage.outgoing_associations(&me)?.into_iter().map(|a| LinkOutput {
        relationship: a.relationship_type.to_string(),
        entity: a.to_ref(),
        id: a.id,
        note: a.note,
    });
    let incoming = storage
        .incoming_associations(&me)?
        .into_iter()
        .map(|a: Association| LinkOutput {
            relationship: a.relationship_type.inverse_label().to_string(),
            entity: a.from_ref(),
            id: a.id,
            note: a.note,
        });
    Ok(outgoing.chain(incoming).collect())
}

fn execute_show(storage: &SqliteStorage, ctx: &Context<'_>, id: &str) -> Result<()> {
    let item = get(storage, id)?;
    let mut subtasks = storage.list_items(&ItemQuery::children_of(&item.id))?;
    sort_by_step(&mut subtasks);
    let links = links_for(storage, &item.id)?;

    if ctx.json {
        return print_json(&ItemDetail {
            item,
            subtasks,
            links,
        });
    }

    println!("{} {}", status_icon(&item), item.title);
    println!("  ID: {}", item.id);
    println!("  Type: {}", item.item_type);
    println!("  Status: {}", item.status);
    println!(
        "  STEP: S{} T{} E{} P{}",
        level(item.s_sextant),
        level(item.t_time),
        level(item.e_effort),
        level(item.p_priority)
    );
    for (label, value) in [
        ("Venture", &item.venture_id),
        ("Project", &item.project_id),
        ("Milestone", &item.milestone_id),
        ("Workstream", &item.workstream_id),
        ("Parent", &item.parent_id),
        ("Assigned", &item.assigned_to),
    ] {
        if let Some(v) = value {
            println!("  {label}: {v}");
        }
    }
    if let Some(due) = item.due_date {
        println!("  Due: {due}");
    }
    if let Some(desc) = &item.description {
        println!();
        println!("{desc}");
    }

    if !subtasks.is_empty() {
        println!();
        println!("Subtasks ({}):", subtasks.len());
        for sub in &subtasks {
            println!("  {} [{}] {}", status_icon(sub), sub.id, sub.title);
        }
    }
    if !links.is_empty() {
        println!();
        println!("Links:");
        for link in &links {
            println!("  {} {}  ({})", link.relationship, link.entity, link.id);
        }
    }
    Ok(())
}

fn execute_update(storage: &mut SqliteStorage, ctx: &Context<'_>, args: &ItemUpdateArgs) -> Result<()> {
    let (sextant, time, effort, priority) = parse_step(&args.step)?;
    let update = ItemUpdate {
        title: args.title.clone(),
        description: args.description.clone(),
        item_type: args.item_type.as_deref().map(parse_type).transpose()?,
        status: args.status.as_deref().map(parse_status).transpose()?,
        project_id: args.project.clone(),
        milestone_id: args.milestone.clone(),
        workstream_id: args.workstream.clone(),
        assigned_to: args.assign.as_deref().map(str::to_lowercase),
        due_date: parse_opt_date(args.due.as_deref())?,
        s_sextant: sextant,
        t_time: time,
        e_effort: effort,
        p_priority: priority,
        ..ItemUpdate::default()
    };

    get(storage, &args.id)?;
    let item = storage.update_item(&args.id, &update, &ctx.actor())?;

    if crate::is_silent() {
        println!("{}", item.id);
    } else if ctx.json {
        print_json(&item)?;
    } else {
        println!("Updated: {} [{}]", item.title, item.id);
    }
    Ok(())
}

fn execute_complete(storage: &mut SqliteStorage, ctx: &Context<'_>, ids: &[String]) -> Result<()> {
    let actor = ctx.actor();
    let mut done = Vec::with_capacity(ids.len());
    for id in ids {
        get(storage, id)?;
        done.push(storage.complete_item(id, &actor)?);
    }

    if crate::is_silent() {
        for item in &done {
            println!("{}", item.id);
        }
    } else if ctx.json {
        print_json(&ItemListOutput {
            count: done.len(),
            items: done,
        })?;
    } else {
        for item in &done {
            println!("✓ {} [{}]", item.title, item.id);
        }
    }
    Ok(())
}

fn execute_delete(storage: &mut SqliteStorage, ctx: &Context<'_>, ids: &[String]) -> Result<()> {
    let actor = ctx.actor();
    for id in ids {
        get(storage, id)?;
        storage.delete_item(id, &actor)?;
    }

    if crate::is_silent() {
        for id in ids {
            println!("{id}");
        }
    } else if ctx.json {
        print_json(&serde_json::json!({ "deleted": ids, "count": ids.len() }))?;
    } else {
        println!("Deleted {} item(s)", ids.len());
    }
    Ok(())
}

fn execute_import(
    storage: &mut SqliteStorage,
    ctx: &Context<'_>,
    file: &Path,
    defaults: &ImportDefaults,
) -> Result<()> {
    let items = import_items(storage, file, defaults, &ctx.actor())?;

    if crate::is_silent() {
        for item in &items {
            println!("{}", item.id);
        }
    } else if ctx.json {
        print_json(&serde_json::json!({
            "imported": items.len(),
            "ids": items.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
        }))?;
    } else {
        println!("Imported {} item(s) from {}", items.len(), file.display());
    }
    Ok(())
}

/// Suggestion fields `--apply` can write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyField {
    Assignee,
    Priority,
    Sextant,
    Subtasks,
}

impl ApplyField {
    const fn name(self) -> &'static str {
        match self {
            Self::Assignee => "assignee",
            Self::Priority => "priority",
            Self::Sextant => "sextant",
            Self::Subtasks => "subtasks",
        }
    }
}

fn parse_apply(values: &[String]) -> Result<Vec<ApplyField>> {
    let mut fields = Vec::new();
    for value in values {
        let parsed: &[ApplyField] = match value.trim().to_lowercase().as_str() {
            "assignee" | "assign" | "assign_to" => &[ApplyField::Assignee],
            "priority" => &[ApplyField::Priority],
            "sextant" => &[ApplyField::Sextant],
            "subtasks" => &[ApplyField::Subtasks],
            "all" => &[
                ApplyField::Assignee,
                ApplyField::Priority,
                ApplyField::Sextant,
                ApplyField::Subtasks,
            ],
            "" => &[],
            other => {
                return Err(Error::InvalidArgument(format!(
                    "Unknown --apply field '{other}' (expected assignee, priority, sextant, subtasks or all)"
                )));
            }
        };
        for field in parsed {
            if !fields.contains(field) {
                fields.push(*field);
            }
        }
    }
    Ok(fields)
}

/// Field updates a suggestion implies for the chosen fields. Subtasks are
/// not part of the update; they become child items.
fn suggestion_update(suggestion: &TaskSuggestion, fields: &[ApplyField]) -> ItemUpdate {
    let mut update = ItemUpdate::default();
    for field in fields {
        match field {
            ApplyField::Assignee => update.assigned_to = suggestion.assign_to.clone(),
            ApplyField::Priority => update.p_priority = Some(suggestion.priority),
            ApplyField::Sextant => update.s_sextant = Some(suggestion.sextant),
            ApplyField::Subtasks => {}
        }
    }
    update
}

fn subtask_items(parent: &Item, titles: &[String], actor: &str) -> Vec<Item> {
    titles
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|title| {
            let mut child = Item::new(title.trim().to_string(), actor.to_string())
                .with_type(parent.item_type)
                .in_scope(parent.venture_id.as_deref(), parent.project_id.as_deref())
                .with_parent(&parent.id);
            child.milestone_id = parent.milestone_id.clone();
            child.workstream_id = parent.workstream_id.clone();
            child
        })
        .collect()
}

fn execute_suggest(
    storage: &mut SqliteStorage,
    ctx: &Context<'_>,
    id: &str,
    apply: &[String],
) -> Result<()> {
    let fields = parse_apply(apply)?;
    let item = get(storage, id)?;
    let candidates = analysis::candidates_for(storage, &item)?;
    let request = AnalyzeTaskRequest::for_item(&item, candidates);

    let settings = crate::config::load_config()?.llm;
    let provider = analysis::provider_from_settings(&settings)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let suggestion = runtime.block_on(analysis::analyze(&provider, &request))?;

    let actor = ctx.actor();
    let mut applied = Vec::new();
    let update = suggestion_update(&suggestion, &fields);
    let children = if fields.contains(&ApplyField::Subtasks) {
        subtask_items(&item, &suggestion.subtasks, &actor)
    } else {
        Vec::new()
    };
    if !update.is_empty() || !children.is_empty() {
        storage.apply_suggestion(&item.id, &update, &children, &actor)?;
    }
    for field in &fields {
        let took = match field {
            ApplyField::Assignee => suggestion.assign_to.is_some(),
            ApplyField::Subtasks => !suggestion.subtasks.is_empty(),
            ApplyField::Priority | ApplyField::Sextant => true,
        };
        if took {
            applied.push(field.name());
        }
    }

    let created_subtasks: Vec<String> = children.into_iter().map(|c| c.id).collect();

    if ctx.json {
        return print_json(&SuggestOutput {
            suggestion,
            applied,
            created_subtasks,
        });
    }

    println!("Suggestion for {} [{}]", item.title, item.id);
    println!(
        "  Assign to:  {}",
        suggestion.assign_to.as_deref().unwrap_or("(nobody)")
    );
    println!("  Priority:   {}", suggestion.priority);
    println!("  Sextant:    {}", suggestion.sextant);
    println!("  Confidence: {}%", suggestion.confidence);
    if !suggestion.subtasks.is_empty() {
        println!("  Subtasks:");
        for sub in &suggestion.subtasks {
            println!("    - {sub}");
        }
    }
    if !suggestion.reasoning.is_empty() {
        println!();
        println!("{}", suggestion.reasoning);
    }
    if !applied.is_empty() {
        println!();
        println!("Applied: {}", applied.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion() -> TaskSuggestion {
        TaskSuggestion {
            assign_to: Some("bo@acme.io".into()),
            priority: 3,
            subtasks: vec!["Draft".into(), "  ".into(), "Review".into()],
            sextant: 2,
            confidence: 80,
            reasoning: "Bo has the lightest load".into(),
        }
    }

    #[test]
    fn test_parse_apply() {
        let fields = parse_apply(&["priority".into(), "assign".into(), "priority".into()]).unwrap();
        assert_eq!(fields, vec![ApplyField::Priority, ApplyField::Assignee]);
        assert_eq!(parse_apply(&["all".into()]).unwrap().len(), 4);
        assert!(parse_apply(&["colour".into()]).is_err());
    }

    #[test]
    fn test_suggestion_update_only_chosen_fields() {
        let update = suggestion_update(&suggestion(), &[ApplyField::Sextant]);
        assert_eq!(update.s_sextant, Some(2));
        assert_eq!(update.p_priority, None);
        assert_eq!(update.assigned_to, None);

        let none = suggestion_update(&suggestion(), &[ApplyField::Subtasks]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_subtasks_inherit_scope() {
        let mut parent = Item::new("Launch".into(), "ana@acme.io".into())
            .in_scope(Some("ven_1"), Some("proj_1"));
        parent.milestone_id = Some("ms_1".into());

        let children = subtask_items(&parent, &suggestion().subtasks, "ana@acme.io");
        assert_eq!(children.len(), 2);
        for child in &children {
            assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
            assert_eq!(child.project_id.as_deref(), Some("proj_1"));
            assert_eq!(child.milestone_id.as_deref(), Some("ms_1"));
        }
    }

    #[test]
    fn test_parse_step_flags() {
        let args = StepArgs {
            sextant: Some("S2".into()),
            priority: Some("high".into()),
            ..StepArgs::default()
        };
        assert_eq!(parse_step(&args).unwrap(), (Some(2), None, None, Some(3)));

        let bad = StepArgs {
            sextant: Some("7".into()),
            ..StepArgs::default()
        };
        assert!(matches!(parse_step(&bad), Err(Error::InvalidStep { .. })));
    }
}
