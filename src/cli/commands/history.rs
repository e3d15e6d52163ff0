//! `vt history` - the audit trail of one record.

use super::{format_millis, print_json, Context};
use crate::error::Result;

/// Execute the history command.
///
/// # Errors
///
/// Returns an error if the database is missing or the query fails.
pub fn execute(ctx: &Context<'_>, entity_type: &str, id: &str, limit: u32) -> Result<()> {
    let storage = ctx.open()?;
    let kind = match entity_type.to_lowercase().as_str() {
        "task" => "item".to_string(),
        other => other.to_string(),
    };
    let events = storage.get_events(&kind, id, Some(limit))?;

    if ctx.json {
        return print_json(&serde_json::json!({ "events": events, "count": events.len() }));
    }

    if events.is_empty() {
        println!("No history for {kind} {id}.");
        return Ok(());
    }

    for event in &events {
        let change = match (&event.old_value, &event.new_value) {
            (Some(old), Some(new)) => format!(" {old} → {new}"),
            (None, Some(new)) => format!(" → {new}"),
            (Some(old), None) => format!(" {old} →"),
            (None, None) => String::new(),
        };
        let comment = event
            .comment
            .as_deref()
            .map_or_else(String::new, |c| format!("  ({c})"));
        println!(
            "{}  {:<22} {}{change}{comment}",
            format_millis(event.created_at),
            event.event_type.as_str(),
            event.actor
        );
    }
    Ok(())
}
