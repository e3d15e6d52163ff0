//! `vt report` - aggregate statistics for a venture, a project or everything.

use super::Context;
use crate::cli::ReportArgs;
use crate::error::Result;
use crate::planning::{report, Report, ReportScope};
use crate::transfer::atomic_write;

/// Execute the report command.
///
/// CSV is chosen with `--format csv`, JSON with `--json`; otherwise a text
/// summary is printed. `--output` writes the chosen rendering to a file.
///
/// # Errors
///
/// Returns an error if the venture or project doesn't exist, or the output
/// can't be written.
pub fn execute(args: &ReportArgs, ctx: &Context<'_>) -> Result<()> {
    let storage = ctx.open()?;

    let scope = match (&args.venture, &args.project) {
        (_, Some(project)) => ReportScope::Project(project.clone()),
        (Some(venture), None) => ReportScope::Venture(venture.clone()),
        (None, None) => ReportScope::All,
    };
    let today = chrono::Local::now().date_naive();
    let report = report::generate(&storage, &scope, today)?;

    let rendered = if crate::is_csv() {
        report.to_csv()?
    } else if ctx.json {
        serde_json::to_string_pretty(&report)?
    } else {
        render_text(&report)
    };

    match &args.output {
        Some(path) => {
            atomic_write(path, &rendered)?;
            tracing::info!(path = %path.display(), "report written");
            if !crate::is_silent() {
                eprintln!("Report written to {}", path.display());
            }
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn render_text(report: &Report) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "Report: {} ({})", report.scope, report.generated_on);
    let _ = writeln!(out, "  Items: {}", report.total);
    let _ = writeln!(out, "  Completed: {:.1}%", report.completion_rate);
    let _ = writeln!(out, "  Overdue: {}", report.overdue);

    let sections = [
        ("Status", &report.by_status),
        ("Type", &report.by_type),
        ("Sextant", &report.sextant),
        ("Time", &report.time),
        ("Effort", &report.effort),
        ("Priority", &report.priority),
    ];
    for (title, counts) in sections {
        let _ = writeln!(out);
        let _ = writeln!(out, "{title}:");
        for (key, count) in counts {
            let _ = writeln!(out, "  {key:<12} {count}");
        }
    }

    if !report.by_assignee.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Assignees:");
        for (email, stats) in &report.by_assignee {
            let _ = writeln!(
                out,
                "  {email:<30} {} open, {} completed",
                stats.open, stats.completed
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, ItemStatus};
    use chrono::NaiveDate;

    #[test]
    fn test_render_text_lists_sections() {
        let mut done = Item::new("Ship".into(), "ana@acme.io".into()).assigned("ana@acme.io");
        done.status = ItemStatus::Completed;
        let open = Item::new("Plan".into(), "ana@acme.io".into());
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let report = Report::build(&ReportScope::All, &[done, open], today);
        let text = render_text(&report);

        assert!(text.contains("Items: 2"));
        assert!(text.contains("Completed: 50.0%"));
        assert!(text.contains("Sextant:"));
        assert!(text.contains("ana@acme.io"));
    }
}
