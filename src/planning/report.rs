//! Item reports: aggregate counts over a scope, exported as JSON or CSV.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Item, ItemStatus, ItemType};
use crate::storage::{ItemQuery, SqliteStorage};

/// Which items a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportScope {
    All,
    Venture(String),
    Project(String),
}

impl ReportScope {
    fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Venture(id) => format!("venture:{id}"),
            Self::Project(id) => format!("project:{id}"),
        }
    }
}

/// Per-assignee totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssigneeStats {
    pub total: usize,
    pub completed: usize,
    pub open: usize,
}

/// Aggregated report over a set of items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub scope: String,
    pub generated_on: NaiveDate,
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    /// Percent of items completed, 0 for an empty scope
    pub completion_rate: f64,
    pub overdue: usize,
    pub sextant: BTreeMap<String, usize>,
    pub time: BTreeMap<String, usize>,
    pub effort: BTreeMap<String, usize>,
    pub priority: BTreeMap<String, usize>,
    pub by_assignee: BTreeMap<String, AssigneeStats>,
}

impl Report {
    /// Aggregate `items` as of `today`.
    #[must_use]
    pub fn build(scope: &ReportScope, items: &[Item], today: NaiveDate) -> Self {
        let mut by_status: BTreeMap<String, usize> = ItemStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        let mut by_type: BTreeMap<String, usize> =
            ItemType::ALL.iter().map(|t| (t.to_string(), 0)).collect();
        let mut sextant = BTreeMap::new();
        let mut time = BTreeMap::new();
        let mut effort = BTreeMap::new();
        let mut priority = BTreeMap::new();
        let mut by_assignee: BTreeMap<String, AssigneeStats> = BTreeMap::new();
        let mut completed = 0;
        let mut overdue = 0;

        for item in items {
            *by_status.entry(item.status.to_string()).or_default() += 1;
            *by_type.entry(item.item_type.to_string()).or_default() += 1;
            *sextant.entry(level_key(item.s_sextant)).or_default() += 1;
            *time.entry(level_key(item.t_time)).or_default() += 1;
            *effort.entry(level_key(item.e_effort)).or_default() += 1;
            *priority.entry(level_key(item.p_priority)).or_default() += 1;

            let done = item.status == ItemStatus::Completed;
            if done {
                completed += 1;
            }
            if item.is_overdue(today) {
                overdue += 1;
            }
            if let Some(email) = &item.assigned_to {
                let stats = by_assignee.entry(email.clone()).or_default();
                stats.total += 1;
                if done {
                    stats.completed += 1;
                } else {
                    stats.open += 1;
                }
            }
        }

        Self {
            scope: scope.label(),
            generated_on: today,
            total: items.len(),
            by_status,
            by_type,
            completion_rate: percent(completed, items.len()),
            overdue,
            sextant,
            time,
            effort,
            priority,
            by_assignee,
        }
    }

    /// Flatten into `metric,value` rows.
    #[must_use]
    pub fn rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("scope".to_string(), self.scope.clone()),
            ("generated_on".to_string(), self.generated_on.to_string()),
            ("total".to_string(), self.total.to_string()),
        ];
        let sections = [
            ("status", &self.by_status),
            ("type", &self.by_type),
            ("sextant", &self.sextant),
            ("time", &self.time),
            ("effort", &self.effort),
            ("priority", &self.priority),
        ];
        for (section, counts) in sections {
            rows.extend(
                counts
                    .iter()
                    .map(|(k, v)| (format!("{section}.{k}"), v.to_string())),
            );
        }
        rows.push((
            "completion_rate".to_string(),
            format!("{:.1}", self.completion_rate),
        ));
        rows.push(("overdue".to_string(), self.overdue.to_string()));
        for (email, stats) in &self.by_assignee {
            rows.push((format!("assignee.{email}.total"), stats.total.to_string()));
            rows.push((format!("assignee.{email}.completed"), stats.completed.to_string()));
            rows.push((format!("assignee.{email}.open"), stats.open.to_string()));
        }
        rows
    }

    /// Render as CSV with a `metric,value` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV writer fails.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["metric", "value"])?;
        for (metric, value) in self.rows() {
            writer.write_record([metric, value])?;
        }
        let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| Error::Other(e.to_string()))
    }
}

fn level_key(level: Option<u8>) -> String {
    level.map_or_else(|| "unset".to_string(), |l| l.to_string())
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 10.0
    }
}

/// Load the items in `scope` and build a report.
///
/// # Errors
///
/// Returns an error if the scope's venture or project doesn't exist or a
/// query fails.
pub fn generate(storage: &SqliteStorage, scope: &ReportScope, today: NaiveDate) -> Result<Report> {
    let query = match scope {
        ReportScope::All => ItemQuery::default(),
        ReportScope::Venture(id) => {
            storage
                .get_venture(id)?
                .ok_or_else(|| Error::not_found("Venture", id))?;
            ItemQuery::venture(id)
        }
        ReportScope::Project(id) => {
            storage
                .get_project(id)?
                .ok_or_else(|| Error::not_found("Project", id))?;
            ItemQuery::project(id)
        }
    };
    let items = storage.list_items(&query)?;
    Ok(Report::build(scope, &items, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn sample() -> Vec<Item> {
        let mut a = Item::new("a".into(), "u".into())
            .assigned("bo@acme.io")
            .with_step(Some(1), Some(2), None, Some(3));
        a.due_date = Some(day(1));

        let mut b = Item::new("b".into(), "u".into()).assigned("bo@acme.io");
        b.status = ItemStatus::Completed;
        b.due_date = Some(day(1));

        let c = Item::new("c".into(), "u".into()).with_type(ItemType::Idea);
        let d = Item::new("d".into(), "u".into()).with_step(Some(1), None, None, None);
        vec![a, b, c, d]
    }

    #[test]
    fn test_build_counts() {
        let report = Report::build(&ReportScope::All, &sample(), day(10));
        assert_eq!(report.total, 4);
        assert_eq!(report.by_status["completed"], 1);
        assert_eq!(report.by_status["blocked"], 0);
        assert_eq!(report.by_type["idea"], 1);
        assert!((report.completion_rate - 25.0).abs() < f64::EPSILON);
        assert_eq!(report.overdue, 1);
        assert_eq!(report.sextant["1"], 2);
        assert_eq!(report.sextant["unset"], 2);
        assert_eq!(report.by_assignee["bo@acme.io"].completed, 1);
        assert_eq!(report.by_assignee["bo@acme.io"].open, 1);
    }

    #[test]
    fn test_empty_scope() {
        let report = Report::build(&ReportScope::Project("proj_1".into()), &[], day(10));
        assert_eq!(report.total, 0);
        assert!(report.completion_rate.abs() < f64::EPSILON);
        assert_eq!(report.scope, "project:proj_1");
    }

    #[test]
    fn test_csv_export() {
        let report = Report::build(&ReportScope::All, &sample(), day(10));
        let csv = report.to_csv().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("metric,value"));
        assert!(csv.contains("total,4\n"));
        assert!(csv.contains("status.completed,1\n"));
        assert!(csv.contains("completion_rate,25.0\n"));
        assert!(csv.contains("assignee.bo@acme.io.open,1\n"));
    }

    #[test]
    fn test_generate_unknown_scope() {
        let storage = SqliteStorage::open_memory().unwrap();
        let err = generate(&storage, &ReportScope::Venture("ven_x".into()), day(1)).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "Venture", .. }));
    }
}
