//! Bulk item import from JSONL.
//!
//! Each line is one item. Only `title` is required; `type` and `status`
//! accept the same synonyms as the CLI (`done`, `wip`, `memo`, …).
//!
//! ```text
//! {"title":"Draft pitch","type":"task","status":"wip","p_priority":3,"assigned_to":"bo@acme.io"}
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::Result;
use crate::model::item::{check_level, LEVEL_RANGE, SEXTANT_RANGE};
use crate::model::Item;
use crate::storage::SqliteStorage;
use crate::transfer::file::read_jsonl;
use crate::validate::{parse_status, parse_type};

/// One line of an item import file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemRecord {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub venture_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub milestone_id: Option<String>,
    #[serde(default)]
    pub workstream_id: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub s_sextant: Option<u8>,
    #[serde(default)]
    pub t_time: Option<u8>,
    #[serde(default)]
    pub e_effort: Option<u8>,
    #[serde(default)]
    pub p_priority: Option<u8>,
}

/// Scope applied to records that don't name their own.
#[derive(Debug, Clone, Default)]
pub struct ImportDefaults {
    pub venture_id: Option<String>,
    pub project_id: Option<String>,
}

impl ItemRecord {
    /// Convert into a new item, filling scope from `defaults`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown type/status values or out-of-range STEP
    /// levels.
    pub fn into_item(self, defaults: &ImportDefaults, created_by: &str) -> Result<Item> {
        let mut item = Item::new(self.title, created_by.to_string());
        if let Some(t) = self.item_type.as_deref() {
            item.item_type = parse_type(t)?;
        }
        if let Some(s) = self.status.as_deref() {
            item.status = parse_status(s)?;
        }
        if !item.status.is_open() {
            item.completed_at = Some(item.created_at);
        }
        item.description = self.description;
        item.venture_id = self.venture_id.or_else(|| defaults.venture_id.clone());
        item.project_id = self.project_id.or_else(|| defaults.project_id.clone());
        item.milestone_id = self.milestone_id;
        item.workstream_id = self.workstream_id;
        item.assigned_to = self.assigned_to.map(|e| e.to_lowercase());
        item.due_date = self.due_date;

        check_level("sextant", self.s_sextant, SEXTANT_RANGE)?;
        check_level("time", self.t_time, LEVEL_RANGE)?;
        check_level("effort", self.e_effort, LEVEL_RANGE)?;
        check_level("priority", self.p_priority, LEVEL_RANGE)?;
        Ok(item.with_step(self.s_sextant, self.t_time, self.e_effort, self.p_priority))
    }
}

/// Parse every line of `path` into items without writing anything.
///
/// # Errors
///
/// Returns the first read, parse or validation error.
pub fn load_items(path: &Path, defaults: &ImportDefaults, created_by: &str) -> Result<Vec<Item>> {
    read_jsonl::<ItemRecord>(path)?
        .into_iter()
        .map(|record| record.into_item(defaults, created_by))
        .collect()
}

/// Import a JSONL file of items in one transaction.
///
/// Either every line is created or none is.
///
/// # Errors
///
/// Returns an error if the file is invalid or any insert fails.
pub fn import_items(
    storage: &mut SqliteStorage,
    path: &Path,
    defaults: &ImportDefaults,
    actor: &str,
) -> Result<Vec<Item>> {
    let items = load_items(path, defaults, actor)?;
    let created = storage.bulk_create_items(&items, actor)?;
    tracing::info!(path = %path.display(), created, "imported items");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{ItemStatus, ItemType, Venture};
    use crate::storage::ItemQuery;
    use tempfile::TempDir;

    const ACTOR: &str = "ana@acme.io";

    #[test]
    fn test_record_normalizes_synonyms() {
        let record: ItemRecord =
            serde_json::from_str(r#"{"title":"Fix login","type":"action","status":"done","p_priority":3}"#)
                .unwrap();
        let item = record.into_item(&ImportDefaults::default(), ACTOR).unwrap();
        assert_eq!(item.item_type, ItemType::Task);
        assert_eq!(item.status, ItemStatus::Completed);
        assert_eq!(item.p_priority, Some(3));
    }

    #[test]
    fn test_record_rejects_bad_level() {
        let record = ItemRecord {
            title: "x".into(),
            s_sextant: Some(7),
            ..ItemRecord::default()
        };
        assert!(matches!(
            record.into_item(&ImportDefaults::default(), ACTOR),
            Err(Error::InvalidStep { field: "sextant", .. })
        ));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let temp = TempDir::new().unwrap();
        let mut storage = SqliteStorage::open_memory().unwrap();
        let venture = Venture::new("Acme".into(), ACTOR.into());
        storage.create_venture(&venture, ACTOR).unwrap();
        let defaults = ImportDefaults {
            venture_id: Some(venture.id.clone()),
            project_id: None,
        };

        let good = temp.path().join("good.jsonl");
        std::fs::write(&good, "{\"title\":\"a\"}\n{\"title\":\"b\",\"type\":\"idea\"}\n").unwrap();
        let items = import_items(&mut storage, &good, &defaults, ACTOR).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(storage.list_items(&ItemQuery::venture(&venture.id)).unwrap().len(), 2);

        let bad = temp.path().join("bad.jsonl");
        std::fs::write(&bad, "{\"title\":\"c\"}\n{\"title\":\"d\",\"project_id\":\"proj_missing\"}\n")
            .unwrap();
        assert!(import_items(&mut storage, &bad, &defaults, ACTOR).is_err());
        assert_eq!(storage.list_items(&ItemQuery::venture(&venture.id)).unwrap().len(), 2);
    }
}
