//! Input normalization for statuses, types, relationships and STEP levels.
//!
//! Three-tier resolution: exact match → synonym lookup → error with the
//! closest suggestion. Lets users type `done`, `wip`, `high` or `blocked-by`
//! and get the canonical value.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::item::{LEVEL_RANGE, SEXTANT_RANGE};
use crate::model::{EntityKind, ItemStatus, ItemType, RelationshipType};

// ── Synonym maps ─────────────────────────────────────────────

pub static STATUS_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("done", "completed"),
        ("complete", "completed"),
        ("finished", "completed"),
        ("closed", "completed"),
        ("wip", "in_progress"),
        ("working", "in_progress"),
        ("started", "in_progress"),
        ("doing", "in_progress"),
        ("in-progress", "in_progress"),
        ("open", "todo"),
        ("new", "todo"),
        ("pending", "todo"),
        ("stuck", "blocked"),
        ("waiting", "blocked"),
    ]
    .into_iter()
    .collect()
});

pub static TYPE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("item", "task"),
        ("todo", "task"),
        ("action", "task"),
        ("memo", "note"),
        ("comment", "note"),
        ("thought", "idea"),
        ("proposal", "idea"),
    ]
    .into_iter()
    .collect()
});

pub static RELATIONSHIP_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("blocked-by", "blocked_by"),
        ("blockedby", "blocked_by"),
        ("depends-on", "depends_on"),
        ("depends", "depends_on"),
        ("requires", "depends_on"),
        ("helps", "aids"),
        ("supports", "aids"),
        ("aided-by", "aided_by"),
        ("relates", "relates_to"),
        ("related", "relates_to"),
        ("relates-to", "relates_to"),
        ("parent", "parent_of"),
        ("parent-of", "parent_of"),
        ("child", "child_of"),
        ("child-of", "child_of"),
    ]
    .into_iter()
    .collect()
});

/// Named level for a STEP dimension.
fn named_level(field: &str, name: &str) -> Option<u8> {
    match (field, name) {
        ("time", "short" | "quick") | ("effort", "low" | "easy") | ("priority", "low") => Some(1),
        ("time" | "effort", "medium") | ("priority", "medium" | "normal") => Some(2),
        ("time", "long") | ("effort", "high" | "hard") | ("priority", "high" | "urgent" | "critical") => {
            Some(3)
        }
        _ => None,
    }
}

/// Resolve `input` against an enum's canonical names and a synonym map.
fn normalize<T: FromStr>(
    input: &str,
    canonical: &[&'static str],
    synonyms: &HashMap<&str, &str>,
) -> std::result::Result<T, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    // Tier 1: exact match
    if let Ok(value) = lower.parse() {
        return Ok(value);
    }

    // Tier 2: synonym lookup
    if let Some(value) = synonyms.get(lower.as_str()).and_then(|c| c.parse().ok()) {
        return Ok(value);
    }

    // Tier 3: closest suggestion
    Err((input.to_string(), find_closest_match(&lower, canonical, synonyms)))
}

/// Normalize an item status.
pub fn normalize_status(input: &str) -> std::result::Result<ItemStatus, (String, Option<String>)> {
    let names: Vec<&str> = ItemStatus::ALL.iter().map(ItemStatus::as_str).collect();
    normalize(input, &names, &STATUS_SYNONYMS)
}

/// Normalize an item type.
pub fn normalize_type(input: &str) -> std::result::Result<ItemType, (String, Option<String>)> {
    let names: Vec<&str> = ItemType::ALL.iter().map(ItemType::as_str).collect();
    normalize(input, &names, &TYPE_SYNONYMS)
}

/// Normalize an association relationship.
pub fn normalize_relationship(
    input: &str,
) -> std::result::Result<RelationshipType, (String, Option<String>)> {
    let names: Vec<&str> = RelationshipType::ALL
        .iter()
        .map(RelationshipType::as_str)
        .collect();
    normalize(input, &names, &RELATIONSHIP_SYNONYMS)
}

fn invalid(what: &str, (input, suggestion): (String, Option<String>)) -> Error {
    match suggestion {
        Some(s) => Error::InvalidArgument(format!("Invalid {what}: {input} (did you mean {s}?)")),
        None => Error::InvalidArgument(format!("Invalid {what}: {input}")),
    }
}

/// [`normalize_status`] as a crate error.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the closest valid status.
pub fn parse_status(input: &str) -> Result<ItemStatus> {
    normalize_status(input).map_err(|e| invalid("status", e))
}

/// [`normalize_type`] as a crate error.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the closest valid type.
pub fn parse_type(input: &str) -> Result<ItemType> {
    normalize_type(input).map_err(|e| invalid("type", e))
}

/// [`normalize_relationship`] as a crate error.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the closest valid relationship.
pub fn parse_relationship(input: &str) -> Result<RelationshipType> {
    normalize_relationship(input).map_err(|e| invalid("relationship", e))
}

/// Parse an association endpoint `kind:id`, or a bare ID whose prefix gives
/// the kind (`item_`, `ms_`, `ws_`).
///
/// # Errors
///
/// Returns `InvalidArgument` if the kind cannot be determined.
pub fn parse_entity_ref(input: &str) -> Result<crate::model::EntityRef> {
    let (kind, id) = match input.split_once(':') {
        Some((kind, id)) => {
            let kind = match kind.to_lowercase().as_str() {
                "task" | "item" => EntityKind::Task,
                "milestone" | "ms" => EntityKind::Milestone,
                "workstream" | "ws" => EntityKind::Workstream,
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "Invalid entity kind: {other} (expected task, milestone or workstream)"
                    )))
                }
            };
            (kind, id)
        }
        None if input.starts_with("item_") => (EntityKind::Task, input),
        None if input.starts_with("ms_") => (EntityKind::Milestone, input),
        None if input.starts_with("ws_") => (EntityKind::Workstream, input),
        None => {
            return Err(Error::InvalidArgument(format!(
                "Cannot tell entity kind of '{input}'; write it as task:<id>, milestone:<id> or workstream:<id>"
            )))
        }
    };
    Ok(crate::model::EntityRef::new(kind, id))
}

/// Parse a STEP level for `field` (`sextant`, `time`, `effort`, `priority`).
///
/// Accepts digits, letter-prefixed digits (`S4`, `P3`) and level names
/// (`short`, `high`, …).
///
/// # Errors
///
/// Returns `InvalidStep` for out-of-range numbers and `InvalidArgument`
/// for unrecognized input.
pub fn parse_level(field: &'static str, input: &str) -> Result<u8> {
    let lower = input.trim().to_lowercase();
    let range = if field == "sextant" {
        SEXTANT_RANGE
    } else {
        LEVEL_RANGE
    };

    let digits = lower
        .strip_prefix(|c: char| c.is_ascii_alphabetic())
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(lower.as_str());

    if let Ok(n) = digits.parse::<i64>() {
        return u8::try_from(n)
            .ok()
            .filter(|v| (range.0..=range.1).contains(v))
            .ok_or_else(|| Error::InvalidStep {
                field,
                value: n,
                expected: if field == "sextant" { "1-6" } else { "1-3" },
            });
    }

    named_level(field, &lower).ok_or_else(|| Error::InvalidArgument(format!("Invalid {field} level: {input}")))
}

/// Find the closest matching value across canonical names and synonyms.
fn find_closest_match(
    input: &str,
    canonical: &[&str],
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in canonical.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            // Synonyms suggest what they map to
            best = Some((synonyms.get(v).copied().unwrap_or(v), dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Find existing IDs similar to the searched ID.
///
/// Returns up to `max` suggestions with edit distance ≤ 3,
/// sorted by distance then alphabetically.
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|id| (levenshtein_distance(searched, id), id.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("todo"), Ok(ItemStatus::Todo));
        assert_eq!(normalize_status("done"), Ok(ItemStatus::Completed));
        assert_eq!(normalize_status("WIP"), Ok(ItemStatus::InProgress));
        assert!(normalize_status("nonsense").is_err());
    }

    #[test]
    fn test_status_suggestion() {
        let err = normalize_status("complted").unwrap_err();
        assert_eq!(err.1.as_deref(), Some("completed"));

        let err = parse_status("blokced").unwrap_err();
        assert!(err.to_string().contains("did you mean blocked"));
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("idea"), Ok(ItemType::Idea));
        assert_eq!(normalize_type("item"), Ok(ItemType::Task));
        assert!(normalize_type("epic").is_err());
    }

    #[test]
    fn test_normalize_relationship() {
        assert_eq!(normalize_relationship("blocked-by"), Ok(RelationshipType::BlockedBy));
        assert_eq!(normalize_relationship("parent"), Ok(RelationshipType::ParentOf));
        assert_eq!(normalize_relationship("relates_to"), Ok(RelationshipType::RelatesTo));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("sextant", "4").unwrap(), 4);
        assert_eq!(parse_level("sextant", "S6").unwrap(), 6);
        assert_eq!(parse_level("priority", "P3").unwrap(), 3);
        assert_eq!(parse_level("priority", "high").unwrap(), 3);
        assert_eq!(parse_level("time", "short").unwrap(), 1);
        assert_eq!(parse_level("effort", "Medium").unwrap(), 2);

        assert!(matches!(
            parse_level("sextant", "7"),
            Err(Error::InvalidStep { value: 7, .. })
        ));
        assert!(matches!(parse_level("time", "0"), Err(Error::InvalidStep { .. })));
        assert!(matches!(parse_level("time", "high"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_parse_entity_ref() {
        let r = parse_entity_ref("milestone:ms_1").unwrap();
        assert_eq!(r.kind, EntityKind::Milestone);
        assert_eq!(r.id, "ms_1");

        let r = parse_entity_ref("item_abc").unwrap();
        assert_eq!(r.kind, EntityKind::Task);

        assert!(parse_entity_ref("abc").is_err());
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar_ids() {
        let ids = vec![
            "ven_a1b2".to_string(),
            "ven_a1b3".to_string(),
            "ven_xxxx".to_string(),
        ];
        let result = find_similar_ids("ven_a1b1", &ids, 3);
        assert!(result.contains(&"ven_a1b2".to_string()));
        assert!(!result.contains(&"ven_xxxx".to_string()));
    }
}
