//! Command implementations.

pub mod assoc;
pub mod completions;
pub mod config;
pub mod history;
pub mod init;
pub mod item;
pub mod milestone;
pub mod project;
pub mod report;
pub mod serve;
pub mod team;
pub mod template;
pub mod user;
pub mod venture;
pub mod version;
pub mod workstream;

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::User;
use crate::storage::SqliteStorage;
use crate::validate::find_similar_ids;

/// Global flags every handler needs.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub db: Option<&'a Path>,
    pub actor: Option<&'a str>,
    pub user: Option<&'a str>,
    pub json: bool,
}

impl Context<'_> {
    /// Open the database, failing if it hasn't been initialized.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` or a database error.
    pub fn open(&self) -> Result<SqliteStorage> {
        crate::config::open_storage(self.db)
    }

    /// Actor name for the audit trail.
    #[must_use]
    pub fn actor(&self) -> String {
        crate::config::resolve_actor(self.actor, self.user)
    }

    /// The current user's record.
    ///
    /// # Errors
    ///
    /// Returns `NoCurrentUser` or `NotFound`.
    pub fn current_user(&self, storage: &SqliteStorage) -> Result<User> {
        crate::config::current_user(storage, self.user)
    }

    /// Email of the current user, if one resolves.
    #[must_use]
    pub fn user_email(&self) -> Option<String> {
        crate::config::resolve_user_email(self.user)
    }
}

/// Print a value as a single line of JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Parse `YYYY-MM-DD`, `today` or `tomorrow`.
pub(crate) fn parse_date(input: &str) -> Result<NaiveDate> {
    let today = chrono::Local::now().date_naive();
    match input.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(today + chrono::Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
            Error::InvalidArgument(format!("Invalid date '{input}' (expected YYYY-MM-DD)"))
        }),
    }
}

/// Parse an optional date argument.
pub(crate) fn parse_opt_date(input: Option<&str>) -> Result<Option<NaiveDate>> {
    input.map(parse_date).transpose()
}

/// Parse a string into one of the model's string enums.
pub(crate) fn parse_enum<T>(what: &str, input: &str) -> Result<T>
where
    T: std::str::FromStr,
{
    input
        .trim()
        .to_lowercase()
        .replace('-', "_")
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("Invalid {what}: {input}")))
}

/// Not-found error that names similar IDs when there are any.
pub(crate) fn not_found(storage: &SqliteStorage, kind: &'static str, id: &str) -> Error {
    let existing = storage
        .record_ids(&kind.to_lowercase())
        .unwrap_or_default();
    let similar = find_similar_ids(id, &existing, 3);
    if similar.is_empty() {
        Error::not_found(kind, id)
    } else {
        Error::NotFoundSimilar {
            kind,
            id: id.to_string(),
            similar,
        }
    }
}

/// Shorten text for table cells.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Render an optional STEP level.
pub(crate) fn level(value: Option<u8>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Format a Unix-millisecond timestamp as local date and time.
pub(crate) fn format_millis(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}
