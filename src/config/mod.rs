//! Configuration management.
//!
//! Resolves where the database lives, who the current user is and which
//! actor name goes into the audit trail, and loads the settings file.
//!
//! # Layout
//!
//! ```text
//! ~/.venturer/
//! ├── config.json        settings (default user, LLM, server)
//! ├── data/venturer.db   the database
//! └── test/venturer.db   isolated database when VT_TEST_DB is set
//! ```

mod settings;

pub use settings::{
    config_path, load_config, load_from, save_to, LlmSettings, ServerSettings, VtConfig,
    DEFAULT_BIND, SETTABLE_KEYS,
};

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::User;
use crate::storage::SqliteStorage;

/// The `~/.venturer` directory.
#[must_use]
pub fn venturer_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".venturer"))
}

/// Whether `VT_TEST_DB` asks for the isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("VT_TEST_DB")
        .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}

/// `~/.venturer/test/venturer.db`
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    venturer_home().map(|dir| dir.join("test").join("venturer.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. `explicit_path` (the `--db` flag)
/// 2. `VT_TEST_DB` → the test database
/// 3. `VENTURER_DB`
/// 4. `~/.venturer/data/venturer.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("VENTURER_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    venturer_home().map(|dir| dir.join("data").join("venturer.db"))
}

/// Open the database at the resolved path, failing if `vt init` hasn't run.
///
/// # Errors
///
/// Returns `NotInitialized` if the file doesn't exist, or a database error.
pub fn open_storage(explicit_path: Option<&Path>) -> Result<SqliteStorage> {
    let path = resolve_db_path(explicit_path).ok_or(Error::NotInitialized)?;
    if !path.exists() {
        return Err(Error::NotInitialized);
    }
    tracing::debug!(path = %path.display(), "opening database");
    SqliteStorage::open(&path)
}

fn git_config(key: &str) -> Option<String> {
    std::process::Command::new("git")
        .args(["config", key])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Email of the current user, if any source names one.
///
/// Priority:
/// 1. `explicit` (the `--user` flag or `VT_USER`)
/// 2. `default_user` in the settings file
/// 3. git `user.email`
#[must_use]
pub fn resolve_user_email(explicit: Option<&str>) -> Option<String> {
    if let Some(email) = explicit.filter(|e| !e.trim().is_empty()) {
        return Some(email.trim().to_lowercase());
    }

    if let Some(email) = load_config().ok().and_then(|c| c.default_user) {
        return Some(email);
    }

    git_config("user.email").map(|e| e.to_lowercase())
}

/// The current user's record.
///
/// # Errors
///
/// Returns `NoCurrentUser` if no email resolves, or `NotFound` if the email
/// has no user record.
pub fn current_user(storage: &SqliteStorage, explicit: Option<&str>) -> Result<User> {
    let email = resolve_user_email(explicit).ok_or(Error::NoCurrentUser)?;
    storage
        .get_user(&email)?
        .ok_or_else(|| Error::not_found("User", &email))
}

/// Actor name recorded in the audit trail.
///
/// Priority:
/// 1. `explicit` (the `--actor` flag or `VT_ACTOR`)
/// 2. The current user's email
/// 3. Git user name
/// 4. `$USER`
/// 5. `"unknown"`
#[must_use]
pub fn resolve_actor(explicit: Option<&str>, user: Option<&str>) -> String {
    if let Some(actor) = explicit.filter(|a| !a.is_empty()) {
        return actor.to_string();
    }

    if let Some(email) = resolve_user_email(user) {
        return email;
    }

    if let Some(name) = git_config("user.name") {
        return name;
    }

    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}
