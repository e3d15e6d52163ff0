//! Create the Venturer database.
//!
//! The database lives at `~/.venturer/data/venturer.db` (or wherever
//! `--db`, `VT_TEST_DB` or `VENTURER_DB` point). The schema is applied on
//! open, so init only has to create the file and its directory.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use super::{print_json, Context};
use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::model::{User, UserRole};
use crate::storage::SqliteStorage;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<String>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` unless `force` is set, or an error if the
/// directory or database cannot be created.
pub fn execute(ctx: &Context<'_>, force: bool, admin: Option<&str>) -> Result<()> {
    let db_path = resolve_db_path(ctx.db)
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    if db_path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
        fs::remove_file(&db_path)?;
        for suffix in ["-wal", "-shm"] {
            let mut side = db_path.clone().into_os_string();
            side.push(suffix);
            let side = PathBuf::from(side);
            if side.exists() {
                fs::remove_file(side)?;
            }
        }
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut storage = SqliteStorage::open(&db_path)?;
    tracing::info!(path = %db_path.display(), "initialized database");

    let admin = match admin {
        Some(email) => {
            let mut user = User::new(email);
            user.role = UserRole::Admin;
            storage.create_user(&user, &ctx.actor())?;
            Some(user.email)
        }
        None => None,
    };

    if ctx.json {
        return print_json(&InitOutput {
            database: db_path,
            admin,
        });
    }

    println!("Initialized Venturer database");
    println!("  Database: {}", db_path.display());
    match admin {
        Some(email) => println!("  Admin: {email}"),
        None => {
            println!();
            println!("Next: register yourself with `vt user add <email>` and `vt config set default_user <email>`.");
        }
    }
    Ok(())
}
