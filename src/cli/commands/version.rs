//! Version command implementation.

use serde::Serialize;

use super::print_json;
use crate::error::Result;
use crate::storage::schema::CURRENT_SCHEMA_VERSION;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    schema: i32,
    build: &'a str,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) { "dev" } else { "release" };

    if json {
        return print_json(&VersionOutput {
            version,
            schema: CURRENT_SCHEMA_VERSION,
            build,
        });
    }

    println!("vt version {version} (schema v{CURRENT_SCHEMA_VERSION}, {build})");
    Ok(())
}
