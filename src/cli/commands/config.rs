//! `vt config` - show and edit `~/.venturer/config.json`.

use super::{print_json, Context};
use crate::cli::ConfigCommands;
use crate::config::{config_path, load_config, load_from, save_to, SETTABLE_KEYS};
use crate::error::Result;

/// Execute config commands.
///
/// # Errors
///
/// Returns an error if the settings file can't be read or written, or the
/// key is unknown.
pub fn execute(command: &ConfigCommands, ctx: &Context<'_>) -> Result<()> {
    match command {
        ConfigCommands::Show => show(ctx),
        ConfigCommands::Set { key, value } => set(ctx, key, value),
        ConfigCommands::Reset => reset(ctx),
    }
}

fn show(ctx: &Context<'_>) -> Result<()> {
    let path = config_path()?;
    let config = load_config()?.redacted();

    if ctx.json {
        return print_json(&serde_json::json!({
            "path": path,
            "config": config,
        }));
    }

    println!("Config: {}", path.display());
    println!("  default_user:     {}", config.default_user.as_deref().unwrap_or("-"));
    println!("  llm.endpoint:     {}", config.llm.endpoint());
    println!("  llm.model:        {}", config.llm.model());
    println!("  llm.api_key:      {}", config.llm.api_key().as_deref().unwrap_or("-"));
    println!("  llm.timeout_secs: {}", config.llm.timeout_secs());
    println!(
        "  server.bind:      {}",
        config.server.bind.as_deref().unwrap_or(crate::config::DEFAULT_BIND)
    );
    Ok(())
}

fn set(ctx: &Context<'_>, key: &str, value: &str) -> Result<()> {
    let path = config_path()?;
    let mut config = load_from(&path)?;
    config.set(key, value)?;
    save_to(&path, &config)?;
    tracing::info!(key, "config updated");

    if ctx.json {
        return print_json(&serde_json::json!({ "key": key, "set": !value.is_empty() }));
    }
    if value.is_empty() {
        println!("Cleared {key}");
    } else {
        println!("Set {key}");
    }
    Ok(())
}

fn reset(ctx: &Context<'_>) -> Result<()> {
    let path = config_path()?;
    let existed = path.exists();
    if existed {
        std::fs::remove_file(&path)?;
    }

    if ctx.json {
        return print_json(&serde_json::json!({ "reset": existed, "keys": SETTABLE_KEYS }));
    }
    if existed {
        println!("Removed {}", path.display());
    } else {
        println!("No config file at {}", path.display());
    }
    Ok(())
}
