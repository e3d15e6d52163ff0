//! `vt serve` - run the HTTP server.

use std::net::SocketAddr;

use super::Context;
use crate::analysis::provider_from_settings;
use crate::config::load_config;
use crate::error::{Error, Result};
use crate::server::{self, AppState};

/// Execute the serve command. Blocks until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the database is missing, the bind address is
/// invalid or taken, or the LLM client can't be built.
pub fn execute(ctx: &Context<'_>, bind: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let addr: SocketAddr = match bind {
        Some(b) => b
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("Invalid bind address: {b}")))?,
        None => config.server.bind_addr()?,
    };

    let mut storage = ctx.open()?;
    let purged = storage.purge_expired_sessions(chrono::Utc::now().timestamp_millis())?;
    if purged > 0 {
        tracing::debug!(purged, "dropped expired sessions");
    }

    let provider = provider_from_settings(&config.llm)?;
    if config.llm.api_key().is_none() {
        tracing::warn!("no LLM API key configured; set llm.api_key or VT_LLM_API_KEY");
    }

    if !crate::is_silent() {
        eprintln!("Serving on http://{addr} (Ctrl-C to stop)");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(addr, AppState::new(storage, provider)))
}
