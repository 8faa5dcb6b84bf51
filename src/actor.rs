//! Actor identity management.
//!
//! Actor resolution order:
//! 1) CLI --actor (explicit)
//! 2) TANDEM_ACTOR environment variable
//! 3) Persisted board value in .tandem/actor
//! 4) Config default (actor.default)

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;

pub const ACTOR_ENV: &str = "TANDEM_ACTOR";

/// Resolve the current actor using CLI, environment, persisted value, and config.
pub fn resolve_actor(storage: &Storage, config: &Config, cli_actor: Option<&str>) -> String {
    if let Some(actor) = non_empty(cli_actor) {
        return actor.to_string();
    }

    if let Ok(env_actor) = std::env::var(ACTOR_ENV) {
        if let Some(actor) = non_empty(Some(env_actor.as_str())) {
            return actor.to_string();
        }
    }

    if let Some(actor) = storage.read_actor() {
        return actor;
    }

    config.actor.default.clone()
}

/// Persist the actor identity in `.tandem/actor`.
pub fn persist_actor(storage: &Storage, actor: &str) -> Result<String> {
    let actor = non_empty(Some(actor))
        .ok_or_else(|| Error::InvalidArgument("actor name cannot be empty".to_string()))?;
    storage.write_actor(actor)?;
    Ok(actor.to_string())
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|value| !value.is_empty())
}
