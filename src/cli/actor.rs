//! tandem actor command implementation
//!
//! With a name, persists it in `.tandem/actor`; without, shows the resolved actor.

use std::path::PathBuf;

use crate::actor;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;

use super::context::board_root;
use super::GlobalOptions;

#[derive(serde::Serialize)]
struct ActorReport {
    actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
}

pub fn run(globals: GlobalOptions, name: Option<String>) -> Result<()> {
    let root = board_root(globals.dir)?;
    let storage = Storage::new(root.clone());
    if !storage.is_initialized() {
        return Err(Error::NotInitialized(root));
    }

    let (report, human) = match name {
        Some(name) => {
            let actor = actor::persist_actor(&storage, &name)?;
            let path = storage.actor_file();
            let mut human = HumanOutput::new(format!("tandem actor: {actor}"));
            human.push_summary("actor", actor.clone());
            human.push_summary("path", path.display().to_string());
            (
                ActorReport {
                    actor,
                    path: Some(path),
                },
                human,
            )
        }
        None => {
            let config = Config::load_from_dir(&root);
            let actor = actor::resolve_actor(&storage, &config, globals.actor.as_deref());
            let mut human = HumanOutput::new(format!("tandem actor: {actor}"));
            human.push_summary("actor", actor.clone());
            (ActorReport { actor, path: None }, human)
        }
    };

    emit_success(
        OutputOptions {
            json: globals.json,
            quiet: globals.quiet,
        },
        "actor",
        &report,
        Some(&human),
    )
}
