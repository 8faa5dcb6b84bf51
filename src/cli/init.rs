//! tandem init command implementation
//!
//! Creates the default `.tandem.toml` and the `.tandem/` data directory.

use std::path::{Path, PathBuf};

use crate::actor;
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::{Storage, DATA_DIR};

use super::context::board_root;
use super::GlobalOptions;

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    created: InitCreated,
    #[serde(skip_serializing_if = "Option::is_none")]
    actor: Option<String>,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    data_dir: bool,
}

pub fn run(globals: GlobalOptions) -> Result<()> {
    let root = board_root(globals.dir)?;
    std::fs::create_dir_all(&root)?;

    let storage = Storage::new(root.clone());
    let created_data_dir = !storage.is_initialized();
    storage.init()?;
    let created_config = ensure_config(&root)?;

    let actor = globals
        .actor
        .as_deref()
        .map(|name| actor::persist_actor(&storage, name))
        .transpose()?;

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    if created_data_dir {
        created_items.push(format!("{DATA_DIR}/"));
    }

    let header = if created_items.is_empty() {
        "tandem init: nothing to do"
    } else {
        "tandem init: board ready"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("root", root.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    if let Some(actor) = actor.as_deref() {
        human.push_summary("actor", actor);
    } else {
        human.push_next_step("tandem actor <name>");
    }
    human.push_next_step("tandem quick \"first task\"");

    let report = InitReport {
        root,
        created: InitCreated {
            config: created_config,
            data_dir: created_data_dir,
        },
        actor,
    };

    emit_success(
        OutputOptions {
            json: globals.json,
            quiet: globals.quiet,
        },
        "init",
        &report,
        Some(&human),
    )
}

fn ensure_config(root: &Path) -> Result<bool> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "{CONFIG_FILE} exists but is not a file: {}",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    Config::default().save(&config_path)?;
    Ok(true)
}
