use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use uniform_core::model::TargetEnvironments;
use uniform_core::transform::roles::RoleReassigner;
use uniform_core::transform::{handle_rename_changesets, handle_transform_roles, MacroEvent};

pub fn run_rename_changesets(event_path: Option<&Path>) -> Result<()> {
    let event = read_event(event_path)?;
    let response = handle_rename_changesets(event)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub fn run_transform_roles(event_path: Option<&Path>) -> Result<()> {
    let environments = TargetEnvironments::from_env()
        .context("loading target environments from the environment")?;
    let devops = environments.devops()?;
    let reassigner = RoleReassigner::new(devops.account.clone());

    let event = read_event(event_path)?;
    let response = handle_transform_roles(event, &reassigner)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn read_event(path: Option<&Path>) -> Result<MacroEvent> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading event file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading event from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&raw).context("parsing macro event")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
