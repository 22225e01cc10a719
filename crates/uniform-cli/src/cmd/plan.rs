use anyhow::{Context, Result};
use std::path::Path;
use uniform_core::model::TargetEnvironments;
use uniform_core::plan::{standard_plan, DeploymentPolicyEntry};
use uniform_core::planner::{smoke_test_spec_present, DeploymentPlanner};

pub fn run(
    stack_name: &str,
    stack_version: &str,
    plan_file: Option<&Path>,
    source_dir: Option<&Path>,
) -> Result<()> {
    let environments = TargetEnvironments::from_env()
        .context("loading target environments from the environment")?;

    let entries: Vec<DeploymentPolicyEntry> = match plan_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading plan file {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing plan file {}", path.display()))?
        }
        None => standard_plan(),
    };

    let source_dir = source_dir.unwrap_or_else(|| Path::new("."));
    let plan = DeploymentPlanner::new(&environments, stack_name, stack_version)
        .with_smoke_test_spec(smoke_test_spec_present(source_dir))
        .build_pipeline(&entries)?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
