//! Deployment-plan-driven pipeline assembly.
//!
//! `DeploymentPlanner` turns the ordered deployment plan into the
//! sequence of pipeline-stage specifications the infrastructure layer
//! materializes: one deployment stage per plan entry, an optional
//! manual-approval gate, an optional post-deploy smoke-test step, and
//! the list of stage transitions to disable up front so an approval
//! token cannot expire while waiting.

use crate::error::Result;
use crate::model::{
    deployment_stage_name, versioned_pipeline_name, versioned_pipeline_stack_name,
    TargetEnvironment, TargetEnvironments, POSTMAN_SPEC_FILE, STACK_DEPLOYED_AT_TAG,
    STACK_NAME_TAG, STACK_VERSION_TAG,
};
use crate::plan::DeploymentPolicyEntry;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const DISABLED_TRANSITION_REASON: &str = "Avoid manual approval expiration after one week";

// ---------------------------------------------------------------------------
// PipelineStageSpec
// ---------------------------------------------------------------------------

/// One deployment stage, derived one-to-one from a plan entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStageSpec {
    pub stage_name: String,
    pub target_environment: TargetEnvironment,
    pub has_approval_gate: bool,
    pub has_smoke_test: bool,
    /// Present iff `has_approval_gate`; contains the approval-action
    /// name pattern the role reassignment macro later matches on.
    pub approval_step_name: Option<String>,
    /// Present iff `has_smoke_test`; contains the postman-action name
    /// pattern the role reassignment macro later matches on.
    pub smoke_test_step_name: Option<String>,
    /// Tags stamped onto the contained stack deployed by this stage.
    pub stack_tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledTransition {
    pub stage_name: String,
    pub reason: String,
}

/// The assembled pipeline shape, ready for the resource layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub pipeline_name: String,
    /// Tags on the pipeline resource itself; the cleanup detector
    /// reads these back from listings.
    pub pipeline_tags: BTreeMap<String, String>,
    pub stages: Vec<PipelineStageSpec>,
    pub disabled_transitions: Vec<DisabledTransition>,
}

// ---------------------------------------------------------------------------
// DeploymentPlanner
// ---------------------------------------------------------------------------

pub struct DeploymentPlanner<'a> {
    environments: &'a TargetEnvironments,
    contained_stack_name: String,
    contained_stack_version: String,
    has_smoke_test_spec: bool,
}

impl<'a> DeploymentPlanner<'a> {
    pub fn new(
        environments: &'a TargetEnvironments,
        contained_stack_name: impl Into<String>,
        contained_stack_version: impl Into<String>,
    ) -> Self {
        Self {
            environments,
            contained_stack_name: contained_stack_name.into(),
            contained_stack_version: contained_stack_version.into(),
            has_smoke_test_spec: false,
        }
    }

    /// Record whether the smoke-test collection exists. Without it no
    /// smoke-test step is emitted regardless of plan flags.
    pub fn with_smoke_test_spec(mut self, present: bool) -> Self {
        self.has_smoke_test_spec = present;
        self
    }

    /// Build the pipeline shape from the plan, in list order.
    ///
    /// An empty plan is legal and produces a pipeline with no
    /// deployment stages. An entry referencing an unconfigured
    /// environment key aborts construction before any stage is
    /// emitted.
    pub fn build_pipeline(&self, plan: &[DeploymentPolicyEntry]) -> Result<PipelinePlan> {
        // Resolve every key up front so a bad entry aborts before any
        // stage is emitted.
        let mut resolved: Vec<(&DeploymentPolicyEntry, &TargetEnvironment)> =
            Vec::with_capacity(plan.len());
        for entry in plan {
            resolved.push((entry, self.environments.resolve(&entry.target_environment_key)?));
        }

        // Synthesis-time timestamp: the deployed-at tag goes stale if
        // actual deployment lags synthesis. Known caveat, kept for tag
        // compatibility.
        let synthesized_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut stages = Vec::with_capacity(plan.len());
        let mut disabled_transitions = Vec::new();

        for (entry, environment) in resolved {
            let stage_name = deployment_stage_name(environment);
            debug!(stage = %stage_name, "planning deployment stage");

            let has_smoke_test = entry.should_smoke_test && self.has_smoke_test_spec;

            if entry.requires_approval {
                disabled_transitions.push(DisabledTransition {
                    stage_name: stage_name.clone(),
                    reason: DISABLED_TRANSITION_REASON.to_string(),
                });
            }

            let mut stack_tags = BTreeMap::new();
            stack_tags.insert(
                STACK_VERSION_TAG.to_string(),
                self.contained_stack_version.clone(),
            );
            stack_tags.insert(STACK_DEPLOYED_AT_TAG.to_string(), synthesized_at.clone());

            stages.push(PipelineStageSpec {
                stage_name,
                target_environment: environment.clone(),
                has_approval_gate: entry.requires_approval,
                has_smoke_test,
                approval_step_name: entry.requires_approval.then(|| {
                    format!(
                        "{}-approval-promote-to-{}",
                        self.contained_stack_name, environment.unique_name
                    )
                }),
                smoke_test_step_name: has_smoke_test
                    .then(|| format!("test-run-postman-{}", environment.unique_name)),
                stack_tags,
            });
        }

        let mut pipeline_tags = BTreeMap::new();
        pipeline_tags.insert(STACK_NAME_TAG.to_string(), self.contained_stack_name.clone());
        pipeline_tags.insert(
            STACK_VERSION_TAG.to_string(),
            self.contained_stack_version.clone(),
        );
        pipeline_tags.insert(
            crate::model::DEPLOYER_STACK_NAME_TAG.to_string(),
            versioned_pipeline_stack_name(&self.contained_stack_name, &self.contained_stack_version),
        );

        Ok(PipelinePlan {
            pipeline_name: versioned_pipeline_name(
                &self.contained_stack_name,
                &self.contained_stack_version,
            ),
            pipeline_tags,
            stages,
            disabled_transitions,
        })
    }
}

/// Existence probe for the smoke-test collection at its conventional
/// path under `dir`.
pub fn smoke_test_spec_present(dir: &Path) -> bool {
    dir.join(POSTMAN_SPEC_FILE).is_file()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
