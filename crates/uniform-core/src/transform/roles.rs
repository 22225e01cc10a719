//! Role reassignment macro.
//!
//! The resource generator synthesizes a least-privilege IAM role and
//! policy per pipeline, so N generated pipelines accumulate O(N) IAM
//! resources. This transform swaps them for a small fixed set of
//! pre-provisioned shared roles in the devops account and strips the
//! generated roles/policies from the fragment. Every stage, action,
//! and build project must match a known pattern; an unrecognized name
//! aborts the transform, since passing it through would leave a
//! dangling reference to a role that is about to be deleted.

use crate::error::{Result, UniformError};
use crate::template::{
    CodeBuildProject, PipelineResource, Resource, StageNode, TemplateFragment,
};
use serde_json::Value;
use tracing::debug;

const SOURCE_STAGE: &str = "Source";
const BUILD_STAGE: &str = "Build";
const SELF_MUTATE_STAGE: &str = "UpdatePipeline";
const ASSETS_STAGE: &str = "Assets";
const DEPLOYMENT_STAGE_PREFIX: &str = "deployment-";
const POSTMAN_ACTION: &str = "-run-postman-";
const APPROVAL_ACTION: &str = "-approval-promote-to-";

const CODEBUILD_PROJECT_SYNTH: &str = "synth-step";
const CODEBUILD_PROJECT_POSTMAN: &str = "-run-postman-";
const CODEBUILD_PROJECT_SELF_MUTATE: &str = "UpdatePipeline/SelfMutate";
const CODEBUILD_PROJECT_ASSET: &str = "Assets/FileAsset";

// ---------------------------------------------------------------------------
// Shared role names
// ---------------------------------------------------------------------------

/// The fixed shared roles, pre-provisioned once in the devops account.
/// One mapping table so the matching rules stay auditable in one place.
pub mod shared_roles {
    pub const MAIN: &str = "inner-pipeline-main-role";
    pub const SOURCE_ACTION: &str = "inner-pipeline-source-action-role";
    pub const BUILD_ACTION: &str = "inner-pipeline-build-action-role";
    pub const SELF_MUTATE_ACTION: &str = "inner-pipeline-self-mutate-action-role";
    pub const ASSETS_ACTION: &str = "inner-pipeline-assets-action-role";
    pub const POSTMAN_ACTION: &str = "inner-pipeline-postman-action-role";
    pub const APPROVAL_ACTION: &str = "inner-pipeline-approval-action-role";
    pub const CDK_BUILD_SERVICE: &str = "inner-pipeline-cdk-build-service-role";
    pub const POSTMAN_SERVICE: &str = "inner-pipeline-postman-service-role";
    pub const SELF_MUTATE_SERVICE: &str = "inner-pipeline-self-mutate-service-role";
    pub const ASSETS_SERVICE: &str = "inner-pipeline-assets-service-role";
}

// ---------------------------------------------------------------------------
// Dispatch tables
// ---------------------------------------------------------------------------

/// Closed set of recognized pipeline stage shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageKind {
    Source,
    Build,
    SelfMutate,
    Assets,
    Deployment,
}

impl StageKind {
    fn classify(name: &str) -> Result<StageKind> {
        match name {
            SOURCE_STAGE => Ok(StageKind::Source),
            BUILD_STAGE => Ok(StageKind::Build),
            SELF_MUTATE_STAGE => Ok(StageKind::SelfMutate),
            ASSETS_STAGE => Ok(StageKind::Assets),
            other if other.starts_with(DEPLOYMENT_STAGE_PREFIX) => Ok(StageKind::Deployment),
            other => Err(UniformError::UnknownStage(other.to_string())),
        }
    }
}

/// Closed set of recognized build projects, matched on description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProjectKind {
    Synth,
    Postman,
    SelfMutate,
    Asset,
}

impl ProjectKind {
    fn classify(description: Option<&str>) -> Result<ProjectKind> {
        let description =
            description.ok_or_else(|| UniformError::UnknownCodeBuildProject("<none>".into()))?;
        if description.contains(CODEBUILD_PROJECT_SYNTH) {
            Ok(ProjectKind::Synth)
        } else if description.contains(CODEBUILD_PROJECT_POSTMAN) {
            Ok(ProjectKind::Postman)
        } else if description.contains(CODEBUILD_PROJECT_SELF_MUTATE) {
            Ok(ProjectKind::SelfMutate)
        } else if description.contains(CODEBUILD_PROJECT_ASSET) {
            Ok(ProjectKind::Asset)
        } else {
            Err(UniformError::UnknownCodeBuildProject(description.to_string()))
        }
    }

    fn service_role(self) -> &'static str {
        match self {
            ProjectKind::Synth => shared_roles::CDK_BUILD_SERVICE,
            ProjectKind::Postman => shared_roles::POSTMAN_SERVICE,
            ProjectKind::SelfMutate => shared_roles::SELF_MUTATE_SERVICE,
            ProjectKind::Asset => shared_roles::ASSETS_SERVICE,
        }
    }
}

// ---------------------------------------------------------------------------
// RoleReassigner
// ---------------------------------------------------------------------------

pub struct RoleReassigner {
    devops_account: String,
}

impl RoleReassigner {
    pub fn new(devops_account: impl Into<String>) -> Self {
        Self {
            devops_account: devops_account.into(),
        }
    }

    fn role_arn(&self, role_name: &str) -> Value {
        Value::String(format!(
            "arn:aws:iam::{}:role/{role_name}",
            self.devops_account
        ))
    }

    pub fn reassign_roles(&self, fragment: &mut TemplateFragment) -> Result<()> {
        for (logical_name, resource) in &mut fragment.resources {
            match resource {
                Resource::Pipeline(pipeline) => self.process_pipeline(pipeline)?,
                Resource::CodeBuildProject(project) => self.process_project(project)?,
                _ => {}
            }
            if resource.is_iam() {
                debug!(resource = %logical_name, "filtering out role/policy");
            }
        }
        fragment.resources.retain(|(_, resource)| !resource.is_iam());
        Ok(())
    }

    fn process_pipeline(&self, pipeline: &mut PipelineResource) -> Result<()> {
        pipeline.properties.role_arn = Some(self.role_arn(shared_roles::MAIN));
        // The edge referenced the now-removed auto-generated role.
        pipeline.depends_on = None;

        for stage in &mut pipeline.properties.stages {
            debug!(stage = %stage.name, "reassigning stage action roles");
            match StageKind::classify(&stage.name)? {
                StageKind::Source => {
                    self.assign_stage_actions(stage, shared_roles::SOURCE_ACTION, Some(1))?
                }
                StageKind::Build => {
                    self.assign_stage_actions(stage, shared_roles::BUILD_ACTION, Some(1))?
                }
                StageKind::SelfMutate => {
                    self.assign_stage_actions(stage, shared_roles::SELF_MUTATE_ACTION, Some(1))?
                }
                StageKind::Assets => {
                    self.assign_stage_actions(stage, shared_roles::ASSETS_ACTION, None)?
                }
                StageKind::Deployment => self.assign_deployment_actions(stage),
            }
        }
        Ok(())
    }

    fn assign_stage_actions(
        &self,
        stage: &mut StageNode,
        role_name: &str,
        expected_actions: Option<usize>,
    ) -> Result<()> {
        if let Some(expected) = expected_actions {
            if stage.actions.len() != expected {
                return Err(UniformError::WrongActionCount {
                    stage: stage.name.clone(),
                    expected,
                    found: stage.actions.len(),
                });
            }
        }
        for action in &mut stage.actions {
            action.role_arn = Some(self.role_arn(role_name));
        }
        Ok(())
    }

    /// Prepare/Deploy changeset actions run under the target account's
    /// own deploy role and are left as-is; only the postman and manual
    /// approval actions get shared roles.
    fn assign_deployment_actions(&self, stage: &mut StageNode) {
        for action in &mut stage.actions {
            if action.name.contains(POSTMAN_ACTION) {
                action.role_arn = Some(self.role_arn(shared_roles::POSTMAN_ACTION));
            } else if action.name.contains(APPROVAL_ACTION) {
                action.role_arn = Some(self.role_arn(shared_roles::APPROVAL_ACTION));
            }
        }
    }

    fn process_project(&self, project: &mut CodeBuildProject) -> Result<()> {
        let kind = ProjectKind::classify(project.properties.description.as_deref())?;
        project.properties.service_role = Some(self.role_arn(kind.service_role()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
