//! Shared naming, tagging, and target-environment configuration.
//!
//! Everything a release pipeline and the cleanup batch agree on lives
//! here: the namespace, the tag keys stamped onto generated pipelines,
//! and the `TargetEnvironments` table resolved from the environment.

use crate::error::{Result, UniformError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LIBRARY_NAMESPACE: &str = "uniform-pipeline";

/// Suffix every generated inner-pipeline name carries; the cleanup
/// detector filters listings on it.
pub const PIPELINE_NAME_SUFFIX: &str = "-uniform-pipeline";

pub const STACK_NAME_TAG: &str = "uniform-pipeline:contained-stack-name";
pub const STACK_VERSION_TAG: &str = "uniform-pipeline:contained-stack-version";
pub const DEPLOYER_STACK_NAME_TAG: &str = "uniform-pipeline:deployer-stack-name";
pub const STACK_DEPLOYED_AT_TAG: &str = "uniform-pipeline:deployed-at";

/// Conventional path of the smoke-test collection; its presence gates
/// whether a deployment stage gets a post-deploy verification step.
pub const POSTMAN_SPEC_FILE: &str = "pipelines-postman-spec.json";

/// Bootstrap qualifier baked into the per-account deploy role names.
const DEFAULT_QUALIFIER: &str = "hnb659fds";

const ENV_VAR_PREFIX: &str = "UNIFORM_PIPELINES_ENV";

/// The standard environment keys, in no particular order. Deployment
/// order is set by the deployment plan, not by this list.
pub const STANDARD_ENVIRONMENT_KEYS: &[&str] =
    &["DEVOPS", "DEVELOPMENT", "TEST", "ACCEPTANCE", "PRODUCTION"];

pub const DEVOPS_KEY: &str = "DEVOPS";

// ---------------------------------------------------------------------------
// TargetEnvironment
// ---------------------------------------------------------------------------

/// One deployment destination: an account/region pair with a unique
/// lowercase name used in generated stage and step names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEnvironment {
    pub account: String,
    pub region: String,
    pub unique_name: String,
}

// ---------------------------------------------------------------------------
// TargetEnvironments
// ---------------------------------------------------------------------------

/// Immutable lookup table of target environments, keyed by logical
/// name (e.g. "TEST", "PRODUCTION"). Built once at synthesis time and
/// threaded into each component explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEnvironments {
    entries: BTreeMap<String, TargetEnvironment>,
}

impl TargetEnvironments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, environment: TargetEnvironment) -> Self {
        self.entries.insert(key.into(), environment);
        self
    }

    pub fn get(&self, key: &str) -> Option<&TargetEnvironment> {
        self.entries.get(key)
    }

    pub fn resolve(&self, key: &str) -> Result<&TargetEnvironment> {
        self.entries
            .get(key)
            .ok_or_else(|| UniformError::UnknownEnvironment(key.to_string()))
    }

    /// The devops environment hosts the pipelines themselves and owns
    /// the shared pipeline roles.
    pub fn devops(&self) -> Result<&TargetEnvironment> {
        self.resolve(DEVOPS_KEY)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Load the standard key set from `UNIFORM_PIPELINES_ENV_ACCOUNT_<KEY>`
    /// and `UNIFORM_PIPELINES_ENV_REGION_<KEY>`. Any missing variable is a
    /// fatal configuration error.
    pub fn from_env() -> Result<Self> {
        Self::from_env_keys(STANDARD_ENVIRONMENT_KEYS)
    }

    pub fn from_env_keys(keys: &[&str]) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for key in keys {
            entries.insert(
                key.to_string(),
                TargetEnvironment {
                    account: read_env_var(&account_env_var(key))?,
                    region: read_env_var(&region_env_var(key))?,
                    unique_name: key.to_lowercase(),
                },
            );
        }
        Ok(Self { entries })
    }
}

pub fn account_env_var(key: &str) -> String {
    format!("{ENV_VAR_PREFIX}_ACCOUNT_{key}")
}

pub fn region_env_var(key: &str) -> String {
    format!("{ENV_VAR_PREFIX}_REGION_{key}")
}

fn read_env_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| UniformError::MissingEnvironmentVariable(name.to_string()))
}

// ---------------------------------------------------------------------------
// Naming helpers
// ---------------------------------------------------------------------------

/// Stage name of the deployment into `environment`. The role
/// reassignment macro dispatches on the `deployment-` prefix.
pub fn deployment_stage_name(environment: &TargetEnvironment) -> String {
    format!(
        "deployment-{}-{}-{}",
        environment.unique_name, environment.account, environment.region
    )
}

pub fn versioned_pipeline_name(stack_name: &str, stack_version: &str) -> String {
    format!("{stack_name}-{stack_version}{PIPELINE_NAME_SUFFIX}")
}

/// Name of the CloudFormation stack that deploys a versioned pipeline;
/// recorded on the pipeline as the deployer-stack tag so the cleanup
/// batch can delete the right stack later.
pub fn versioned_pipeline_stack_name(stack_name: &str, stack_version: &str) -> String {
    format!("{stack_name}-{stack_version}{PIPELINE_NAME_SUFFIX}-stack")
}

/// ARN of the bootstrap deploy role in the target account. Deployment
/// changeset actions run under this role, which is why the role
/// reassignment macro leaves them alone.
pub fn cdk_default_deploy_role_arn(environment: &TargetEnvironment) -> String {
    format!(
        "arn:aws:iam::{account}:role/cdk-{DEFAULT_QUALIFIER}-deploy-role-{account}-{region}",
        account = environment.account,
        region = environment.region,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_env() -> TargetEnvironment {
        TargetEnvironment {
            account: "111122223333".to_string(),
            region: "eu-west-1".to_string(),
            unique_name: "test".to_string(),
        }
    }

    #[test]
    fn deployment_stage_name_format() {
        assert_eq!(
            deployment_stage_name(&test_env()),
            "deployment-test-111122223333-eu-west-1"
        );
    }

    #[test]
    fn versioned_names_carry_suffix() {
        assert_eq!(
            versioned_pipeline_name("orders-api", "1.2.3"),
            "orders-api-1.2.3-uniform-pipeline"
        );
        assert_eq!(
            versioned_pipeline_stack_name("orders-api", "1.2.3"),
            "orders-api-1.2.3-uniform-pipeline-stack"
        );
    }

    #[test]
    fn deploy_role_arn_embeds_account_and_region() {
        assert_eq!(
            cdk_default_deploy_role_arn(&test_env()),
            "arn:aws:iam::111122223333:role/cdk-hnb659fds-deploy-role-111122223333-eu-west-1"
        );
    }

    #[test]
    fn resolve_unknown_key_fails() {
        let environments = TargetEnvironments::new().with_entry("TEST", test_env());
        assert!(environments.get("TEST").is_some());
        let err = environments.resolve("STAGING").unwrap_err();
        assert!(matches!(err, UniformError::UnknownEnvironment(k) if k == "STAGING"));
    }

    #[test]
    fn from_env_reports_missing_variable() {
        // Deliberately unset key.
        let err = TargetEnvironments::from_env_keys(&["NO_SUCH_ENV_KEY"]).unwrap_err();
        assert!(matches!(
            err,
            UniformError::MissingEnvironmentVariable(name)
                if name == "UNIFORM_PIPELINES_ENV_ACCOUNT_NO_SUCH_ENV_KEY"
        ));
    }
}
