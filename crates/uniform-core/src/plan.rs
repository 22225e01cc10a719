//! The deployment plan: the ordered list of per-environment release
//! policies that is the single source of truth for pipeline shape.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DeploymentPolicyEntry
// ---------------------------------------------------------------------------

/// One entry per stage in the release sequence. List order is
/// deployment order; no reordering is permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentPolicyEntry {
    pub target_environment_key: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub should_smoke_test: bool,
}

impl DeploymentPolicyEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            target_environment_key: key.into(),
            requires_approval: false,
            should_smoke_test: false,
        }
    }

    pub fn with_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    pub fn with_smoke_test(mut self) -> Self {
        self.should_smoke_test = true;
        self
    }
}

/// The standard three-stage release sequence: test (smoke-tested),
/// acceptance (gated and smoke-tested), production (gated only).
pub fn standard_plan() -> Vec<DeploymentPolicyEntry> {
    vec![
        DeploymentPolicyEntry::new("TEST").with_smoke_test(),
        DeploymentPolicyEntry::new("ACCEPTANCE")
            .with_approval()
            .with_smoke_test(),
        DeploymentPolicyEntry::new("PRODUCTION").with_approval(),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
