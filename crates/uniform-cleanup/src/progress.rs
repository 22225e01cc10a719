//! Checkpoint/resume envelope passed between workflow steps.
//!
//! `ProgressStatus` is the only state that survives between successive
//! invocations of the batch deleter. The core never persists it; the
//! external step orchestrator carries it from one invocation to the
//! next. Field names are part of the wire contract with that
//! orchestrator, which branches on `isComplete`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PipelineStackPair
// ---------------------------------------------------------------------------

/// Unit of deletion work: a versioned pipeline and the CloudFormation
/// stack that deployed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStackPair {
    pub pipeline_name: String,
    pub stack_name: String,
}

// ---------------------------------------------------------------------------
// ProgressStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStatus<T> {
    pub is_complete: bool,
    pub units_of_work: Vec<T>,
}

impl<T> ProgressStatus<T> {
    /// `is_complete` iff there is no work left.
    pub fn from_units(units_of_work: Vec<T>) -> Self {
        Self {
            is_complete: units_of_work.is_empty(),
            units_of_work,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
