//! Remote collaborator surface.
//!
//! The provisioning control plane is a black box reached only through
//! the calls below. Implementations issue the real network calls; the
//! detector and deleter are written against these traits so tests can
//! drive them with in-memory doubles.

use crate::error::Result;
use crate::retry::with_throttling_retry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

// ---------------------------------------------------------------------------
// Wire data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub name: String,
    /// Last-update timestamp; missing on corrupt listings.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

/// One page of a pipeline listing.
#[derive(Debug, Clone, Default)]
pub struct PipelinePage {
    pub pipelines: Vec<PipelineSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Status of a pipeline's most recent execution, as reported by the
/// control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Cancelled,
    InProgress,
    Stopped,
    Stopping,
    Succeeded,
    Superseded,
    Failed,
}

// ---------------------------------------------------------------------------
// Remote traits
// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait PipelineApi {
    async fn list_pipelines(&self, next_token: Option<String>) -> Result<PipelinePage>;

    /// Resolve a pipeline's ARN; `None` when the control plane has no
    /// metadata for it.
    async fn get_pipeline_arn(&self, pipeline_name: &str) -> Result<Option<String>>;

    async fn list_tags(&self, pipeline_arn: &str) -> Result<Vec<Tag>>;

    async fn last_execution_status(&self, pipeline_name: &str) -> Result<ExecutionStatus>;

    async fn start_pipeline_execution(&self, pipeline_name: &str) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait StackApi {
    async fn delete_stack(&self, stack_name: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Call helpers
// ---------------------------------------------------------------------------

/// Page through the full pipeline listing; each page fetch is shielded
/// by the throttling retry. Pages are fetched sequentially to stay
/// within remote rate limits.
pub async fn list_all_pipelines<A: PipelineApi>(api: &A) -> Result<Vec<PipelineSummary>> {
    let mut pipelines = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page =
            with_throttling_retry(|| api.list_pipelines(next_token.clone())).await?;
        pipelines.extend(page.pipelines);
        next_token = page.next_token;
        if next_token.is_none() {
            return Ok(pipelines);
        }
    }
}

/// Project the tag list down to the requested keys.
pub fn filter_tags_to_map(tags: &[Tag], tag_names: &[&str]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for tag_name in tag_names {
        if let Some(tag) = tags.iter().find(|t| t.key == *tag_name) {
            map.insert(tag.key.clone(), tag.value.clone());
        }
    }
    map
}

/// Trigger an execution of the named pipeline.
pub async fn start_pipeline<A: PipelineApi>(api: &A, pipeline_name: &str) -> Result<()> {
    with_throttling_retry(|| api.start_pipeline_execution(pipeline_name)).await?;
    info!(pipeline = pipeline_name, "pipeline started successfully");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
