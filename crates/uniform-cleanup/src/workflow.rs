//! The detect → delete-batch → wait control loop.
//!
//! Mirrors the external step orchestration that drives the detector
//! and deleter in production: run the detector once, then consume
//! batches with a fixed wait in between, looping on `isComplete` and
//! bounded by an overall timeout.

use crate::api::{PipelineApi, StackApi};
use crate::config::CleanupConfig;
use crate::deleter::BatchStackDeleter;
use crate::detector::OldPipelineDetector;
use crate::error::{CleanupError, Result};
use tracing::info;

/// Summary of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupRun {
    pub detected: usize,
    pub batches: usize,
}

pub async fn run_cleanup<P, S>(
    pipelines: &P,
    stacks: &S,
    config: &CleanupConfig,
) -> Result<CleanupRun>
where
    P: PipelineApi,
    S: StackApi,
{
    tokio::time::timeout(config.process_timeout, run_unbounded(pipelines, stacks, config))
        .await
        .map_err(|_| CleanupError::Timeout)?
}

async fn run_unbounded<P, S>(
    pipelines: &P,
    stacks: &S,
    config: &CleanupConfig,
) -> Result<CleanupRun>
where
    P: PipelineApi,
    S: StackApi,
{
    let detector = OldPipelineDetector::new(pipelines, config);
    let deleter = BatchStackDeleter::new(stacks, config.delete_batch_size);

    let mut status = detector.detect_old_pipeline_stacks().await?;
    let detected = status.units_of_work.len();
    info!(detected, "old pipeline detection finished");

    let mut batches = 0;
    status = deleter.process_batch(status).await;
    batches += 1;
    while !status.is_complete {
        tokio::time::sleep(config.wait_between_batches).await;
        status = deleter.process_batch(status).await;
        batches += 1;
    }

    info!(detected, batches, "cleanup run complete");
    Ok(CleanupRun { detected, batches })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ExecutionStatus, PipelinePage, PipelineSummary, Tag};
    use chrono::{Duration, Utc};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use uniform_core::model::{DEPLOYER_STACK_NAME_TAG, STACK_NAME_TAG, STACK_VERSION_TAG};

    struct FakeRemote {
        pipelines: Vec<PipelineSummary>,
        tags: HashMap<String, Vec<Tag>>,
        deleted: RefCell<Vec<String>>,
    }

    impl FakeRemote {
        fn with_versions(versions: &[&str]) -> Self {
            let mut pipelines = Vec::new();
            let mut tags = HashMap::new();
            for version in versions {
                let name = format!("orders-{version}-uniform-pipeline");
                pipelines.push(PipelineSummary {
                    name: name.clone(),
                    updated: Some(Utc::now() - Duration::days(365)),
                });
                tags.insert(
                    format!("arn:{name}"),
                    vec![
                        tag(STACK_NAME_TAG, "orders"),
                        tag(STACK_VERSION_TAG, version),
                        tag(DEPLOYER_STACK_NAME_TAG, &format!("orders-{version}-stack")),
                    ],
                );
            }
            Self {
                pipelines,
                tags,
                deleted: RefCell::new(Vec::new()),
            }
        }
    }

    fn tag(key: &str, value: &str) -> Tag {
        Tag {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    impl PipelineApi for FakeRemote {
        async fn list_pipelines(&self, _: Option<String>) -> crate::Result<PipelinePage> {
            Ok(PipelinePage {
                pipelines: self.pipelines.clone(),
                next_token: None,
            })
        }

        async fn get_pipeline_arn(&self, pipeline_name: &str) -> crate::Result<Option<String>> {
            Ok(Some(format!("arn:{pipeline_name}")))
        }

        async fn list_tags(&self, pipeline_arn: &str) -> crate::Result<Vec<Tag>> {
            Ok(self.tags.get(pipeline_arn).cloned().unwrap_or_default())
        }

        async fn last_execution_status(&self, _: &str) -> crate::Result<ExecutionStatus> {
            Ok(ExecutionStatus::Succeeded)
        }

        async fn start_pipeline_execution(&self, _: &str) -> crate::Result<()> {
            Ok(())
        }
    }

    impl StackApi for FakeRemote {
        async fn delete_stack(&self, stack_name: &str) -> crate::Result<()> {
            self.deleted.borrow_mut().push(stack_name.to_string());
            Ok(())
        }
    }

    fn fast_config() -> CleanupConfig {
        CleanupConfig {
            max_history_length: 1,
            delete_batch_size: 2,
            wait_between_batches: std::time::Duration::from_secs(60),
            ..CleanupConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loops_until_all_batches_consumed() {
        // Five versions, newest retained: four stacks across two batches.
        let remote = FakeRemote::with_versions(&["5.0.0", "4.0.0", "3.0.0", "2.0.0", "1.0.0"]);
        let run = run_cleanup(&remote, &remote, &fast_config()).await.unwrap();

        assert_eq!(run, CleanupRun { detected: 4, batches: 2 });
        let deleted = remote.deleted.borrow();
        assert_eq!(deleted.len(), 4);
        assert!(!deleted.iter().any(|s| s.contains("5.0.0")));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_to_do_is_a_single_pass() {
        let remote = FakeRemote::with_versions(&["1.0.0"]);
        let run = run_cleanup(&remote, &remote, &fast_config()).await.unwrap();
        assert_eq!(run, CleanupRun { detected: 0, batches: 1 });
        assert!(remote.deleted.borrow().is_empty());
    }
}
