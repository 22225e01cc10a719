//! Old-pipeline detection.
//!
//! Reconstructs the fleet of deployed uniform pipelines from listings
//! and tags, groups them by contained stack, and decides which
//! pipeline+stack pairs are old enough and idle enough to delete. The
//! newest `max_history_length` releases of every stack are always
//! retained so a rollback target stays available.
//!
//! Partial or corrupt listing records (missing ARN, timestamp, or
//! tag; unparseable version; no executions yet) are skipped with a
//! warning and never fail the batch.

use crate::api::{
    filter_tags_to_map, list_all_pipelines, ExecutionStatus, PipelineApi,
};
use crate::config::CleanupConfig;
use crate::error::{CleanupError, Result};
use crate::progress::{PipelineStackPair, ProgressStatus};
use crate::retry::with_throttling_retry;
use chrono::{DateTime, Months, Utc};
use semver::Version;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uniform_core::model::{
    DEPLOYER_STACK_NAME_TAG, PIPELINE_NAME_SUFFIX, STACK_NAME_TAG, STACK_VERSION_TAG,
};

// ---------------------------------------------------------------------------
// UniformPipelineInfo
// ---------------------------------------------------------------------------

/// One deployed uniform pipeline, reconstructed per listing call from
/// the remote system's current state. Never persisted.
#[derive(Debug, Clone)]
pub struct UniformPipelineInfo {
    pub pipeline_name: String,
    pub pipeline_arn: String,
    pub contained_stack_name: String,
    pub contained_stack_version: Version,
    pub pipeline_last_update: DateTime<Utc>,
    pub cloudformation_stack_name: String,
    pub pipeline_status: ExecutionStatus,
}

// ---------------------------------------------------------------------------
// OldPipelineDetector
// ---------------------------------------------------------------------------

pub struct OldPipelineDetector<'a, A: PipelineApi> {
    api: &'a A,
    config: &'a CleanupConfig,
}

impl<'a, A: PipelineApi> OldPipelineDetector<'a, A> {
    pub fn new(api: &'a A, config: &'a CleanupConfig) -> Self {
        Self { api, config }
    }

    /// Determine which pipeline+stack pairs are eligible for deletion.
    ///
    /// `is_complete` reflects whether any candidates beyond the
    /// retention window exist at all; the eligible list can be shorter
    /// when age or in-progress gates exclude candidates this pass.
    pub async fn detect_old_pipeline_stacks(&self) -> Result<ProgressStatus<PipelineStackPair>> {
        let infos = self.collect_uniform_pipelines().await?;

        let mut groups: BTreeMap<String, Vec<UniformPipelineInfo>> = BTreeMap::new();
        for info in infos {
            groups
                .entry(info.contained_stack_name.clone())
                .or_default()
                .push(info);
        }

        let age_cutoff = Utc::now()
            .checked_sub_months(Months::new(self.config.history_months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut candidate_count = 0usize;
        let mut eligible = Vec::new();

        for (stack_name, mut group) in groups {
            group.sort_by(|a, b| b.contained_stack_version.cmp(&a.contained_stack_version));
            if group.len() <= self.config.max_history_length {
                debug!(stack = %stack_name, "all versions within retention window");
                continue;
            }

            for candidate in group.drain(self.config.max_history_length..) {
                candidate_count += 1;
                if candidate.pipeline_last_update > age_cutoff {
                    debug!(
                        pipeline = %candidate.pipeline_name,
                        "candidate updated too recently, keeping"
                    );
                    continue;
                }
                if candidate.pipeline_status == ExecutionStatus::InProgress {
                    debug!(
                        pipeline = %candidate.pipeline_name,
                        "candidate execution in progress, keeping"
                    );
                    continue;
                }
                eligible.push(PipelineStackPair {
                    pipeline_name: candidate.pipeline_name,
                    stack_name: candidate.cloudformation_stack_name,
                });
            }
        }

        Ok(ProgressStatus {
            is_complete: candidate_count == 0,
            units_of_work: eligible,
        })
    }

    /// List all pipelines carrying the uniform suffix and resolve each
    /// to a full record, skipping any with incomplete metadata.
    async fn collect_uniform_pipelines(&self) -> Result<Vec<UniformPipelineInfo>> {
        let all_pipelines = list_all_pipelines(self.api).await?;
        let mut result = Vec::new();

        for pipeline in all_pipelines
            .into_iter()
            .filter(|p| p.name.ends_with(PIPELINE_NAME_SUFFIX))
        {
            let Some(pipeline_arn) =
                with_throttling_retry(|| self.api.get_pipeline_arn(&pipeline.name)).await?
            else {
                warn!(pipeline = %pipeline.name, "skipping pipeline without ARN");
                continue;
            };

            let Some(pipeline_last_update) = pipeline.updated else {
                warn!(pipeline = %pipeline.name, "skipping pipeline with corrupt last update");
                continue;
            };

            let all_tags = with_throttling_retry(|| self.api.list_tags(&pipeline_arn)).await?;
            let tags = filter_tags_to_map(
                &all_tags,
                &[STACK_NAME_TAG, STACK_VERSION_TAG, DEPLOYER_STACK_NAME_TAG],
            );
            let (Some(contained_stack_name), Some(version_tag), Some(cloudformation_stack_name)) = (
                tags.get(STACK_NAME_TAG),
                tags.get(STACK_VERSION_TAG),
                tags.get(DEPLOYER_STACK_NAME_TAG),
            ) else {
                warn!(pipeline = %pipeline.name, "skipping pipeline with incomplete tags");
                continue;
            };

            let contained_stack_version = match Version::parse(version_tag) {
                Ok(version) => version,
                Err(error) => {
                    warn!(
                        pipeline = %pipeline.name,
                        version = %version_tag,
                        %error,
                        "skipping pipeline with unparseable version tag"
                    );
                    continue;
                }
            };

            let pipeline_status = match with_throttling_retry(|| {
                self.api.last_execution_status(&pipeline.name)
            })
            .await
            {
                Ok(status) => status,
                Err(CleanupError::NoExecutions(_)) => {
                    warn!(pipeline = %pipeline.name, "skipping pipeline with no executions");
                    continue;
                }
                Err(error) => return Err(error),
            };

            result.push(UniformPipelineInfo {
                pipeline_name: pipeline.name,
                pipeline_arn,
                contained_stack_name: contained_stack_name.clone(),
                contained_stack_version,
                pipeline_last_update,
                cloudformation_stack_name: cloudformation_stack_name.clone(),
                pipeline_status,
            });
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
