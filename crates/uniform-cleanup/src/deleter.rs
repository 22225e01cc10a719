//! Batched stack deletion.
//!
//! Deletes a bounded batch of stacks per invocation and reports the
//! remaining work, so an external orchestrator can re-invoke until the
//! envelope says complete. A failed delete is logged and left for a
//! future detection pass; it never aborts the batch. Deleting an
//! already-deleted stack is a tolerable no-op failure.

use crate::api::StackApi;
use crate::progress::{PipelineStackPair, ProgressStatus};
use crate::retry::with_throttling_retry;
use tracing::{error, info};

pub struct BatchStackDeleter<'a, A: StackApi> {
    api: &'a A,
    batch_size: usize,
}

impl<'a, A: StackApi> BatchStackDeleter<'a, A> {
    pub fn new(api: &'a A, batch_size: usize) -> Self {
        Self { api, batch_size }
    }

    /// Delete the first `batch_size` units of work and return the
    /// rest. Stateless between calls; all state lives in the envelope.
    pub async fn process_batch(
        &self,
        status: ProgressStatus<PipelineStackPair>,
    ) -> ProgressStatus<PipelineStackPair> {
        let mut units_of_work = status.units_of_work;
        let remaining = units_of_work.split_off(self.batch_size.min(units_of_work.len()));

        for pair in &units_of_work {
            info!(stack = %pair.stack_name, "attempting to delete stack");
            if let Err(err) =
                with_throttling_retry(|| self.api.delete_stack(&pair.stack_name)).await
            {
                error!(stack = %pair.stack_name, %err, "failed to delete stack");
            }
        }

        ProgressStatus::from_units(remaining)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
