//! Tunables for the cleanup batch, threaded explicitly into each
//! component so tests can use arbitrary values.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Newest releases per contained stack that are always retained,
    /// regardless of age. Supports rollback.
    pub max_history_length: usize,
    /// A candidate younger than this many months is left alone.
    pub history_months: u32,
    /// Stacks deleted per batch invocation.
    pub delete_batch_size: usize,
    /// Pause between consecutive delete batches.
    pub wait_between_batches: Duration,
    /// Bound on a whole detect/delete workflow run.
    pub process_timeout: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_history_length: 3,
            history_months: 3,
            delete_batch_size: 5,
            wait_between_batches: Duration::from_secs(5 * 60),
            process_timeout: Duration::from_secs(2 * 60 * 60),
        }
    }
}
