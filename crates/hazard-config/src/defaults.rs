use std::time::Duration;

use crate::types::{FillSchedule, HarnessConfig, HumanDuration, ScratchPolicy};

/// Reference pool width.
pub const THREAD_COUNT: usize = 10;
/// Reference fill target and key universe size.
pub const ITEM_COUNT: usize = 1000;
/// Reference number of increments for the frequency count.
pub const LOOP_COUNT: u64 = 10_000_000;
/// Entries the fill race leaves missing at seed time.
pub const FILL_GAP: usize = 100;
/// Await ceiling used by the reference scenarios.
pub const TIMEOUT: Duration = Duration::from_secs(3600);
/// Idle pause between the two scratch tasks.
pub const SCRATCH_IDLE: Duration = Duration::from_secs(1);

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            thread_count: THREAD_COUNT,
            item_count: ITEM_COUNT,
            loop_count: LOOP_COUNT,
            timeout: HumanDuration(TIMEOUT),
            seed: None,
            fill_gap: FILL_GAP,
            fill_schedule: FillSchedule::default(),
            scratch_policy: ScratchPolicy::default(),
            scratch_idle: HumanDuration(SCRATCH_IDLE),
        }
    }
}

impl HarnessConfig {
    /// Number of entries the fill race seeds before launching workers.
    pub fn fill_seed_size(&self) -> usize {
        self.item_count.saturating_sub(self.fill_gap)
    }

    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_items(mut self, item_count: usize) -> Self {
        self.item_count = item_count;
        self
    }

    pub fn with_loops(mut self, loop_count: u64) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = HumanDuration(timeout);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fill_gap(mut self, fill_gap: usize) -> Self {
        self.fill_gap = fill_gap;
        self
    }

    pub fn with_fill_schedule(mut self, schedule: FillSchedule) -> Self {
        self.fill_schedule = schedule;
        self
    }

    pub fn with_scratch_policy(mut self, policy: ScratchPolicy) -> Self {
        self.scratch_policy = policy;
        self
    }

    pub fn with_scratch_idle(mut self, idle: Duration) -> Self {
        self.scratch_idle = HumanDuration(idle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_constants() {
        let config = HarnessConfig::default();
        assert_eq!(config.thread_count, 10);
        assert_eq!(config.item_count, 1000);
        assert_eq!(config.loop_count, 10_000_000);
        assert_eq!(config.timeout.as_duration(), Duration::from_secs(3600));
        assert_eq!(config.fill_schedule, FillSchedule::Free);
        assert_eq!(config.scratch_policy, ScratchPolicy::Retain);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_fill_seed_size() {
        let config = HarnessConfig::default();
        assert_eq!(config.fill_seed_size(), 900);

        let small = HarnessConfig::default().with_items(50);
        assert_eq!(small.fill_seed_size(), 0);
    }

    #[test]
    fn test_builder_chain() {
        let config = HarnessConfig::default()
            .with_threads(4)
            .with_loops(42)
            .with_seed(7)
            .with_fill_schedule(FillSchedule::ReadsFirst);
        assert_eq!(config.thread_count, 4);
        assert_eq!(config.loop_count, 42);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.fill_schedule, FillSchedule::ReadsFirst);
    }
}
