use std::sync::{Arc, Barrier};
use std::time::Duration;

use hazard_config::{FillSchedule, HarnessConfig, ScenarioKind, ScratchPolicy};
use hazard_core::{CounterMap, HarnessError, SharedMap, UnitContext, WorkerPool};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::generator::{self, FillGap, Login, TallyChunk};
use crate::report::{
    FillRaceReport, FrequencyReport, HarnessReport, ScenarioReport, ScratchLeakReport,
    TaskObservation,
};
use crate::verifier;

/// Chunks handed to each unit during the frequency count, so faster units
/// can pick up the slack of slower ones.
const CHUNKS_PER_UNIT: usize = 16;

/// User ids for the two scratch tasks.
const FIRST_USER: u64 = 1;
const SECOND_USER: u64 = 2;

/// Runs the hazard scenarios.
///
/// Every run builds its own container and pool; nothing carries over from one
/// run to the next.
pub struct ScenarioRunner {
    config: HarnessConfig,
}

impl ScenarioRunner {
    /// Create a runner after validating `config`.
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate_or_err()?;
        Ok(ScenarioRunner { config })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        self.config.timeout.as_duration()
    }

    /// Seed the container short of its target, then let every worker read the
    /// gap and fill it.
    ///
    /// The final size is reported, not checked: workers that read the same
    /// stale size each insert a full gap's worth of entries.
    pub async fn run_fill_race(&self) -> Result<FillRaceReport, HarnessError> {
        let target = self.config.item_count;
        let threads = self.config.thread_count;
        let schedule = self.config.fill_schedule;

        let map = Arc::new(SharedMap::<u64>::with_capacity(target));
        map.put_all(generator::fresh_entries(self.config.fill_seed_size()));
        let initial_size = map.len();
        info!(size = initial_size, target, ?schedule, "init size");

        let pool: WorkerPool = WorkerPool::new(threads)?;
        let barrier = Arc::new(Barrier::new(threads));
        let guard = Arc::new(Mutex::new(()));
        let shared = Arc::clone(&map);

        let outcome = pool
            .submit_and_await(
                generator::fill_gaps(threads),
                move |ctx: &UnitContext<'_, ()>, _: FillGap| {
                    let gap = match schedule {
                        FillSchedule::Free => {
                            let gap = target.saturating_sub(shared.len());
                            shared.put_all(generator::fresh_entries(gap));
                            gap
                        }
                        FillSchedule::ReadsFirst => {
                            let gap = target.saturating_sub(shared.len());
                            barrier.wait();
                            shared.put_all(generator::fresh_entries(gap));
                            gap
                        }
                        FillSchedule::Guarded => {
                            let _held = guard.lock();
                            let gap = target.saturating_sub(shared.len());
                            shared.put_all(generator::fresh_entries(gap));
                            gap
                        }
                    };
                    info!(unit = %ctx.unit(), gap, "gap size");
                    gap
                },
                self.timeout(),
            )
            .await?;
        pool.close();

        let drift = verifier::observe_drift(map.len(), target);
        Ok(FillRaceReport {
            schedule,
            threads,
            initial_size,
            gaps: outcome.outputs,
            drift,
            completed: outcome.completed,
            elapsed_ms: millis(outcome.elapsed),
            pool: pool.stats(),
        })
    }

    /// Count `loop_count` random keys with get-or-create plus lock-free
    /// increments, then require the counts to add up exactly.
    ///
    /// A run that times out skips the sum check; partial counts are not a
    /// violation.
    pub async fn run_frequency_count(&self) -> Result<FrequencyReport, HarnessError> {
        let threads = self.config.thread_count;
        let item_count = self.config.item_count;
        let loop_count = self.config.loop_count;
        let seed = self.config.seed;

        let counters = Arc::new(CounterMap::with_capacity(item_count));
        let pool: WorkerPool = WorkerPool::new(threads)?;
        let work = generator::chunks(loop_count, threads * CHUNKS_PER_UNIT);
        debug!(chunks = work.len(), loop_count, "frequency work split");

        let shared = Arc::clone(&counters);
        let outcome = pool
            .submit_and_await(
                work,
                move |_: &UnitContext<'_, ()>, chunk: TallyChunk| {
                    let mut applied = 0u64;
                    for tally in chunk.tallies(item_count, seed) {
                        shared.get_or_create_counter(&tally.key).increment();
                        applied += 1;
                    }
                    applied
                },
                self.timeout(),
            )
            .await?;
        pool.close();

        let counts = counters.snapshot();
        let counters_created = counters.counters_created();

        let verified = if outcome.completed {
            if let Some(violation) = verifier::verify_unique_handles(counters_created, counts.len())
            {
                return Err(HarnessError::InvariantViolated(violation));
            }
            Some(verifier::verify_sum(&counts, loop_count)?)
        } else {
            warn!(
                applied = outcome.outputs.iter().sum::<u64>(),
                loop_count, "frequency count incomplete, sum not checked"
            );
            None
        };

        info!(
            keys = counts.len(),
            total = counts.values().sum::<u64>(),
            elapsed_ms = millis(outcome.elapsed),
            "frequency count finished"
        );

        Ok(FrequencyReport {
            threads,
            item_count,
            loop_count,
            completed: outcome.completed,
            elapsed_ms: millis(outcome.elapsed),
            verified,
            counters_created,
            counts,
            pool: pool.stats(),
        })
    }

    /// Run two unrelated tasks back to back on a single-unit pool and record
    /// what each one reads from the unit's scratch slot.
    ///
    /// With [`ScratchPolicy::Retain`] the second task starts out holding the
    /// first task's user id.
    pub async fn run_scratch_leak(&self) -> Result<ScratchLeakReport, HarnessError> {
        let policy = self.config.scratch_policy;
        let pool: WorkerPool<u64> = WorkerPool::new(1)?;

        let first = pool
            .submit_and_await(
                generator::logins([FIRST_USER]),
                move |ctx: &UnitContext<'_, u64>, login: Login| handle_login(ctx, login, policy),
                self.timeout(),
            )
            .await?;
        let first_obs = first.outputs.into_iter().next();

        // Let the unit go idle before the next, unrelated request arrives.
        tokio::time::sleep(self.config.scratch_idle.as_duration()).await;

        let second = pool
            .submit_and_await(
                generator::logins([SECOND_USER]),
                move |ctx: &UnitContext<'_, u64>, login: Login| handle_login(ctx, login, policy),
                self.timeout(),
            )
            .await?;
        let second_obs = second.outputs.into_iter().next();
        pool.close();

        let leak = match (&first_obs, &second_obs) {
            (Some(a), Some(b)) => Some(verifier::observe_leak(a, b)),
            _ => None,
        };

        Ok(ScratchLeakReport {
            policy,
            completed: first.completed && second.completed,
            first: first_obs,
            second: second_obs,
            leak,
        })
    }

    pub async fn run(&self, kind: ScenarioKind) -> Result<ScenarioReport, HarnessError> {
        info!(scenario = %kind, "running scenario");
        Ok(match kind {
            ScenarioKind::Fill => ScenarioReport::Fill(self.run_fill_race().await?),
            ScenarioKind::Frequency => {
                ScenarioReport::Frequency(self.run_frequency_count().await?)
            }
            ScenarioKind::Scratch => ScenarioReport::Scratch(self.run_scratch_leak().await?),
        })
    }

    /// Run every scenario in the fixed order fill, frequency, scratch.
    pub async fn run_all(&self) -> Result<HarnessReport, HarnessError> {
        self.run_many(&ScenarioKind::ALL).await
    }

    /// Run the given scenarios in order, stopping at the first error.
    pub async fn run_many(&self, kinds: &[ScenarioKind]) -> Result<HarnessReport, HarnessError> {
        let mut report = HarnessReport::default();
        for kind in kinds {
            report.scenarios.push(self.run(*kind).await?);
        }
        Ok(report)
    }
}

fn handle_login(ctx: &UnitContext<'_, u64>, login: Login, policy: ScratchPolicy) -> TaskObservation {
    let thread = std::thread::current()
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| ctx.unit().to_string());

    let before = ctx.scratch_get();
    info!(%thread, user_id = login.user_id, ?before, "before");

    ctx.scratch_set(login.user_id);
    let after = ctx.scratch_get();
    info!(%thread, user_id = login.user_id, ?after, "after");

    if policy == ScratchPolicy::ClearAfterTask {
        ctx.scratch_clear();
    }

    TaskObservation {
        user_id: login.user_id,
        unit: ctx.unit(),
        thread,
        before,
        after,
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
