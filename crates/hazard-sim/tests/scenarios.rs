use std::time::Duration;

use hazard_config::{FillSchedule, HarnessConfig, ScenarioKind, ScratchPolicy};
use hazard_sim::{ScenarioReport, ScenarioRunner};

fn reference() -> HarnessConfig {
    HarnessConfig::default()
        .with_timeout(Duration::from_secs(600))
        .with_scratch_idle(Duration::from_millis(50))
}

// ─── Fill race ──────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn fill_race_reference_reaches_target() {
    let runner = ScenarioRunner::new(reference()).unwrap();
    let report = runner.run_fill_race().await.unwrap();

    assert!(report.completed);
    assert_eq!(report.initial_size, 900);
    assert_eq!(report.gaps.len(), 10);
    // Overshoot is allowed; only the lower bound is guaranteed.
    assert!(report.final_size() >= 1000, "{:#?}", report.drift);
    assert_eq!(report.drift.drift, report.final_size() as i64 - 1000);
}

#[tokio::test(flavor = "multi_thread")]
async fn fill_race_reads_first_overshoots() {
    let runner = ScenarioRunner::new(
        reference().with_fill_schedule(FillSchedule::ReadsFirst),
    )
    .unwrap();
    let report = runner.run_fill_race().await.unwrap();

    assert!(report.completed);
    assert!(report.gaps.iter().all(|g| *g == 100), "{:?}", report.gaps);
    assert_eq!(report.final_size(), 1900);
    assert!(report.drift.overshoot());
    assert_eq!(report.drift.drift, 900);
}

#[tokio::test(flavor = "multi_thread")]
async fn fill_race_guarded_lands_on_target() {
    for _ in 0..5 {
        let runner = ScenarioRunner::new(
            reference().with_fill_schedule(FillSchedule::Guarded),
        )
        .unwrap();
        let report = runner.run_fill_race().await.unwrap();

        assert_eq!(report.final_size(), 1000);
        assert_eq!(report.gaps.iter().sum::<usize>(), 100);
        assert_eq!(report.gaps.iter().filter(|g| **g > 0).count(), 1);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn fill_race_runs_are_independent() {
    let runner = ScenarioRunner::new(
        reference().with_fill_schedule(FillSchedule::ReadsFirst),
    )
    .unwrap();
    let first = runner.run_fill_race().await.unwrap();
    let second = runner.run_fill_race().await.unwrap();
    assert_eq!(first.initial_size, 900);
    assert_eq!(second.initial_size, 900);
    assert_eq!(first.final_size(), second.final_size());
}

// ─── Frequency count ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn frequency_reference_ten_million_is_exact() {
    let runner = ScenarioRunner::new(reference()).unwrap();
    let report = runner.run_frequency_count().await.unwrap();

    assert!(report.completed);
    assert_eq!(report.total(), 10_000_000);
    let verified = report.verified.as_ref().expect("sum checked");
    assert_eq!(verified.actual, 10_000_000);
    assert!(report.counts.len() <= 1000);
    assert_eq!(report.counters_created, report.counts.len() as u64);
    assert_eq!(report.pool.panicked, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn frequency_single_unit_single_key() {
    let runner = ScenarioRunner::new(
        reference().with_threads(1).with_items(1).with_fill_gap(0).with_loops(1234),
    )
    .unwrap();
    let report = runner.run_frequency_count().await.unwrap();
    assert_eq!(report.counts.len(), 1);
    assert_eq!(report.counts.get("item0"), Some(&1234));
}

#[tokio::test(flavor = "multi_thread")]
async fn frequency_zero_loops() {
    let runner = ScenarioRunner::new(reference().with_loops(0)).unwrap();
    let report = runner.run_frequency_count().await.unwrap();
    assert!(report.completed);
    assert!(report.counts.is_empty());
    assert_eq!(report.verified.as_ref().map(|v| v.actual), Some(0));
    assert_eq!(report.pool.dispatched, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn frequency_seeded_runs_match() {
    let config = reference().with_loops(100_000).with_seed(42);
    let a = ScenarioRunner::new(config.clone())
        .unwrap()
        .run_frequency_count()
        .await
        .unwrap();
    let b = ScenarioRunner::new(config)
        .unwrap()
        .run_frequency_count()
        .await
        .unwrap();
    assert_eq!(a.counts, b.counts);
}

#[tokio::test(flavor = "multi_thread")]
async fn frequency_timeout_is_incomplete_not_error() {
    let runner = ScenarioRunner::new(
        reference()
            .with_threads(1)
            .with_loops(5_000_000)
            .with_timeout(Duration::from_millis(1)),
    )
    .unwrap();
    let report = runner.run_frequency_count().await.unwrap();

    assert!(!report.completed);
    assert!(report.verified.is_none());
    assert!(report.total() < 5_000_000);
    assert_eq!(report.pool.timed_out, 1);
    // Every chunk went on the queue once and only once.
    assert_eq!(report.pool.dispatched, 16);
}

#[test]
fn frequency_counts_serialize_as_key_count_json() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let report = rt.block_on(async {
        ScenarioRunner::new(reference().with_items(3).with_fill_gap(0).with_loops(300))
            .unwrap()
            .run_frequency_count()
            .await
            .unwrap()
    });
    let json = report.counts_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let total: u64 = parsed
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(total, 300);
}

// ─── Scratch leak ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn scratch_second_task_sees_first_users_value() {
    let runner = ScenarioRunner::new(reference()).unwrap();
    let report = runner.run_scratch_leak().await.unwrap();

    assert!(report.completed);
    let (before_a, after_a, before_b, after_b) = report.reads();
    assert_eq!(before_a, None);
    assert_eq!(after_a, Some(1));
    assert_eq!(before_b, Some(1), "stale value from task 1 expected");
    assert_eq!(after_b, Some(2));

    let leak = report.leak.as_ref().unwrap();
    assert!(leak.leaked);
    assert!(leak.same_unit);
    assert_eq!(leak.leaked_from, Some(1));
    let first = report.first.as_ref().unwrap();
    assert_eq!(first.thread, "hazard-unit-0");
}

#[tokio::test(flavor = "multi_thread")]
async fn scratch_cleared_after_task_does_not_leak() {
    let runner = ScenarioRunner::new(
        reference().with_scratch_policy(ScratchPolicy::ClearAfterTask),
    )
    .unwrap();
    let report = runner.run_scratch_leak().await.unwrap();

    assert_eq!(report.reads(), (None, Some(1), None, Some(2)));
    assert!(!report.leaked());
}

// ─── Full harness ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn run_all_in_fixed_order() {
    let runner = ScenarioRunner::new(reference().with_loops(200_000)).unwrap();
    let report = runner.run_all().await.unwrap();

    let kinds: Vec<_> = report.scenarios.iter().map(ScenarioReport::kind).collect();
    assert_eq!(
        kinds,
        vec![ScenarioKind::Fill, ScenarioKind::Frequency, ScenarioKind::Scratch]
    );
    assert!(report.all_completed());
    assert!(report.fill().unwrap().final_size() >= 1000);
    assert_eq!(report.frequency().unwrap().total(), 200_000);
    assert!(report.scratch().unwrap().leaked());

    let json = report.to_json_pretty().unwrap();
    assert!(json.contains("\"scenario\": \"frequency\""));
}
