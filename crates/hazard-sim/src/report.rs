use std::collections::BTreeMap;

use hazard_config::{FillSchedule, ScenarioKind, ScratchPolicy};
use hazard_core::{PoolStatsSnapshot, UnitId};
use serde::Serialize;

use crate::verifier::{DriftReport, LeakReport, SumReport};

/// Result of the fill-to-target race.
#[derive(Debug, Clone, Serialize)]
pub struct FillRaceReport {
    pub schedule: FillSchedule,
    pub threads: usize,
    pub initial_size: usize,
    /// Gap each worker computed, in completion order.
    pub gaps: Vec<usize>,
    pub drift: DriftReport,
    pub completed: bool,
    pub elapsed_ms: u64,
    pub pool: PoolStatsSnapshot,
}

impl FillRaceReport {
    pub fn final_size(&self) -> usize {
        self.drift.observed
    }
}

/// Result of the frequency count.
#[derive(Debug, Clone, Serialize)]
pub struct FrequencyReport {
    pub threads: usize,
    pub item_count: usize,
    pub loop_count: u64,
    pub completed: bool,
    pub elapsed_ms: u64,
    /// Present when the run completed and the sum check passed.
    pub verified: Option<SumReport>,
    pub counters_created: u64,
    /// Final count per key.
    pub counts: BTreeMap<String, u64>,
    pub pool: PoolStatsSnapshot,
}

impl FrequencyReport {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// The key-to-count mapping as JSON.
    pub fn counts_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.counts)
    }
}

/// What one scratch task saw on its unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskObservation {
    pub user_id: u64,
    pub unit: UnitId,
    pub thread: String,
    /// Scratch value before the task wrote its own.
    pub before: Option<u64>,
    /// Scratch value right after the write.
    pub after: Option<u64>,
}

/// Result of the scratch leak demonstration.
#[derive(Debug, Clone, Serialize)]
pub struct ScratchLeakReport {
    pub policy: ScratchPolicy,
    pub completed: bool,
    pub first: Option<TaskObservation>,
    pub second: Option<TaskObservation>,
    pub leak: Option<LeakReport>,
}

impl ScratchLeakReport {
    /// `(before_a, after_a, before_b, after_b)`.
    pub fn reads(&self) -> (Option<u64>, Option<u64>, Option<u64>, Option<u64>) {
        let (before_a, after_a) = self
            .first
            .as_ref()
            .map_or((None, None), |t| (t.before, t.after));
        let (before_b, after_b) = self
            .second
            .as_ref()
            .map_or((None, None), |t| (t.before, t.after));
        (before_a, after_a, before_b, after_b)
    }

    pub fn leaked(&self) -> bool {
        self.leak.as_ref().is_some_and(|l| l.leaked)
    }
}

/// One scenario's report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum ScenarioReport {
    Fill(FillRaceReport),
    Frequency(FrequencyReport),
    Scratch(ScratchLeakReport),
}

impl ScenarioReport {
    pub fn kind(&self) -> ScenarioKind {
        match self {
            ScenarioReport::Fill(_) => ScenarioKind::Fill,
            ScenarioReport::Frequency(_) => ScenarioKind::Frequency,
            ScenarioReport::Scratch(_) => ScenarioKind::Scratch,
        }
    }

    pub fn completed(&self) -> bool {
        match self {
            ScenarioReport::Fill(r) => r.completed,
            ScenarioReport::Frequency(r) => r.completed,
            ScenarioReport::Scratch(r) => r.completed,
        }
    }
}

/// Reports from a full harness run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarnessReport {
    pub scenarios: Vec<ScenarioReport>,
}

impl HarnessReport {
    pub fn all_completed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::completed)
    }

    pub fn fill(&self) -> Option<&FillRaceReport> {
        self.scenarios.iter().find_map(|s| match s {
            ScenarioReport::Fill(r) => Some(r),
            _ => None,
        })
    }

    pub fn frequency(&self) -> Option<&FrequencyReport> {
        self.scenarios.iter().find_map(|s| match s {
            ScenarioReport::Frequency(r) => Some(r),
            _ => None,
        })
    }

    pub fn scratch(&self) -> Option<&ScratchLeakReport> {
        self.scenarios.iter().find_map(|s| match s {
            ScenarioReport::Scratch(r) => Some(r),
            _ => None,
        })
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
