use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the fill-to-target workers interleave their size read and their insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillSchedule {
    /// Read and write with no coordination; overshoot depends on timing.
    #[default]
    Free,
    /// Every worker reads the size before any worker writes.
    ReadsFirst,
    /// Read and write happen under one lock.
    Guarded,
}

/// What a task does with its unit's scratch slot when it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScratchPolicy {
    /// Leave the value behind for the next task on the same unit.
    #[default]
    Retain,
    /// Remove the value before returning the unit to the pool.
    ClearAfterTask,
}

/// The scenarios the harness knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Fill,
    Frequency,
    Scratch,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Fill,
        ScenarioKind::Frequency,
        ScenarioKind::Scratch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::Fill => "fill",
            ScenarioKind::Frequency => "frequency",
            ScenarioKind::Scratch => "scratch",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fill" => Ok(ScenarioKind::Fill),
            "frequency" => Ok(ScenarioKind::Frequency),
            "scratch" => Ok(ScenarioKind::Scratch),
            other => Err(format!("Unknown scenario: {}", other)),
        }
    }
}

/// Human-readable duration (e.g., "200ms", "5m", "1h").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl Default for HumanDuration {
    fn default() -> Self {
        HumanDuration(Duration::from_secs(0))
    }
}

impl HumanDuration {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for HumanDuration {
    fn from(d: Duration) -> Self {
        HumanDuration(d)
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        let (num_str, unit) = if let Some(n) = s.strip_suffix("ms") {
            (n, "ms")
        } else if let Some(n) = s.strip_suffix('s') {
            (n, "s")
        } else if let Some(n) = s.strip_suffix('m') {
            (n, "m")
        } else if let Some(n) = s.strip_suffix('h') {
            (n, "h")
        } else {
            return Err(format!("Invalid duration format: {}", s));
        };

        let num: u64 = num_str
            .trim()
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", s))?;

        let secs_per_unit = match unit {
            "ms" => return Ok(HumanDuration(Duration::from_millis(num))),
            "s" => 1,
            "m" => 60,
            _ => 3600,
        };
        let secs = num
            .checked_mul(secs_per_unit)
            .ok_or_else(|| format!("Duration out of range: {}", s))?;
        let duration = Duration::from_secs(secs);

        Ok(HumanDuration(duration))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        let secs = self.0.as_secs();

        if millis % 1000 != 0 || secs == 0 {
            write!(f, "{}ms", millis)
        } else if secs % 3600 == 0 {
            write!(f, "{}h", secs / 3600)
        } else if secs % 60 == 0 {
            write!(f, "{}m", secs / 60)
        } else {
            write!(f, "{}s", secs)
        }
    }
}

impl Serialize for HumanDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HumanDuration::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Root configuration for a harness run.
///
/// Every field is optional in YAML; missing fields take the reference
/// values from [`HarnessConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Pool width for the fill and frequency scenarios.
    pub thread_count: usize,
    /// Target size for the fill race and key universe for the frequency count.
    pub item_count: usize,
    /// Total increments performed by the frequency count.
    pub loop_count: u64,
    /// Ceiling on how long a runner waits for a batch to drain.
    pub timeout: HumanDuration,
    /// Fixed seed for key generation; fresh randomness when absent.
    pub seed: Option<u64>,
    /// Number of entries left missing when the fill race seeds its container.
    pub fill_gap: usize,
    pub fill_schedule: FillSchedule,
    pub scratch_policy: ScratchPolicy,
    /// Pause between the two scratch tasks so the single unit goes idle.
    pub scratch_idle: HumanDuration,
}
