pub mod generator;
pub mod report;
pub mod runner;
pub mod verifier;

pub use report::{
    FillRaceReport, FrequencyReport, HarnessReport, ScenarioReport, ScratchLeakReport,
    TaskObservation,
};
pub use runner::ScenarioRunner;
