use hazard_config::{HarnessConfig, ScenarioKind};
use hazard_sim::{
    FillRaceReport, FrequencyReport, HarnessReport, ScenarioReport, ScenarioRunner,
    ScratchLeakReport,
};
use tracing::{info, warn};

/// Run arguments.
pub struct RunArgs {
    /// Scenarios to run, in order.
    pub scenarios: Vec<ScenarioKind>,
    /// Print the full report as JSON instead of a summary.
    pub json: bool,
}

pub async fn run(config: HarnessConfig, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runner = ScenarioRunner::new(config)?;
    let report = runner.run_many(&args.scenarios).await?;

    if args.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print_summary(&report)?;
    }

    if !report.all_completed() {
        warn!("one or more scenarios timed out before finishing");
    }

    Ok(())
}

fn print_summary(report: &HarnessReport) -> Result<(), Box<dyn std::error::Error>> {
    for scenario in &report.scenarios {
        match scenario {
            ScenarioReport::Fill(r) => print_fill(r),
            ScenarioReport::Frequency(r) => print_frequency(r)?,
            ScenarioReport::Scratch(r) => print_scratch(r),
        }
    }
    Ok(())
}

fn print_fill(r: &FillRaceReport) {
    println!(
        "fill       schedule={:?} threads={} init={} target={} final={} drift={:+}",
        r.schedule,
        r.threads,
        r.initial_size,
        r.drift.target,
        r.final_size(),
        r.drift.drift
    );
    if !r.completed {
        println!("           timed out after {}ms", r.elapsed_ms);
    }
}

fn print_frequency(r: &FrequencyReport) -> Result<(), Box<dyn std::error::Error>> {
    info!("the result is: {}", r.counts_json()?);
    let status = match (&r.verified, r.completed) {
        (Some(_), _) => "verified",
        (None, false) => "incomplete",
        (None, true) => "unchecked",
    };
    println!(
        "frequency  threads={} keys={} total={} expected={} {} in {}ms",
        r.threads,
        r.counts.len(),
        r.total(),
        r.loop_count,
        status,
        r.elapsed_ms
    );
    Ok(())
}

fn print_scratch(r: &ScratchLeakReport) {
    let (before_a, after_a, before_b, after_b) = r.reads();
    println!(
        "scratch    policy={:?} first=({:?} -> {:?}) second=({:?} -> {:?}) leaked={}",
        r.policy,
        before_a,
        after_a,
        before_b,
        after_b,
        r.leaked()
    );
}
