//! Simulate one night of planning.
//!
//! Loads a planner configuration and a scenario (projects plus a tabulated
//! sky), then runs the planner from the start of the night to its end. Each
//! imaging plan is assumed to succeed: the exposure is recorded in the
//! in-memory repository and the clock jumps to the end of the exposure.
//!
//! ```text
//! plan-night --scenario data/sample_night.json --config planner.toml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use target_scheduler::config::{ConfigError, PlannerConfig};
use target_scheduler::db::LocalRepository;
use target_scheduler::models::Project;
use target_scheduler::oracles::{LorentzianMoonAvoidance, TabulatedSky};
use target_scheduler::planning::{PlanInstruction, Planner, SchedulerPlan};
use target_scheduler::scoring::WeightedRuleEngine;

#[derive(Parser, Debug)]
#[command(name = "plan-night")]
#[command(about = "Run the target planner over a simulated night")]
#[command(version)]
struct Args {
    /// Scenario JSON with `projects` and `sky`
    #[arg(short, long)]
    scenario: PathBuf,

    /// Planner configuration; defaults to the first planner.toml found
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Profile used when no configuration file exists
    #[arg(long, default_value = "default")]
    profile: String,

    /// Print the timeline as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    projects: Vec<Project>,
    sky: TabulatedSky,
}

#[derive(Debug, Serialize)]
struct TimelineEntry {
    at: DateTime<Utc>,
    plan: SchedulerPlan,
}

fn load_config(args: &Args) -> Result<PlannerConfig> {
    match &args.config {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => match PlannerConfig::from_default_location() {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound) => Ok(PlannerConfig::for_profile(&args.profile)),
            Err(err) => Err(err).context("Failed to load default configuration"),
        },
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read scenario {}", path.display()))?;
    let deserializer = &mut serde_json::Deserializer::from_str(&text);
    serde_path_to_error::deserialize(deserializer)
        .with_context(|| format!("Invalid scenario {}", path.display()))
}

fn describe(plan: &SchedulerPlan) -> String {
    match plan {
        SchedulerPlan::Imaging(imaging) => {
            let steps: Vec<String> = imaging
                .instructions
                .iter()
                .map(|instruction| match instruction {
                    PlanInstruction::Slew { target_name, .. } => format!("slew to {}", target_name),
                    PlanInstruction::SwitchFilter { filter_name } => format!("filter {}", filter_name),
                    PlanInstruction::Dither => "dither".to_string(),
                    PlanInstruction::TakeExposure {
                        filter_name,
                        exposure_length,
                        ..
                    } => format!("expose {} {}s", filter_name, exposure_length.value()),
                })
                .collect();
            format!("{:<24} {}", imaging.active.target.name, steps.join(", "))
        }
        SchedulerPlan::Wait { until, next_target, park } => format!(
            "wait until {} for {}{}",
            until.format("%H:%M:%S"),
            next_target.as_ref().map(|t| t.target.name.as_str()).unwrap_or("?"),
            if *park { " (parked)" } else { "" }
        ),
        SchedulerPlan::NoPlan => "no plan".to_string(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let scenario = load_scenario(&args.scenario)?;

    let night = match scenario.sky.night() {
        Some(night) => night,
        None => bail!("Scenario sky has no twilight windows"),
    };

    let repository = LocalRepository::new();
    for project in scenario.projects {
        repository.store_project(&config.profile.id, project);
    }
    info!(
        "Simulating {} project(s) for profile '{}' over {}",
        repository.project_count(),
        config.profile.id,
        night
    );

    let sampling = config.sampling_interval();
    let sky = scenario.sky;
    let moon = LorentzianMoonAvoidance::new(&sky);
    let scoring = WeightedRuleEngine::default();
    let mut planner = Planner::new(config, &repository, &sky, &sky, &moon, &scoring);
    planner.start_session();

    let mut timeline = Vec::new();
    let mut at = night.start();
    let mut previous = None;
    while at < night.end() {
        let plan = planner.get_plan(at, previous.take())?;
        let next = match &plan {
            SchedulerPlan::Imaging(imaging) => {
                if let Some(exposure) = imaging.active.selected_exposure() {
                    repository.record_exposure(exposure.id, true)?;
                }
                previous = Some(imaging.active.clone());
                Some(imaging.time_interval.end())
            }
            SchedulerPlan::Wait { until, .. } => Some(if *until > at { *until } else { at + sampling }),
            SchedulerPlan::NoPlan => None,
        };

        if !args.json {
            println!("{}  {}", at.format("%Y-%m-%d %H:%M:%S"), describe(&plan));
        }
        timeline.push(TimelineEntry { at, plan });

        match next {
            Some(next) => at = next,
            None => break,
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
    }

    info!("Simulation finished with {} planning cycle(s)", timeline.len());
    Ok(())
}
