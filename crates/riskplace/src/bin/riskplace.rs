use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;

use riskplace::common::settings::Settings;
use riskplace::common::setup::setup_logging;
use riskplace::load::{load_infrastructure, load_workload, write_infrastructure, write_workload};
use riskplace::output::JsonLines;
use riskplace::simulation::batch::BatchSimulation;
use riskplace::simulation::greedy::run_greedy;
use riskplace::simulation::sweep::{sweep, sweep_greedy};
use riskplace::simulation::timeout::create_backend;
use riskplace::workload::generator::WorkloadGenerator;
use riskplace::workload::infrastructure::InfrastructureGenerator;
use riskplace_core::Core;
use riskplace_core::ledger::ResourceLedger;
use riskplace_core::request::Request;

#[derive(Parser)]
#[command(author, about, version, disable_help_subcommand(true))]
struct RootOptions {
    /// Enables more detailed log output
    #[arg(long, short, env = "RISKPLACE_VERBOSE", global = true)]
    verbose: bool,

    /// TOML file with scheduler and simulation settings
    #[arg(long, env = "RISKPLACE_SETTINGS", global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Windowed batch simulation solving one placement problem per window
    Batch(BatchOpts),
    /// Continuous simulation placing requests one at a time
    Greedy(GreedyOpts),
    /// Runs one scheduler for a range of risk weights
    Sweep(SweepOpts),
    /// Writes a synthetic workload file
    Generate(GenerateOpts),
    /// Writes a synthetic infrastructure file
    #[command(name = "generate-infra")]
    GenerateInfra(GenerateInfraOpts),
}

#[derive(Args)]
struct InputOpts {
    /// JSON file describing the nodes
    #[arg(long)]
    infra: PathBuf,

    /// JSON file describing the pods; generated from the settings when omitted
    #[arg(long)]
    workload: Option<PathBuf>,
}

#[derive(Args)]
struct BatchOpts {
    #[command(flatten)]
    input: InputOpts,

    /// Length of a collection window
    #[arg(long, value_parser = humantime::parse_duration)]
    window: Option<Duration>,

    /// Simulated time at which the run stops
    #[arg(long, value_parser = humantime::parse_duration)]
    until: Option<Duration>,

    /// Solves running longer are treated as infeasible
    #[arg(long, value_parser = humantime::parse_duration)]
    solver_timeout: Option<Duration>,
}

#[derive(Args)]
struct GreedyOpts {
    #[command(flatten)]
    input: InputOpts,

    /// Simulated time at which the run stops
    #[arg(long, value_parser = humantime::parse_duration)]
    until: Option<Duration>,
}

#[derive(Args)]
struct SweepOpts {
    #[command(flatten)]
    input: InputOpts,

    /// Number of intervals between risk weights 0 and 1
    #[arg(long, default_value_t = 10)]
    steps: u32,

    /// Scheduler evaluated at every risk weight
    #[arg(long, value_enum, default_value_t = SweepMode::Batch)]
    mode: SweepMode,

    /// Simulated time at which a greedy run stops
    #[arg(long, value_parser = humantime::parse_duration)]
    until: Option<Duration>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SweepMode {
    /// Solves all requests as one batch
    Batch,
    /// Continuous simulation placing requests one at a time
    Greedy,
}

#[derive(Args)]
struct GenerateOpts {
    /// Arrivals per hour
    #[arg(long)]
    rate: Option<f64>,

    /// End of the arrival period
    #[arg(long, value_parser = humantime::parse_duration)]
    until: Option<Duration>,

    #[arg(long)]
    seed: Option<u64>,

    /// Output file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateInfraOpts {
    /// Cloud nodes in every region
    #[arg(long)]
    cloud_per_region: Option<u32>,

    /// Edge nodes in every region
    #[arg(long)]
    edge_per_region: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,

    /// Output file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

fn load_core(settings: &Settings, infra: &Path) -> anyhow::Result<Core> {
    let nodes = load_infrastructure(infra)
        .with_context(|| format!("Cannot load infrastructure from {}", infra.display()))?;
    Ok(Core::new(settings.scheduler, ResourceLedger::new(nodes))?)
}

fn generate_requests(settings: &Settings) -> Vec<Request> {
    let simulation = &settings.simulation;
    WorkloadGenerator::new(
        &settings.workload,
        &settings.scheduler.normalization,
        simulation.seed,
    )
    .generate(simulation.arrival_rate, simulation.until)
}

fn load_requests(settings: &Settings, workload: Option<&Path>) -> anyhow::Result<Vec<Request>> {
    match workload {
        Some(path) => load_workload(path)
            .with_context(|| format!("Cannot load workload from {}", path.display())),
        None => {
            log::info!("No workload given, generating one from the settings");
            Ok(generate_requests(settings))
        }
    }
}

// Commands

fn command_batch(mut settings: Settings, opts: BatchOpts) -> anyhow::Result<()> {
    let simulation = &mut settings.simulation;
    if opts.window.is_some() {
        simulation.window = opts.window;
    }
    if let Some(until) = opts.until {
        simulation.until = until;
    }
    if opts.solver_timeout.is_some() {
        simulation.solver_timeout = opts.solver_timeout;
    }
    settings.validate()?;

    let core = load_core(&settings, &opts.input.infra)?;
    let requests = load_requests(&settings, opts.input.workload.as_deref())?;
    let window = settings.simulation.window_for(core.ledger().len());
    log::info!(
        "Batch simulation of {} request(s) on {} node(s), window {}",
        requests.len(),
        core.ledger().len(),
        humantime::format_duration(window)
    );
    let simulation = BatchSimulation::new(
        core,
        create_backend(settings.simulation.solver_timeout),
        requests,
        window,
        settings.simulation.until,
    );

    let mut output = JsonLines::stdout();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let summary = runtime.block_on(simulation.run(|report| output.emit(report)))?;
    output.emit(&json!({ "summary": summary }))?;
    Ok(())
}

fn command_greedy(mut settings: Settings, opts: GreedyOpts) -> anyhow::Result<()> {
    if let Some(until) = opts.until {
        settings.simulation.until = until;
    }
    let core = load_core(&settings, &opts.input.infra)?;
    let requests = load_requests(&settings, opts.input.workload.as_deref())?;
    log::info!(
        "Greedy simulation of {} request(s) on {} node(s)",
        requests.len(),
        core.ledger().len()
    );
    let summary = run_greedy(core, requests, Some(settings.simulation.until))?;
    JsonLines::stdout().emit(&json!({ "summary": summary }))?;
    Ok(())
}

fn command_sweep(mut settings: Settings, opts: SweepOpts) -> anyhow::Result<()> {
    if let Some(until) = opts.until {
        settings.simulation.until = until;
    }
    let core = load_core(&settings, &opts.input.infra)?;
    let requests = load_requests(&settings, opts.input.workload.as_deref())?;
    log::info!(
        "{:?} sweep over {} risk weight(s) with {} request(s)",
        opts.mode,
        opts.steps + 1,
        requests.len()
    );
    let points = match opts.mode {
        SweepMode::Batch => {
            let backend = create_backend(settings.simulation.solver_timeout);
            sweep(&core, backend.as_ref(), &requests, opts.steps)?
        }
        SweepMode::Greedy => {
            sweep_greedy(&core, &requests, Some(settings.simulation.until), opts.steps)?
        }
    };
    let mut output = JsonLines::stdout();
    for point in &points {
        output.emit(point)?;
    }
    Ok(())
}

fn command_generate(mut settings: Settings, opts: GenerateOpts) -> anyhow::Result<()> {
    let simulation = &mut settings.simulation;
    if let Some(rate) = opts.rate {
        simulation.arrival_rate = rate;
    }
    if let Some(until) = opts.until {
        simulation.until = until;
    }
    if let Some(seed) = opts.seed {
        simulation.seed = seed;
    }
    settings.validate()?;

    let requests = generate_requests(&settings);
    match &opts.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            write_workload(file, &requests)?;
            log::info!("Wrote {} pod(s) to {}", requests.len(), path.display());
        }
        None => write_workload(std::io::stdout().lock(), &requests)?,
    }
    Ok(())
}

fn command_generate_infra(mut settings: Settings, opts: GenerateInfraOpts) -> anyhow::Result<()> {
    let infrastructure = &mut settings.infrastructure;
    if let Some(count) = opts.cloud_per_region {
        infrastructure.cloud_per_region = count;
    }
    if let Some(count) = opts.edge_per_region {
        infrastructure.edge_per_region = count;
    }
    if let Some(seed) = opts.seed {
        settings.simulation.seed = seed;
    }
    settings.validate()?;

    let nodes =
        InfrastructureGenerator::new(&settings.infrastructure, settings.simulation.seed).generate();
    match &opts.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            write_infrastructure(file, &nodes)?;
            log::info!("Wrote {} node(s) to {}", nodes.len(), path.display());
        }
        None => write_infrastructure(std::io::stdout().lock(), &nodes)?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let opts = RootOptions::parse();
    setup_logging(opts.verbose);

    let settings = match &opts.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Cannot load settings from {}", path.display()))?,
        None => Settings::default(),
    };

    match opts.subcmd {
        SubCommand::Batch(opts) => command_batch(settings, opts),
        SubCommand::Greedy(opts) => command_greedy(settings, opts),
        SubCommand::Sweep(opts) => command_sweep(settings, opts),
        SubCommand::Generate(opts) => command_generate(settings, opts),
        SubCommand::GenerateInfra(opts) => command_generate_infra(settings, opts),
    }
}
