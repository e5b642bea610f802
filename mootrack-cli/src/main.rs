// MooTrack CLI - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # MooTrack CLI
//!
//! Herd simulator, risk model trainer and map server.
//!
//! ## Usage
//!
//! ```bash
//! # Write the forest zone and a leopard sighting into the store
//! mootrack seed --scenario forest_edge
//!
//! # Train the random forest on synthetic data
//! mootrack train --samples 1000 --seed 42
//!
//! # Move the herd for 20 ticks with SMS alerts logged only
//! mootrack simulate --dry-run
//!
//! # Serve the map and Prometheus metrics
//! mootrack serve --port 8080
//! ```

mod metrics;
mod server;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use mootrack::model::{self, dataset};
use mootrack::{
    AlertChannel, ContainmentMode, Dashboard, DocumentStore, Geofence, JsonFileStore,
    LearnedPolicy, MooTrackConfig, ProximityRule, RiskPolicy, SimulationConfig, Simulator,
};
use mootrack_testdata::{generate_samples, label_distribution, FarmScenario, GeneratorConfig};
use server::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// MooTrack livestock risk tracker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Document store directory (overrides config)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Model artifact directory (overrides config)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Move a simulated herd, persist positions and raise alerts
    Simulate(SimulateArgs),
    /// Train the risk model and save its artifacts
    Train(TrainArgs),
    /// Write a farm scenario (forest zone, sightings) into the store
    Seed(SeedArgs),
    /// Render the map once as GeoJSON
    Dashboard(DashboardArgs),
    /// Serve the map, summary and Prometheus metrics over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct PolicyArgs {
    /// Use the proximity rule instead of the trained model
    #[arg(long)]
    rule: bool,

    /// Use bounding-box containment instead of the polygon test
    #[arg(long)]
    bounding_box: bool,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Unassessed, unbounded movement from the continuous preset
    #[arg(long)]
    continuous: bool,

    /// Number of ticks (0 = run until stopped)
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// Milliseconds between ticks
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Herd size
    #[arg(long)]
    herd_size: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log alerts instead of sending SMS
    #[arg(long)]
    dry_run: bool,

    /// Alert recipient phone number (overrides config and environment)
    #[arg(long)]
    recipient: Option<String>,

    /// Classify with the trained model instead of the proximity rule
    #[arg(long)]
    learned: bool,

    /// Use bounding-box containment instead of the polygon test
    #[arg(long)]
    bounding_box: bool,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Labeled CSV dataset; synthetic rows are generated when omitted
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Synthetic rows to generate
    #[arg(long, default_value = "1000")]
    samples: usize,

    /// Seed for synthetic rows
    #[arg(long)]
    seed: Option<u64>,

    /// Save the generated rows as CSV
    #[arg(long)]
    save_dataset: Option<PathBuf>,

    /// Number of trees (overrides config)
    #[arg(long)]
    trees: Option<usize>,
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Built-in scenario name
    #[arg(short, long, default_value = "forest_edge")]
    scenario: String,

    /// Scenario JSON file (takes precedence over --scenario)
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DashboardArgs {
    #[command(flatten)]
    policy: PolicyArgs,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    policy: PolicyArgs,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    info!("MooTrack v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    match cli.command {
        Command::Simulate(args) => run_simulate(&config, args),
        Command::Train(args) => run_train(&config, args),
        Command::Seed(args) => run_seed(&config, args),
        Command::Dashboard(args) => run_dashboard(&config, args),
        Command::Serve(args) => run_serve(&config, args),
    }
}

/// File (or defaults), then environment, then command-line flags.
fn load_config(cli: &Cli) -> anyhow::Result<MooTrackConfig> {
    let mut config = MooTrackConfig::load(cli.config.as_deref())
        .with_context(|| format!("loading configuration {:?}", cli.config))?;
    if let Some(dir) = &cli.store_dir {
        config = config.with_store_dir(dir);
    }
    if let Some(dir) = &cli.model_dir {
        config = config.with_model_dir(dir);
    }
    Ok(config)
}

fn open_store(config: &MooTrackConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = JsonFileStore::open(&config.store_dir)
        .with_context(|| format!("opening store at {}", config.store_dir.display()))?;
    Ok(Arc::new(store))
}

fn containment(config: &MooTrackConfig, bounding_box: bool) -> Geofence {
    if bounding_box {
        Geofence::new(ContainmentMode::BoundingBox)
    } else {
        Geofence::new(config.containment)
    }
}

fn build_policy(config: &MooTrackConfig, rule: bool) -> Box<dyn RiskPolicy + Send + Sync> {
    if rule {
        Box::new(ProximityRule::default())
    } else {
        Box::new(LearnedPolicy::load_or_degrade(&config.model_dir))
    }
}

fn simulation_config(config: &MooTrackConfig, args: &SimulateArgs) -> SimulationConfig {
    let mut sim = if args.continuous {
        SimulationConfig::continuous()
    } else {
        config.simulation.clone()
    };
    if let Some(n) = args.iterations {
        sim = sim.with_iterations(if n == 0 { None } else { Some(n) });
    }
    if let Some(ms) = args.interval_ms {
        sim = sim.with_tick_interval_ms(ms);
    }
    if let Some(n) = args.herd_size {
        sim = sim.with_herd_size(n);
    }
    if let Some(seed) = args.seed {
        sim = sim.with_seed(seed);
    }
    sim
}

fn run_simulate(config: &MooTrackConfig, args: SimulateArgs) -> anyhow::Result<()> {
    let sim_config = simulation_config(config, &args);
    if sim_config.herd_size == 0 {
        bail!("herd size must be at least 1");
    }
    let store = open_store(config)?;

    let recipient = args.recipient.as_deref().or(config.alert_recipient.as_deref());
    let alerts = if args.dry_run {
        Some(AlertChannel::dry_run(recipient.unwrap_or("dry-run")))
    } else {
        AlertChannel::from_env(recipient)
    };

    let mut simulator = Simulator::new(sim_config, store)
        .with_policy(build_policy(config, !args.learned))
        .with_geofence(containment(config, args.bounding_box));
    if let Some(channel) = alerts {
        info!("Alerts go to {}", channel.recipient());
        simulator = simulator.with_alerts(channel);
    }

    let summary = simulator.run();
    println!(
        "{} ticks, {} positions stored ({} failed), {} alerts raised, {} delivered",
        summary.ticks,
        summary.persisted,
        summary.persist_failures,
        summary.alerts_raised,
        summary.alerts_delivered
    );
    Ok(())
}

fn run_train(config: &MooTrackConfig, args: TrainArgs) -> anyhow::Result<()> {
    let samples = match &args.dataset {
        Some(path) => dataset::read_csv(path)
            .with_context(|| format!("reading dataset {}", path.display()))?,
        None => {
            let mut generator = GeneratorConfig::new().with_num_samples(args.samples);
            if let Some(seed) = args.seed {
                generator = generator.with_seed(seed);
            }
            info!("Generating {} synthetic rows", generator.num_samples);
            let samples = generate_samples(&generator);
            if let Some(path) = &args.save_dataset {
                dataset::write_csv(path, &samples)?;
                info!("Dataset written to {}", path.display());
            }
            samples
        }
    };

    println!("Rows: {}", samples.len());
    for (label, count) in label_distribution(&samples) {
        println!("  {:<10} {}", label, count);
    }

    let mut training = config.training.clone();
    if let Some(n) = args.trees {
        training.forest = training.forest.with_n_trees(n);
    }
    let outcome = model::train(&samples, &training)?;

    println!("\nTrain accuracy: {:.3}", outcome.train_accuracy);
    println!("Test set ({} rows):\n{}", outcome.test_size, outcome.test_report);
    println!("Feature importances:");
    for (name, importance) in &outcome.feature_importances {
        println!("  {:<22} {:.3}", name, importance);
    }

    std::fs::create_dir_all(&config.model_dir)?;
    outcome
        .model
        .save(&config.model_dir)
        .with_context(|| format!("saving model to {}", config.model_dir.display()))?;
    println!("\nModel saved to {}", config.model_dir.display());
    Ok(())
}

fn run_seed(config: &MooTrackConfig, args: SeedArgs) -> anyhow::Result<()> {
    let scenario = match &args.file {
        Some(path) => FarmScenario::load(path)
            .with_context(|| format!("reading scenario {}", path.display()))?,
        None => match FarmScenario::by_name(&args.scenario) {
            Some(s) => s,
            None => {
                let names: Vec<_> = FarmScenario::presets().into_iter().map(|s| s.name).collect();
                bail!("unknown scenario {:?} (available: {})", args.scenario, names.join(", "));
            }
        },
    };

    let store = open_store(config)?;
    let report = scenario.apply(store.as_ref(), chrono::Utc::now())?;
    println!(
        "Scenario {}: zone {}, {} sightings inserted, {} already present",
        scenario.name,
        if report.zone_written { "written" } else { "unchanged" },
        report.sightings_inserted,
        report.sightings_skipped
    );
    Ok(())
}

fn build_dashboard(config: &MooTrackConfig, policy: &PolicyArgs) -> anyhow::Result<Dashboard> {
    Ok(Dashboard::new(
        open_store(config)?,
        build_policy(config, policy.rule),
        config.dashboard.clone(),
    )
    .with_geofence(containment(config, policy.bounding_box)))
}

fn run_dashboard(config: &MooTrackConfig, args: DashboardArgs) -> anyhow::Result<()> {
    let view = build_dashboard(config, &args.policy)?.render()?;
    let geojson = serde_json::to_string_pretty(&view.to_geojson())?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, geojson)?;
            info!("Map written to {}", path.display());
        }
        None => println!("{}", geojson),
    }
    for (name, count) in &view.summary {
        info!("{}: {}", name, count);
    }
    Ok(())
}

fn run_serve(config: &MooTrackConfig, args: ServeArgs) -> anyhow::Result<()> {
    let dashboard = build_dashboard(config, &args.policy)?;
    info!("Serving with {} policy", dashboard.policy_name());

    let state = Arc::new(AppState::new(dashboard));
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(addr, state))
}
