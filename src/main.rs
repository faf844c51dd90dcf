use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gateflow_netlist::CircuitSnapshot;
use gateflow_sim::{resolve_order, ClockManager, SimulationConfig, SimulationOutcome, Simulator};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// gateflow - logic gate circuit simulator
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a circuit snapshot
    Sim {
        /// Snapshot file (JSON)
        snapshot: PathBuf,

        /// Toggle every CLOCK gate this many times, one pass per half period
        #[arg(short, long, default_value_t = 0)]
        ticks: u32,

        /// Bypass the subcircuit cache
        #[arg(long)]
        realtime: bool,

        /// Sweep cap when settling subcircuit feedback
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Subcircuit nesting cap (at most 64)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Number of cached subcircuit results
        #[arg(long)]
        cache_capacity: Option<usize>,

        /// Simulation config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the flattened signal map as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the evaluation order of a circuit snapshot
    Order {
        /// Snapshot file (JSON)
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Sim {
            snapshot,
            ticks,
            realtime,
            max_iterations,
            max_depth,
            cache_capacity,
            config,
            json,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(n) = max_iterations {
                config = config.with_max_iterations(n);
            }
            if let Some(n) = max_depth {
                config = config.with_max_depth(n);
            }
            if let Some(n) = cache_capacity {
                config = config.with_cache_capacity(n);
            }
            if realtime {
                config = config.with_realtime(true);
            }
            simulate_snapshot(&snapshot, config, ticks, json)?;
        }

        Commands::Order { snapshot } => {
            print_order(&snapshot)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: SimulationConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

fn load_snapshot(path: &Path) -> Result<CircuitSnapshot> {
    info!("Loading circuit from {:?}", path);
    CircuitSnapshot::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Run one pass, then one more per clock half period
fn simulate_snapshot(path: &Path, config: SimulationConfig, ticks: u32, json: bool) -> Result<()> {
    let mut snapshot = load_snapshot(path)?;
    let library = snapshot.library();
    let mut simulator = Simulator::new(config);
    let mut clocks = ClockManager::from_gates(&snapshot.gates);

    if ticks > 0 && clocks.is_empty() {
        anyhow::bail!("--ticks given but the circuit has no CLOCK gates");
    }

    for tick in 0..=ticks {
        if tick > 0 {
            for (clock, edge) in clocks.tick(&mut snapshot.gates) {
                info!("tick {}: {} {:?}", tick, clock, edge);
            }
        }
        let outcome = simulator
            .simulate(&snapshot.gates, &snapshot.wires, &library)
            .with_context(|| format!("Simulation of {} failed", path.display()))?;

        if json {
            print_json(tick, &outcome)?;
        } else {
            print_outcome(tick, ticks > 0, &snapshot, &outcome);
        }
    }

    if !json {
        let stats = simulator.cache_stats();
        println!(
            "cache: {} entries, {} hits, {} misses, {} evictions ({:.1}% hit rate)",
            simulator.cache().len(),
            stats.hits,
            stats.misses,
            stats.evictions,
            stats.hit_rate() * 100.0
        );
    }
    Ok(())
}

fn print_outcome(tick: u32, clocked: bool, snapshot: &CircuitSnapshot, outcome: &SimulationOutcome) {
    if clocked {
        println!("== tick {} ==", tick);
    }
    for gate in snapshot.outputs() {
        let bit = outcome.signals.gate(gate.id.as_str()).unwrap_or(false);
        println!("{} = {}", gate.id, u8::from(bit));
    }
    for warning in &outcome.warnings {
        println!("warning: {}", warning);
    }
    let stats = &outcome.stats;
    info!(
        "evaluated {} gates, {} subcircuit runs, {} cache hits",
        stats.gates_evaluated, stats.subcircuit_evaluations, stats.cache_hits
    );
}

fn print_json(tick: u32, outcome: &SimulationOutcome) -> Result<()> {
    let wires: serde_json::Map<String, serde_json::Value> = outcome
        .signals
        .wires()
        .map(|(id, bit)| (id.to_string(), serde_json::Value::from(u8::from(bit))))
        .collect();
    let gates: serde_json::Map<String, serde_json::Value> = outcome
        .signals
        .gate_labels()
        .into_iter()
        .map(|(label, bit)| (label, serde_json::Value::from(u8::from(bit))))
        .collect();
    let report = serde_json::json!({
        "tick": tick,
        "gates": gates,
        "wires": wires,
        "warnings": outcome.warnings,
        "stats": outcome.stats,
    });
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn print_order(path: &Path) -> Result<()> {
    let snapshot = load_snapshot(path)?;
    let (order, feedback) = resolve_order(&snapshot.gates, &snapshot.wires)
        .with_context(|| format!("Failed to order {}", path.display()))?;

    for (position, id) in order.iter().enumerate() {
        let kind = snapshot
            .gates
            .iter()
            .find(|g| &g.id == id)
            .map_or("?", |g| g.kind.mnemonic());
        println!("{:>4}  {:<12} {}", position, kind, id);
    }
    if !feedback.is_empty() {
        let names: Vec<String> = feedback.iter().map(ToString::to_string).collect();
        println!("feedback wires: {}", names.join(", "));
    }
    Ok(())
}
