use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use road_traffic_sim::simulation::{SaveFormat, SimConfig, SimRng, Simulator, World};

#[derive(Parser)]
#[command(name = "road_traffic_sim")]
#[command(about = "Headless road traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u64,

    /// Simulated seconds per tick
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Wall-clock milliseconds between driver calls in realtime mode
    #[arg(long, default_value = "16")]
    tick_ms: u64,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// JSON configuration file with feature flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable the right-of-way system regardless of the config file
    #[arg(long)]
    right_of_way: bool,

    /// Load the world from a save file instead of building the demo world
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write the world to a save file when the run ends
    #[arg(long)]
    save: Option<PathBuf>,

    /// Pace the run against the wall clock instead of running flat out
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if cli.right_of_way {
        config = config.with_right_of_way(true);
    }

    let world = match &cli.load {
        Some(path) => load_world(path, cli.seed)?,
        None => match cli.seed {
            Some(seed) => World::create_demo_world_with_seed(seed),
            None => World::create_demo_world(),
        },
    };

    let mut sim = Simulator::new(world, cli.delta, &config);

    if cli.realtime {
        run_realtime(&mut sim, cli.ticks, Duration::from_millis(cli.tick_ms.max(1)));
    } else {
        run_headless(&mut sim, cli.ticks);
    }

    if let Some(path) = &cli.save {
        save_world(&sim, path)?;
    }

    print_final_stats(&sim);
    Ok(())
}

fn load_world(path: &Path, seed: Option<u64>) -> Result<World> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read save file {}", path.display()))?;
    let save = SaveFormat::from_json(&json)
        .with_context(|| format!("Failed to parse save file {}", path.display()))?;
    let mut world = World::from_save_format(&save)
        .with_context(|| format!("Invalid save file {}", path.display()))?;
    if let Some(seed) = seed {
        world.rng = SimRng::seeded(seed);
    }
    info!("Loaded world from {}", path.display());
    Ok(world)
}

fn save_world(sim: &Simulator, path: &Path) -> Result<()> {
    let json = sim
        .read()
        .to_save_format()
        .to_json()
        .context("Failed to serialize world")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write save file {}", path.display()))?;
    info!("Saved world to {}", path.display());
    Ok(())
}

/// Run flat out, printing a summary after every simulated second
fn run_headless(sim: &mut Simulator, ticks: u64) {
    println!("Running road traffic simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s", ticks, sim.tick());

    let ticks_per_second = (1.0 / sim.tick()).ceil().max(1.0) as u64;
    println!();

    println!("Initial state:");
    sim.read().print_summary();
    println!();

    let mut tick = 0;
    while tick < ticks {
        let batch = ticks_per_second.min(ticks - tick);
        sim.run(batch);
        tick += batch;

        println!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            sim.read().time
        );
        sim.read().print_summary();
        println!();
    }
}

/// Feed wall-clock deltas through the fixed-step accumulator until `ticks`
/// ticks have run
fn run_realtime(sim: &mut Simulator, ticks: u64, interval: Duration) {
    println!(
        "Running road traffic simulation in realtime ({} ms driver interval)...",
        interval.as_millis()
    );

    let mut last = Instant::now();
    let mut next_report = 1.0;
    while sim.tick_count() < ticks {
        std::thread::sleep(interval);
        let now = Instant::now();
        sim.update_once(now.duration_since(last).as_secs_f32());
        last = now;

        let time = sim.read().time;
        if time >= next_report {
            println!("--- {:.1}s simulated time ---", time);
            sim.read().print_summary();
            println!();
            next_report = time.floor() + 1.0;
        }
    }
}

fn print_final_stats(sim: &Simulator) {
    let world = sim.read();
    println!("=== SIMULATION COMPLETE ===");
    println!("Ticks run: {}", sim.tick_count());
    println!("Simulated time: {:.1}s", world.time);
    println!("Vehicles spawned: {}", world.stats.vehicles_spawned);
    println!("Vehicles despawned: {}", world.stats.vehicles_despawned);
    println!("Vehicles still active: {}", world.vehicles.len());
}
