use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use courier::{Command, CourierConfig, RouteController, TickEvent};
use log::{info, warn};

/// Run the delivery courier over a map image, without a window
#[derive(Parser)]
#[command(name = "courier")]
#[command(version)]
struct Cli {
    /// Map image. Cells whose average colour is close to the road gray become roads
    #[arg(long)]
    map: PathBuf,

    /// TOML file overriding the default settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible random routes
    #[arg(long)]
    seed: Option<u64>,

    /// Commands to run in order, e.g. `randomize,start,return,start`
    #[arg(long, value_delimiter = ',', default_value = "randomize,start")]
    actions: Vec<Command>,

    /// Give up on a command whose motion takes longer than this many ticks
    #[arg(long, default_value_t = 100_000)]
    max_ticks: usize,

    /// Print the road grid before running
    #[arg(long)]
    print_grid: bool,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CourierConfig::load(path)?,
        None => CourierConfig::default(),
    };
    let mut session = match cli.seed {
        Some(seed) => RouteController::with_seed(config, seed)?,
        None => RouteController::new(config)?,
    };

    let img = image::open(&cli.map)
        .with_context(|| format!("failed to open map {}", cli.map.display()))?;
    session.load_image(&img)?;

    if cli.print_grid {
        if let Some(grid) = session.grid() {
            println!("{}", grid);
        }
    }

    for command in cli.actions {
        match session.handle(command) {
            Ok(response) => info!("{}: {:?}", command.name(), response),
            Err(e) => {
                warn!("{}: {}", command.name(), e);
                continue;
            }
        }
        run(&mut session, cli.max_ticks)?;
    }

    let pose = session.pose();
    println!(
        "courier at {} heading {:.2} rad, {:?}",
        pose.position, pose.heading, pose.phase
    );
    Ok(())
}

/// Tick until the courier stands still, printing every step
fn run(session: &mut RouteController, max_ticks: usize) -> Result<(), anyhow::Error> {
    for _ in 0..max_ticks {
        match session.tick()? {
            TickEvent::Idle => return Ok(()),
            TickEvent::Waiting | TickEvent::Settling { .. } => {}
            TickEvent::Stepped(pose) => println!("{} {:.2}", pose.position, pose.heading),
            event => info!("{:?}", event),
        }
    }
    anyhow::bail!("courier still moving after {} ticks", max_ticks)
}
