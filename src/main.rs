use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use bhring::{FrameSink, Renderer, SimConfig, Simulator};

const FRAME_WIDTH: u32 = 800;
const FRAME_HEIGHT: u32 = 800;

#[derive(Parser, Debug)]
#[command(name = "bhring", about = "Distributed 2D Barnes-Hut n-body simulation")]
struct Args {
    /// YAML scenario file; the flags below override its values
    #[arg(short = 'c', long)]
    scenario: Option<PathBuf>,

    /// In-process peer count. A build with the `mpi` feature takes its
    /// process count from mpirun instead.
    #[arg(short, long, default_value_t = 1)]
    procs: usize,

    /// Total body count (must be a multiple of the process count)
    #[arg(short, long)]
    n: Option<usize>,

    /// Simulation radius (half side of the root quadrant)
    #[arg(long)]
    radius: Option<f64>,

    /// Integration time step
    #[arg(long)]
    dt: Option<f64>,

    /// Barnes-Hut acceptance ratio
    #[arg(long)]
    theta: Option<f64>,

    /// Base RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many steps (unbounded when omitted)
    #[arg(long)]
    steps: Option<u64>,

    /// Skip the all-gather + frame phase
    #[arg(long)]
    no_render: bool,

    /// Output directory for PNG frames
    #[arg(long)]
    frames_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.scenario {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_yaml::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimConfig::default(),
    };

    if let Some(n) = args.n {
        config.n = n;
    }
    if let Some(radius) = args.radius {
        config.radius = radius;
    }
    if let Some(dt) = args.dt {
        config.dt = dt;
    }
    if let Some(theta) = args.theta {
        config.theta = theta;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.steps.is_some() {
        config.steps = args.steps;
    }
    if args.no_render {
        config.render = false;
    }
    if let Some(dir) = &args.frames_dir {
        config.frames_dir = dir.clone();
    }

    Ok(config)
}

/// Rank 0 gets the frame sink; other ranks still gather and wait at the
/// barrier so every rank sees the same frame boundary.
fn make_sink(config: &SimConfig) -> Result<Option<Box<dyn Renderer + Send>>> {
    if !config.render {
        return Ok(None);
    }
    let sink = FrameSink::new(
        config.frames_dir.clone(),
        FRAME_WIDTH,
        FRAME_HEIGHT,
        config.radius,
    )
    .with_context(|| format!("creating frame sink in {}", config.frames_dir.display()))?;
    Ok(Some(Box::new(sink)))
}

#[cfg(not(feature = "mpi"))]
fn run_single(config: SimConfig) -> Result<()> {
    use bhring::SingleProcess;

    info!("running {} bodies in a single process", config.n);
    let sink = make_sink(&config)?;
    let mut sim = Simulator::new(config, SingleProcess, sink)?;
    sim.run()?;
    Ok(())
}

#[cfg(not(feature = "mpi"))]
fn run_local(config: SimConfig, procs: usize) -> Result<()> {
    use bhring::local_cluster;

    config.validate(procs)?;
    info!("running {} bodies across {} in-process peers", config.n, procs);

    let endpoints = local_cluster(procs);
    let mut sinks: Vec<Option<Box<dyn Renderer + Send>>> = Vec::with_capacity(procs);
    sinks.push(make_sink(&config)?);
    for _ in 1..procs {
        sinks.push(None);
    }

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .zip(sinks)
            .map(|(comm, sink)| {
                let config = config.clone();
                s.spawn(move || {
                    let mut sim = Simulator::new(config, comm, sink)?;
                    sim.run()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    for joined in results {
        match joined {
            Ok(run_result) => run_result?,
            Err(_) => anyhow::bail!("worker thread panicked"),
        }
    }
    Ok(())
}

#[cfg(feature = "mpi")]
fn run_mpi(config: SimConfig) -> Result<()> {
    use bhring::communication::mpi::MpiTransport;
    use bhring::Transport;

    let comm = MpiTransport::init()?;
    config.validate(comm.size())?;
    info!(
        "rank {}/{}: running {} bodies under MPI",
        comm.rank(),
        comm.size(),
        config.n
    );
    let sink = if comm.rank() == 0 {
        make_sink(&config)?
    } else {
        None
    };
    let mut sim = Simulator::new(config, comm, sink)?;
    sim.run()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    #[cfg(feature = "mpi")]
    {
        let _ = args.procs;
        run_mpi(config)
    }

    #[cfg(not(feature = "mpi"))]
    {
        if args.procs <= 1 {
            run_single(config)
        } else {
            run_local(config, args.procs)
        }
    }
}
