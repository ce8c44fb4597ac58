use std::path::PathBuf;

use eyre::WrapErr;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use verlet_sim::{Simulation, SimulationConfig, SimulationStatistics};

#[derive(StructOpt, Debug)]
#[structopt(name = "verlet_sim")]
struct Opt {
    /// JSON simulation settings. Anything left out keeps its default.
    #[structopt(short, long)]
    config: Option<PathBuf>,
    /// Directory to write one MessagePack encoded frame per step into
    #[structopt(short, long)]
    output_dir: Option<PathBuf>,
    #[structopt(short, long, default_value = "600")]
    frames: usize,
    /// Log statistics every this many frames (0 disables)
    #[structopt(short, long, default_value = "60")]
    log_every: usize,
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opt = Opt::from_args();

    let config: SimulationConfig = match &opt.config {
        Some(path) => std::fs::read(path)
            .wrap_err_with(|| format!("Failed to read JSON settings file: {:?}", path))
            .and_then(|json| {
                serde_json::from_slice(&json).wrap_err("Serde failed to deserialize JSON.")
            })?,
        None => SimulationConfig::default(),
    };

    if let Some(dir) = &opt.output_dir {
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create output directory: {:?}", dir))?;
    }

    let mut simulation = Simulation::new(&config).wrap_err("Invalid simulation settings")?;
    tracing::info!(frames = opt.frames, collision = ?config.collision, "starting simulation");

    for frame in 0..opt.frames {
        let verts = simulation
            .simulate_frame()
            .wrap_err_with(|| format!("Simulation failed on frame {}", frame))?;

        if let Some(dir) = &opt.output_dir {
            let path = dir.join(format!("{:04}.dat", frame));
            let mut writer = std::io::BufWriter::new(
                std::fs::File::create(&path)
                    .wrap_err_with(|| format!("Failed to create frame file: {:?}", path))?,
            );
            rmp_serde::encode::write(&mut writer, &verts)?;
        }

        if opt.log_every != 0 && frame % opt.log_every == 0 {
            log_statistics(&simulation, frame);
        }
    }

    log_statistics(&simulation, opt.frames);
    Ok(())
}

fn log_statistics(simulation: &Simulation, frame: usize) {
    let store = &simulation.store;
    let centroid = store.centroid().map(|c| [c.x, c.y]);

    tracing::info!(
        frame,
        particles = store.particle_count(),
        ?centroid,
        kinetic_energy = store.total_kinetic_energy(simulation.solver.sub_dt()),
        "frame statistics"
    );
}
