use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use sponge_wave::config::{Config, ServerConfig};
use sponge_wave::snapshot::{ChannelSink, NullSink, SnapshotSink};
use sponge_wave::visualisation::WavefieldVisualiser;
use sponge_wave::{server, Simulation};
use std::net::TcpListener;
use std::str::FromStr;
use std::thread;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(short, long, global = true)]
    verbosity: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation described by a TOML file
    Run {
        /// Path to the simulation toml
        #[arg(short, long)]
        config: String,

        /// Skip frame rendering
        #[arg(long)]
        headless: bool,

        /// Override the frame output directory
        #[arg(short, long)]
        output: Option<String>,

        /// Frames buffered for the renderer before new ones are dropped
        #[arg(long, default_value_t = 8)]
        frame_queue: usize,
    },
    /// Start the line-oriented sample server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Read host and port from a simulation toml
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .format_timestamp_secs()
        .filter_level(LevelFilter::from_str(
            args.verbosity.as_deref().unwrap_or("info"),
        )?)
        .parse_default_env()
        .init();

    match args.command {
        Command::Run {
            config,
            headless,
            output,
            frame_queue,
        } => run(&config, headless, output, frame_queue),
        Command::Serve { host, port, config } => {
            let mut server_config = match config {
                Some(path) => Config::from_file(&path)?.server,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                server_config.host = host;
            }
            if let Some(port) = port {
                server_config.port = port;
            }
            let listener = TcpListener::bind(server_config.address())
                .with_context(|| format!("Failed to bind {}", server_config.address()))?;
            server::serve(listener)?;
            Ok(())
        }
    }
}

fn run(path: &str, headless: bool, output: Option<String>, frame_queue: usize) -> Result<()> {
    let mut config = Config::from_file(path)?;
    if let Some(output) = output {
        config.visualization.output_dir = output;
    }
    for line in config.summary().lines() {
        log::info!("{}", line);
    }

    let mut simulation = Simulation::from_config(&config)?;
    let start = Instant::now();

    let summary = if headless || !config.visualization.enabled {
        simulation.run(&mut NullSink)?
    } else {
        let vis = &config.visualization;
        let mut subtitle = format!("dt={}", config.simulation.dt);
        if simulation.sponge.is_active() {
            subtitle = format!(
                "sponge depth={}, sigma_max={:.3}",
                simulation.sponge.thickness, simulation.sponge.sigma_max
            );
        }
        let mut visualiser =
            WavefieldVisualiser::new(&vis.output_dir, vis.image_width, vis.image_height)?
                .with_color_limit(vis.color_limit)
                .with_subtitle(subtitle);

        let (mut sink, frames) = ChannelSink::bounded(frame_queue.max(1));
        let renderer = thread::spawn(move || {
            for (step, field) in frames {
                if let Err(e) = visualiser.emit(step, field) {
                    log::warn!("{}", e);
                }
            }
        });

        let result = simulation.run(&mut sink);
        drop(sink);
        if renderer.join().is_err() {
            log::warn!("Renderer thread panicked");
        }
        log::info!("Frames saved to {}/", vis.output_dir);
        result?
    };

    log::info!(
        "Finished {} steps in {:.1} s",
        summary.steps_completed,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
