pub mod commands;

use std::{fs, path::Path, process::ExitCode};

use clap::Parser;
use commands::{coordinator::CoordinatorCommand, worker::WorkerCommand, Commands};
use coordinator::{run_coordinator, CoordinatorOptions};
use log::error;
use shared::{env, logger, networking::network::NetworkConfig, scene::SceneDescription};
use uuid::Uuid;
use worker::{run_worker, WorkerOptions};

const DEFAULT_WORKER_PORT: u16 = 11811;
const DEFAULT_RENDERER: &str = "distracer";

/// Distributed tile renderer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    env::init();
    logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Coordinator(args) => coordinator(args).await,
        Commands::Worker(args) => worker(args).await,
    }
}

async fn coordinator(args: CoordinatorCommand) -> ExitCode {
    let network = match NetworkConfig::from_file(&args.network) {
        Ok(network) => network,
        Err(e) => {
            logger::log_error(&format!("Could not load {}", args.network.display()), &e);
            return ExitCode::FAILURE;
        }
    };
    let scene = match read_scene(&args.scene) {
        Some(scene) => scene,
        None => return ExitCode::FAILURE,
    };

    let options = CoordinatorOptions {
        network,
        scene,
        output: args.output,
        portal: args.portal,
        seed: args.seed,
    };
    match run_coordinator(options).await {
        Ok(report) if report.is_complete() => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn read_scene(path: &Path) -> Option<SceneDescription> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Could not read scene {}: {}", path.display(), e);
            return None;
        }
    };
    match SceneDescription::parse(raw) {
        Ok(scene) => Some(scene),
        Err(e) => {
            logger::log_error(&format!("Invalid scene {}", path.display()), &e);
            None
        }
    }
}

async fn worker(args: WorkerCommand) -> ExitCode {
    let options = WorkerOptions {
        name: args
            .name
            .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4())),
        address: args.address.unwrap_or_else(|| "0.0.0.0".to_string()),
        port: args.port.unwrap_or(DEFAULT_WORKER_PORT),
        command: args
            .command
            .or_else(|| env::var("DISTRACER_RENDERER"))
            .unwrap_or_else(|| DEFAULT_RENDERER.to_string()),
        benchmark_scene: args.benchmark_scene,
    };

    match run_worker(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
