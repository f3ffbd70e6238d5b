pub mod aggregator;
pub mod connection;
pub mod coordinator_state;
pub mod dispatcher;
pub mod error;
pub mod portal;
pub mod progress;
pub mod tile_supply;

use std::{path::PathBuf, sync::Arc};

use log::{error, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::{
    graphics::{color::Palette, save_image},
    logger::log_error,
    models::tile::tile_generator::TileGenerator,
    networking::{network::NetworkConfig, worker::WorkerSpec},
    scene::SceneDescription,
};
use tokio::{net::TcpStream, sync::mpsc};

use self::{
    aggregator::PixelAggregator,
    connection::{benchmark_worker, WorkerConnection},
    coordinator_state::CoordinatorState,
    dispatcher::{DispatchSettings, Dispatcher, RenderReport},
    error::{CoordinatorError, CoordinatorResult},
    portal::start_portal,
    progress::ProgressTracker,
};

const PIXEL_CHANNEL_CAPACITY: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub network: NetworkConfig,
    pub scene: SceneDescription,
    /// Where to write the finished image.
    pub output: Option<PathBuf>,
    /// Address for the HTTP status portal.
    pub portal: Option<String>,
    /// Overrides `dispatch.seed` from the network config.
    pub seed: Option<u64>,
}

pub async fn run_coordinator(options: CoordinatorOptions) -> CoordinatorResult<RenderReport> {
    match run(options).await {
        Ok(report) => {
            report.log_summary();
            Ok(report)
        }
        Err(e) => {
            log_error("Coordinator error", &e);
            Err(e)
        }
    }
}

async fn run(options: CoordinatorOptions) -> CoordinatorResult<RenderReport> {
    let CoordinatorOptions {
        network,
        scene,
        output,
        portal,
        seed,
    } = options;
    network.validate()?;

    let seed = seed
        .or(network.dispatch.seed)
        .unwrap_or_else(rand::random);
    info!("Using seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let palette = Palette::default().shuffled(&mut rng);

    if network.dispatch.benchmark {
        run_benchmarks(&network.workers).await;
    }

    let connections = connect_workers(&network.workers, &scene).await?;

    let resolution = scene.resolution();
    let generator = TileGenerator::new(resolution, network.tiling.size, rng.gen());
    let tiles = generator.generate();
    info!(
        "Split {}x{} raster into {} tiles of {}px",
        resolution.width,
        resolution.height,
        tiles.len(),
        network.tiling.size
    );

    let (pixel_tx, pixel_rx) = mpsc::channel(PIXEL_CHANNEL_CAPACITY);
    let aggregator = PixelAggregator::spawn(pixel_rx);
    let progress = Arc::new(ProgressTracker::new());

    let portal = match portal {
        Some(address) => {
            let state = CoordinatorState::new(
                resolution,
                tiles.len(),
                Arc::clone(&progress),
                aggregator.view(),
            );
            Some(start_portal(&address, state).map_err(CoordinatorError::Portal)?)
        }
        None => None,
    };

    let dispatcher = Dispatcher::new(
        connections,
        resolution,
        &palette,
        progress,
        DispatchSettings::from(&network.dispatch),
    );
    let report = dispatcher.dispatch(tiles, pixel_tx).await;
    let pixels = aggregator.finish().await;
    info!(
        "Received {} of {} pixels",
        pixels.len(),
        resolution.pixel_count()
    );

    if let Some(portal) = portal {
        portal.stop().await;
    }

    if let Some(path) = output {
        save_image(resolution, &pixels, &path)?;
    }

    Ok(report)
}

/// Dials every worker and hands it the scene. Any failure aborts the run.
async fn connect_workers(
    workers: &[WorkerSpec],
    scene: &SceneDescription,
) -> CoordinatorResult<Vec<WorkerConnection<TcpStream>>> {
    let mut connections = Vec::with_capacity(workers.len());
    for spec in workers {
        let mut connection = WorkerConnection::dial(spec).await?;
        if let Err(source) = connection.send_scene(scene.raw()).await {
            return Err(CoordinatorError::Handshake {
                name: connection.name,
                source,
            });
        }
        connections.push(connection);
    }
    Ok(connections)
}

async fn run_benchmarks(workers: &[WorkerSpec]) {
    for spec in workers {
        match benchmark_worker(spec).await {
            Ok(finished_in) => info!(
                "{:?} finished its benchmark in {:.3}s",
                spec.display_name(),
                finished_in
            ),
            Err(CoordinatorError::Benchmark { name, source }) => {
                warn!("{:?} could not be benchmarked: {}", name, source)
            }
            Err(e) => error!("{}", e),
        }
    }
}
