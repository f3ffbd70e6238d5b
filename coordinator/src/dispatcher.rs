use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::{error, info, warn};
use shared::{
    graphics::color::Palette,
    models::{pixel::Pixel, resolution::Resolution, tile::Tile},
    networking::{error::NetworkingError, network::DispatchConfig},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc::Sender,
};

use crate::{
    connection::WorkerConnection,
    progress::ProgressTracker,
    tile_supply::{TileLease, TileSupply},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchSettings {
    /// How long a worker may take to answer one tile request.
    pub tile_timeout: Option<Duration>,
    /// Connections that may attempt a tile before it counts as lost.
    pub max_attempts: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            tile_timeout: None,
            max_attempts: 3,
        }
    }
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            tile_timeout: config.tile_timeout(),
            max_attempts: config.max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSummary {
    pub name: String,
    pub address: String,
    pub completed_tiles: u32,
    /// Why the loop stopped early, if it did.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub total_tiles: usize,
    pub completed_tiles: usize,
    pub lost_tiles: Vec<Tile>,
    pub workers: Vec<WorkerSummary>,
    pub elapsed: Duration,
}

impl RenderReport {
    /// Every tile was rendered by some worker.
    pub fn is_complete(&self) -> bool {
        self.lost_tiles.is_empty() && self.completed_tiles == self.total_tiles
    }

    pub fn log_summary(&self) {
        info!("Completed in {:?}", self.elapsed);
        for worker in &self.workers {
            let percentage = if self.total_tiles == 0 {
                0.0
            } else {
                worker.completed_tiles as f64 / self.total_tiles as f64 * 100.0
            };
            info!(
                "{:?} completed {} tiles, that's {:.2}%",
                worker.name, worker.completed_tiles, percentage
            );
        }
        if !self.is_complete() {
            warn!(
                "Render incomplete: {} of {} tiles rendered, {} lost",
                self.completed_tiles,
                self.total_tiles,
                self.lost_tiles.len()
            );
        }
    }
}

/// Fans tiles out over every worker connection and fans their pixels back
/// into one channel.
pub struct Dispatcher<S> {
    connections: Vec<WorkerConnection<S>>,
    resolution: Resolution,
    progress: Arc<ProgressTracker>,
    settings: DispatchSettings,
}

impl<S> Dispatcher<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        mut connections: Vec<WorkerConnection<S>>,
        resolution: Resolution,
        palette: &Palette,
        progress: Arc<ProgressTracker>,
        settings: DispatchSettings,
    ) -> Self {
        for (i, connection) in connections.iter_mut().enumerate() {
            connection.color = palette.color_for(i);
        }
        Self {
            connections,
            resolution,
            progress,
            settings,
        }
    }

    /// Renders `tiles` to completion. Returns once every worker loop has
    /// ended; `pixel_tx` is dropped by then, which closes the pixel sink.
    pub async fn dispatch(self, tiles: Vec<Tile>, pixel_tx: Sender<Pixel>) -> RenderReport {
        let total_tiles = tiles.len();
        let started = Instant::now();
        let supply = Arc::new(TileSupply::new(tiles, self.settings.max_attempts));
        info!(
            "Dispatching {} tiles to {} workers",
            total_tiles,
            self.connections.len()
        );

        let handles: Vec<_> = self
            .connections
            .into_iter()
            .map(|connection| {
                let context = LoopContext {
                    supply: Arc::clone(&supply),
                    progress: Arc::clone(&self.progress),
                    pixel_tx: pixel_tx.clone(),
                    resolution: self.resolution,
                    settings: self.settings,
                };
                let name = connection.name.clone();
                let address = connection.address.clone();
                (name, address, tokio::spawn(run_worker_loop(connection, context)))
            })
            .collect();
        drop(pixel_tx);

        let mut workers = Vec::with_capacity(handles.len());
        for (name, address, handle) in handles {
            let summary = match handle.await {
                Ok(summary) => summary,
                Err(e) => {
                    // The loop died with its tile still in flight.
                    error!("Worker loop for {:?} panicked: {}", name, e);
                    self.progress.unset(&name);
                    WorkerSummary {
                        name,
                        address,
                        completed_tiles: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            workers.push(summary);
        }

        let abandoned = supply.abandon();
        if abandoned > 0 {
            error!("No worker left to render {} queued tiles", abandoned);
        }

        let completed_tiles = workers.iter().map(|w| w.completed_tiles as usize).sum();
        RenderReport {
            total_tiles,
            completed_tiles,
            lost_tiles: supply.lost(),
            workers,
            elapsed: started.elapsed(),
        }
    }
}

struct LoopContext {
    supply: Arc<TileSupply>,
    progress: Arc<ProgressTracker>,
    pixel_tx: Sender<Pixel>,
    resolution: Resolution,
    settings: DispatchSettings,
}

impl LoopContext {
    /// Gives the in-flight tile back after the connection failed on it.
    fn give_back<S>(&self, connection: &WorkerConnection<S>, lease: TileLease<'_>) {
        self.progress.unset(&connection.name);
        let tile = lease.tile();
        if lease.fail() {
            info!(
                "Tile {:?} from {:?} returned to the supply",
                tile, connection.name
            );
        }
    }
}

async fn run_worker_loop<S>(
    mut connection: WorkerConnection<S>,
    context: LoopContext,
) -> WorkerSummary
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let started = Instant::now();
    let mut failure: Option<NetworkingError> = None;

    while let Some(lease) = context.supply.pull().await {
        let tile = lease.tile();
        context
            .progress
            .set(&connection.name, tile, connection.color);

        let sent_at = Instant::now();
        if let Err(e) = connection.send_tile(tile).await {
            error!(
                "Could not send tile {:?} to {:?} ({}) after {:?}: {}",
                tile,
                connection.name,
                connection.address,
                started.elapsed(),
                e
            );
            context.give_back(&connection, lease);
            failure = Some(e);
            break;
        }

        let pixels = match connection.recv_pixels(context.settings.tile_timeout).await {
            Ok(Some(pixels)) => pixels,
            Ok(None) => {
                info!(
                    "{:?} ({}) ended the stream after {:?}",
                    connection.name,
                    connection.address,
                    started.elapsed()
                );
                context.give_back(&connection, lease);
                break;
            }
            Err(e) => {
                error!(
                    "{:?} ({}) failed on tile {:?} after {:?}: {}",
                    connection.name,
                    connection.address,
                    tile,
                    sent_at.elapsed(),
                    e
                );
                context.give_back(&connection, lease);
                failure = Some(e);
                break;
            }
        };

        let expected = tile.pixel_count(context.resolution);
        if pixels.len() != expected {
            let e = NetworkingError::PixelCountMismatch {
                expected,
                received: pixels.len(),
            };
            error!(
                "{:?} ({}) sent a bad reply for tile {:?}: {}",
                connection.name, connection.address, tile, e
            );
            context.give_back(&connection, lease);
            failure = Some(e);
            break;
        }

        connection.completed_tiles += 1;
        context.progress.unset(&connection.name);
        info!(
            "{:?} processed tile in {:?}",
            connection.name,
            sent_at.elapsed()
        );

        let mut sink_closed = false;
        for pixel in pixels {
            if context.pixel_tx.send(pixel).await.is_err() {
                sink_closed = true;
                break;
            }
        }
        lease.complete();
        if sink_closed {
            error!("Pixel sink closed, stopping {:?}", connection.name);
            break;
        }
    }

    context.progress.unset(&connection.name);
    connection.close().await;

    WorkerSummary {
        name: connection.name,
        address: connection.address,
        completed_tiles: connection.completed_tiles,
        error: failure.map(|e| e.to_string()),
    }
}
