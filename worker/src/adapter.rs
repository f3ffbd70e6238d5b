use std::{sync::Arc, time::Instant};

use log::{debug, info};
use shared::{
    models::{pixel::Pixel, tile::Tile},
    networking::protocol::{read_job, send_pixels, send_reply, Job, Reply},
    scene::SceneDescription,
};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::{
    error::{WorkerError, WorkerResult},
    renderer::{RenderRequest, Renderer},
};

enum AdapterState {
    AwaitingScene,
    Ready(SceneDescription),
}

/// Serves one coordinator connection: a scene, then tiles rendered one at
/// a time through the [`Renderer`].
pub struct WorkerJobAdapter<R> {
    name: String,
    renderer: Arc<R>,
    benchmark_scene: Option<Arc<SceneDescription>>,
}

impl<R> Clone for WorkerJobAdapter<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            renderer: Arc::clone(&self.renderer),
            benchmark_scene: self.benchmark_scene.clone(),
        }
    }
}

impl<R: Renderer> WorkerJobAdapter<R> {
    pub fn new(name: impl Into<String>, renderer: Arc<R>) -> Self {
        Self {
            name: name.into(),
            renderer,
            benchmark_scene: None,
        }
    }

    pub fn with_benchmark_scene(mut self, scene: SceneDescription) -> Self {
        self.benchmark_scene = Some(Arc::new(scene));
        self
    }

    /// Runs the connection to its end. Any error is reported to the
    /// coordinator before the stream is closed.
    pub async fn serve<S>(&self, mut stream: S, peer: &str) -> WorkerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let started = Instant::now();
        let result = self.run(&mut stream, peer).await;

        if let Err(e) = &result {
            let reply = Reply::Error {
                message: e.to_string(),
            };
            if let Err(send_error) = send_reply(&mut stream, &reply).await {
                debug!("Could not report error to {}: {}", peer, send_error);
            }
        }
        if let Err(e) = stream.shutdown().await {
            debug!("Error closing stream to {}: {}", peer, e);
        }

        info!("{} closed connection from {} after {:?}", self.name, peer, started.elapsed());
        result
    }

    async fn run<S>(&self, stream: &mut S, peer: &str) -> WorkerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut state = AdapterState::AwaitingScene;
        let mut rendered_tiles = 0u32;

        loop {
            let Some(job) = read_job(stream).await? else {
                info!("{} rendered {} tiles for {}", self.name, rendered_tiles, peer);
                return Ok(());
            };

            state = match (state, job) {
                (AdapterState::AwaitingScene, Job::Scene { spec }) => {
                    let scene = SceneDescription::parse(spec)?;
                    let resolution = scene.resolution();
                    info!(
                        "Received {}x{} scene from {}",
                        resolution.width, resolution.height, peer
                    );
                    AdapterState::Ready(scene)
                }
                (AdapterState::AwaitingScene, Job::Benchmark) => {
                    let finished_in = self.benchmark().await?;
                    info!("Benchmark for {} finished in {:.3}s", peer, finished_in);
                    send_reply(stream, &Reply::Score { finished_in }).await?;
                    return Ok(());
                }
                (AdapterState::AwaitingScene, Job::Tile(_)) => {
                    return Err(WorkerError::ProtocolViolation(
                        "first message must be a scene".to_owned(),
                    ))
                }
                (AdapterState::Ready(scene), Job::Tile(tile)) => {
                    let pixels = self.render_tile(&scene, tile).await?;
                    send_pixels(stream, &pixels).await?;
                    rendered_tiles += 1;
                    AdapterState::Ready(scene)
                }
                (AdapterState::Ready(_), job) => {
                    return Err(WorkerError::ProtocolViolation(format!(
                        "consecutive messages must be tiles, got {:?}",
                        job_kind(&job)
                    )))
                }
            };
        }
    }

    async fn render_tile(&self, scene: &SceneDescription, tile: Tile) -> WorkerResult<Vec<Pixel>> {
        let resolution = scene.resolution();
        let coordinates = tile.pixels(resolution);
        if coordinates.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let request = RenderRequest {
            scene: scene.with_partial_render(&coordinates)?,
            pixels: coordinates,
        };
        let expected = request.pixels.len();
        let pixels = self.renderer.render(request).await?;

        if pixels.len() != expected {
            return Err(WorkerError::MissingOutput {
                expected,
                received: pixels.len(),
            });
        }
        if let Some(stray) = pixels.iter().find(|p| !tile.contains(resolution, p.x, p.y)) {
            return Err(WorkerError::UnexpectedPixel {
                x: stray.x,
                y: stray.y,
                tile,
            });
        }

        info!("Rendered tile {:?} in {:?}", tile, started.elapsed());
        Ok(pixels)
    }

    /// Seconds taken to render the whole benchmark scene.
    async fn benchmark(&self) -> WorkerResult<f64> {
        let scene = self
            .benchmark_scene
            .as_ref()
            .ok_or(WorkerError::BenchmarkUnavailable)?;
        let resolution = scene.resolution();
        let frame = Tile::new(0, 0, resolution.width.max(resolution.height));
        let coordinates = frame.pixels(resolution);

        let started = Instant::now();
        let request = RenderRequest {
            scene: scene.with_partial_render(&coordinates)?,
            pixels: coordinates,
        };
        self.renderer.render(request).await?;
        Ok(started.elapsed().as_secs_f64())
    }
}

fn job_kind(job: &Job) -> &'static str {
    match job {
        Job::Scene { .. } => "Scene",
        Job::Tile(_) => "Tile",
        Job::Benchmark => "Benchmark",
    }
}
