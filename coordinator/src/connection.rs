use std::time::Duration;

use log::{debug, info};
use shared::{
    graphics::color::DisplayColor,
    models::{pixel::Pixel, tile::Tile},
    networking::{
        error::NetworkingError,
        protocol::{read_reply, send_job, Job, Response},
        result::NetworkingResult,
        worker::WorkerSpec,
    },
};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use crate::error::{CoordinatorError, CoordinatorResult};

/// One persistent stream to one worker.
#[derive(Debug)]
pub struct WorkerConnection<S = TcpStream> {
    pub name: String,
    pub address: String,
    pub color: DisplayColor,
    pub completed_tiles: u32,
    stream: S,
}

async fn connect_to_worker(spec: &WorkerSpec) -> CoordinatorResult<TcpStream> {
    info!("Dialling {} at {}", spec.display_name(), spec.address);
    let stream = TcpStream::connect(&spec.address)
        .await
        .map_err(|source| CoordinatorError::Dial {
            name: spec.display_name().to_owned(),
            address: spec.address.clone(),
            source,
        })?;
    stream
        .set_nodelay(true)
        .map_err(|source| CoordinatorError::Dial {
            name: spec.display_name().to_owned(),
            address: spec.address.clone(),
            source,
        })?;
    Ok(stream)
}

impl WorkerConnection<TcpStream> {
    pub async fn dial(spec: &WorkerSpec) -> CoordinatorResult<Self> {
        let stream = connect_to_worker(spec).await?;
        Ok(Self::new(spec.display_name(), &spec.address, stream))
    }
}

impl<S> WorkerConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(name: impl Into<String>, address: impl Into<String>, stream: S) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            color: DisplayColor::new(255, 255, 255),
            completed_tiles: 0,
            stream,
        }
    }

    pub async fn send_scene(&mut self, spec: &str) -> NetworkingResult<()> {
        send_job(
            &mut self.stream,
            &Job::Scene {
                spec: spec.to_owned(),
            },
        )
        .await?;
        info!("Scene sent to {} ({} bytes)", self.name, spec.len());
        Ok(())
    }

    pub async fn send_tile(&mut self, tile: Tile) -> NetworkingResult<()> {
        debug!("Sending tile {:?} to {}", tile, self.name);
        send_job(&mut self.stream, &Job::Tile(tile)).await
    }

    /// The reply to the last tile request; `None` if the worker ended the
    /// stream instead.
    pub async fn recv_pixels(
        &mut self,
        timeout: Option<Duration>,
    ) -> NetworkingResult<Option<Vec<Pixel>>> {
        let reply = match timeout {
            Some(limit) => tokio::time::timeout(limit, read_reply(&mut self.stream))
                .await
                .map_err(|_| NetworkingError::Timeout(limit))??,
            None => read_reply(&mut self.stream).await?,
        };

        match reply {
            Some(Response::Pixels(pixels)) => Ok(Some(pixels)),
            Some(Response::Score(_)) => Err(NetworkingError::UnexpectedMessage(
                "score in reply to a tile".to_owned(),
            )),
            None => Ok(None),
        }
    }

    /// Closes the sending side; the worker ends the stream in turn.
    pub async fn close(&mut self) {
        match self.stream.shutdown().await {
            Ok(()) => debug!("Closed render stream to {} ({})", self.name, self.address),
            Err(e) => debug!("Error closing render stream to {}: {}", self.name, e),
        }
    }
}

/// Scores a worker on a dedicated connection: seconds it took to render
/// its benchmark scene.
pub async fn benchmark_worker(spec: &WorkerSpec) -> CoordinatorResult<f64> {
    let mut stream = connect_to_worker(spec).await?;
    request_score(&mut stream)
        .await
        .map_err(|source| CoordinatorError::Benchmark {
            name: spec.display_name().to_owned(),
            source,
        })
}

async fn request_score<S>(stream: &mut S) -> NetworkingResult<f64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_job(stream, &Job::Benchmark).await?;
    let score = match read_reply(stream).await? {
        Some(Response::Score(finished_in)) => finished_in,
        Some(Response::Pixels(_)) => {
            return Err(NetworkingError::UnexpectedMessage(
                "pixels in reply to a benchmark".to_owned(),
            ))
        }
        None => {
            return Err(NetworkingError::UnexpectedMessage(
                "stream ended before the score".to_owned(),
            ))
        }
    };
    let _ = stream.shutdown().await;
    Ok(score)
}

#[cfg(test)]
mod tests {
    use shared::{
        models::pixel::Color,
        networking::protocol::{read_job, send_pixels, send_reply, Reply},
    };

    use super::*;

    #[tokio::test]
    async fn scene_then_tile_then_pixels() {
        let (coordinator_end, mut worker_end) = tokio::io::duplex(4096);
        let mut connection = WorkerConnection::new("alpha", "in-memory", coordinator_end);

        connection.send_scene("{}").await.unwrap();
        connection.send_tile(Tile::new(0, 0, 1)).await.unwrap();

        assert_eq!(
            read_job(&mut worker_end).await.unwrap(),
            Some(Job::Scene {
                spec: "{}".to_owned()
            })
        );
        assert_eq!(
            read_job(&mut worker_end).await.unwrap(),
            Some(Job::Tile(Tile::new(0, 0, 1)))
        );

        let pixel = Pixel::new(0, 0, Color::new(0.5, 0.5, 0.5));
        send_pixels(&mut worker_end, &[pixel]).await.unwrap();
        assert_eq!(connection.recv_pixels(None).await.unwrap(), Some(vec![pixel]));

        connection.close().await;
        assert_eq!(read_job(&mut worker_end).await.unwrap(), None);
    }

    #[tokio::test]
    async fn silent_worker_times_out() {
        let (coordinator_end, _worker_end) = tokio::io::duplex(4096);
        let mut connection = WorkerConnection::new("slow", "in-memory", coordinator_end);
        let result = connection.recv_pixels(Some(Duration::from_millis(20))).await;
        assert!(matches!(result, Err(NetworkingError::Timeout(_))));
    }

    #[tokio::test]
    async fn closed_stream_is_graceful_end() {
        let (coordinator_end, worker_end) = tokio::io::duplex(4096);
        drop(worker_end);
        let mut connection = WorkerConnection::new("gone", "in-memory", coordinator_end);
        assert_eq!(connection.recv_pixels(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn score_round_trip() {
        let (mut coordinator_end, mut worker_end) = tokio::io::duplex(4096);
        let worker = tokio::spawn(async move {
            assert_eq!(read_job(&mut worker_end).await.unwrap(), Some(Job::Benchmark));
            send_reply(&mut worker_end, &Reply::Score { finished_in: 1.5 })
                .await
                .unwrap();
        });

        assert_eq!(request_score(&mut coordinator_end).await.unwrap(), 1.5);
        worker.await.unwrap();
    }
}
