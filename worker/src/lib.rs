pub mod adapter;
pub mod error;
pub mod renderer;

use std::{path::PathBuf, sync::Arc};

use log::{error, info};
use shared::{logger::log_error, scene::SceneDescription};
use tokio::net::TcpListener;

use self::{
    adapter::WorkerJobAdapter,
    error::{WorkerError, WorkerResult},
    renderer::SubprocessRenderer,
};

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub name: String,
    pub address: String,
    pub port: u16,
    /// Renderer command line, split on whitespace.
    pub command: String,
    pub benchmark_scene: Option<PathBuf>,
}

pub async fn run_worker(options: WorkerOptions) -> WorkerResult<()> {
    match run(options).await {
        Ok(()) => {
            info!("Worker shutdown gracefully");
            Ok(())
        }
        Err(e) => {
            log_error("Worker error", &e);
            Err(e)
        }
    }
}

async fn run(options: WorkerOptions) -> WorkerResult<()> {
    let renderer = SubprocessRenderer::from_command_line(&options.command)
        .ok_or_else(|| WorkerError::Config("renderer command is empty".to_owned()))?;
    let mut adapter = WorkerJobAdapter::new(options.name.clone(), Arc::new(renderer));
    if let Some(path) = &options.benchmark_scene {
        let scene = SceneDescription::parse(std::fs::read_to_string(path)?)?;
        info!("Loaded benchmark scene from {}", path.display());
        adapter = adapter.with_benchmark_scene(scene);
    }

    let listen_addr = format!("{}:{}", options.address, options.port);
    let listener = TcpListener::bind(&listen_addr).await?;
    info!(
        "Worker {} listening on {}, rendering with {:?}",
        options.name, listen_addr, options.command
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                if let Err(e) = socket.set_nodelay(true) {
                    error!("Could not disable Nagle for {}: {}", peer, e);
                }
                info!("Accepted connection from {}", peer);

                let adapter = adapter.clone();
                tokio::spawn(async move {
                    let peer = peer.to_string();
                    if let Err(e) = adapter.serve(socket, &peer).await {
                        log_error(&format!("Connection from {peer} failed"), &e);
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Received Ctrl-C, no longer accepting connections");
                return Ok(());
            }
        }
    }
}
