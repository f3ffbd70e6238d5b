use std::process::ExitStatus;

use shared::{networking::error::NetworkingError, scene::SceneError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Networking(#[from] NetworkingError),

    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("could not start renderer {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed renderer output {line:?}: {reason}")]
    MalformedOutput { line: String, reason: String },

    #[error("renderer produced {received} of {expected} pixels")]
    MissingOutput { expected: usize, received: usize },

    #[error("renderer returned pixel ({x}, {y}) outside tile {tile:?}")]
    UnexpectedPixel {
        x: u32,
        y: u32,
        tile: shared::models::tile::Tile,
    },

    #[error("renderer exited with {0}")]
    RendererExit(ExitStatus),

    #[error("no benchmark scene configured")]
    BenchmarkUnavailable,

    #[error("invalid worker configuration: {0}")]
    Config(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
