use shared::{
    networking::{error::NetworkingError, network::ConfigError},
    scene::SceneError,
};
use thiserror::Error;

/// Errors that abort a whole render.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("could not dial worker {name} at {address}: {source}")]
    Dial {
        name: String,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not send the scene to worker {name}: {source}")]
    Handshake {
        name: String,
        #[source]
        source: NetworkingError,
    },

    #[error("benchmark of worker {name} failed: {source}")]
    Benchmark {
        name: String,
        #[source]
        source: NetworkingError,
    },

    #[error("could not write the image: {0}")]
    Image(#[from] image::ImageError),

    #[error("could not start the portal: {0}")]
    Portal(#[source] std::io::Error),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
