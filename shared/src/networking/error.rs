use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds the {max} byte limit", max = super::MAX_FRAME_LENGTH)]
    FrameTooLarge(usize),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("expected {expected} pixels, received {received}")]
    PixelCountMismatch { expected: usize, received: usize },

    #[error("remote error: {0}")]
    Remote(String),

    #[error("no reply within {0:?}")]
    Timeout(std::time::Duration),
}
