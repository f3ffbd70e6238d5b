//! Messages exchanged on a worker connection.
//!
//! The coordinator sends exactly one [`Job::Scene`] first, then any number
//! of [`Job::Tile`] requests, waiting for the [`Reply::Pixels`] of each
//! before sending the next. A connection may instead open with
//! [`Job::Benchmark`], which is answered by a single [`Reply::Score`].

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::models::{
    pixel::{Color, Pixel},
    tile::Tile,
};

use super::{
    error::NetworkingError, read_message_raw, result::NetworkingResult, send_message, RawMessage,
};

/// Bytes per pixel on the wire: `x u32, y u32, r f64, g f64, b f64`.
pub const PIXEL_WIRE_SIZE: usize = 4 + 4 + 3 * 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Job {
    Scene { spec: String },
    Tile(Tile),
    Benchmark,
}

/// JSON header of a worker reply. The pixels of a `Pixels` reply travel as
/// the binary data section of the same frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Pixels { count: u32 },
    Score { finished_in: f64 },
    Error { message: String },
}

/// A decoded reply. `Reply::Error` surfaces as [`NetworkingError::Remote`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Pixels(Vec<Pixel>),
    Score(f64),
}

pub fn encode_pixels(pixels: &[Pixel]) -> Vec<u8> {
    let mut data = Vec::with_capacity(pixels.len() * PIXEL_WIRE_SIZE);
    for pixel in pixels {
        data.extend_from_slice(&pixel.x.to_be_bytes());
        data.extend_from_slice(&pixel.y.to_be_bytes());
        data.extend_from_slice(&pixel.color.r.to_be_bytes());
        data.extend_from_slice(&pixel.color.g.to_be_bytes());
        data.extend_from_slice(&pixel.color.b.to_be_bytes());
    }
    data
}

pub fn decode_pixels(data: &[u8], count: usize) -> NetworkingResult<Vec<Pixel>> {
    if data.len() != count * PIXEL_WIRE_SIZE {
        return Err(NetworkingError::MalformedFrame(format!(
            "{} data bytes cannot hold {} pixels",
            data.len(),
            count
        )));
    }

    let u32_at = |chunk: &[u8], at: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&chunk[at..at + 4]);
        u32::from_be_bytes(bytes)
    };
    let f64_at = |chunk: &[u8], at: usize| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&chunk[at..at + 8]);
        f64::from_be_bytes(bytes)
    };

    Ok(data
        .chunks_exact(PIXEL_WIRE_SIZE)
        .map(|chunk| Pixel {
            x: u32_at(chunk, 0),
            y: u32_at(chunk, 4),
            color: Color::new(f64_at(chunk, 8), f64_at(chunk, 16), f64_at(chunk, 24)),
        })
        .collect())
}

pub async fn send_job<W>(stream: &mut W, job: &Job) -> NetworkingResult<()>
where
    W: AsyncWrite + Unpin,
{
    let serialized_job = serde_json::to_vec(job)?;
    send_message(stream, &serialized_job, None).await
}

/// Next job on the stream, or `None` once the coordinator closed its side.
pub async fn read_job<R>(stream: &mut R) -> NetworkingResult<Option<Job>>
where
    R: AsyncRead + Unpin,
{
    let Some(raw_message) = read_message_raw(stream).await? else {
        return Ok(None);
    };
    if !raw_message.data.is_empty() {
        return Err(NetworkingError::MalformedFrame(format!(
            "job carries {} unexpected data bytes",
            raw_message.data.len()
        )));
    }
    Ok(Some(serde_json::from_str(&raw_message.json_message)?))
}

pub async fn send_reply<W>(stream: &mut W, reply: &Reply) -> NetworkingResult<()>
where
    W: AsyncWrite + Unpin,
{
    let serialized_reply = serde_json::to_vec(reply)?;
    send_message(stream, &serialized_reply, None).await
}

pub async fn send_pixels<W>(stream: &mut W, pixels: &[Pixel]) -> NetworkingResult<()>
where
    W: AsyncWrite + Unpin,
{
    let reply = Reply::Pixels {
        count: pixels.len() as u32,
    };
    let serialized_reply = serde_json::to_vec(&reply)?;
    send_message(stream, &serialized_reply, Some(&encode_pixels(pixels))).await
}

/// Next reply on the stream, or `None` once the worker ended the stream.
pub async fn read_reply<R>(stream: &mut R) -> NetworkingResult<Option<Response>>
where
    R: AsyncRead + Unpin,
{
    match read_message_raw(stream).await? {
        Some(raw_message) => decode_reply(raw_message).map(Some),
        None => Ok(None),
    }
}

fn decode_reply(raw_message: RawMessage) -> NetworkingResult<Response> {
    match serde_json::from_str::<Reply>(&raw_message.json_message)? {
        Reply::Pixels { count } => Ok(Response::Pixels(decode_pixels(
            &raw_message.data,
            count as usize,
        )?)),
        Reply::Score { finished_in } => Ok(Response::Score(finished_in)),
        Reply::Error { message } => Err(NetworkingError::Remote(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_are_externally_tagged() {
        let tile = serde_json::to_string(&Job::Tile(Tile::new(2, 4, 8))).unwrap();
        assert_eq!(tile, r#"{"Tile":{"x":2,"y":4,"size":8}}"#);
        assert_eq!(serde_json::to_string(&Job::Benchmark).unwrap(), r#""Benchmark""#);
    }

    #[tokio::test]
    async fn pixels_reply_carries_binary_payload() {
        let (mut worker, mut coordinator) = tokio::io::duplex(4096);
        let pixels = vec![
            Pixel::new(0, 0, Color::new(1.0, 0.0, 0.0)),
            Pixel::new(1, 0, Color::new(0.0, 0.5, 0.25)),
        ];
        send_pixels(&mut worker, &pixels).await.unwrap();

        let response = read_reply(&mut coordinator).await.unwrap().unwrap();
        assert_eq!(response, Response::Pixels(pixels));
    }

    #[tokio::test]
    async fn error_reply_becomes_remote_error() {
        let (mut worker, mut coordinator) = tokio::io::duplex(1024);
        send_reply(
            &mut worker,
            &Reply::Error {
                message: "renderer crashed".to_owned(),
            },
        )
        .await
        .unwrap();

        match read_reply(&mut coordinator).await {
            Err(NetworkingError::Remote(message)) => assert_eq!(message, "renderer crashed"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pixel_data_must_match_the_count() {
        let data = encode_pixels(&[Pixel::new(3, 4, Color::default())]);
        assert!(decode_pixels(&data, 2).is_err());
        assert_eq!(decode_pixels(&data, 1).unwrap()[0].y, 4);
    }
}
