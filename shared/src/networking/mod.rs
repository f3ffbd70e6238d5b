pub mod error;
pub mod network;
pub mod protocol;
pub mod result;
pub mod worker;

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use self::{error::NetworkingError, result::NetworkingResult};

/// Upper bound for `json + data` in a single frame.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// One frame: `u32 total | u32 json | json | data`, lengths big-endian.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub message_length: u32,
    pub json_length: u32,
    pub json_message: String,
    pub data: Vec<u8>,
}

pub async fn send_message<W>(
    stream: &mut W,
    json_message: &[u8],
    data: Option<&[u8]>,
) -> NetworkingResult<()>
where
    W: AsyncWrite + Unpin,
{
    let data_size = data.map_or(0, <[u8]>::len);
    let total_message_size = json_message.len() + data_size;
    if total_message_size > MAX_FRAME_LENGTH {
        return Err(NetworkingError::FrameTooLarge(total_message_size));
    }

    let mut buffer = Vec::with_capacity(8 + total_message_size);
    buffer.extend_from_slice(&(total_message_size as u32).to_be_bytes());
    buffer.extend_from_slice(&(json_message.len() as u32).to_be_bytes());
    buffer.extend_from_slice(json_message);
    if let Some(data) = data {
        buffer.extend_from_slice(data);
    };

    stream.write_all(&buffer).await?;
    Ok(stream.flush().await?)
}

pub async fn read_message_length<R>(stream: &mut R) -> NetworkingResult<u32>
where
    R: AsyncRead + Unpin,
{
    let mut length_bytes = [0u8; 4];
    stream.read_exact(&mut length_bytes).await?;
    Ok(u32::from_be_bytes(length_bytes))
}

/// Like [`read_message_length`], but a stream that ends before the first
/// byte is a clean end of stream and yields `None`.
async fn read_frame_start<R>(stream: &mut R) -> NetworkingResult<Option<u32>>
where
    R: AsyncRead + Unpin,
{
    let mut length_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < length_bytes.len() {
        let read = stream.read(&mut length_bytes[filled..]).await?;
        if read == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(NetworkingError::MalformedFrame(format!(
                "stream ended after {filled} header bytes"
            )));
        }
        filled += read;
    }
    Ok(Some(u32::from_be_bytes(length_bytes)))
}

pub async fn read_json_message<R>(stream: &mut R, length: usize) -> NetworkingResult<String>
where
    R: AsyncRead + Unpin,
{
    let mut json_message = vec![0u8; length];
    stream.read_exact(&mut json_message).await?;
    String::from_utf8(json_message)
        .map_err(|e| NetworkingError::MalformedFrame(format!("JSON section is not UTF-8: {e}")))
}

pub async fn read_binary_data<R>(stream: &mut R, length: usize) -> NetworkingResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut data_message = vec![0u8; length];
    stream.read_exact(&mut data_message).await?;
    Ok(data_message)
}

/// Reads the next frame, or `None` if the peer closed the stream between
/// frames.
pub async fn read_message_raw<R>(stream: &mut R) -> NetworkingResult<Option<RawMessage>>
where
    R: AsyncRead + Unpin,
{
    let Some(message_length) = read_frame_start(stream).await? else {
        return Ok(None);
    };
    if message_length as usize > MAX_FRAME_LENGTH {
        return Err(NetworkingError::FrameTooLarge(message_length as usize));
    }

    let json_length = read_message_length(stream).await?;
    if json_length > message_length {
        return Err(NetworkingError::MalformedFrame(format!(
            "JSON length {json_length} exceeds frame length {message_length}"
        )));
    }

    let json_message = read_json_message(stream, json_length as usize).await?;
    let data = read_binary_data(stream, (message_length - json_length) as usize).await?;
    trace!("Read frame: {} JSON bytes, {} data bytes", json_length, data.len());

    Ok(Some(RawMessage {
        message_length,
        json_length,
        json_message,
        data,
    }))
}
