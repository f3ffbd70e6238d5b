//! The boundary to the program that actually traces rays.

use std::{future::Future, process::Stdio};

use log::debug;
use shared::models::pixel::{Color, Pixel};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::Command,
};

use crate::error::{WorkerError, WorkerResult};

/// A render restricted to `pixels`. `scene` already carries the matching
/// partial render instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub scene: String,
    pub pixels: Vec<(u32, u32)>,
}

pub trait Renderer: Send + Sync + 'static {
    /// Renders exactly `request.pixels.len()` pixels, in any order.
    fn render(&self, request: RenderRequest)
        -> impl Future<Output = WorkerResult<Vec<Pixel>>> + Send;
}

/// Parses one renderer output line: `x y r g b`.
pub fn parse_pixel_line(line: &str) -> WorkerResult<Pixel> {
    let malformed = |reason: &str| WorkerError::MalformedOutput {
        line: line.to_owned(),
        reason: reason.to_owned(),
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    let (x, y, r, g, b) = match fields.as_slice() {
        &[x, y, r, g, b] => (x, y, r, g, b),
        _ => return Err(malformed(&format!("expected 5 fields, found {}", fields.len()))),
    };

    let coordinate = |field: &str| field.parse::<u32>().map_err(|e| malformed(&e.to_string()));
    let channel = |field: &str| field.parse::<f64>().map_err(|e| malformed(&e.to_string()));

    Ok(Pixel::new(
        coordinate(x)?,
        coordinate(y)?,
        Color::new(channel(r)?, channel(g)?, channel(b)?),
    ))
}

/// Runs an external renderer per tile: the scene goes to its stdin, one
/// pixel per line comes back on its stdout.
#[derive(Debug, Clone, PartialEq)]
pub struct SubprocessRenderer {
    program: String,
    args: Vec<String>,
}

impl SubprocessRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a command line on whitespace. `None` if it is blank.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Renderer for SubprocessRenderer {
    async fn render(&self, request: RenderRequest) -> WorkerResult<Vec<Pixel>> {
        let expected = request.pixels.len();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                command: self.command_line(),
                source,
            })?;
        debug!("Started renderer {:?} for {} pixels", self.command_line(), expected);

        let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(WorkerError::Config("renderer pipes unavailable".to_owned()));
        };

        stdin.write_all(request.scene.as_bytes()).await?;
        stdin.shutdown().await?;
        drop(stdin);

        let mut lines = BufReader::new(stdout).lines();
        let mut pixels = Vec::with_capacity(expected);
        while pixels.len() < expected {
            match lines.next_line().await? {
                Some(line) => pixels.push(parse_pixel_line(&line)?),
                None => break,
            }
        }

        // Output beyond the requested pixels is discarded. The read end is
        // closed before waiting so an over-producing renderer cannot block.
        let overflowed = pixels.len() == expected && lines.next_line().await?.is_some();
        drop(lines);

        let status = child.wait().await?;
        if overflowed {
            debug!(
                "Renderer {:?} wrote past {} pixels, exited with {}",
                self.command_line(),
                expected,
                status
            );
        } else if !status.success() {
            return Err(WorkerError::RendererExit(status));
        }
        if pixels.len() < expected {
            return Err(WorkerError::MissingOutput {
                expected,
                received: pixels.len(),
            });
        }
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> SubprocessRenderer {
        SubprocessRenderer::new("sh", vec!["-c".to_owned(), script.to_owned()])
    }

    fn request(pixels: Vec<(u32, u32)>) -> RenderRequest {
        RenderRequest {
            scene: r#"{"rendering": {"partial_render": [[0, 0], [1, 0]]}}"#.to_owned(),
            pixels,
        }
    }

    #[test]
    fn parses_output_lines() {
        let pixel = parse_pixel_line("3 7 0.25 0.5 1").unwrap();
        assert_eq!(pixel, Pixel::new(3, 7, Color::new(0.25, 0.5, 1.0)));
        assert_eq!(parse_pixel_line("  1\t2 0 0 0 ").unwrap().y, 2);
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["", "1 2 3 4", "1 2 3 4 5 6", "-1 0 0 0 0", "a 0 0 0 0", "0 0 red 0 0"] {
            assert!(
                matches!(parse_pixel_line(line), Err(WorkerError::MalformedOutput { .. })),
                "accepted {line:?}"
            );
        }
    }

    #[test]
    fn splits_command_lines() {
        let renderer = SubprocessRenderer::from_command_line("distracer --threads 4").unwrap();
        assert_eq!(renderer.program, "distracer");
        assert_eq!(renderer.args, vec!["--threads", "4"]);
        assert!(SubprocessRenderer::from_command_line("   ").is_none());
    }

    #[tokio::test]
    async fn renders_two_pixels_from_stdout() {
        let renderer = shell(concat!(
            "grep partial_render > /dev/null || exit 9; ",
            "printf '0 0 1.0 0.0 0.0\\n1 0 0.0 1.0 0.0\\n'",
        ));
        let pixels = renderer.render(request(vec![(0, 0), (1, 0)])).await.unwrap();
        assert_eq!(
            pixels,
            vec![
                Pixel::new(0, 0, Color::new(1.0, 0.0, 0.0)),
                Pixel::new(1, 0, Color::new(0.0, 1.0, 0.0)),
            ]
        );
    }

    #[tokio::test]
    async fn waits_for_exit_after_the_last_pixel() {
        let renderer = shell("cat > /dev/null; printf '0 0 1 1 1\\n1 0 1 1 1\\n'; exit 3");
        let result = renderer.render(request(vec![(0, 0), (1, 0)])).await;
        assert!(matches!(
            result,
            Err(WorkerError::RendererExit(status)) if status.code() == Some(3)
        ));
    }

    #[tokio::test]
    async fn surplus_output_is_discarded() {
        let renderer = shell("cat > /dev/null; yes '0 0 1 1 1' | head -c 2000000");
        let pixels = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            renderer.render(request(vec![(0, 0)])),
        )
        .await
        .expect("renderer blocked on its own output")
        .unwrap();
        assert_eq!(pixels, vec![Pixel::new(0, 0, Color::new(1.0, 1.0, 1.0))]);
    }

    #[tokio::test]
    async fn short_output_is_an_error() {
        let renderer = shell("cat > /dev/null; printf '0 0 1 1 1\\n'");
        let result = renderer.render(request(vec![(0, 0), (1, 0)])).await;
        assert!(matches!(
            result,
            Err(WorkerError::MissingOutput {
                expected: 2,
                received: 1
            })
        ));
    }

    #[tokio::test]
    async fn garbage_output_is_an_error() {
        let renderer = shell("cat > /dev/null; echo 'Segmentation fault'");
        let result = renderer.render(request(vec![(0, 0)])).await;
        assert!(matches!(result, Err(WorkerError::MalformedOutput { .. })));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let renderer = SubprocessRenderer::new("/nonexistent/distracer", Vec::new());
        let result = renderer.render(request(vec![(0, 0)])).await;
        assert!(matches!(result, Err(WorkerError::Spawn { .. })));
    }
}
