use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
pub struct WorkerCommand {
    #[arg(short, long)]
    pub name: Option<String>,

    #[arg(short, long)]
    pub address: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Renderer command line. Falls back to $DISTRACER_RENDERER.
    #[arg(short, long)]
    pub command: Option<String>,

    /// Scene rendered when a coordinator asks for a benchmark.
    #[arg(long, value_name = "FILE")]
    pub benchmark_scene: Option<PathBuf>,
}
