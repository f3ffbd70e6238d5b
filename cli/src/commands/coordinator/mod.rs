use std::path::PathBuf;

use clap::Parser;

/// 🖥️ Coordinator Command
///
/// Renders one scene over every worker listed in the network config.
#[derive(Parser, Debug)]
#[command(name = "coordinator", about = "🚀 Render a scene over the network.", long_about = None)]
pub struct CoordinatorCommand {
    /// 🌐 Network config
    ///
    /// JSON or YAML file listing the workers along with tiling and dispatch settings.
    #[arg(short, long, value_name = "FILE")]
    pub network: PathBuf,

    /// 🎬 Scene file
    ///
    /// Scene description forwarded verbatim to every worker.
    #[arg(short, long, value_name = "FILE")]
    pub scene: PathBuf,

    /// 🖼️ Output image
    ///
    /// Where to write the rendered frame. Nothing is written if not set.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// 📊 Status portal address
    ///
    /// Serve render progress over HTTP on this address, e.g. 127.0.0.1:8080.
    #[arg(long, value_name = "ADDRESS")]
    pub portal: Option<String>,

    /// 🎲 Shuffle seed
    ///
    /// Overrides the seed from the network config.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}
