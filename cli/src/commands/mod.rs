use clap::Subcommand;

use self::{coordinator::CoordinatorCommand, worker::WorkerCommand};

pub mod coordinator;
pub mod worker;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 🚀 Start Coordinator
    ///
    /// Split a scene into tiles and dispatch them over the configured workers.
    Coordinator(CoordinatorCommand),

    /// 👷 Worker Mode
    ///
    /// Accept tiles from a coordinator and render them with the local renderer.
    Worker(WorkerCommand),
}
