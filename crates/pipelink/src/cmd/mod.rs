use clap::{Args, Subcommand};
use std::path::PathBuf;

use pipelink_frame::DEFAULT_MAX_FRAME_SIZE;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod peer;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one side of a FIFO session: stdin lines out, received messages to stdout.
    Peer(PeerArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Peer(args) => peer::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PeerArgs {
    /// FIFO to read the peer's messages from.
    #[arg(long, short = 'i', env = "PIPELINK_INPUT")]
    pub input: PathBuf,
    /// FIFO to write messages to the peer.
    #[arg(long, short = 'o', env = "PIPELINK_OUTPUT")]
    pub output: PathBuf,
    /// Session label used in logs and output.
    #[arg(long, default_value = "peer")]
    pub label: String,
    /// Largest payload accepted or sent, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Stay in `connecting` until the peer's first message arrives.
    #[arg(long)]
    pub await_first_frame: bool,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
