use std::path::PathBuf;

use clap::{Args, Subcommand};
use ptywire_frame::DEFAULT_MAX_PAYLOAD;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command under the pty helper and print its events.
    Run(RunArgs),
    /// Decode a captured helper stream and print its frames.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path of the pty helper executable.
    #[arg(long, value_name = "PATH", env = "PTYWIRE_HELPER")]
    pub helper: PathBuf,
    /// Working directory for the helper.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
    /// Do not forward local stdin to the child.
    #[arg(long)]
    pub no_stdin: bool,
    /// Largest payload accepted from the helper, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
    /// Command (and arguments) handed to the helper.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured helper output. Reads stdin when omitted.
    pub file: Option<PathBuf>,
    /// Largest payload accepted, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
