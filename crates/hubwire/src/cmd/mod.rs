use clap::Subcommand;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod inspect;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a captured frame stream and print the envelopes.
    Inspect(inspect::InspectArgs),
    /// Show version and protocol information.
    Version(version::VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}
