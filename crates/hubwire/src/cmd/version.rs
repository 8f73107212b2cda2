use clap::Args;
use hubwire_protocol::{PROTOCOL_MINOR_VERSION, PROTOCOL_NAME, PROTOCOL_VERSION};
use serde::Serialize;

use crate::exit::{self, CliResult};
use crate::output::OutputFormat;

#[derive(Args, Debug)]
pub struct VersionArgs {}

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    protocol: &'static str,
    protocol_version: i32,
    protocol_minor_version: i32,
}

pub fn run(_args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let out = VersionOutput {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        protocol: PROTOCOL_NAME,
        protocol_version: PROTOCOL_VERSION,
        protocol_minor_version: PROTOCOL_MINOR_VERSION,
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => println!(
            "{} {} (protocol {} v{}.{})",
            out.name, out.version, out.protocol, out.protocol_version, out.protocol_minor_version
        ),
    }

    Ok(exit::SUCCESS)
}
