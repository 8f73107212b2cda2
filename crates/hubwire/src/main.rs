mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "hubwire", version, about = "hubwire frame-stream tools")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Log filter directives (e.g. "debug" or "hubwire_protocol=trace").
    #[arg(long, value_name = "FILTER", default_value = "info", global = true)]
    log_filter: String,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_filter);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inspect_subcommand() {
        let cli = Cli::try_parse_from(["hubwire", "inspect", "capture.bin", "--count", "5"])
            .expect("inspect args should parse");

        match cli.command {
            Command::Inspect(args) => {
                assert_eq!(args.input.to_str(), Some("capture.bin"));
                assert_eq!(args.count, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_version_subcommand_with_json_format() {
        let cli = Cli::try_parse_from(["hubwire", "--format", "json", "version"])
            .expect("version args should parse");

        assert!(matches!(cli.command, Command::Version(_)));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["hubwire", "transmogrify"]).is_err());
    }
}
