use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use hubwire_frame::{FrameConfig, FrameError, FrameReader};
use hubwire_protocol::{
    BoxedFallback, EnvelopeCodec, NoFallback, PayloadRegistry, FALLBACK_DISCRIMINATOR,
};

use crate::exit::{self, CliResult};
use crate::output::{self, EnvelopeRow, OutputFormat};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Frame stream to decode ("-" for stdin).
    pub input: PathBuf,
    /// Maximum accepted frame body size in bytes.
    #[arg(long, default_value_t = hubwire_frame::DEFAULT_MAX_BODY)]
    pub max_body: usize,
    /// Stop after N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = if args.input.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(&args.input).map_err(|err| exit::io_error("opening input", err))?)
    };

    let config = FrameConfig {
        max_body_size: args.max_body,
        ..FrameConfig::default()
    };
    let mut frames = FrameReader::with_config(input, config);

    // Metadata-only decoding: nothing is registered, so every payload item is
    // skipped via the forward-compatibility path and only envelope fields show.
    let codec = EnvelopeCodec::new(PayloadRegistry::empty(), BoxedFallback::new(NoFallback));

    let mut rows = Vec::new();
    loop {
        if args.count.is_some_and(|count| rows.len() >= count) {
            break;
        }

        match frames.read_frame() {
            Ok(frame) if frame.discriminator == FALLBACK_DISCRIMINATOR => {
                rows.push(EnvelopeRow::fallback(rows.len(), frame.body.len()));
            }
            Ok(frame) => match codec.decode_raw(&frame) {
                Ok(envelope) => rows.push(EnvelopeRow::from_envelope(rows.len(), &envelope)),
                Err(err) => {
                    return Err(exit::decode_error(&format!("frame {}", rows.len()), err));
                }
            },
            Err(FrameError::ConnectionClosed) => {
                if frames.buffered_len() > 0 {
                    tracing::warn!(
                        trailing = frames.buffered_len(),
                        "input ended in the middle of a frame"
                    );
                }
                break;
            }
            Err(err) => return Err(exit::frame_error("reading frame", err)),
        }
    }

    output::print_rows(&rows, format);
    Ok(exit::SUCCESS)
}
