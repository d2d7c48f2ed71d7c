use std::fs::File;
use std::io::{self, BufReader, Read};

use ptywire_frame::{FrameConfig, FrameReader};
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let source: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|err| io_error(&format!("open {}", path.display()), err))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let config = FrameConfig {
        max_payload_size: args.max_payload,
    };
    let mut reader = FrameReader::with_config(source, config);

    let mut frames = 0usize;
    while let Some(frame) = reader
        .read_frame()
        .map_err(|err| frame_error("decode failed", err))?
    {
        print_frame(&frame, format);
        frames = frames.saturating_add(1);
    }

    debug!(frames, "end of stream");
    Ok(SUCCESS)
}
