use std::fs::File;
use std::io::{self, Read};

use puppetry_frame::FrameReader;
use puppetry_notation::{from_notation, Value};
use tracing::warn;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let dropped = decode_stream(input, |message| print_message(message, format))?;
    if dropped > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{dropped} message(s) were not valid notation"),
        ));
    }
    Ok(SUCCESS)
}

/// Hand every decodable message to `emit`; return how many were dropped.
fn decode_stream<R: Read>(input: R, mut emit: impl FnMut(&Value)) -> CliResult<usize> {
    let mut dropped = 0;
    for (index, payload) in FrameReader::new(input).enumerate() {
        let payload = payload.map_err(|err| frame_error("decode failed", err))?;
        match from_notation(&payload) {
            Ok(message) => emit(&message),
            Err(err) => {
                warn!(frame = index, error = %err, "skipping malformed message");
                dropped += 1;
            }
        }
    }
    Ok(dropped)
}
