use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use puppetry_session::{DEFAULT_HOST, DEFAULT_PORT, MIN_PORT};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a puppetry server and stream poses from a file.
    Stream(StreamArgs),
    /// Encode a JSON value as one notation frame on stdout.
    Encode(EncodeArgs),
    /// Decode a frame stream and print the messages.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Server host.
    #[arg(long, env = "PUPPETRY_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Server port.
    #[arg(
        long,
        env = "PUPPETRY_PORT",
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(MIN_PORT as i64..)
    )]
    pub port: u16,
    /// Seconds between pose updates (clamped to 0.05-5).
    #[arg(long, value_name = "SECS", default_value_t = 0.1)]
    pub update_time: f64,
    /// Armature to stream; optional when the pose file holds only one.
    #[arg(long, value_name = "NAME")]
    pub target: Option<String>,
    /// JSON pose file, re-read on every update.
    #[arg(long, value_name = "FILE")]
    pub pose: PathBuf,
    /// Connection timeout (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON value to encode.
    #[arg(long)]
    pub json: String,
    /// Wrap the value in a `{pump, data}` envelope for this pump.
    #[arg(long, value_name = "PUMP")]
    pub envelope: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding the frame stream. Default: stdin.
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
