use puppetry_frame::frame_message;
use puppetry_notation::Value;
use puppetry_session::envelope;

use crate::cmd::EncodeArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let frame = encode(&args)?;
    print_raw(&frame);
    Ok(SUCCESS)
}

fn encode(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    let json: serde_json::Value = serde_json::from_str(&args.json)
        .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
    let mut value = Value::from(json);
    if let Some(pump) = &args.envelope {
        value = envelope(pump, value);
    }
    Ok(frame_message(&value).to_vec())
}
