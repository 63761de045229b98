use puppetry_notation::{Map, Value};

use crate::pose::Quaternion;

/// Pump that outbound envelopes are addressed to.
pub const DEFAULT_PUMP: &str = "puppetry";
/// Envelope key holding the pump name.
pub const KEY_PUMP: &str = "pump";
/// Envelope key holding the command map.
pub const KEY_DATA: &str = "data";
/// Command key naming the operation.
pub const KEY_COMMAND: &str = "command";
/// Command key requesting a reply; sent as undef.
pub const KEY_REPLY: &str = "reply";
/// Per-bone key holding the rotation triple.
pub const KEY_LOCAL_ROT: &str = "local_rot";
/// Command name for pose updates.
pub const COMMAND_MOVE: &str = "move";

/// Wrap a command in the outbound envelope, `pump` first.
pub fn envelope(pump: &str, data: Value) -> Value {
    let mut map = Map::with_capacity(2);
    map.insert(KEY_PUMP, pump);
    map.insert(KEY_DATA, data);
    Value::Map(map)
}

/// Build the move command for one bone.
///
/// Returns `None` for bone names that would collide with the command's own
/// keys.
pub fn move_command(bone: &str, rotation: Quaternion) -> Option<Value> {
    if bone == KEY_COMMAND || bone == KEY_REPLY {
        return None;
    }
    let [x, y, z] = rotation.local_rot();

    let mut joint = Map::with_capacity(1);
    joint.insert(KEY_LOCAL_ROT, vec![x, y, z]);

    let mut command = Map::with_capacity(3);
    command.insert(KEY_COMMAND, COMMAND_MOVE);
    command.insert(KEY_REPLY, Value::Undef);
    command.insert(bone, joint);
    Some(Value::Map(command))
}

/// The pump an inbound message names, if any.
pub fn pump_from_message(message: &Value) -> Option<&str> {
    message.get(KEY_PUMP).and_then(Value::as_str)
}
