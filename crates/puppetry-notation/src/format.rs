use crate::value::Value;

/// Serialize a value as LLSD notation.
///
/// ```text
/// {'pump':'puppetry','data':{'command':'move','reply':!,'chest':{'local_rot':[r0.0,r0.0,r0.1]}}}
/// ```
pub fn to_notation(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    write_notation(value, &mut out);
    out
}

/// Serialize a value as LLSD notation, appending to `out`.
pub fn write_notation(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Undef => out.push(b'!'),
        Value::Boolean(true) => out.extend_from_slice(b"true"),
        Value::Boolean(false) => out.extend_from_slice(b"false"),
        Value::Integer(i) => {
            out.push(b'i');
            out.extend_from_slice(i.to_string().as_bytes());
        }
        Value::Real(r) => {
            out.push(b'r');
            out.extend_from_slice(format_real(*r).as_bytes());
        }
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_notation(item, out);
            }
            out.push(b']');
        }
        Value::Map(map) => {
            out.push(b'{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_notation(item, out);
            }
            out.push(b'}');
        }
    }
}

/// Shortest representation that parses back to the same `f64`.
fn format_real(r: f64) -> String {
    if r.is_nan() {
        "nan".to_string()
    } else if r == f64::INFINITY {
        "inf".to_string()
    } else if r == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        // Debug keeps the trailing ".0" on integral values.
        format!("{r:?}")
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'\'');
    for &b in s.as_bytes() {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            0x00..=0x1f | 0x7f => {
                out.extend_from_slice(format!("\\x{b:02x}").as_bytes());
            }
            _ => out.push(b),
        }
    }
    out.push(b'\'');
}
