use crate::error::{NotationError, Result};
use crate::value::{Map, Value};

/// Default limit on nested arrays and maps.
pub const DEFAULT_MAX_DEPTH: usize = 128;

const UUID_LEN: usize = 36;

/// Parse one LLSD notation document.
///
/// Whitespace around tokens is allowed; anything else after the top-level
/// value is an error.
pub fn from_notation(input: &[u8]) -> Result<Value> {
    from_notation_with_depth(input, DEFAULT_MAX_DEPTH)
}

/// Parse one LLSD notation document with an explicit nesting limit.
pub fn from_notation_with_depth(input: &[u8], max_depth: usize) -> Result<Value> {
    let mut parser = Parser {
        input,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let value = parser.parse_value()?;
    parser.skip_ws();
    if parser.pos < input.len() {
        return Err(NotationError::TrailingData { offset: parser.pos });
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<u8> {
        let b = self.peek().ok_or(NotationError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        let offset = self.pos;
        match self.next()? {
            b if b == expected => Ok(()),
            byte => Err(NotationError::UnexpectedByte { byte, offset }),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Consume `literal` if the input continues with it.
    fn eat(&mut self, literal: &[u8]) -> bool {
        if self.input[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_ws();
        let offset = self.pos;
        let byte = self.peek().ok_or(NotationError::UnexpectedEof { offset })?;
        match byte {
            b'!' => {
                self.pos += 1;
                Ok(Value::Undef)
            }
            b'{' => self.parse_map(),
            b'[' => self.parse_array(),
            b'i' => {
                self.pos += 1;
                self.parse_integer()
            }
            b'r' => {
                self.pos += 1;
                self.parse_real()
            }
            b'\'' | b'"' => self.parse_quoted().map(Value::String),
            b's' => self.parse_sized_string().map(Value::String),
            b'u' => {
                self.pos += 1;
                self.parse_uuid().map(Value::String)
            }
            // URIs and dates have no variant of their own; keep their text.
            b'l' | b'd' => {
                self.pos += 1;
                self.parse_quoted().map(Value::String)
            }
            b'b' => Err(NotationError::Unsupported {
                kind: "binary",
                offset,
            }),
            b'1' => {
                self.pos += 1;
                Ok(Value::Boolean(true))
            }
            b'0' => {
                self.pos += 1;
                Ok(Value::Boolean(false))
            }
            b't' | b'T' => {
                self.pos += 1;
                let _ = self.eat(b"rue") || self.eat(b"RUE");
                Ok(Value::Boolean(true))
            }
            b'f' | b'F' => {
                self.pos += 1;
                let _ = self.eat(b"alse") || self.eat(b"ALSE");
                Ok(Value::Boolean(false))
            }
            byte => Err(NotationError::UnexpectedByte { byte, offset }),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(NotationError::TooDeep {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.enter()?;
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            let offset = self.pos;
            match self.next()? {
                b',' => continue,
                b']' => break,
                byte => return Err(NotationError::UnexpectedByte { byte, offset }),
            }
        }
        self.depth -= 1;
        Ok(Value::Array(items))
    }

    fn parse_map(&mut self) -> Result<Value> {
        self.enter()?;
        self.expect(b'{')?;
        let mut map = Map::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Map(map));
        }
        loop {
            self.skip_ws();
            let offset = self.pos;
            let key = match self.peek() {
                Some(b'\'' | b'"') => self.parse_quoted()?,
                Some(b's') => self.parse_sized_string()?,
                Some(byte) => return Err(NotationError::UnexpectedByte { byte, offset }),
                None => return Err(NotationError::UnexpectedEof { offset }),
            };
            self.skip_ws();
            self.expect(b':')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_ws();
            let offset = self.pos;
            match self.next()? {
                b',' => continue,
                b'}' => break,
                byte => return Err(NotationError::UnexpectedByte { byte, offset }),
            }
        }
        self.depth -= 1;
        Ok(Value::Map(map))
    }

    fn parse_integer(&mut self) -> Result<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        // Only ASCII sign and digits were consumed.
        let text = String::from_utf8_lossy(text);
        text.parse::<i32>()
            .map(Value::Integer)
            .map_err(|_| NotationError::InvalidNumber {
                text: text.into_owned(),
                offset: start,
            })
    }

    fn parse_real(&mut self) -> Result<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
        {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.input[start..self.pos]);
        text.parse::<f64>()
            .map(Value::Real)
            .map_err(|_| NotationError::InvalidNumber {
                text: text.into_owned(),
                offset: start,
            })
    }

    /// A `'` or `"` delimited string with backslash escapes.
    fn parse_quoted(&mut self) -> Result<String> {
        let start = self.pos;
        let delimiter = self.next()?;
        if delimiter != b'\'' && delimiter != b'"' {
            return Err(NotationError::UnexpectedByte {
                byte: delimiter,
                offset: start,
            });
        }

        let mut buf = Vec::new();
        loop {
            let byte = self.next()?;
            if byte == delimiter {
                break;
            }
            if byte != b'\\' {
                buf.push(byte);
                continue;
            }
            let offset = self.pos;
            let escaped = match self.next()? {
                b'n' => b'\n',
                b't' => b'\t',
                b'r' => b'\r',
                b'a' => 0x07,
                b'b' => 0x08,
                b'f' => 0x0c,
                b'v' => 0x0b,
                b'x' => {
                    let hi = self.next()?;
                    let lo = self.next()?;
                    match (hex_digit(hi), hex_digit(lo)) {
                        (Some(hi), Some(lo)) => (hi << 4) | lo,
                        _ => {
                            return Err(NotationError::UnexpectedByte {
                                byte: if hex_digit(hi).is_none() { hi } else { lo },
                                offset,
                            })
                        }
                    }
                }
                other => other,
            };
            buf.push(escaped);
        }

        String::from_utf8(buf).map_err(|_| NotationError::InvalidUtf8 { offset: start })
    }

    /// `s(N)"raw bytes"` with exactly N bytes between the quotes.
    fn parse_sized_string(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect(b's')?;
        self.expect(b'(')?;
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.input[digits_start..self.pos]).into_owned();
        let len: usize = text.parse().map_err(|_| NotationError::InvalidNumber {
            text: text.clone(),
            offset: digits_start,
        })?;
        self.expect(b')')?;

        let quote_offset = self.pos;
        let delimiter = self.next()?;
        if delimiter != b'\'' && delimiter != b'"' {
            return Err(NotationError::UnexpectedByte {
                byte: delimiter,
                offset: quote_offset,
            });
        }
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(NotationError::UnexpectedEof {
                offset: self.input.len(),
            })?;
        let raw = &self.input[self.pos..end];
        self.pos = end;
        self.expect(delimiter)?;

        String::from_utf8(raw.to_vec()).map_err(|_| NotationError::InvalidUtf8 { offset: start })
    }

    fn parse_uuid(&mut self) -> Result<String> {
        let start = self.pos;
        let end = start + UUID_LEN;
        if end > self.input.len() {
            return Err(NotationError::UnexpectedEof {
                offset: self.input.len(),
            });
        }
        for (i, &byte) in self.input[start..end].iter().enumerate() {
            let ok = match i {
                8 | 13 | 18 | 23 => byte == b'-',
                _ => byte.is_ascii_hexdigit(),
            };
            if !ok {
                return Err(NotationError::UnexpectedByte {
                    byte,
                    offset: start + i,
                });
            }
        }
        self.pos = end;
        Ok(String::from_utf8_lossy(&self.input[start..end]).into_owned())
    }
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
