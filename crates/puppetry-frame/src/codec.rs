use bytes::{BufMut, Bytes, BytesMut};
use puppetry_notation::{to_notation, Value};
use tracing::trace;

use crate::error::{FrameError, Result};

/// Separates the decimal length prefix from the payload.
pub const DELIMITER: u8 = b':';

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Default up-front reservation for a payload buffer.
pub const DEFAULT_INITIAL_CAPACITY: usize = 8 * 1024;

/// Encode a payload into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬─────┬──────────────────────┐
/// │ Length (ASCII digits)│ ':' │ Payload (Length bytes)│
/// └──────────────────────┴─────┴──────────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    let len = payload.len().to_string();
    dst.reserve(len.len() + 1 + payload.len());
    dst.put_slice(len.as_bytes());
    dst.put_u8(DELIMITER);
    dst.put_slice(payload);
}

/// Serialize `message` as notation and encode it as one frame.
pub fn encode_message(message: &Value, dst: &mut BytesMut) {
    encode_frame(&to_notation(message), dst);
}

/// Convenience wrapper around [`encode_message`] returning the frame bytes.
pub fn frame_message(message: &Value) -> Bytes {
    let mut buf = BytesMut::new();
    encode_message(message, &mut buf);
    buf.freeze()
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Bytes reserved when a payload starts. Larger payloads grow as
    /// their bytes arrive, never on the strength of the declared length.
    pub initial_capacity: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Accumulating ASCII digits until the delimiter.
    ReadingLength { value: usize, digits: usize },
    /// Collecting `declared` payload bytes.
    ReadingPayload { declared: usize },
    /// A framing error was seen; nothing more can be trusted.
    Poisoned,
}

const READING_LENGTH: State = State::ReadingLength {
    value: 0,
    digits: 0,
};

/// Incremental decoder for `<len>:<payload>` frames.
///
/// Bytes may be pushed in arbitrarily small chunks; the decoder keeps at
/// most one partial frame and emits each payload as soon as its last byte
/// arrives. Feeding a stream in one piece or one byte at a time yields the
/// same frames.
#[derive(Debug)]
pub struct FrameDecoder {
    state: State,
    payload: BytesMut,
    config: FrameConfig,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            state: READING_LENGTH,
            payload: BytesMut::new(),
            config,
        }
    }

    /// Feed bytes and collect every frame they complete.
    ///
    /// On a framing error the decoder is poisoned: this and every later call
    /// fails until [`reset`](Self::reset). Frames completed earlier in the
    /// same chunk are dropped with the error; [`push_into`](Self::push_into)
    /// keeps them.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        let mut frames = Vec::new();
        self.push_into(data, &mut frames)?;
        Ok(frames)
    }

    /// Feed bytes, appending every completed frame to `frames`.
    ///
    /// Frames that complete before a framing error are appended before the
    /// error is returned.
    pub fn push_into(&mut self, data: &[u8], frames: &mut Vec<Bytes>) -> Result<()> {
        let mut rest = data;

        while !rest.is_empty() {
            match self.state {
                State::Poisoned => return Err(FrameError::Poisoned),
                State::ReadingLength { value, digits } => {
                    let byte = rest[0];
                    rest = &rest[1..];
                    match self.length_byte(value, digits, byte) {
                        Ok(Some(frame)) => frames.push(frame),
                        Ok(None) => {}
                        Err(err) => {
                            self.state = State::Poisoned;
                            return Err(err);
                        }
                    }
                }
                State::ReadingPayload { declared } => {
                    let wanted = declared - self.payload.len();
                    let take = wanted.min(rest.len());
                    self.payload.extend_from_slice(&rest[..take]);
                    rest = &rest[take..];
                    if self.payload.len() == declared {
                        frames.push(self.finish_frame());
                    }
                }
            }
        }

        Ok(())
    }

    fn length_byte(&mut self, value: usize, digits: usize, byte: u8) -> Result<Option<Bytes>> {
        match byte {
            b'0'..=b'9' => {
                let max = self.config.max_payload_size;
                let value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(usize::from(byte - b'0')))
                    .unwrap_or(usize::MAX);
                if value > max {
                    return Err(FrameError::PayloadTooLarge { size: value, max });
                }
                self.state = State::ReadingLength {
                    value,
                    digits: digits + 1,
                };
                Ok(None)
            }
            DELIMITER if digits == 0 => Err(FrameError::MissingLength),
            DELIMITER => {
                trace!(declared = value, "frame length parsed");
                if value == 0 {
                    self.state = READING_LENGTH;
                    return Ok(Some(Bytes::new()));
                }
                self.payload
                    .reserve(value.min(self.config.initial_capacity));
                self.state = State::ReadingPayload { declared: value };
                Ok(None)
            }
            byte => Err(FrameError::InvalidLengthByte { byte }),
        }
    }

    fn finish_frame(&mut self) -> Bytes {
        self.state = READING_LENGTH;
        self.payload.split().freeze()
    }

    /// True when no partial frame is buffered.
    pub fn is_idle(&self) -> bool {
        self.state == READING_LENGTH
    }

    /// True after a framing error, until [`reset`](Self::reset).
    pub fn is_poisoned(&self) -> bool {
        self.state == State::Poisoned
    }

    /// Number of bytes consumed for the frame currently in progress.
    pub fn buffered(&self) -> usize {
        match self.state {
            State::ReadingLength { digits, .. } => digits,
            State::ReadingPayload { .. } => self.payload.len(),
            State::Poisoned => 0,
        }
    }

    /// Drop any partial frame and clear a poisoned state.
    pub fn reset(&mut self) {
        self.state = READING_LENGTH;
        self.payload.clear();
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use puppetry_notation::{from_notation, Map};

    use super::*;

    fn decode_all(decoder: &mut FrameDecoder, chunks: &[&[u8]]) -> Vec<Bytes> {
        chunks
            .iter()
            .flat_map(|chunk| decoder.push(chunk).unwrap())
            .collect()
    }

    fn chest_envelope() -> Value {
        let mut rot = Map::new();
        rot.insert("local_rot", vec![0.0, 0.0, 0.1]);
        let mut data = Map::new();
        data.insert("command", "move");
        data.insert("reply", Value::Undef);
        data.insert("chest", rot);
        let mut envelope = Map::new();
        envelope.insert("pump", "puppetry");
        envelope.insert("data", data);
        Value::Map(envelope)
    }

    #[test]
    fn test_encode_frame() {
        let mut buf = BytesMut::new();
        encode_frame(b"abcde", &mut buf);
        assert_eq!(buf.as_ref(), b"5:abcde");
    }

    #[test]
    fn test_encode_message_scenario() {
        let notation = "{'pump':'puppetry','data':{'command':'move','reply':!,'chest':{'local_rot':[r0.0,r0.0,r0.1]}}}";
        let frame = frame_message(&chest_envelope());

        let expected = format!("{}:{}", notation.len(), notation);
        assert_eq!(frame.as_ref(), expected.as_bytes());

        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(&frame).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(from_notation(&payloads[0]).unwrap(), chest_envelope());
    }

    #[test]
    fn test_decode_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        let frames = decode_all(&mut decoder, &[b"5", b":a", b"bcde3", b":xyz"]);

        assert_eq!(frames, vec![Bytes::from_static(b"abcde"), Bytes::from_static(b"xyz")]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_resumable_for_every_split() {
        let mut stream = BytesMut::new();
        encode_frame(b"first", &mut stream);
        encode_frame(b"", &mut stream);
        encode_frame(b"{'a':[i1,i2]}", &mut stream);
        encode_frame(&[b'x'; 12], &mut stream);

        let whole = FrameDecoder::new().push(&stream).unwrap();
        assert_eq!(whole.len(), 4);

        for chunk_size in 1..=stream.len() {
            let mut decoder = FrameDecoder::new();
            let frames: Vec<Bytes> = stream
                .chunks(chunk_size)
                .flat_map(|chunk| decoder.push(chunk).unwrap())
                .collect();
            assert_eq!(frames, whole, "chunk size {chunk_size}");
        }

        for split in 0..=stream.len() {
            let (left, right) = stream.split_at(split);
            let mut decoder = FrameDecoder::new();
            let frames = decode_all(&mut decoder, &[left, right]);
            assert_eq!(frames, whole, "split at {split}");
        }
    }

    #[test]
    fn test_incomplete_frame_is_buffered() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"10:hello").unwrap().is_empty());
        assert!(!decoder.is_idle());
        assert_eq!(decoder.buffered(), 5);

        let frames = decoder.push(b"world").unwrap();
        assert_eq!(frames, vec![Bytes::from_static(b"helloworld")]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_zero_length_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"0:").unwrap();
        assert_eq!(frames, vec![Bytes::new()]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_missing_length_digits() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.push(b":abc").unwrap_err();
        assert!(matches!(err, FrameError::MissingLength));
        assert!(err.is_framing());
    }

    #[test]
    fn test_non_digit_in_length() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.push(b"1x:").unwrap_err();
        assert!(matches!(err, FrameError::InvalidLengthByte { byte: b'x' }));

        let err = FrameDecoder::new().push(b"-5:").unwrap_err();
        assert!(matches!(err, FrameError::InvalidLengthByte { byte: b'-' }));
    }

    #[test]
    fn test_payload_too_large_before_delimiter() {
        let cfg = FrameConfig {
            max_payload_size: 100,
            ..FrameConfig::default()
        };
        let mut decoder = FrameDecoder::with_config(cfg);
        // The third digit already exceeds the cap; no delimiter needed.
        let err = decoder.push(b"999").unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 999, max: 100 }
        ));
        assert_eq!(decoder.payload.capacity(), 0);
    }

    #[test]
    fn test_huge_length_does_not_overflow() {
        let mut decoder = FrameDecoder::new();
        let err = decoder
            .push(b"99999999999999999999999999999999:")
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_poisoned_until_reset() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"?").is_err());
        assert!(decoder.is_poisoned());
        assert!(matches!(decoder.push(b"3:abc"), Err(FrameError::Poisoned)));

        decoder.reset();
        assert_eq!(decoder.push(b"3:abc").unwrap(), vec![Bytes::from_static(b"abc")]);
    }

    #[test]
    fn test_frames_before_error_are_kept() {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        let err = decoder.push_into(b"1:a2:bcx", &mut frames).unwrap_err();

        assert!(matches!(err, FrameError::InvalidLengthByte { byte: b'x' }));
        assert_eq!(frames, vec![Bytes::from_static(b"a"), Bytes::from_static(b"bc")]);
        assert!(decoder.is_poisoned());

        assert!(FrameDecoder::new().push(b"1:a2:bcx").is_err());
    }

    #[test]
    fn test_max_payload_is_inclusive() {
        let cfg = FrameConfig {
            max_payload_size: 3,
            ..FrameConfig::default()
        };
        let mut decoder = FrameDecoder::with_config(cfg);
        assert_eq!(decoder.push(b"3:abc").unwrap().len(), 1);
        assert!(decoder.push(b"4:").is_err());
    }

    #[test]
    fn test_set_max_payload_size() {
        let mut decoder = FrameDecoder::new();
        decoder.set_max_payload_size(1);
        assert_eq!(decoder.config().max_payload_size, 1);
        assert!(decoder.push(b"2:").is_err());
    }
}
