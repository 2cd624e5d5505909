//! # Bencode Codec
//!
//! Self-delimiting binary encoding used on the DHT wire.
//!
//! ## Grammar
//! ```text
//! integer    = "i" ["-"] digits "e"
//! byte string = length ":" bytes
//! list       = "l" value* "e"
//! dictionary = "d" (byte-string value)* "e"
//! ```
//!
//! A wire message is always a dictionary. Decoding reads one dictionary from
//! the front of the input and reports how many bytes it used, so anything
//! after it is left to the caller.
//!
//! ## Strictness
//! - No leading zeros in integers or lengths, no `-0`
//! - Integers must fit in an `i64`
//! - Dictionary keys must be byte strings and must not repeat
//! - Unsorted keys are accepted; the encoder always writes sorted keys
//! - Nesting deeper than the configured limit is rejected

use crate::config::CodecConfig;
use crate::core::value::{Dict, Value};
use std::io::Write;
use thiserror::Error;

/// Default nesting limit for decoded messages
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Longest textual integer that can still fit in an i64 ("-9223372036854775808")
const MAX_INTEGER_DIGITS: usize = 20;

/// Reasons a byte sequence is not a valid encoded message.
///
/// Offsets are relative to the start of the decoded input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    #[error("unexpected byte 0x{byte:02x} at offset {offset}")]
    UnexpectedByte { offset: usize, byte: u8 },

    #[error("invalid integer at offset {0}")]
    InvalidInteger(usize),

    #[error("invalid string length at offset {0}")]
    InvalidLength(usize),

    #[error("message is not a dictionary")]
    NotADictionary,

    #[error("dictionary key is not a string at offset {0}")]
    KeyNotString(usize),

    #[error("duplicate dictionary key at offset {0}")]
    DuplicateKey(usize),

    #[error("nesting exceeds {0} levels")]
    DepthExceeded(usize),
}

impl DecodeError {
    /// True when more input could still turn this into a valid message.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, DecodeError::UnexpectedEof(_))
    }
}

/// Converts structured messages to wire bytes and back.
///
/// Implementations must be pure: no I/O, bounded work per byte.
pub trait MessageCodec: Send + Sync {
    /// Name used in log fields
    fn name(&self) -> &'static str;

    /// Append the encoding of `message` to `out`.
    fn encode(&self, message: &Dict, out: &mut Vec<u8>);

    /// Decode one message from the front of `input`.
    ///
    /// Returns the message and the number of bytes it occupied.
    fn decode(&self, input: &[u8]) -> Result<(Dict, usize), DecodeError>;
}

/// Bencode implementation of [`MessageCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BencodeCodec {
    max_depth: usize,
}

impl Default for BencodeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl BencodeCodec {
    /// Create a codec with the given nesting limit (at least 1).
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.max_depth)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl MessageCodec for BencodeCodec {
    fn name(&self) -> &'static str {
        "bencode"
    }

    fn encode(&self, message: &Dict, out: &mut Vec<u8>) {
        write_dict(message, out);
    }

    fn decode(&self, input: &[u8]) -> Result<(Dict, usize), DecodeError> {
        let mut reader = Reader {
            input,
            pos: 0,
            max_depth: self.max_depth,
        };
        if reader.peek()? != b'd' {
            return Err(DecodeError::NotADictionary);
        }
        let dict = reader.dict(1)?;
        Ok((dict, reader.pos))
    }
}

/// Encode a message into a fresh vector.
pub fn to_bytes(message: &Dict) -> Vec<u8> {
    let mut out = Vec::new();
    write_dict(message, &mut out);
    out
}

fn write_dict(dict: &Dict, out: &mut Vec<u8>) {
    out.push(b'd');
    for (key, value) in dict {
        write_bytes(key, out);
        write_value(value, out);
    }
    out.push(b'e');
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    // Writing into a Vec cannot fail
    let _ = write!(out, "{}:", bytes.len());
    out.extend_from_slice(bytes);
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Integer(i) => {
            let _ = write!(out, "i{i}e");
        }
        Value::Bytes(b) => write_bytes(b, out),
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                write_value(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(d) => write_dict(d, out),
    }
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    max_depth: usize,
}

impl Reader<'_> {
    #[inline]
    fn peek(&self) -> Result<u8, DecodeError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof(self.pos))
    }

    /// `depth` is the nesting level of the enclosing container.
    fn value(&mut self, depth: usize) -> Result<Value, DecodeError> {
        match self.peek()? {
            b'i' => self.integer().map(Value::Integer),
            b'l' => self.list(depth + 1),
            b'd' => self.dict(depth + 1).map(Value::Dict),
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            byte => Err(DecodeError::UnexpectedByte {
                offset: self.pos,
                byte,
            }),
        }
    }

    /// Advance over `[-0-9]*` and return the scanned slice's end.
    /// The byte at the returned index must be `terminator`.
    fn scan_number(&mut self, terminator: u8) -> Result<usize, DecodeError> {
        let end = self.input[self.pos..]
            .iter()
            .position(|b| !matches!(b, b'-' | b'0'..=b'9'))
            .map(|i| self.pos + i)
            .ok_or(DecodeError::UnexpectedEof(self.input.len()))?;
        if self.input[end] != terminator {
            return Err(DecodeError::UnexpectedByte {
                offset: end,
                byte: self.input[end],
            });
        }
        Ok(end)
    }

    fn integer(&mut self) -> Result<i64, DecodeError> {
        let start = self.pos;
        self.pos += 1;
        let end = self.scan_number(b'e')?;
        let value =
            parse_integer(&self.input[self.pos..end]).ok_or(DecodeError::InvalidInteger(start))?;
        self.pos = end + 1;
        Ok(value)
    }

    fn bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let start = self.pos;
        let colon = self.scan_number(b':')?;
        let len =
            parse_length(&self.input[start..colon]).ok_or(DecodeError::InvalidLength(start))?;
        let data_start = colon + 1;
        let data_end = data_start
            .checked_add(len)
            .ok_or(DecodeError::InvalidLength(start))?;
        if data_end > self.input.len() {
            return Err(DecodeError::UnexpectedEof(self.input.len()));
        }
        self.pos = data_end;
        Ok(self.input[data_start..data_end].to_vec())
    }

    fn enter(&self, depth: usize) -> Result<(), DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::DepthExceeded(self.max_depth));
        }
        Ok(())
    }

    fn list(&mut self, depth: usize) -> Result<Value, DecodeError> {
        self.enter(depth)?;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            if self.peek()? == b'e' {
                self.pos += 1;
                return Ok(Value::List(items));
            }
            items.push(self.value(depth)?);
        }
    }

    fn dict(&mut self, depth: usize) -> Result<Dict, DecodeError> {
        self.enter(depth)?;
        self.pos += 1;
        let mut dict = Dict::new();
        loop {
            let key_offset = self.pos;
            match self.peek()? {
                b'e' => {
                    self.pos += 1;
                    return Ok(dict);
                }
                b'0'..=b'9' => {}
                _ => return Err(DecodeError::KeyNotString(key_offset)),
            }
            let key = self.bytes()?;
            let value = self.value(depth)?;
            if dict.insert(key, value).is_some() {
                return Err(DecodeError::DuplicateKey(key_offset));
            }
        }
    }
}

fn parse_integer(text: &[u8]) -> Option<i64> {
    let digits = text.strip_prefix(b"-").unwrap_or(text);
    if digits.is_empty() || text.len() > MAX_INTEGER_DIGITS || digits.contains(&b'-') {
        return None;
    }
    if digits[0] == b'0' && (digits.len() > 1 || text.len() != digits.len()) {
        // leading zero, or "-0"
        return None;
    }
    std::str::from_utf8(text).ok()?.parse().ok()
}

fn parse_length(text: &[u8]) -> Option<usize> {
    if text.is_empty() || text.contains(&b'-') || (text[0] == b'0' && text.len() > 1) {
        return None;
    }
    std::str::from_utf8(text).ok()?.parse().ok()
}
