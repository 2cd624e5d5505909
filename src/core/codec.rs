//! # Stream Framing
//!
//! Tokio codec that splits a byte stream into successive bencoded messages.
//!
//! The diagnostic tap writes raw messages back to back with no framing of its
//! own; bencode is self-delimiting, so a reader recovers message boundaries by
//! decoding one dictionary at a time.
//!
//! - Incomplete input waits for more bytes
//! - Malformed input is an error; the stream cannot be resynchronized
//! - Buffered input larger than the frame limit is an error

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::config::{CodecConfig, DEFAULT_MAX_MESSAGE_SIZE};
use crate::core::bencode::{to_bytes, BencodeCodec, MessageCodec};
use crate::core::value::Dict;
use crate::error::{Result, StageError};

#[derive(Debug, Clone, Copy)]
pub struct BencodeFrameCodec {
    codec: BencodeCodec,
    max_frame_size: usize,
}

impl Default for BencodeFrameCodec {
    fn default() -> Self {
        Self::new(BencodeCodec::default(), DEFAULT_MAX_MESSAGE_SIZE)
    }
}

impl BencodeFrameCodec {
    pub fn new(codec: BencodeCodec, max_frame_size: usize) -> Self {
        Self {
            codec,
            max_frame_size,
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(BencodeCodec::from_config(config), config.max_message_size)
    }
}

impl Decoder for BencodeFrameCodec {
    type Item = Dict;
    type Error = StageError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Dict>> {
        if src.is_empty() {
            return Ok(None);
        }

        match self.codec.decode(src.as_ref()) {
            Ok((message, used)) => {
                if used > self.max_frame_size {
                    return Err(StageError::Oversized {
                        size: used,
                        limit: self.max_frame_size,
                    });
                }
                src.advance(used);
                trace!(frame_len = used, remaining = src.len(), "Decoded frame");
                Ok(Some(message))
            }
            Err(e) if e.is_incomplete() => {
                if src.len() > self.max_frame_size {
                    return Err(StageError::Oversized {
                        size: src.len(),
                        limit: self.max_frame_size,
                    });
                }
                Ok(None)
            }
            Err(e) => Err(StageError::Malformed(e)),
        }
    }
}

impl<'a> Encoder<&'a Dict> for BencodeFrameCodec {
    type Error = StageError;

    fn encode(&mut self, item: &'a Dict, dst: &mut BytesMut) -> Result<()> {
        let bytes = to_bytes(item);
        if bytes.len() > self.max_frame_size {
            return Err(StageError::Oversized {
                size: bytes.len(),
                limit: self.max_frame_size,
            });
        }
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::core::value::{dict, Value};

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut codec = BencodeFrameCodec::default();
        let mut buf = BytesMut::from(&b"d1:ai1eed1:bi2ee"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.get(&b"a"[..]), Some(&Value::Integer(1)));
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.get(&b"b"[..]), Some(&Value::Integer(2)));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_partial_frame_waits() {
        let mut codec = BencodeFrameCodec::default();
        let mut buf = BytesMut::from(&b"d1:ai1"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 6);

        buf.extend_from_slice(b"ee");
        assert!(codec.decode(&mut buf).unwrap().is_some());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_malformed_frame_errors() {
        let mut codec = BencodeFrameCodec::default();
        let mut buf = BytesMut::from(&b"x"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(StageError::Malformed(_))
        ));
    }

    #[test]
    fn test_oversized_partial_frame_errors() {
        let mut codec = BencodeFrameCodec::new(BencodeCodec::default(), 8);
        let mut buf = BytesMut::from(&b"d1:a20:0123456789"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(StageError::Oversized { limit: 8, .. })
        ));
    }

    #[test]
    fn test_encode_appends() {
        let mut codec = BencodeFrameCodec::default();
        let mut buf = BytesMut::new();
        let msg = dict([("y", Value::from("r"))]);
        codec.encode(&msg, &mut buf).unwrap();
        codec.encode(&msg, &mut buf).unwrap();
        assert_eq!(&buf[..], b"d1:y1:red1:y1:re");
    }
}
