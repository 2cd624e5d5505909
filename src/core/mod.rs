//! # Core Components
//!
//! Message values, the bencode codec, wire buffers and stream framing.
//!
//! ## Components
//! - **Value**: structured message representation (`Dict` of `Value`s)
//! - **Bencode**: the `MessageCodec` trait and its bencode implementation
//! - **Wire**: per-message byte buffer with an unconsumed-length cursor
//! - **Codec**: Tokio codec for splitting a byte stream into messages
//!
//! ## Wire Format
//! ```text
//! d <key> <value> ... e      (keys are length-prefixed byte strings)
//! ```
//!
//! ## Security
//! - Nesting depth limit (prevents stack exhaustion)
//! - Length validation before slicing
//! - Encoded size limit on the outgoing path

pub mod bencode;
pub mod codec;
pub mod value;
pub mod wire;
