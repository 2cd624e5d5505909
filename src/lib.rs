//! # dht-serialization
//!
//! Serialization stage for DHT message pipelines.
//!
//! Converts between structured messages and their bencoded wire form in both
//! directions, and optionally mirrors raw incoming bytes to a named pipe for
//! offline inspection.
//!
//! ## Layout
//! - [`core`]: values, bencode codec, wire buffers, stream framing
//! - [`protocol`]: message context, module registry, the stage itself
//! - [`tap`]: diagnostic side channel
//! - [`config`]: TOML/environment configuration
//! - [`utils`]: logging and metrics
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use dht_serialization::{
//!     DhtMessage, DiagnosticTap, ModuleRegistry, SerializationStage, StageConfig,
//! };
//! use dht_serialization::core::value::{dict, Value};
//!
//! // `SerializationStage::register` opens the tap FIFO named in the config;
//! // here the stage gets a disabled tap instead.
//! let stage = SerializationStage::with_tap(&StageConfig::default(), DiagnosticTap::disabled());
//! let mut registry = ModuleRegistry::new();
//! registry.register(Arc::new(stage)).unwrap();
//!
//! let mut out = DhtMessage::outgoing(dict([("q", Value::from("ping"))]));
//! registry.handle_outgoing(&mut out).unwrap();
//!
//! let mut inc = DhtMessage::incoming(out.wire.as_slice());
//! registry.handle_incoming(&mut inc).unwrap();
//! assert_eq!(inc.dict(), out.dict());
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod tap;
pub mod utils;

pub use crate::config::StageConfig;
pub use crate::core::bencode::{BencodeCodec, DecodeError, MessageCodec};
pub use crate::core::value::{Dict, Value};
pub use crate::core::wire::WireBuffer;
pub use crate::error::{ErrorKind, Result, StageError};
pub use crate::protocol::message::{DhtMessage, Direction};
pub use crate::protocol::registry::{DhtModule, ModuleRegistry};
pub use crate::protocol::stage::{SerializationStage, MODULE_NAME};
pub use crate::tap::{DiagnosticTap, MemorySink, TapOutcome};
