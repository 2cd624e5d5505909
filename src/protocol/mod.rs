//! # Pipeline Layer
//!
//! Message context, stage registration and the serialization stage.
//!
//! ## Components
//! - **Message**: per-message context (`DhtMessage`) with wire buffer and parsed form
//! - **Registry**: `DhtModule` trait and the ordered `ModuleRegistry`
//! - **Stage**: `SerializationStage`, the bytes/structure bridge
//!
//! ## Status Convention
//! Handlers return `Ok(())` to continue. An `Err` halts the message; its
//! `status_code()` gives the integer form (`-2` for malformed input).

pub mod message;
pub mod registry;
pub mod stage;
