//! # Serialization Stage
//!
//! Pipeline node bridging wire bytes and structured messages.
//!
//! ## Outgoing
//! The structured message is encoded into the (empty) wire buffer. This stage
//! is always the last one to touch an outgoing message.
//!
//! ## Incoming
//! 1. The raw bytes are mirrored to the diagnostic tap, if one is open
//! 2. One message is decoded from the front of the buffer
//! 3. Leftover bytes are tolerated and left in the buffer
//!
//! Only decode failures (and oversized encodes) halt the pipeline. Tap
//! problems are logged and counted, never returned.

use std::sync::Arc;
use tracing::{info, instrument, trace};

use crate::config::StageConfig;
use crate::core::bencode::{BencodeCodec, MessageCodec};
use crate::error::{constants, invariant_violation, Result, StageError};
use crate::protocol::message::DhtMessage;
use crate::protocol::registry::{DhtModule, ModuleRegistry};
use crate::tap::DiagnosticTap;
use crate::utils::metrics::StageMetrics;

/// Name the stage registers under
pub const MODULE_NAME: &str = "SerializationModule";

pub struct SerializationStage {
    codec: Box<dyn MessageCodec>,
    tap: DiagnosticTap,
    mirror_outgoing: bool,
    max_message_size: usize,
    metrics: StageMetrics,
}

impl std::fmt::Debug for SerializationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationStage")
            .field("codec", &self.codec.name())
            .field("tap", &self.tap)
            .field("mirror_outgoing", &self.mirror_outgoing)
            .field("max_message_size", &self.max_message_size)
            .finish()
    }
}

impl SerializationStage {
    /// Build the stage, opening the diagnostic tap as configured.
    ///
    /// A tap that cannot be opened is logged and left disabled.
    pub fn new(config: &StageConfig) -> Self {
        Self::with_tap(config, DiagnosticTap::initialize(&config.tap))
    }

    /// Build the stage around an already constructed tap.
    pub fn with_tap(config: &StageConfig, tap: DiagnosticTap) -> Self {
        Self::with_codec(Box::new(BencodeCodec::from_config(&config.codec)), tap, config)
    }

    /// Build the stage with a custom codec.
    pub fn with_codec(codec: Box<dyn MessageCodec>, tap: DiagnosticTap, config: &StageConfig) -> Self {
        Self {
            codec,
            tap,
            mirror_outgoing: config.tap.mirror_outgoing,
            max_message_size: config.codec.max_message_size,
            metrics: StageMetrics::new(),
        }
    }

    /// Build the stage and add it to `registry`.
    pub fn register(registry: &mut ModuleRegistry, config: &StageConfig) -> Result<Arc<Self>> {
        let stage = Arc::new(Self::new(config));
        registry.register(stage.clone())?;
        info!(
            module = MODULE_NAME,
            codec = stage.codec.name(),
            tap_enabled = stage.tap.is_enabled(),
            tap = stage.tap.label(),
            "Serialization stage registered"
        );
        Ok(stage)
    }

    pub fn tap(&self) -> &DiagnosticTap {
        &self.tap
    }

    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Serialize the structured message into the wire buffer.
    ///
    /// # Panics
    /// If the wire buffer is not empty, or its start is not 4-byte aligned
    /// before or after the write.
    #[instrument(level = "trace", skip_all)]
    pub fn encode(&self, message: &mut DhtMessage) -> Result<()> {
        // Nothing may precede the encoded message in the buffer.
        if !message.wire.is_empty() {
            invariant_violation(constants::ERR_BUFFER_NOT_EMPTY);
        }
        let Some(dict) = message.dict.as_ref() else {
            return Err(StageError::MissingMessage);
        };

        message.wire.clear();
        if !message.wire.is_aligned() {
            invariant_violation(constants::ERR_ALIGNMENT_BEFORE);
        }
        self.codec.encode(dict, message.wire.writer());
        if !message.wire.is_aligned() {
            invariant_violation(constants::ERR_ALIGNMENT_AFTER);
        }

        let size = message.wire.len();
        if size > self.max_message_size {
            message.wire.clear();
            self.metrics.oversized_encode();
            info!(size, limit = self.max_message_size, "Encoded message exceeds size limit");
            return Err(StageError::Oversized {
                size,
                limit: self.max_message_size,
            });
        }
        self.metrics.message_encoded(size as u64);

        if self.mirror_outgoing {
            let outcome = self.tap.mirror(message.wire.as_slice());
            self.metrics.tap_outcome(&outcome);
        }

        trace!(bytes = size, "Message encoded");
        Ok(())
    }

    /// Mirror the raw bytes to the tap, then decode one message from them.
    #[instrument(level = "trace", skip_all, fields(len = message.wire.len()))]
    pub fn decode(&self, message: &mut DhtMessage) -> Result<()> {
        let outcome = self.tap.mirror(message.wire.as_slice());
        self.metrics.tap_outcome(&outcome);

        match self.codec.decode(message.wire.as_slice()) {
            Ok((dict, used)) => {
                message.wire.consume(used);
                message.dict = Some(dict);
                self.metrics.message_decoded(used as u64);

                let leftover = message.wire.len();
                if leftover > 0 {
                    self.metrics.trailing(leftover as u64);
                    info!(
                        trailing_bytes = leftover,
                        "Message contains [{leftover}] bytes of trailing data"
                    );
                }
                Ok(())
            }
            Err(e) => {
                message.dict = None;
                self.metrics.decode_failure();
                info!(error = %e, "Failed to parse message [{e}]");
                Err(StageError::Malformed(e))
            }
        }
    }
}

impl DhtModule for SerializationStage {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn handle_incoming(&self, message: &mut DhtMessage) -> Result<()> {
        self.decode(message)
    }

    fn handle_outgoing(&self, message: &mut DhtMessage) -> Result<()> {
        self.encode(message)
    }
}
