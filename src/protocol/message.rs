use crate::core::value::Dict;
use crate::core::wire::WireBuffer;

/// Which way a message travels through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Received from the network; bytes become structure
    Incoming,
    /// Headed for the network; structure becomes bytes
    Outgoing,
}

/// Per-message context handed to every pipeline stage.
///
/// `dict` is `None` on the incoming path until a successful decode.
#[derive(Debug, Clone)]
pub struct DhtMessage {
    pub wire: WireBuffer,
    pub dict: Option<Dict>,
    pub direction: Direction,
}

impl DhtMessage {
    /// Context for raw bytes received from a peer.
    pub fn incoming(bytes: &[u8]) -> Self {
        Self {
            wire: WireBuffer::from_slice(bytes),
            dict: None,
            direction: Direction::Incoming,
        }
    }

    /// Context for a message to be serialized and sent.
    pub fn outgoing(dict: Dict) -> Self {
        Self {
            wire: WireBuffer::new(),
            dict: Some(dict),
            direction: Direction::Outgoing,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.dict.is_some()
    }

    pub fn dict(&self) -> Option<&Dict> {
        self.dict.as_ref()
    }
}
