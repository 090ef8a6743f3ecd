use failure::Fail;
use std::net::Ipv4Addr;

/// Failure reported by a `LinkLayer` when a frame could not be handed to the driver.
#[derive(Clone, Debug, Fail, PartialEq, Eq)]
#[fail(display = "link error: {}", message)]
pub struct LinkError {
    message: String,
}

impl LinkError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        LinkError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Fail)]
pub enum BridgeError {
    /// No next hop MAC could be resolved before the ARP timeout.
    #[fail(display = "no route to {}", ip)]
    NoRoute { ip: Ipv4Addr },

    /// A frame or packet would not fit in a fixed size buffer and was dropped.
    #[fail(display = "{} bytes exceeds buffer capacity of {}", len, capacity)]
    BufferOverrun { len: usize, capacity: usize },

    /// The single slot serial transmit queue is already occupied.
    #[fail(display = "serial transmit slot is busy")]
    TxBusy,

    #[fail(display = "{}", _0)]
    Link(#[cause] LinkError),

    #[fail(display = "malformed packet: {}", _0)]
    Malformed(&'static str),
}

impl From<LinkError> for BridgeError {
    fn from(error: LinkError) -> Self {
        BridgeError::Link(error)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
