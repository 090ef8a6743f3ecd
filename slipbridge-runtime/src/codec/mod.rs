//! SLIP style framing for the serial link.
//!
//! A frame on the wire is `END payload END`. Inside the payload an `END` byte is sent as the
//! two byte sequence `ESC ESC_END`. `ESC` itself is never escaped, which keeps the encoder
//! compatible with the peer on the other end of the serial line.

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape lead byte.
pub const ESC: u8 = 0xDB;
/// Follows `ESC` to stand for an `END` inside the payload.
pub const ESC_END: u8 = 0xDC;

/// Largest packet the serial peer sends, from RFC 1055.
pub const MAX_PACKET_LEN: usize = 1006;

/// Default reassembly capacity, leaving room for a packet where every byte was escaped.
pub const DEFAULT_MAX_FRAME_LEN: usize = MAX_PACKET_LEN * 2;

mod decoder;
pub use self::decoder::*;

mod encoder;
pub use self::encoder::*;
