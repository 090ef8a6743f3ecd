use crate::codec::{DEFAULT_MAX_FRAME_LEN, END, ESC, ESC_END};
use log::warn;

/// Where the decoder is relative to the frame delimiters.
///
/// - `Idle`: between frames. Everything except `END` is line noise and is dropped.
/// - `InFrame`: collecting payload bytes.
/// - `InEscape`: the previous byte was `ESC`. If this byte is `ESC_END` the pair stands for
///   an `END`. Otherwise the `ESC` is kept as a literal and this byte is handled as if it
///   arrived in `InFrame`.
/// - `Discarding`: the frame outgrew the reassembly buffer. Bytes are dropped until the next
///   `END`, after which the decoder is `Idle` again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderState {
    Idle,
    InFrame,
    InEscape,
    Discarding,
}

/// Recovers packets from the serial byte stream one byte at a time.
///
/// Frames are opened by an `END` and closed by the next `END`. An `END` that would close an
/// empty frame instead keeps the frame open, so a decoder that started listening in the
/// middle of a frame lines up with the stream again after at most one lost packet.
pub struct SlipDecoder {
    state: DecoderState,
    buffer: Vec<u8>,
    capacity: usize,
    overruns: u64,
}

impl SlipDecoder {
    pub fn new(capacity: usize) -> Self {
        SlipDecoder {
            state: DecoderState::Idle,
            buffer: Vec::with_capacity(capacity),
            capacity,
            overruns: 0,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Frames abandoned so far because they exceeded the reassembly capacity.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Bytes collected for the frame in progress.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops any partial frame and waits for the next opening `END`.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Idle;
    }

    /// Feeds one byte, returning a packet when this byte completes one.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        match self.state {
            DecoderState::Idle => {
                if byte == END {
                    self.buffer.clear();
                    self.state = DecoderState::InFrame;
                }
                None
            }
            DecoderState::InFrame => self.in_frame(byte),
            DecoderState::InEscape => {
                if byte == ESC_END {
                    self.append(END);
                    None
                } else {
                    self.state = DecoderState::InFrame;
                    if !self.append(ESC) {
                        // The overrun may already be closed by this very byte
                        return self.push(byte);
                    }
                    self.in_frame(byte)
                }
            }
            DecoderState::Discarding => {
                if byte == END {
                    self.reset();
                }
                None
            }
        }
    }

    /// Feeds a run of bytes, returning every packet completed along the way.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    fn in_frame(&mut self, byte: u8) -> Option<Vec<u8>> {
        match byte {
            END if self.buffer.is_empty() => None,
            END => {
                self.state = DecoderState::Idle;
                Some(std::mem::replace(
                    &mut self.buffer,
                    Vec::with_capacity(self.capacity),
                ))
            }
            ESC => {
                self.state = DecoderState::InEscape;
                None
            }
            _ => {
                self.append(byte);
                None
            }
        }
    }

    /// Appends a decoded byte. On overrun the partial frame is thrown away and the decoder
    /// moves to `Discarding`, returning false.
    fn append(&mut self, byte: u8) -> bool {
        if self.buffer.len() >= self.capacity {
            self.overruns += 1;
            warn!(
                "Serial frame exceeded {} bytes, discarding it",
                self.capacity
            );
            self.buffer.clear();
            self.state = DecoderState::Discarding;
            return false;
        }
        self.buffer.push(byte);
        if self.state == DecoderState::InEscape {
            self.state = DecoderState::InFrame;
        }
        true
    }
}

impl Default for SlipDecoder {
    fn default() -> Self {
        SlipDecoder::new(DEFAULT_MAX_FRAME_LEN)
    }
}
