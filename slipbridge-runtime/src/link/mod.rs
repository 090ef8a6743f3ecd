use crate::error::LinkError;
use std::time::{Duration, Instant};

/// The WiFi side of the bridge. Implementors hand fully formed Ethernet frames to the driver.
///
/// Both the tick path and the frame receive path transmit, so a link must be shareable
/// between them.
pub trait LinkLayer: Send + Sync {
    fn send_frame(&self, frame: &[u8]) -> Result<(), LinkError>;
}

/// Byte oriented, non-blocking serial port.
pub trait SerialPort: Send {
    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> usize;

    /// Reads up to `buf.len()` bytes, returning how many were read. Never blocks.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Best effort write of every byte in `data`.
    fn write(&mut self, data: &[u8]);
}

/// Monotonic millisecond clock, plus the one suspension point the bridge uses while it
/// waits for an ARP reply.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;

    fn pause(&self, duration: Duration);
}

/// Wall clock backed by `Instant`, measured from construction.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<L: LinkLayer + ?Sized> LinkLayer for std::sync::Arc<L> {
    fn send_frame(&self, frame: &[u8]) -> Result<(), LinkError> {
        (**self).send_frame(frame)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn pause(&self, duration: Duration) {
        (**self).pause(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let before = clock.now_ms();
        clock.pause(Duration::from_millis(5));
        let after = clock.now_ms();
        assert!(after >= before + 5);
    }
}
