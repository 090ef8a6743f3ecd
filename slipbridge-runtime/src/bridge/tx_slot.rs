use crate::error::{BridgeError, Result};
use crate::utils::lock;
use crossbeam::atomic::AtomicCell;
use std::sync::Mutex;

/// SlotState
///
/// The state machine of the single slot serial transmit queue.
///
/// # Empty: nothing is queued, a producer may claim the slot.
///
/// # Filling: a producer won the claim and is copying its packet in. Other producers see the
/// slot as busy.
///
/// # Ready: a packet is waiting for the next tick to write it to the serial port.
///
/// Only a successful `Empty -> Filling` compare-exchange gives access to the buffer, so a
/// rejected producer can never touch the packet already queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Filling,
    Ready,
}

pub struct PendingTxSlot {
    state: AtomicCell<SlotState>,
    packet: Mutex<Vec<u8>>,
    capacity: usize,
}

impl PendingTxSlot {
    pub fn new(capacity: usize) -> Self {
        PendingTxSlot {
            state: AtomicCell::new(SlotState::Empty),
            packet: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn state(&self) -> SlotState {
        self.state.load()
    }

    pub fn is_occupied(&self) -> bool {
        self.state() != SlotState::Empty
    }

    /// Queues a copy of `packet`. Fails with `TxBusy` if a packet is already queued and
    /// with `BufferOverrun` if it is larger than the slot. Never waits.
    pub fn offer(&self, packet: &[u8]) -> Result<()> {
        if packet.len() > self.capacity {
            return Err(BridgeError::BufferOverrun {
                len: packet.len(),
                capacity: self.capacity,
            });
        }
        if self
            .state
            .compare_exchange(SlotState::Empty, SlotState::Filling)
            .is_err()
        {
            return Err(BridgeError::TxBusy);
        }

        {
            let mut slot = lock(&self.packet);
            slot.clear();
            slot.extend_from_slice(packet);
        }
        self.state.store(SlotState::Ready);
        Ok(())
    }

    /// The queued packet, leaving it in place.
    pub fn peek(&self) -> Option<Vec<u8>> {
        if self.state() != SlotState::Ready {
            return None;
        }
        Some(lock(&self.packet).clone())
    }

    /// Removes the queued packet and frees the slot.
    pub fn take(&self) -> Option<Vec<u8>> {
        if self.state() != SlotState::Ready {
            return None;
        }
        let packet = std::mem::replace(&mut *lock(&self.packet), Vec::with_capacity(self.capacity));
        self.state.store(SlotState::Empty);
        Some(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn second_offer_is_rejected() {
        let slot = PendingTxSlot::new(16);
        slot.offer(&[1, 2, 3]).unwrap();
        assert!(slot.is_occupied());

        match slot.offer(&[9, 9]) {
            Err(BridgeError::TxBusy) => {}
            other => panic!("expected TxBusy, got {:?}", other),
        }
        assert_eq!(slot.peek(), Some(vec![1, 2, 3]));

        assert_eq!(slot.take(), Some(vec![1, 2, 3]));
        assert_eq!(slot.state(), SlotState::Empty);
        assert_eq!(slot.take(), None);
        slot.offer(&[9, 9]).unwrap();
        assert_eq!(slot.take(), Some(vec![9, 9]));
    }

    #[test]
    fn oversized_packet_is_rejected() {
        let slot = PendingTxSlot::new(4);
        match slot.offer(&[0; 5]) {
            Err(BridgeError::BufferOverrun { len, capacity }) => {
                assert_eq!((len, capacity), (5, 4));
            }
            other => panic!("expected BufferOverrun, got {:?}", other),
        }
        assert!(!slot.is_occupied());
    }

    #[test]
    fn exactly_one_concurrent_producer_wins() {
        let slot = Arc::new(PendingTxSlot::new(16));
        let handles: Vec<_> = (0..8u8)
            .map(|n| {
                let slot = Arc::clone(&slot);
                thread::spawn(move || slot.offer(&[n; 4]).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|&won| won)
            .count();

        assert_eq!(winners, 1);
        let packet = slot.take().unwrap();
        assert_eq!(packet.len(), 4);
        assert!(packet.iter().all(|&b| b == packet[0]));
    }
}
