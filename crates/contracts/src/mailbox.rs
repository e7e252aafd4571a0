//! LatestSlot - single-slot producer/consumer handoff
//!
//! Newest wins: publishing replaces whatever the slot holds, nothing is queued.
//! Each publish gets a sequence number so the consumer can tell a fresh value
//! from one it has already consumed.

use parking_lot::Mutex;

#[derive(Debug)]
struct SlotState<T> {
    value: Option<T>,
    seq: u64,
    consumed_seq: u64,
}

/// Single-slot mailbox shared between one producer and one consumer
#[derive(Debug)]
pub struct LatestSlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                seq: 0,
                consumed_seq: 0,
            }),
        }
    }

    /// Publish a value, replacing the previous one.
    ///
    /// Returns `true` when the replaced value had not been consumed yet.
    pub fn publish(&self, value: T) -> bool {
        let mut state = self.state.lock();
        let superseded = state.value.is_some() && state.consumed_seq < state.seq;
        state.value = Some(value);
        state.seq += 1;
        superseded
    }

    /// Sequence number of the latest publish (0 = never published)
    pub fn seq(&self) -> u64 {
        self.state.lock().seq
    }

    /// Drop the held value
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.value = None;
        state.consumed_seq = state.seq;
    }
}

impl<T: Clone> LatestSlot<T> {
    /// Copy of the latest value without marking it consumed
    pub fn snapshot(&self) -> Option<T> {
        self.state.lock().value.clone()
    }

    /// Copy of the latest value if it has not been consumed yet, marking it consumed
    pub fn take_fresh(&self) -> Option<(u64, T)> {
        let mut state = self.state.lock();
        if state.consumed_seq >= state.seq {
            return None;
        }
        let value = state.value.clone()?;
        state.consumed_seq = state.seq;
        Some((state.seq, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot() {
        let slot: LatestSlot<u32> = LatestSlot::new();
        assert_eq!(slot.snapshot(), None);
        assert_eq!(slot.take_fresh(), None);
        assert_eq!(slot.seq(), 0);
    }

    #[test]
    fn test_newest_wins() {
        let slot = LatestSlot::new();
        assert!(!slot.publish(1));
        assert!(slot.publish(2));
        assert!(slot.publish(3));

        assert_eq!(slot.take_fresh(), Some((3, 3)));
        // Not replayed
        assert_eq!(slot.take_fresh(), None);
        // Still visible for snapshots
        assert_eq!(slot.snapshot(), Some(3));
    }

    #[test]
    fn test_publish_after_consume_is_not_superseded() {
        let slot = LatestSlot::new();
        slot.publish("a");
        let _ = slot.take_fresh();
        assert!(!slot.publish("b"));
        assert_eq!(slot.take_fresh(), Some((2, "b")));
    }

    #[test]
    fn test_clear() {
        let slot = LatestSlot::new();
        slot.publish(7);
        slot.clear();
        assert_eq!(slot.snapshot(), None);
        assert_eq!(slot.take_fresh(), None);
    }

    #[test]
    fn test_concurrent_publish() {
        use std::sync::Arc;

        let slot = Arc::new(LatestSlot::new());
        let producer = {
            let slot = Arc::clone(&slot);
            std::thread::spawn(move || {
                for i in 0..1000u32 {
                    slot.publish(i);
                }
            })
        };
        producer.join().unwrap();
        assert_eq!(slot.take_fresh(), Some((1000, 999)));
    }
}
