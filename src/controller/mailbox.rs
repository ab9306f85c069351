use parking_lot::Mutex;
use tracing::{trace, warn};

use super::events::ControllerEvents;
use crate::hardware::MAX_DEVICES;

/// Latest unconsumed record per device slot
///
/// The worker publishes, the consumer drains. A record that is overwritten
/// before it is drained is gone; only the newest state per remote matters.
#[derive(Debug, Default)]
pub struct EventMailbox {
    slots: Mutex<[Option<ControllerEvents>; MAX_DEVICES]>,
}

impl EventMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, events: ControllerEvents) {
        let Some(index) = events.id.checked_sub(1).filter(|i| *i < MAX_DEVICES) else {
            warn!("Dropping record for unknown device id {}", events.id);
            return;
        };

        let mut slots = self.slots.lock();
        if slots[index].is_some() {
            trace!("Replacing undrained record for device {}", events.id);
        }
        slots[index] = Some(events);
    }

    /// Hands every pending record to `callback`, in slot order.
    ///
    /// The lock is released before each call, so the callback may block or
    /// publish without stalling the worker.
    pub fn drain<F>(&self, mut callback: F) -> usize
    where
        F: FnMut(&ControllerEvents),
    {
        let mut delivered = 0;
        for index in 0..MAX_DEVICES {
            let pending = self.slots.lock()[index].take();
            if let Some(events) = pending {
                callback(&events);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn pending(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::events::{MoteButton, Orientation, Transition};
    use std::sync::Arc;

    fn record(id: usize, roll: f32) -> ControllerEvents {
        let mut events = ControllerEvents::new(id);
        events.mote_orientation = Some(Orientation {
            roll,
            ..Default::default()
        });
        events
    }

    #[test]
    fn latest_record_wins() {
        let mailbox = EventMailbox::new();
        mailbox.publish(record(1, 1.0));
        mailbox.publish(record(1, 2.0));

        let mut seen = Vec::new();
        assert_eq!(mailbox.drain(|e| seen.push(e.clone())), 1);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].mote_orientation.unwrap().roll, 2.0);
        assert_eq!(mailbox.pending(), 0);
    }

    #[test]
    fn slots_are_isolated_and_drained_in_order() {
        let mailbox = EventMailbox::new();
        mailbox.publish(record(3, 3.0));
        mailbox.publish(record(1, 1.0));
        let mut pressed = ControllerEvents::new(2);
        pressed.buttons[MoteButton::A.index()] = Transition::Pressed;
        mailbox.publish(pressed);

        let mut ids = Vec::new();
        mailbox.drain(|e| ids.push(e.id));
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn empty_drain_does_not_call_back() {
        let mailbox = EventMailbox::new();
        let mut calls = 0;
        assert_eq!(mailbox.drain(|_| calls += 1), 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn out_of_range_ids_are_dropped() {
        let mailbox = EventMailbox::new();
        mailbox.publish(record(0, 1.0));
        mailbox.publish(record(5, 1.0));
        assert_eq!(mailbox.pending(), 0);
    }

    #[test]
    fn callback_may_publish_during_drain() {
        let mailbox = EventMailbox::new();
        mailbox.publish(record(1, 1.0));
        mailbox.drain(|e| mailbox.publish(record(e.id, 9.0)));
        assert_eq!(mailbox.pending(), 1);
    }

    #[test]
    fn publishes_from_another_thread_are_seen() {
        let mailbox = Arc::new(EventMailbox::new());
        let worker = {
            let mailbox = mailbox.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    mailbox.publish(record(4, i as f32));
                }
            })
        };
        worker.join().unwrap();

        let mut last = None;
        mailbox.drain(|e| last = e.mote_orientation.map(|o| o.roll));
        assert_eq!(last, Some(99.0));
    }
}
