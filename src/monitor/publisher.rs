// Latest-only delivery of frames to subscribers
use crate::error::FatalLoopError;
use crate::models::Frame;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::debug;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// One completed tick
    Frame(Arc<Frame>),
    /// The sampler stopped on an unrecoverable error; sent once
    Failed(FatalLoopError),
}

struct Slot {
    tx: Sender<MonitorEvent>,
    /// Publisher-side handle used to discard an undelivered event
    drain: Receiver<MonitorEvent>,
    alive: Weak<()>,
}

impl Slot {
    /// Returns false once the subscriber is gone
    fn offer(&self, event: MonitorEvent) -> bool {
        if self.alive.upgrade().is_none() {
            return false;
        }
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                // Slow consumer: replace the stale event with the newest one
                if self.drain.try_recv().is_ok() {
                    debug!("Subscriber lagging, dropped an undelivered frame");
                }
                !matches!(self.tx.try_send(event), Err(TrySendError::Disconnected(_)))
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Fan-out that never blocks the producer. Each subscriber holds at most one
/// pending event; newer events overwrite older undelivered ones.
#[derive(Default)]
pub struct FramePublisher {
    slots: Mutex<Vec<Slot>>,
}

impl FramePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> FrameSubscription {
        let (tx, rx) = bounded(1);
        let alive = Arc::new(());
        self.slots.lock().push(Slot {
            tx,
            drain: rx.clone(),
            alive: Arc::downgrade(&alive),
        });
        FrameSubscription { rx, _alive: alive }
    }

    pub fn publish(&self, event: MonitorEvent) {
        let mut slots = self.slots.lock();
        slots.retain(|slot| slot.offer(event.clone()));
    }

    pub fn subscriber_count(&self) -> usize {
        let mut slots = self.slots.lock();
        slots.retain(|slot| slot.alive.upgrade().is_some());
        slots.len()
    }
}

/// Receiving end handed to a consumer. Dropping it unsubscribes.
pub struct FrameSubscription {
    rx: Receiver<MonitorEvent>,
    _alive: Arc<()>,
}

impl FrameSubscription {
    /// Blocks until the next event; `None` once the monitor is gone
    pub fn recv(&self) -> Option<MonitorEvent> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<MonitorEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<MonitorEvent> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn frame(marker: &str) -> MonitorEvent {
        MonitorEvent::Frame(Arc::new(Frame {
            timestamp: Local::now(),
            samples: vec![crate::models::TargetSample {
                target: marker.to_string(),
                sample: Default::default(),
            }],
        }))
    }

    fn marker(event: MonitorEvent) -> String {
        match event {
            MonitorEvent::Frame(frame) => frame.samples[0].target.clone(),
            MonitorEvent::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn test_slow_subscriber_only_sees_latest() {
        let publisher = FramePublisher::new();
        let subscription = publisher.subscribe();
        for name in ["one", "two", "three"] {
            publisher.publish(frame(name));
        }
        assert_eq!(marker(subscription.try_recv().unwrap()), "three");
        assert!(subscription.try_recv().is_none());
    }

    #[test]
    fn test_every_subscriber_receives() {
        let publisher = FramePublisher::new();
        let first = publisher.subscribe();
        let second = publisher.subscribe();
        publisher.publish(frame("tick"));
        assert_eq!(marker(first.recv_timeout(Duration::from_secs(1)).unwrap()), "tick");
        assert_eq!(marker(second.recv_timeout(Duration::from_secs(1)).unwrap()), "tick");
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let publisher = FramePublisher::new();
        let kept = publisher.subscribe();
        drop(publisher.subscribe());
        publisher.publish(frame("tick"));
        assert_eq!(publisher.subscriber_count(), 1);
        assert!(kept.try_recv().is_some());
    }

    #[test]
    fn test_recv_ends_when_publisher_dropped() {
        let publisher = FramePublisher::new();
        let subscription = publisher.subscribe();
        drop(publisher);
        assert!(subscription.recv().is_none());
    }
}
