// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast bus for poll events.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::PollEvent;
use crate::tree::NodeHandle;

/// Events buffered per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 256;

/// Broadcasts poll events of any number of instances.
///
/// Cloning the bus yields another handle to the same channel, so several
/// pollers can publish on one bus. A subscriber that falls more than 256
/// events behind loses the oldest ones and sees [`RecvError::Lagged`].
///
/// # Examples
///
/// ```
/// use polltree::event::{EventBus, PollEvent};
/// use polltree::tree::NodeHandle;
///
/// let bus = EventBus::new();
/// let mut inverter = bus.subscribe_instance(NodeHandle::new(4));
///
/// bus.publish(PollEvent::AddressesMarkedUnsupported {
///     instance: NodeHandle::new(4),
///     addresses: vec![30_775],
/// });
///
/// assert!(inverter.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PollEvent>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribes to the events of every instance, published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.sender.subscribe()
    }

    /// Subscribes to the events of `instance` only.
    #[must_use]
    pub fn subscribe_instance(&self, instance: NodeHandle) -> InstanceEvents {
        InstanceEvents {
            instance,
            receiver: self.sender.subscribe(),
        }
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event; without subscribers it is discarded.
    pub fn publish(&self, event: PollEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscriber for poll event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver yielding the events of one instance from a shared [`EventBus`].
#[derive(Debug)]
pub struct InstanceEvents {
    instance: NodeHandle,
    receiver: broadcast::Receiver<PollEvent>,
}

impl InstanceEvents {
    /// Returns the instance whose events are received.
    #[must_use]
    pub fn instance(&self) -> NodeHandle {
        self.instance
    }

    /// Waits for the next event of the instance.
    ///
    /// # Errors
    ///
    /// Returns [`RecvError::Closed`] once every publisher is gone and
    /// [`RecvError::Lagged`] if events were dropped.
    pub async fn recv(&mut self) -> Result<PollEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if event.instance() == self.instance {
                return Ok(event);
            }
        }
    }

    /// Returns the next buffered event of the instance without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] if no event of the instance is
    /// buffered, or the channel's closed and lagged errors.
    pub fn try_recv(&mut self) -> Result<PollEvent, TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if event.instance() == self.instance {
                return Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::InstanceStatus;

    fn active(raw: u32) -> PollEvent {
        PollEvent::status_changed(NodeHandle::new(raw), InstanceStatus::Active)
    }

    #[test]
    fn subscriber_count_follows_receivers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe_instance(NodeHandle::new(1));
        assert_eq!(bus.subscriber_count(), 2);

        drop(rx1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_event() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(active(9));

        assert_eq!(rx1.recv().await.unwrap().instance(), NodeHandle::new(9));
        assert_eq!(rx2.recv().await.unwrap().instance(), NodeHandle::new(9));
    }

    #[tokio::test]
    async fn instance_receiver_skips_other_instances() {
        let bus = EventBus::new();
        let publisher = bus.clone();
        let mut second = bus.subscribe_instance(NodeHandle::new(2));

        publisher.publish(active(1));
        publisher.publish(active(2));
        publisher.publish(active(3));

        assert_eq!(second.recv().await.unwrap().instance(), NodeHandle::new(2));
        assert_eq!(second.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn instance_receiver_closes_with_the_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_instance(NodeHandle::new(5));

        bus.publish(active(6));
        drop(bus);

        assert_eq!(rx.recv().await.unwrap_err(), RecvError::Closed);
    }
}
