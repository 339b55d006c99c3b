// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-visible notifications from polling instances.
//!
//! Pollers publish [`PollEvent`]s on an [`EventBus`], a tokio broadcast
//! channel, so any number of subscribers can follow status changes and
//! cycle results. Several pollers may share one bus; [`InstanceEvents`]
//! narrows a subscription to one instance.
//!
//! # Examples
//!
//! ```
//! use polltree::event::{EventBus, PollEvent};
//! use polltree::poll::InstanceStatus;
//! use polltree::tree::NodeHandle;
//!
//! let bus = EventBus::new();
//! let _rx = bus.subscribe();
//!
//! bus.publish(PollEvent::status_changed(NodeHandle::new(7), InstanceStatus::Active));
//! ```

mod event_bus;
mod poll_event;

pub use event_bus::{EventBus, InstanceEvents};
pub use poll_event::PollEvent;
