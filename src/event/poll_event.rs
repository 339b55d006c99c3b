// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::poll::InstanceStatus;
use crate::tree::NodeHandle;

/// Events emitted by a poller.
///
/// Every event carries the handle of the instance container it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PollEvent {
    /// The instance status changed.
    StatusChanged {
        /// The instance container.
        instance: NodeHandle,
        /// The new status.
        status: InstanceStatus,
        /// The error that caused the change, if any.
        error: Option<String>,
    },

    /// A polling cycle was reconciled onto the tree.
    CycleCompleted {
        /// The instance container.
        instance: NodeHandle,
        /// Number of values written.
        values: usize,
        /// Number of nodes created.
        created: usize,
        /// When the cycle finished.
        finished_at: DateTime<Utc>,
    },

    /// Addresses failed and will be skipped from the next cycle on.
    AddressesMarkedUnsupported {
        /// The instance container.
        instance: NodeHandle,
        /// The newly skipped addresses.
        addresses: Vec<u16>,
    },
}

impl PollEvent {
    /// Creates a status change without error.
    #[must_use]
    pub fn status_changed(instance: NodeHandle, status: InstanceStatus) -> Self {
        Self::StatusChanged {
            instance,
            status,
            error: None,
        }
    }

    /// Returns the instance the event concerns.
    #[must_use]
    pub fn instance(&self) -> NodeHandle {
        match self {
            Self::StatusChanged { instance, .. }
            | Self::CycleCompleted { instance, .. }
            | Self::AddressesMarkedUnsupported { instance, .. } => *instance,
        }
    }

    /// Returns `true` if this is a status change.
    #[must_use]
    pub fn is_status_change(&self) -> bool {
        matches!(self, Self::StatusChanged { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_of_every_variant() {
        let instance = NodeHandle::new(3);
        let events = [
            PollEvent::status_changed(instance, InstanceStatus::Active),
            PollEvent::CycleCompleted {
                instance,
                values: 2,
                created: 0,
                finished_at: Utc::now(),
            },
            PollEvent::AddressesMarkedUnsupported {
                instance,
                addresses: vec![30_775],
            },
        ];
        for event in &events {
            assert_eq!(event.instance(), instance);
        }
        assert!(events[0].is_status_change());
        assert!(!events[1].is_status_change());
    }

    #[test]
    fn serializes_tagged() {
        let event = PollEvent::AddressesMarkedUnsupported {
            instance: NodeHandle::new(3),
            addresses: vec![1, 2],
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"addresses_marked_unsupported","instance":3,"addresses":[1,2]}"#
        );
    }
}
