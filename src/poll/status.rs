// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instance status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-visible status of a polling instance.
///
/// The numeric codes follow the host's convention: `1xx` for regular
/// states, `2xx` for errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// The instance is being set up.
    #[default]
    Creating,
    /// The last cycle completed.
    Active,
    /// Polling is stopped.
    Inactive,
    /// The configuration is invalid; nothing is read.
    ConfigInvalid,
    /// The device could not be reached during the last cycle.
    Unreachable,
}

impl InstanceStatus {
    /// Returns the host's numeric status code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Creating => 101,
            Self::Active => 102,
            Self::Inactive => 104,
            Self::ConfigInvalid => 201,
            Self::Unreachable => 202,
        }
    }

    /// Returns the status for a numeric code.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            101 => Some(Self::Creating),
            102 => Some(Self::Active),
            104 => Some(Self::Inactive),
            201 => Some(Self::ConfigInvalid),
            202 => Some(Self::Unreachable),
            _ => None,
        }
    }

    /// Returns `true` for error states.
    #[must_use]
    pub fn is_error(self) -> bool {
        self.code() >= 200
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Creating => "creating",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::ConfigInvalid => "configuration invalid",
            Self::Unreachable => "unreachable",
        };
        write!(f, "{label} ({})", self.code())
    }
}
