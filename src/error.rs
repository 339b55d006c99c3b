// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `polltree` library.
//!
//! The hierarchy mirrors how failures are contained during a polling cycle:
//! transport failures abort the cycle, decode failures are isolated to a
//! single address, store failures surface from the object tree collaborator,
//! and configuration failures are reported before any read happens.

use thiserror::Error;

use crate::tree::NodeHandle;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Communication with the data source failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A raw register value could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The object store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The instance configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while reading from an external data source.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A read did not complete in time.
    #[error("read timed out after {0} ms")]
    Timeout(u64),

    /// The device answered with an exception for this request.
    #[error("device exception {code} for address {address}")]
    Exception {
        /// The register address that was requested.
        address: u16,
        /// The exception code returned by the device.
        code: u8,
    },

    /// The device answered with a payload that could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The source answered with an unexpected HTTP status.
    #[error("unexpected status code {0}")]
    Status(u16),
}

impl TransportError {
    /// Returns `true` if the error means the device itself is unreachable.
    ///
    /// Fatal errors abort the whole cycle. Every other error only concerns
    /// the data point being read, which is then marked unsupported.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Self::Http(_) => true,
            Self::ConnectionFailed(_) | Self::Status(_) => true,
            Self::Timeout(_) | Self::Exception { .. } | Self::Malformed(_) => false,
        }
    }
}

/// Errors raised while decoding a raw word sequence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer words were returned than the format needs.
    #[error("insufficient words: expected {expected} got {got}")]
    InsufficientWords {
        /// Number of words the format needs.
        expected: usize,
        /// Number of words actually returned.
        got: usize,
    },

    /// The word count cannot be reinterpreted as an integer.
    #[error("cannot interpret {0} words as an integer")]
    UnsupportedWidth(usize),

    /// The reading does not fit into a signed 64-bit integer.
    #[error("value {0} is out of range")]
    OutOfRange(u64),
}

/// Errors raised by the object store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No node exists for the handle.
    #[error("node {0} does not exist")]
    NotFound(NodeHandle),

    /// The node exists but is of another kind.
    #[error("node {handle} is not a {expected}")]
    WrongKind {
        /// The offending node.
        handle: NodeHandle,
        /// The kind the operation expected.
        expected: &'static str,
    },

    /// An object with the same key already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// A persisted property could not be read back.
    #[error("invalid property {key}: {source}")]
    InvalidProperty {
        /// The property key.
        key: String,
        /// The underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors related to instance configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The polling interval must be non-zero.
    #[error("polling interval must be greater than zero")]
    ZeroInterval,

    /// The read timeout must be non-zero.
    #[error("read timeout must be greater than zero")]
    ZeroTimeout,

    /// The identifier namespace is empty or contains unsafe characters.
    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// Two registers of one schema share a semantic name.
    #[error("duplicate register name: {0}")]
    DuplicateName(String),

    /// A register schema could not be parsed.
    #[error("invalid register schema: {0}")]
    InvalidSchema(String),

    /// An HTTP source setting is invalid.
    #[error("invalid source setting: {0}")]
    InvalidSource(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display() {
        let err = DecodeError::InsufficientWords {
            expected: 2,
            got: 1,
        };
        assert_eq!(err.to_string(), "insufficient words: expected 2 got 1");
    }

    #[test]
    fn error_from_transport_error() {
        let err: Error = TransportError::Timeout(5000).into();
        assert!(matches!(err, Error::Transport(TransportError::Timeout(5000))));
    }

    #[test]
    fn fatal_classification() {
        assert!(TransportError::ConnectionFailed("refused".into()).is_fatal());
        assert!(TransportError::Status(503).is_fatal());
        assert!(!TransportError::Timeout(100).is_fatal());
        assert!(
            !TransportError::Exception {
                address: 30_775,
                code: 2
            }
            .is_fatal()
        );
        assert!(!TransportError::Malformed("short frame".into()).is_fatal());
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::WrongKind {
            handle: NodeHandle::new(12),
            expected: "container",
        };
        assert_eq!(err.to_string(), "node #12 is not a container");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidNamespace("a b".to_string());
        assert_eq!(err.to_string(), "invalid namespace: \"a b\"");
    }
}
