// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for cluster operations, reconciliation and the sensor stream.
//!
//! This module provides specialized error types for:
//! - Kubernetes API failures on the objects this controller manages
//! - Reconciliation outcomes that withhold a resolved label
//! - Tetragon event stream connection and termination
//!
//! Every error exposes a short reason code (`status_reason`) that is used as a
//! metrics label and in structured log fields.

use crate::constants::{HTTP_CONFLICT, HTTP_NOT_FOUND};
use thiserror::Error;

/// Errors returned by a [`crate::cluster::ClusterApi`] implementation.
///
/// The two expected, handled conditions (`NotFound` on patch and
/// `AlreadyExists` on create) get their own variants so reconcilers can take
/// the create/patch fallback without inspecting HTTP codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The object does not exist (HTTP 404)
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Kind of the object (e.g., `Service`)
        kind: &'static str,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// The object already exists (HTTP 409 on create)
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        /// Kind of the object
        kind: &'static str,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// Any other API or transport failure
    ///
    /// Transient by nature; the controller logs it and abandons the step
    /// until the next trigger.
    #[error("Failed to {operation} {kind} {namespace}/{name}: {reason}")]
    Api {
        /// Verb that failed (`create`, `patch`, `list`)
        operation: &'static str,
        /// Kind of the object
        kind: &'static str,
        /// Namespace of the object (`*` for cluster-wide lists)
        namespace: String,
        /// Name of the object (or the label selector for lists)
        name: String,
        /// Underlying error message
        reason: String,
    },

    /// A patch body could not be serialized
    #[error("Failed to serialize {kind} patch: {reason}")]
    Serialization {
        /// Kind of the object the patch targets
        kind: &'static str,
        /// Serializer error message
        reason: String,
    },
}

impl ClusterError {
    /// Map a `kube::Error` onto the controller's error taxonomy.
    ///
    /// HTTP 404 becomes [`ClusterError::NotFound`], HTTP 409 becomes
    /// [`ClusterError::AlreadyExists`], everything else is [`ClusterError::Api`].
    #[must_use]
    pub fn from_kube(
        err: kube::Error,
        operation: &'static str,
        kind: &'static str,
        namespace: &str,
        name: &str,
    ) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == HTTP_NOT_FOUND => Self::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ae) if ae.code == HTTP_CONFLICT && operation == "create" => {
                Self::AlreadyExists {
                    kind,
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }
            }
            other => Self::Api {
                operation,
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Returns true if the object targeted by the operation does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if a create raced with an existing object of the same name.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the reason code for this error.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::AlreadyExists { .. } => "AlreadyExists",
            Self::Api { .. } => "ApiError",
            Self::Serialization { .. } => "SerializationError",
        }
    }
}

/// Errors that end a reconciliation step without converging it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// More than one candidate Service (or a single non-canonical one) still
    /// claims the user's hostname after cleanup
    ///
    /// No object is created or patched and downstream reconcilers are skipped.
    #[error("Ambiguous north-south ownership for '{key}': {references:?}")]
    AmbiguousOwnership {
        /// DNS label key (`<prefix><user>`)
        key: String,
        /// References that survived cleanup
        references: Vec<String>,
    },

    /// A reference string is not of the form `namespace/name`
    #[error("Malformed service reference '{reference}'")]
    MalformedReference {
        /// The offending reference
        reference: String,
    },

    /// The `EndpointSlice` reconciler was invoked without a resolved label
    #[error("No resolved service label for user '{user}'")]
    MissingLabel {
        /// User the slice was requested for
        user: String,
    },

    /// A cluster call failed
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

impl ReconcileError {
    /// Returns the reason code for this error.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::AmbiguousOwnership { .. } => "AmbiguousOwnership",
            Self::MalformedReference { .. } => "MalformedReference",
            Self::MissingLabel { .. } => "MissingLabel",
            Self::Cluster(err) => err.status_reason(),
        }
    }
}

/// Errors from the Tetragon event stream.
///
/// All of them are fatal: there is no in-process reconnect, the controller
/// exits and relies on its pod restart policy.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The unix socket could not be dialed
    #[error("Failed to connect to Tetragon at {socket}: {reason}")]
    Connect {
        /// Socket path
        socket: String,
        /// Underlying transport error
        reason: String,
    },

    /// The `GetEvents` call was rejected or the stream failed mid-flight
    #[error("Tetragon event stream failed: {0}")]
    Status(#[from] tonic::Status),

    /// The server closed the stream
    #[error("Tetragon event stream closed")]
    Closed,
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
