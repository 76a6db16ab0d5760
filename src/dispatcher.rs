// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Sequential dispatch of sensor events into the reconcilers.
//!
//! The loop consumes one event at a time. A matching event resolves the pod IP
//! and the user, then runs north-south, `EndpointSlice` and east-west
//! reconciliation in that order. The last two only run once north-south has
//! resolved a label. Reconciler errors are logged and counted; only the end of
//! the event stream stops the loop.

use crate::context::Context;
use crate::errors::{ReconcileError, StreamError};
use crate::events::{ExecEvent, ScriptSignature};
use crate::metrics;
use crate::reconcilers::{reconcile_east_west, reconcile_endpoint_slice, reconcile_north_south};
use crate::tetragon::GetEventsResponse;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const COMPONENT_NORTH_SOUTH: &str = "north_south";
const COMPONENT_ENDPOINT_SLICE: &str = "endpoint_slice";
const COMPONENT_EAST_WEST: &str = "east_west";

/// What happened to a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a process exec inside a pod
    Ignored,
    /// Exec that is not the provisioning script
    SignatureMismatch,
    /// The pod has no known IP yet
    NoPodIp,
    /// The working directory is not under a home directory
    NoUser,
    /// North-south resolved no label, downstream reconcilers were skipped
    Withheld {
        /// User derived from the working directory
        user: String,
    },
    /// All reconcilers ran for `user`
    Reconciled {
        /// User derived from the working directory
        user: String,
        /// Label bound to the `EndpointSlice`
        label: String,
    },
}

impl Outcome {
    fn metric_label(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::SignatureMismatch => "signature_mismatch",
            Self::NoPodIp => "no_pod_ip",
            Self::NoUser => "no_user",
            Self::Withheld { .. } => "withheld",
            Self::Reconciled { .. } => "matched",
        }
    }
}

/// Drives reconciliation from decoded sensor events.
pub struct Dispatcher {
    ctx: Arc<Context>,
    signature: ScriptSignature,
    dump_events: bool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(ctx: Arc<Context>, signature: ScriptSignature, dump_events: bool) -> Self {
        Self {
            ctx,
            signature,
            dump_events,
        }
    }

    /// Consume `events` until the stream ends or fails.
    ///
    /// # Errors
    ///
    /// Always returns an error: the stream's own error, or
    /// [`StreamError::Closed`] when the stream ends.
    pub async fn run<S>(&self, events: S) -> Result<(), StreamError>
    where
        S: Stream<Item = Result<GetEventsResponse, StreamError>>,
    {
        let mut events = std::pin::pin!(events);
        info!("Dispatching Tetragon events");

        while let Some(item) = events.next().await {
            let outcome = match ExecEvent::from_response(item?) {
                Some(event) => self.handle(&event).await,
                None => Outcome::Ignored,
            };
            metrics::record_trigger(outcome.metric_label());
        }

        Err(StreamError::Closed)
    }

    /// Process one decoded event.
    pub async fn handle(&self, event: &ExecEvent) -> Outcome {
        if !self.signature.matches(event) {
            debug!(binary = %event.binary, pod = %event.pod_name, "Exec does not match signature");
            return Outcome::SignatureMismatch;
        }

        if self.dump_events {
            match serde_json::to_string(event) {
                Ok(json) => info!(event = %json, "Matched process"),
                Err(e) => warn!(error = %e, "Failed to serialize event"),
            }
        }

        let namespace = event.pod_namespace.as_str();
        let Some(pod_ip) = self.ctx.pods.lookup(namespace, &event.pod_name) else {
            warn!(namespace = %namespace, pod = %event.pod_name, "No IP known for pod, skipping");
            return Outcome::NoPodIp;
        };
        let Some(user) = event.user() else {
            warn!(cwd = %event.cwd, "Cannot derive user from working directory, skipping");
            return Outcome::NoUser;
        };

        info!(user = %user, namespace = %namespace, pod = %event.pod_name, ip = %pod_ip, "Provisioning trigger");

        let start = Instant::now();
        let Some(label) = observe(
            COMPONENT_NORTH_SOUTH,
            start,
            reconcile_north_south(&self.ctx, user).await,
        ) else {
            warn!(user = %user, "No north-south label resolved, skipping downstream reconcilers");
            return Outcome::Withheld {
                user: user.to_string(),
            };
        };

        let start = Instant::now();
        observe(
            COMPONENT_ENDPOINT_SLICE,
            start,
            reconcile_endpoint_slice(&self.ctx, &label, user, &pod_ip).await,
        );

        let start = Instant::now();
        observe(
            COMPONENT_EAST_WEST,
            start,
            reconcile_east_west(&self.ctx, namespace, user, &pod_ip).await,
        );

        Outcome::Reconciled {
            user: user.to_string(),
            label,
        }
    }
}

fn observe<T>(component: &str, start: Instant, result: Result<T, ReconcileError>) -> Option<T> {
    match result {
        Ok(value) => {
            metrics::record_reconciliation_success(component, start.elapsed());
            Some(value)
        }
        Err(e) => {
            error!(component = component, reason = e.status_reason(), error = %e, "Reconciliation failed");
            metrics::record_reconciliation_error(component, e.status_reason(), start.elapsed());
            None
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod dispatcher_tests;
