// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Decoded process-exec events and the provisioning-script signature.
//!
//! The sensor is asked to filter server-side, but the same signature is
//! checked again on every received event so that a sensor ignoring the filter
//! cannot trigger reconciliation.

use crate::constants::{HOME_ROOT, PROVISIONING_SCRIPT, TRIGGER_BINARY, TRIGGER_POD_PREFIX};
use crate::tetragon::{get_events_response, EventType, Filter, GetEventsResponse};
use serde::Serialize;

/// A process execution observed inside a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecEvent {
    /// Node that reported the event
    pub node_name: String,
    /// Sensor-assigned execution id
    pub exec_id: String,
    /// Namespace of the pod the process ran in
    pub pod_namespace: String,
    /// Name of the pod the process ran in
    pub pod_name: String,
    /// Absolute path of the executed binary
    pub binary: String,
    /// Space-joined arguments
    pub arguments: String,
    /// Working directory at exec time
    pub cwd: String,
}

impl ExecEvent {
    /// Decode a streamed response.
    ///
    /// Returns `None` for non-exec events and for execs outside a pod.
    #[must_use]
    pub fn from_response(response: GetEventsResponse) -> Option<Self> {
        let get_events_response::Event::ProcessExec(exec) = response.event?;
        let process = exec.process?;
        let pod = process.pod?;

        Some(Self {
            node_name: response.node_name,
            exec_id: process.exec_id,
            pod_namespace: pod.namespace,
            pod_name: pod.name,
            binary: process.binary,
            arguments: process.arguments,
            cwd: process.cwd,
        })
    }

    /// User that ran the process, derived from the working directory.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        extract_user(&self.cwd)
    }
}

/// Extract `<user>` from a working directory of the form `/home/<user>/...`.
///
/// ```
/// use cmxsafe_controller::events::extract_user;
///
/// assert_eq!(extract_user("/home/alice/scripts"), Some("alice"));
/// assert_eq!(extract_user("/root"), None);
/// ```
#[must_use]
pub fn extract_user(cwd: &str) -> Option<&str> {
    let mut parts = cwd.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(""), Some(root), Some(user)) if root == HOME_ROOT && !user.is_empty() => Some(user),
        _ => None,
    }
}

/// Process signature of the provisioning script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSignature {
    /// Exact path of the reported binary
    pub binary: String,
    /// Prefix every triggering pod name starts with
    pub pod_prefix: String,
    /// Script name that must appear in the arguments or working directory
    pub script: String,
}

impl Default for ScriptSignature {
    fn default() -> Self {
        Self {
            binary: TRIGGER_BINARY.to_string(),
            pod_prefix: TRIGGER_POD_PREFIX.to_string(),
            script: PROVISIONING_SCRIPT.to_string(),
        }
    }
}

impl ScriptSignature {
    /// Returns true if `event` is an execution of the provisioning script.
    #[must_use]
    pub fn matches(&self, event: &ExecEvent) -> bool {
        event.binary == self.binary
            && event.pod_name.starts_with(&self.pod_prefix)
            && (event.arguments.contains(&self.script) || event.cwd.contains(&self.script))
    }

    /// Server-side allow-list filter equivalent to [`Self::matches`] on the
    /// binary, pod and arguments.
    #[must_use]
    pub fn filter(&self) -> Filter {
        Filter {
            event_set: vec![EventType::ProcessExec as i32],
            binary_regex: vec![format!("^{}$", regex::escape(&self.binary))],
            pod_regex: vec![format!("^{}.*", regex::escape(&self.pod_prefix))],
            arguments_regex: vec![format!(".*{}.*", regex::escape(&self.script))],
            namespace: vec![],
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
