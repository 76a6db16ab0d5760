// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pod address index: `(namespace, pod) → IP`.
//!
//! Written only by the pod watch, read by the dispatch loop. A pod that has
//! not been assigned an IP yet is not recorded, so `lookup` reports it as
//! absent and the triggering event is skipped.

use crate::metrics;
use crate::watch::WatchHandler;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Concurrent map from `(namespace, pod name)` to the pod's IP.
#[derive(Debug, Default)]
pub struct PodIpIndex {
    ips: RwLock<HashMap<(String, String), String>>,
}

impl PodIpIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current IP of a pod.
    pub fn insert(&self, namespace: &str, pod: &str, ip: &str) {
        let len = {
            let mut ips = self.ips.write();
            ips.insert((namespace.to_string(), pod.to_string()), ip.to_string());
            ips.len()
        };
        metrics::set_index_size("pod", len);
    }

    /// Forget a pod.
    pub fn remove(&self, namespace: &str, pod: &str) {
        let len = {
            let mut ips = self.ips.write();
            ips.remove(&(namespace.to_string(), pod.to_string()));
            ips.len()
        };
        metrics::set_index_size("pod", len);
    }

    /// Look up the last observed IP of a pod.
    #[must_use]
    pub fn lookup(&self, namespace: &str, pod: &str) -> Option<String> {
        self.ips
            .read()
            .get(&(namespace.to_string(), pod.to_string()))
            .cloned()
    }

    /// Number of pods with a known IP.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ips.read().len()
    }

    /// Returns true if no pod IP is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ips.read().is_empty()
    }

    fn observe(&self, pod: &Pod) {
        let namespace = pod.namespace().unwrap_or_default();
        let name = pod.name_any();

        match pod_ip(pod) {
            Some(ip) => {
                debug!(namespace = %namespace, pod = %name, ip = %ip, "Pod IP observed");
                self.insert(&namespace, &name, ip);
            }
            None => {
                debug!(namespace = %namespace, pod = %name, "Pod has no IP yet");
                self.remove(&namespace, &name);
            }
        }
    }
}

fn pod_ip(pod: &Pod) -> Option<&str> {
    pod.status
        .as_ref()
        .and_then(|status| status.pod_ip.as_deref())
        .filter(|ip| !ip.is_empty())
}

impl WatchHandler<Pod> for PodIpIndex {
    fn on_add(&self, obj: &Pod) {
        self.observe(obj);
    }

    fn on_update(&self, _old: &Pod, new: &Pod) {
        self.observe(new);
    }

    fn on_delete(&self, obj: &Pod) {
        self.remove(&obj.namespace().unwrap_or_default(), &obj.name_any());
    }
}

#[cfg(test)]
#[path = "pod_index_tests.rs"]
mod pod_index_tests;
