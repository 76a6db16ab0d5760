// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback and defaults to the values in
//! [`crate::constants`], so the controller runs unconfigured inside the
//! gateway cluster.

use crate::constants::{
    DYNAMIC_SERVICE_PREFIX, MANAGED_DNS_SUFFIX, METRICS_SERVER_ADDRESS, POD_WATCH_LABEL_SELECTOR,
    POD_WATCH_NAMESPACE, PROVISIONING_SCRIPT, TETRAGON_SOCKET_PATH, TRIGGER_BINARY,
    TRIGGER_POD_PREFIX,
};
use crate::events::ScriptSignature;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Tetragon-driven SSH exposure controller.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct ControllerArgs {
    /// Tetragon agent unix socket
    #[arg(long, env = "TETRAGON_SOCKET", default_value = TETRAGON_SOCKET_PATH)]
    pub tetragon_socket: PathBuf,

    /// Prefix of the per-user load-balancer Service name
    #[arg(long, env = "SERVICE_PREFIX", default_value = DYNAMIC_SERVICE_PREFIX)]
    pub service_prefix: String,

    /// DNS suffix of managed external-DNS hostnames
    #[arg(long, env = "DNS_SUFFIX", default_value = MANAGED_DNS_SUFFIX)]
    pub dns_suffix: String,

    /// Namespace watched for gateway pods
    #[arg(long, env = "POD_NAMESPACE", default_value = POD_WATCH_NAMESPACE)]
    pub pod_namespace: String,

    /// Label selector for gateway pods
    #[arg(long, env = "POD_LABEL_SELECTOR", default_value = POD_WATCH_LABEL_SELECTOR)]
    pub pod_label_selector: String,

    /// Provisioning script whose execution triggers reconciliation
    #[arg(long, env = "TRIGGER_SCRIPT", default_value = PROVISIONING_SCRIPT)]
    pub trigger_script: String,

    /// Binary reported by the sensor when the script runs
    #[arg(long, env = "TRIGGER_BINARY", default_value = TRIGGER_BINARY)]
    pub trigger_binary: String,

    /// Name prefix of the pods the script runs in
    #[arg(long, env = "TRIGGER_POD_PREFIX", default_value = TRIGGER_POD_PREFIX)]
    pub trigger_pod_prefix: String,

    /// Metrics and health listener
    #[arg(long, env = "METRICS_ADDRESS", default_value = METRICS_SERVER_ADDRESS)]
    pub metrics_address: SocketAddr,

    /// Log every matched process as JSON
    #[arg(long, env = "DUMP_EVENTS")]
    pub dump_events: bool,
}

impl ControllerArgs {
    /// Naming scheme handed to the reconcilers.
    #[must_use]
    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            service_prefix: self.service_prefix.clone(),
            dns_suffix: self.dns_suffix.clone(),
        }
    }

    /// Process signature that triggers reconciliation.
    #[must_use]
    pub fn signature(&self) -> ScriptSignature {
        ScriptSignature {
            binary: self.trigger_binary.clone(),
            pod_prefix: self.trigger_pod_prefix.clone(),
            script: self.trigger_script.clone(),
        }
    }
}

/// Naming scheme for the north-south objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Prefix of the Service name and DNS label (`<prefix><user>`)
    pub service_prefix: String,
    /// Suffix appended to the DNS label to form the published hostname
    pub dns_suffix: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            service_prefix: DYNAMIC_SERVICE_PREFIX.to_string(),
            dns_suffix: MANAGED_DNS_SUFFIX.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
