// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the cmxsafe controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance. Values that operators
//! may want to change at deploy time are also exposed as CLI flags in [`crate::config`],
//! using these constants as defaults.

// ============================================================================
// Managed Object Naming
// ============================================================================

/// Namespace holding the north-south Services and the canonical `EndpointSlice`s
pub const DEFAULT_NAMESPACE: &str = "default";

/// Prefix of the per-user load-balancer Service name and DNS label
pub const DYNAMIC_SERVICE_PREFIX: &str = "dynamic-service-";

/// DNS suffix that marks an external-DNS hostname as managed by this controller
pub const MANAGED_DNS_SUFFIX: &str = ".myservices.local";

/// Suffix appended to the user name to form the canonical `EndpointSlice` name
pub const ENDPOINT_SLICE_SUFFIX: &str = "-slice";

/// Workload name used in the synthesized east-west DNS target
pub const GATEWAY_WORKLOAD: &str = "cmxsafe-gw";

/// Cluster-internal DNS domain appended to east-west targets
pub const CLUSTER_DOMAIN: &str = "svc.cluster.local";

// ============================================================================
// SSH Port Constants
// ============================================================================

/// Primary SSH port exposed for each user
pub const SSH_PRIMARY_PORT: i32 = 22;

/// Port name for the primary SSH port
pub const SSH_PRIMARY_PORT_NAME: &str = "ssh-primary";

/// Secondary SSH port exposed for each user
pub const SSH_SECONDARY_PORT: i32 = 2222;

/// Port name for the secondary SSH port
pub const SSH_SECONDARY_PORT_NAME: &str = "ssh-secondary";

/// Protocol used by both SSH ports
pub const PROTOCOL_TCP: &str = "TCP";

// ============================================================================
// Kubernetes Type Constants
// ============================================================================

/// Service type of north-south Services
pub const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";

/// Service type of east-west Services
pub const SERVICE_TYPE_EXTERNAL_NAME: &str = "ExternalName";

/// Address type of managed `EndpointSlice`s
pub const ADDRESS_TYPE_IPV4: &str = "IPv4";

/// HTTP status returned by the API server when an object does not exist
pub const HTTP_NOT_FOUND: u16 = 404;

/// HTTP status returned by the API server when an object already exists
pub const HTTP_CONFLICT: u16 = 409;

// ============================================================================
// Pod Watch Constants
// ============================================================================

/// Namespace watched for gateway pods
pub const POD_WATCH_NAMESPACE: &str = "default";

/// Label selector for gateway pods
pub const POD_WATCH_LABEL_SELECTOR: &str = "app=cmxsafe-gw";

/// Delay before a failed watch stream is polled again
pub const WATCH_ERROR_BACKOFF_SECS: u64 = 5;

// ============================================================================
// Tetragon Sensor Constants
// ============================================================================

/// Unix socket exposed by the Tetragon agent
pub const TETRAGON_SOCKET_PATH: &str = "/var/run/tetragon/tetragon.sock";

/// Placeholder authority for the unix-socket gRPC endpoint (never resolved)
pub const TETRAGON_PLACEHOLDER_URI: &str = "http://[::]:54321";

/// Provisioning script whose execution triggers reconciliation
pub const PROVISIONING_SCRIPT: &str = "createservice.sh";

/// Binary the provisioning script invokes (and which the sensor reports)
pub const TRIGGER_BINARY: &str = "/usr/bin/logger";

/// Name prefix of the gateway pods in which the script runs
pub const TRIGGER_POD_PREFIX: &str = "cmxsafe-gw-";

/// Home directory root used to derive the user identity from a working directory
pub const HOME_ROOT: &str = "home";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the metrics HTTP server
pub const METRICS_SERVER_ADDRESS: &str = "0.0.0.0:9090";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";
