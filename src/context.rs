// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the dispatch loop and the reconcilers.
//!
//! The dispatch loop receives an `Arc<Context>` that contains:
//! - The cluster API (live or in-memory)
//! - The pod address index, fed by the pod watch
//! - The service reference index, fed by the Service watch
//! - The naming scheme for the north-south objects
//!
//! The indexes are the same `Arc`s that were handed to the watch tasks, so
//! reads here observe every update the watches have applied.

use crate::cluster::ClusterApi;
use crate::config::ReconcileConfig;
use crate::pod_index::PodIpIndex;
use crate::service_index::ServiceRefIndex;
use std::sync::Arc;

/// Shared state passed to every reconciler.
#[derive(Clone)]
pub struct Context {
    /// Cluster API used as the system of record
    pub cluster: Arc<dyn ClusterApi>,

    /// Read cache of pod IPs
    pub pods: Arc<PodIpIndex>,

    /// Read cache of Services claiming each DNS label key
    pub services: Arc<ServiceRefIndex>,

    /// Naming scheme for the north-south objects
    pub config: ReconcileConfig,
}

impl Context {
    /// Build a context with empty indexes sized for `config`.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterApi>, config: ReconcileConfig) -> Self {
        Self {
            cluster,
            pods: Arc::new(PodIpIndex::new()),
            services: Arc::new(ServiceRefIndex::new(config.dns_suffix.clone())),
            config,
        }
    }
}
