// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! North-south reconciler: one canonical `LoadBalancer` Service per user.
//!
//! The Service `default/<prefix><user>` publishes `<prefix><user><suffix>`
//! through external-DNS. Any other Service still annotated with that hostname
//! is released first (annotation removed, never deleted). The reconciler only
//! converges when the canonical Service is the sole remaining claimant.

use crate::constants::DEFAULT_NAMESPACE;
use crate::context::Context;
use crate::errors::{ClusterError, ReconcileError};
use crate::metrics;
use crate::patches::ServicePatch;
use crate::resources::{
    build_north_south_service, north_south_hostname, north_south_name, ssh_service_ports,
};
use crate::service_index::ServiceRef;
use tracing::{debug, info, warn};

/// Ensure the canonical north-south Service exists for `user`.
///
/// Returns the label (`<prefix><user>`) that `EndpointSlice`s must carry to
/// back the Service.
///
/// # Errors
///
/// - [`ReconcileError::AmbiguousOwnership`] if other Services still claim the
///   hostname after cleanup. Nothing is created or patched in that case.
/// - [`ReconcileError::Cluster`] if creating or patching the canonical Service
///   fails.
pub async fn reconcile_north_south(ctx: &Context, user: &str) -> Result<String, ReconcileError> {
    let prefix = &ctx.config.service_prefix;
    let key = north_south_name(prefix, user);
    let hostname = north_south_hostname(prefix, user, &ctx.config.dns_suffix);
    let primary = ServiceRef::new(DEFAULT_NAMESPACE, key.clone());

    let claimants = ctx.services.snapshot(&key);
    debug!(key = %key, claimants = claimants.len(), "Resolving north-south Service");

    let mut remaining = Vec::with_capacity(claimants.len());
    for reference in claimants {
        if reference == primary {
            remaining.push(reference);
            continue;
        }

        match ctx
            .cluster
            .patch_service(
                reference.namespace(),
                reference.name(),
                &ServicePatch::ClearHostname,
            )
            .await
        {
            Ok(()) => {
                info!(key = %key, service = %reference, "Released hostname from competing Service");
                metrics::record_conflict_released("Service");
                ctx.services.remove(&key, &reference);
            }
            Err(e) => {
                warn!(key = %key, service = %reference, error = %e, "Failed to release hostname");
                remaining.push(reference);
            }
        }
    }

    match remaining.as_slice() {
        [] => {
            create_canonical(ctx, &key, &hostname).await?;
            ctx.services.append(&key, primary);
            Ok(key)
        }
        [only] if *only == primary => {
            patch_canonical(ctx, &key, &hostname).await?;
            Ok(key)
        }
        _ => {
            let references: Vec<String> = remaining.iter().map(ToString::to_string).collect();
            warn!(key = %key, references = ?references, "Ambiguous north-south ownership, skipping");
            Err(ReconcileError::AmbiguousOwnership { key, references })
        }
    }
}

fn canonical_patch(hostname: &str) -> ServicePatch {
    ServicePatch::NorthSouth {
        hostname: hostname.to_string(),
        ports: ssh_service_ports(),
    }
}

/// Create the canonical Service, patching it instead if the create loses a
/// race with an existing object.
async fn create_canonical(ctx: &Context, name: &str, hostname: &str) -> Result<(), ClusterError> {
    let service = build_north_south_service(name, hostname);
    match ctx.cluster.create_service(DEFAULT_NAMESPACE, &service).await {
        Err(e) if e.is_already_exists() => {
            debug!(name = %name, "North-south Service already exists, patching");
            ctx.cluster
                .patch_service(DEFAULT_NAMESPACE, name, &canonical_patch(hostname))
                .await
        }
        other => other,
    }
}

/// Re-assert the canonical Service, creating it if the index was stale.
async fn patch_canonical(ctx: &Context, name: &str, hostname: &str) -> Result<(), ClusterError> {
    match ctx
        .cluster
        .patch_service(DEFAULT_NAMESPACE, name, &canonical_patch(hostname))
        .await
    {
        Err(e) if e.is_not_found() => {
            debug!(name = %name, "North-south Service vanished, recreating");
            let service = build_north_south_service(name, hostname);
            ctx.cluster.create_service(DEFAULT_NAMESPACE, &service).await
        }
        other => other,
    }
}
