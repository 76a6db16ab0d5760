// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `EndpointSlice` reconciler: back the north-south Service with the pod IP.
//!
//! Exactly one SSH-bearing slice may carry `kubernetes.io/service-name=<label>`:
//! the canonical `default/<user>-slice`. Competing slices lose the label and
//! are otherwise left alone.

use crate::constants::DEFAULT_NAMESPACE;
use crate::context::Context;
use crate::errors::{ClusterError, ReconcileError};
use crate::labels::K8S_SERVICE_NAME;
use crate::metrics;
use crate::patches::EndpointSlicePatch;
use crate::resources::{
    build_endpoint_slice, endpoint_slice_name, has_ssh_port, pod_endpoint, ssh_endpoint_ports,
};
use kube::ResourceExt;
use tracing::{debug, info, warn};

/// Point the canonical slice for `user` at `pod_ip` under `label`.
///
/// # Errors
///
/// - [`ReconcileError::MissingLabel`] if `label` is empty; nothing is touched.
/// - [`ReconcileError::Cluster`] if listing slices or writing the canonical
///   slice fails. Failures releasing competing slices are only logged.
pub async fn reconcile_endpoint_slice(
    ctx: &Context,
    label: &str,
    user: &str,
    pod_ip: &str,
) -> Result<(), ReconcileError> {
    if label.is_empty() {
        return Err(ReconcileError::MissingLabel {
            user: user.to_string(),
        });
    }

    let canonical = endpoint_slice_name(user);
    let selector = format!("{K8S_SERVICE_NAME}={label}");
    let slices = ctx.cluster.list_endpoint_slices(&selector).await?;

    let mut canonical_listed = false;
    for slice in slices.iter().filter(|s| has_ssh_port(s)) {
        let namespace = slice.namespace().unwrap_or_default();
        let name = slice.name_any();

        if namespace == DEFAULT_NAMESPACE && name == canonical {
            canonical_listed = true;
            continue;
        }

        match ctx
            .cluster
            .patch_endpoint_slice(&namespace, &name, &EndpointSlicePatch::ClearServiceName)
            .await
        {
            Ok(()) => {
                info!(label = %label, namespace = %namespace, name = %name, "Released label from competing EndpointSlice");
                metrics::record_conflict_released("EndpointSlice");
            }
            Err(e) => {
                warn!(label = %label, namespace = %namespace, name = %name, error = %e, "Failed to release EndpointSlice label");
            }
        }
    }

    let patch = EndpointSlicePatch::Endpoints {
        service_name: label.to_string(),
        endpoint: pod_endpoint(pod_ip),
        ports: ssh_endpoint_ports(),
    };

    if canonical_listed {
        patch_canonical(ctx, &canonical, label, pod_ip, &patch).await?;
    } else {
        create_canonical(ctx, &canonical, label, pod_ip, &patch).await?;
    }
    Ok(())
}

async fn create_canonical(
    ctx: &Context,
    name: &str,
    label: &str,
    pod_ip: &str,
    patch: &EndpointSlicePatch,
) -> Result<(), ClusterError> {
    let slice = build_endpoint_slice(name, label, pod_ip);
    match ctx
        .cluster
        .create_endpoint_slice(DEFAULT_NAMESPACE, &slice)
        .await
    {
        Err(e) if e.is_already_exists() => {
            // Exists but was not selected: label missing or ports unrelated.
            debug!(name = %name, "EndpointSlice exists outside the selector, patching");
            ctx.cluster
                .patch_endpoint_slice(DEFAULT_NAMESPACE, name, patch)
                .await
        }
        other => other,
    }
}

async fn patch_canonical(
    ctx: &Context,
    name: &str,
    label: &str,
    pod_ip: &str,
    patch: &EndpointSlicePatch,
) -> Result<(), ClusterError> {
    match ctx
        .cluster
        .patch_endpoint_slice(DEFAULT_NAMESPACE, name, patch)
        .await
    {
        Err(e) if e.is_not_found() => {
            debug!(name = %name, "EndpointSlice vanished after listing, recreating");
            let slice = build_endpoint_slice(name, label, pod_ip);
            ctx.cluster
                .create_endpoint_slice(DEFAULT_NAMESPACE, &slice)
                .await
        }
        other => other,
    }
}
