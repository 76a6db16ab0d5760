// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! East-west reconciler: an in-cluster alias for the user's pod.

use crate::context::Context;
use crate::errors::ReconcileError;
use crate::patches::ServicePatch;
use crate::resources::{build_east_west_service, east_west_target};
use tracing::debug;

/// Point the `ExternalName` Service `<namespace>/<user>` at the pod.
///
/// Patches first and creates on 404.
///
/// # Errors
///
/// Returns [`ReconcileError::Cluster`] for any other failure.
pub async fn reconcile_east_west(
    ctx: &Context,
    namespace: &str,
    user: &str,
    pod_ip: &str,
) -> Result<(), ReconcileError> {
    let target = east_west_target(namespace, pod_ip);
    let patch = ServicePatch::ExternalName {
        target: target.clone(),
    };

    match ctx.cluster.patch_service(namespace, user, &patch).await {
        Err(e) if e.is_not_found() => {
            debug!(namespace = %namespace, name = %user, "East-west Service missing, creating");
            let service = build_east_west_service(namespace, user, &target);
            ctx.cluster.create_service(namespace, &service).await?;
            Ok(())
        }
        other => Ok(other?),
    }
}
