// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster API seam used by the reconcilers.
//!
//! [`ClusterApi`] narrows the Kubernetes API down to the five calls the
//! reconcilers make, so they can be exercised against an in-memory fake.
//! [`KubeCluster`] is the production implementation on top of `kube::Api`.
//!
//! Errors are mapped onto [`ClusterError`]: a 404 on patch and a 409 on
//! create get dedicated variants because the reconcilers fall back on them.

use crate::errors::ClusterError;
use crate::metrics;
use crate::patches::{EndpointSlicePatch, PatchStrategy, ServicePatch};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::discovery::v1::EndpointSlice;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info};

const KIND_SERVICE: &str = "Service";
const KIND_ENDPOINT_SLICE: &str = "EndpointSlice";

/// Operations the reconcilers need from the cluster.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create a Service in `namespace`.
    async fn create_service(&self, namespace: &str, service: &Service)
        -> Result<(), ClusterError>;

    /// Patch the Service `namespace/name`.
    async fn patch_service(
        &self,
        namespace: &str,
        name: &str,
        patch: &ServicePatch,
    ) -> Result<(), ClusterError>;

    /// List `EndpointSlice`s in all namespaces matching `label_selector`.
    async fn list_endpoint_slices(
        &self,
        label_selector: &str,
    ) -> Result<Vec<EndpointSlice>, ClusterError>;

    /// Create an `EndpointSlice` in `namespace`.
    async fn create_endpoint_slice(
        &self,
        namespace: &str,
        slice: &EndpointSlice,
    ) -> Result<(), ClusterError>;

    /// Patch the `EndpointSlice` `namespace/name`.
    async fn patch_endpoint_slice(
        &self,
        namespace: &str,
        name: &str,
        patch: &EndpointSlicePatch,
    ) -> Result<(), ClusterError>;
}

/// [`ClusterApi`] backed by a live `kube::Client`.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Wrap a Kubernetes client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn to_patch(strategy: PatchStrategy, body: serde_json::Value) -> Patch<serde_json::Value> {
    match strategy {
        PatchStrategy::Merge => Patch::Merge(body),
        PatchStrategy::Strategic => Patch::Strategic(body),
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<(), ClusterError> {
        let name = service.name_any();
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);

        debug!(namespace = %namespace, name = %name, kind = KIND_SERVICE, "Creating resource");
        api.create(&PostParams::default(), service)
            .await
            .map_err(|e| ClusterError::from_kube(e, "create", KIND_SERVICE, namespace, &name))?;

        info!("Created {} {}/{}", KIND_SERVICE, namespace, name);
        metrics::record_resource_created(KIND_SERVICE);
        Ok(())
    }

    async fn patch_service(
        &self,
        namespace: &str,
        name: &str,
        patch: &ServicePatch,
    ) -> Result<(), ClusterError> {
        let body = patch
            .to_json()
            .map_err(|e| ClusterError::Serialization {
                kind: KIND_SERVICE,
                reason: e.to_string(),
            })?;
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);

        debug!(
            namespace = %namespace,
            name = %name,
            kind = KIND_SERVICE,
            patch = patch.describe(),
            "Patching resource"
        );
        api.patch(
            name,
            &PatchParams::default(),
            &to_patch(patch.strategy(), body),
        )
        .await
        .map_err(|e| ClusterError::from_kube(e, "patch", KIND_SERVICE, namespace, name))?;

        info!(
            "Patched {} {}/{} ({})",
            KIND_SERVICE,
            namespace,
            name,
            patch.describe()
        );
        metrics::record_resource_patched(KIND_SERVICE, patch.describe());
        Ok(())
    }

    async fn list_endpoint_slices(
        &self,
        label_selector: &str,
    ) -> Result<Vec<EndpointSlice>, ClusterError> {
        let api: Api<EndpointSlice> = Api::all(self.client.clone());

        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| {
                ClusterError::from_kube(e, "list", KIND_ENDPOINT_SLICE, "*", label_selector)
            })?;

        debug!(
            label_selector = %label_selector,
            count = list.items.len(),
            "Listed EndpointSlices"
        );
        Ok(list.items)
    }

    async fn create_endpoint_slice(
        &self,
        namespace: &str,
        slice: &EndpointSlice,
    ) -> Result<(), ClusterError> {
        let name = slice.name_any();
        let api: Api<EndpointSlice> = Api::namespaced(self.client.clone(), namespace);

        debug!(namespace = %namespace, name = %name, kind = KIND_ENDPOINT_SLICE, "Creating resource");
        api.create(&PostParams::default(), slice)
            .await
            .map_err(|e| {
                ClusterError::from_kube(e, "create", KIND_ENDPOINT_SLICE, namespace, &name)
            })?;

        info!("Created {} {}/{}", KIND_ENDPOINT_SLICE, namespace, name);
        metrics::record_resource_created(KIND_ENDPOINT_SLICE);
        Ok(())
    }

    async fn patch_endpoint_slice(
        &self,
        namespace: &str,
        name: &str,
        patch: &EndpointSlicePatch,
    ) -> Result<(), ClusterError> {
        let body = patch
            .to_json()
            .map_err(|e| ClusterError::Serialization {
                kind: KIND_ENDPOINT_SLICE,
                reason: e.to_string(),
            })?;
        let api: Api<EndpointSlice> = Api::namespaced(self.client.clone(), namespace);

        debug!(
            namespace = %namespace,
            name = %name,
            kind = KIND_ENDPOINT_SLICE,
            patch = patch.describe(),
            "Patching resource"
        );
        api.patch(
            name,
            &PatchParams::default(),
            &to_patch(patch.strategy(), body),
        )
        .await
        .map_err(|e| ClusterError::from_kube(e, "patch", KIND_ENDPOINT_SLICE, namespace, name))?;

        info!(
            "Patched {} {}/{} ({})",
            KIND_ENDPOINT_SLICE,
            namespace,
            name,
            patch.describe()
        );
        metrics::record_resource_patched(KIND_ENDPOINT_SLICE, patch.describe());
        Ok(())
    }
}
