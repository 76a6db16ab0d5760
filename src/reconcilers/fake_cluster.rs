// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterApi`] for reconciler tests.
//!
//! Objects live in ordered maps, patches are applied with the same field
//! semantics the API server would use for the shapes this crate sends, and
//! every call is appended to a log such as
//! `patch Service ns2/legacy clear-hostname`. Failures are injected per call
//! prefix and stay armed until cleared.

use crate::cluster::ClusterApi;
use crate::config::ReconcileConfig;
use crate::context::Context;
use crate::errors::ClusterError;
use crate::labels::{EXTERNAL_DNS_HOSTNAME, K8S_SERVICE_NAME};
use crate::patches::{EndpointSlicePatch, PatchStrategy, ServicePatch};
use crate::resources::{pod_endpoint, ssh_endpoint_ports};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::discovery::v1::{EndpointPort, EndpointSlice};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Default)]
struct State {
    services: BTreeMap<Key, Service>,
    slices: BTreeMap<Key, EndpointSlice>,
    calls: Vec<String>,
    failures: Vec<(String, ClusterError)>,
}

impl State {
    fn record(&mut self, call: String) -> Result<(), ClusterError> {
        let failure = self
            .failures
            .iter()
            .find(|(prefix, _)| call.starts_with(prefix.as_str()))
            .map(|(_, err)| err.clone());
        self.calls.push(call);
        failure.map_or(Ok(()), Err)
    }
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a Service without logging a call.
    pub fn insert_service(&self, service: Service) {
        let k = key(&service.namespace().unwrap_or_default(), &service.name_any());
        self.state.lock().services.insert(k, service);
    }

    /// Seed an `EndpointSlice` without logging a call.
    pub fn insert_slice(&self, slice: EndpointSlice) {
        let k = key(&slice.namespace().unwrap_or_default(), &slice.name_any());
        self.state.lock().slices.insert(k, slice);
    }

    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        self.state.lock().services.get(&key(namespace, name)).cloned()
    }

    pub fn slice(&self, namespace: &str, name: &str) -> Option<EndpointSlice> {
        self.state.lock().slices.get(&key(namespace, name)).cloned()
    }

    pub fn service_count(&self) -> usize {
        self.state.lock().services.len()
    }

    pub fn slice_count(&self) -> usize {
        self.state.lock().slices.len()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Calls that create or patch, in order.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("list "))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Fail every call whose log line starts with `prefix`.
    pub fn fail_on(&self, prefix: &str, err: ClusterError) {
        self.state.lock().failures.push((prefix.to_string(), err));
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }
}

/// Context over `cluster` with empty indexes and the default naming scheme.
pub fn context(cluster: &Arc<FakeCluster>) -> Context {
    Context::new(cluster.clone(), ReconcileConfig::default())
}

/// A `LoadBalancer` Service annotated with `hostname`.
pub fn lb_service(namespace: &str, name: &str, hostname: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([(
                EXTERNAL_DNS_HOSTNAME.to_string(),
                hostname.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_string()),
            selector: Some(BTreeMap::from([("app".to_string(), "legacy".to_string())])),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// An `EndpointSlice` labelled for `label` with the given ports.
pub fn slice(
    namespace: &str,
    name: &str,
    label: &str,
    ip: &str,
    ports: Option<Vec<EndpointPort>>,
) -> EndpointSlice {
    EndpointSlice {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                K8S_SERVICE_NAME.to_string(),
                label.to_string(),
            )])),
            ..Default::default()
        },
        address_type: "IPv4".to_string(),
        endpoints: vec![pod_endpoint(ip)],
        ports,
    }
}

/// An `EndpointSlice` exposing both SSH ports.
pub fn ssh_slice(namespace: &str, name: &str, label: &str, ip: &str) -> EndpointSlice {
    slice(namespace, name, label, ip, Some(ssh_endpoint_ports()))
}

pub fn api_error(
    operation: &'static str,
    kind: &'static str,
    namespace: &str,
    name: &str,
) -> ClusterError {
    ClusterError::Api {
        operation,
        kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
        reason: "injected failure".to_string(),
    }
}

fn not_found(kind: &'static str, namespace: &str, name: &str) -> ClusterError {
    ClusterError::NotFound {
        kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn already_exists(kind: &'static str, namespace: &str, name: &str) -> ClusterError {
    ClusterError::AlreadyExists {
        kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn apply_service_patch(service: &mut Service, patch: &ServicePatch) {
    match patch {
        ServicePatch::ClearHostname => {
            if let Some(annotations) = service.metadata.annotations.as_mut() {
                annotations.remove(EXTERNAL_DNS_HOSTNAME);
            }
        }
        ServicePatch::NorthSouth { hostname, ports } => {
            service
                .metadata
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(EXTERNAL_DNS_HOSTNAME.to_string(), hostname.clone());
            let spec = service.spec.get_or_insert_with(Default::default);
            spec.type_ = Some("LoadBalancer".to_string());
            spec.selector = None;
            spec.ports = match patch.strategy() {
                PatchStrategy::Merge => Some(ports.clone()),
                PatchStrategy::Strategic => Some(merge_ports_by_key(spec.ports.take(), ports)),
            };
        }
        ServicePatch::ExternalName { target } => {
            let spec = service.spec.get_or_insert_with(Default::default);
            spec.type_ = Some("ExternalName".to_string());
            spec.external_name = Some(target.clone());
        }
    }
}

/// Strategic merge of `ServiceSpec.ports`: entries are keyed by `port`.
fn merge_ports_by_key(existing: Option<Vec<ServicePort>>, patch: &[ServicePort]) -> Vec<ServicePort> {
    let mut merged = existing.unwrap_or_default();
    for port in patch {
        match merged.iter_mut().find(|p| p.port == port.port) {
            Some(slot) => *slot = port.clone(),
            None => merged.push(port.clone()),
        }
    }
    merged
}

fn apply_slice_patch(slice: &mut EndpointSlice, patch: &EndpointSlicePatch) {
    match patch {
        EndpointSlicePatch::ClearServiceName => {
            if let Some(labels) = slice.metadata.labels.as_mut() {
                labels.remove(K8S_SERVICE_NAME);
            }
        }
        EndpointSlicePatch::Endpoints {
            service_name,
            endpoint,
            ports,
        } => {
            slice
                .metadata
                .labels
                .get_or_insert_with(BTreeMap::new)
                .insert(K8S_SERVICE_NAME.to_string(), service_name.clone());
            slice.endpoints = vec![endpoint.clone()];
            slice.ports = Some(ports.clone());
        }
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn create_service(&self, namespace: &str, service: &Service) -> Result<(), ClusterError> {
        let name = service.name_any();
        let mut state = self.state.lock();
        state.record(format!("create Service {namespace}/{name}"))?;

        let k = key(namespace, &name);
        if state.services.contains_key(&k) {
            return Err(already_exists("Service", namespace, &name));
        }
        let mut service = service.clone();
        service.metadata.namespace = Some(namespace.to_string());
        state.services.insert(k, service);
        Ok(())
    }

    async fn patch_service(
        &self,
        namespace: &str,
        name: &str,
        patch: &ServicePatch,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.record(format!(
            "patch Service {namespace}/{name} {}",
            patch.describe()
        ))?;

        let service = state
            .services
            .get_mut(&key(namespace, name))
            .ok_or_else(|| not_found("Service", namespace, name))?;
        apply_service_patch(service, patch);
        Ok(())
    }

    async fn list_endpoint_slices(
        &self,
        label_selector: &str,
    ) -> Result<Vec<EndpointSlice>, ClusterError> {
        let mut state = self.state.lock();
        state.record(format!("list EndpointSlice {label_selector}"))?;

        let (label, value) = label_selector.split_once('=').unwrap_or((label_selector, ""));
        Ok(state
            .slices
            .values()
            .filter(|s| s.labels().get(label).map(String::as_str) == Some(value))
            .cloned()
            .collect())
    }

    async fn create_endpoint_slice(
        &self,
        namespace: &str,
        slice: &EndpointSlice,
    ) -> Result<(), ClusterError> {
        let name = slice.name_any();
        let mut state = self.state.lock();
        state.record(format!("create EndpointSlice {namespace}/{name}"))?;

        let k = key(namespace, &name);
        if state.slices.contains_key(&k) {
            return Err(already_exists("EndpointSlice", namespace, &name));
        }
        let mut slice = slice.clone();
        slice.metadata.namespace = Some(namespace.to_string());
        state.slices.insert(k, slice);
        Ok(())
    }

    async fn patch_endpoint_slice(
        &self,
        namespace: &str,
        name: &str,
        patch: &EndpointSlicePatch,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        state.record(format!(
            "patch EndpointSlice {namespace}/{name} {}",
            patch.describe()
        ))?;

        let slice = state
            .slices
            .get_mut(&key(namespace, name))
            .ok_or_else(|| not_found("EndpointSlice", namespace, name))?;
        apply_slice_patch(slice, patch);
        Ok(())
    }
}
