// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Builders for the objects this controller creates.
//!
//! All functions are pure: they derive names and object bodies from the user,
//! the pod address and the configured naming scheme, so the reconcilers only
//! decide *whether* to create or patch.

use crate::constants::{
    ADDRESS_TYPE_IPV4, CLUSTER_DOMAIN, DEFAULT_NAMESPACE, ENDPOINT_SLICE_SUFFIX, GATEWAY_WORKLOAD,
    PROTOCOL_TCP, SERVICE_TYPE_EXTERNAL_NAME, SERVICE_TYPE_LOAD_BALANCER, SSH_PRIMARY_PORT,
    SSH_PRIMARY_PORT_NAME, SSH_SECONDARY_PORT, SSH_SECONDARY_PORT_NAME,
};
use crate::labels::{
    CMXSAFE_MANAGED_LABEL, CMXSAFE_MANAGED_VALUE, ENDPOINT_SLICE_MANAGED_BY,
    EXTERNAL_DNS_HOSTNAME, K8S_SERVICE_NAME, MANAGED_BY_CMXSAFE,
};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::discovery::v1::{Endpoint, EndpointPort, EndpointSlice};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

const SSH_PORTS: [(i32, &str); 2] = [
    (SSH_PRIMARY_PORT, SSH_PRIMARY_PORT_NAME),
    (SSH_SECONDARY_PORT, SSH_SECONDARY_PORT_NAME),
];

/// Service ports for both SSH listeners, with `targetPort` equal to `port`.
#[must_use]
pub fn ssh_service_ports() -> Vec<ServicePort> {
    SSH_PORTS
        .iter()
        .map(|&(port, name)| ServicePort {
            name: Some(name.to_string()),
            port,
            target_port: Some(IntOrString::Int(port)),
            protocol: Some(PROTOCOL_TCP.to_string()),
            ..Default::default()
        })
        .collect()
}

/// `EndpointSlice` ports for both SSH listeners.
#[must_use]
pub fn ssh_endpoint_ports() -> Vec<EndpointPort> {
    SSH_PORTS
        .iter()
        .map(|&(port, name)| EndpointPort {
            name: Some(name.to_string()),
            port: Some(port),
            protocol: Some(PROTOCOL_TCP.to_string()),
            ..Default::default()
        })
        .collect()
}

/// Name of the north-south Service, which is also its DNS label key.
#[must_use]
pub fn north_south_name(prefix: &str, user: &str) -> String {
    format!("{prefix}{user}")
}

/// External-DNS hostname published for a user.
#[must_use]
pub fn north_south_hostname(prefix: &str, user: &str, suffix: &str) -> String {
    format!("{prefix}{user}{suffix}")
}

/// Name of the canonical `EndpointSlice` for a user.
#[must_use]
pub fn endpoint_slice_name(user: &str) -> String {
    format!("{user}{ENDPOINT_SLICE_SUFFIX}")
}

/// Cluster-internal DNS name the east-west Service resolves to.
///
/// ```
/// use cmxsafe_controller::resources::east_west_target;
///
/// assert_eq!(
///     east_west_target("team1", "10.0.0.5"),
///     "10-0-0-5.cmxsafe-gw.team1.svc.cluster.local"
/// );
/// ```
#[must_use]
pub fn east_west_target(namespace: &str, pod_ip: &str) -> String {
    format!(
        "{}.{GATEWAY_WORKLOAD}.{namespace}.{CLUSTER_DOMAIN}",
        pod_ip.replace('.', "-")
    )
}

/// Single-address endpoint for a pod IP.
#[must_use]
pub fn pod_endpoint(pod_ip: &str) -> Endpoint {
    Endpoint {
        addresses: vec![pod_ip.to_string()],
        ..Default::default()
    }
}

/// Build the north-south `LoadBalancer` Service for a user.
///
/// The Service has no selector; its endpoints come from the hand-managed
/// `EndpointSlice`.
#[must_use]
pub fn build_north_south_service(name: &str, hostname: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(DEFAULT_NAMESPACE.to_string()),
            annotations: Some(BTreeMap::from([(
                EXTERNAL_DNS_HOSTNAME.to_string(),
                hostname.to_string(),
            )])),
            labels: Some(BTreeMap::from([(
                CMXSAFE_MANAGED_LABEL.to_string(),
                CMXSAFE_MANAGED_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(SERVICE_TYPE_LOAD_BALANCER.to_string()),
            ports: Some(ssh_service_ports()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the canonical `EndpointSlice` pointing `service_name` at `pod_ip`.
#[must_use]
pub fn build_endpoint_slice(name: &str, service_name: &str, pod_ip: &str) -> EndpointSlice {
    EndpointSlice {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(DEFAULT_NAMESPACE.to_string()),
            labels: Some(BTreeMap::from([
                (K8S_SERVICE_NAME.to_string(), service_name.to_string()),
                (
                    ENDPOINT_SLICE_MANAGED_BY.to_string(),
                    MANAGED_BY_CMXSAFE.to_string(),
                ),
            ])),
            ..Default::default()
        },
        address_type: ADDRESS_TYPE_IPV4.to_string(),
        endpoints: vec![pod_endpoint(pod_ip)],
        ports: Some(ssh_endpoint_ports()),
    }
}

/// Build the east-west `ExternalName` Service for a user.
#[must_use]
pub fn build_east_west_service(namespace: &str, user: &str, target: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(user.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(SERVICE_TYPE_EXTERNAL_NAME.to_string()),
            external_name: Some(target.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Returns true if the slice exposes TCP 22 or TCP 2222.
#[must_use]
pub fn has_ssh_port(slice: &EndpointSlice) -> bool {
    slice.ports.iter().flatten().any(|p| {
        let is_ssh = matches!(p.port, Some(SSH_PRIMARY_PORT | SSH_SECONDARY_PORT));
        // Protocol defaults to TCP when omitted.
        let is_tcp = p.protocol.as_deref().is_none_or(|proto| proto == PROTOCOL_TCP);
        is_ssh && is_tcp
    })
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
