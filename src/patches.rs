// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed patch requests for the objects this controller manages.
//!
//! Each variant covers exactly one field set and knows both its body shape and
//! the patch strategy it must be sent with:
//!
//! | Patch                                  | Strategy        |
//! |----------------------------------------|-----------------|
//! | [`ServicePatch::ClearHostname`]        | JSON merge      |
//! | [`ServicePatch::NorthSouth`]           | JSON merge      |
//! | [`ServicePatch::ExternalName`]         | strategic merge |
//! | [`EndpointSlicePatch::ClearServiceName`] | JSON merge    |
//! | [`EndpointSlicePatch::Endpoints`]      | JSON merge      |
//!
//! Field removal is expressed as an explicit `null`, which both merge flavours
//! interpret as "delete this key".

use crate::constants::{SERVICE_TYPE_EXTERNAL_NAME, SERVICE_TYPE_LOAD_BALANCER};
use crate::labels::{EXTERNAL_DNS_HOSTNAME, K8S_SERVICE_NAME};
use k8s_openapi::api::core::v1::ServicePort;
use k8s_openapi::api::discovery::v1::{Endpoint, EndpointPort};
use serde::Serialize;
use std::collections::BTreeMap;

/// How a patch body is interpreted by the API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStrategy {
    /// RFC 7386 JSON merge patch: lists are replaced wholesale
    Merge,
    /// Kubernetes strategic merge patch: lists are merged by their patch key
    Strategic,
}

/// Patches applied to `Service` objects.
#[derive(Debug, Clone, PartialEq)]
pub enum ServicePatch {
    /// Remove the external-DNS hostname annotation
    ClearHostname,

    /// Re-assert the canonical north-south shape: hostname annotation,
    /// `LoadBalancer` type, no selector, the SSH ports
    NorthSouth {
        /// Full external-DNS hostname
        hostname: String,
        /// Ports the Service must expose
        ports: Vec<ServicePort>,
    },

    /// Point an `ExternalName` Service at `target`
    ExternalName {
        /// DNS name the Service resolves to
        target: String,
    },
}

/// Patches applied to `EndpointSlice` objects.
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointSlicePatch {
    /// Remove the `kubernetes.io/service-name` label
    ClearServiceName,

    /// Bind the slice to `service_name` with a single endpoint
    Endpoints {
        /// Value of the `kubernetes.io/service-name` label
        service_name: String,
        /// The only endpoint the slice carries
        endpoint: Endpoint,
        /// Ports the slice exposes
        ports: Vec<EndpointPort>,
    },
}

#[derive(Serialize, Default)]
struct MetadataPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<BTreeMap<&'a str, Option<&'a str>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<BTreeMap<&'a str, Option<&'a str>>>,
}

impl<'a> MetadataPatch<'a> {
    fn annotation(key: &'a str, value: Option<&'a str>) -> Self {
        Self {
            annotations: Some(BTreeMap::from([(key, value)])),
            ..Default::default()
        }
    }

    fn label(key: &'a str, value: Option<&'a str>) -> Self {
        Self {
            labels: Some(BTreeMap::from([(key, value)])),
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
struct MetadataOnly<'a> {
    metadata: MetadataPatch<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NorthSouthSpec<'a> {
    #[serde(rename = "type")]
    type_: &'a str,
    // Serialized as an explicit null so a stale selector is dropped.
    selector: Option<()>,
    ports: &'a [ServicePort],
}

#[derive(Serialize)]
struct NorthSouthBody<'a> {
    metadata: MetadataPatch<'a>,
    spec: NorthSouthSpec<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExternalNameSpec<'a> {
    #[serde(rename = "type")]
    type_: &'a str,
    external_name: &'a str,
}

#[derive(Serialize)]
struct ExternalNameBody<'a> {
    spec: ExternalNameSpec<'a>,
}

#[derive(Serialize)]
struct EndpointsBody<'a> {
    metadata: MetadataPatch<'a>,
    endpoints: [&'a Endpoint; 1],
    ports: &'a [EndpointPort],
}

impl ServicePatch {
    /// Strategy the body must be sent with.
    #[must_use]
    pub fn strategy(&self) -> PatchStrategy {
        match self {
            // ports must be replaced, not merged by port number
            Self::ClearHostname | Self::NorthSouth { .. } => PatchStrategy::Merge,
            Self::ExternalName { .. } => PatchStrategy::Strategic,
        }
    }

    /// Short name used in logs and metrics.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ClearHostname => "clear-hostname",
            Self::NorthSouth { .. } => "north-south",
            Self::ExternalName { .. } => "external-name",
        }
    }

    /// Render the patch body.
    ///
    /// # Errors
    ///
    /// Returns an error if a port cannot be serialized.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::ClearHostname => serde_json::to_value(MetadataOnly {
                metadata: MetadataPatch::annotation(EXTERNAL_DNS_HOSTNAME, None),
            }),
            Self::NorthSouth { hostname, ports } => serde_json::to_value(NorthSouthBody {
                metadata: MetadataPatch::annotation(
                    EXTERNAL_DNS_HOSTNAME,
                    Some(hostname.as_str()),
                ),
                spec: NorthSouthSpec {
                    type_: SERVICE_TYPE_LOAD_BALANCER,
                    selector: None,
                    ports,
                },
            }),
            Self::ExternalName { target } => serde_json::to_value(ExternalNameBody {
                spec: ExternalNameSpec {
                    type_: SERVICE_TYPE_EXTERNAL_NAME,
                    external_name: target,
                },
            }),
        }
    }
}

impl EndpointSlicePatch {
    /// Strategy the body must be sent with.
    #[must_use]
    pub fn strategy(&self) -> PatchStrategy {
        PatchStrategy::Merge
    }

    /// Short name used in logs and metrics.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ClearServiceName => "clear-service-name",
            Self::Endpoints { .. } => "endpoints",
        }
    }

    /// Render the patch body.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint or a port cannot be serialized.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::ClearServiceName => serde_json::to_value(MetadataOnly {
                metadata: MetadataPatch::label(K8S_SERVICE_NAME, None),
            }),
            Self::Endpoints {
                service_name,
                endpoint,
                ports,
            } => serde_json::to_value(EndpointsBody {
                metadata: MetadataPatch::label(K8S_SERVICE_NAME, Some(service_name.as_str())),
                endpoints: [endpoint],
                ports,
            }),
        }
    }
}

#[cfg(test)]
#[path = "patches_tests.rs"]
mod patches_tests;
