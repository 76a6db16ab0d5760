// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # cmxsafe-controller - Tetragon-driven service provisioning
//!
//! The controller watches process-exec events reported by a Tetragon agent.
//! When a gateway pod runs the provisioning script for a user, it makes the
//! cluster expose that user's SSH endpoint:
//!
//! - a north-south `LoadBalancer` Service in `default`, annotated with a
//!   hostname under the managed DNS suffix,
//! - an `EndpointSlice` binding that Service to the gateway pod's IP,
//! - an east-west `ExternalName` Service named after the user in the pod's
//!   namespace.
//!
//! Two in-memory indexes fed by Kubernetes watches back the reconcilers: the
//! pod IP index and the hostname ownership index.
//!
//! ## Modules
//!
//! - [`tetragon`] - gRPC client for the agent's event stream
//! - [`events`] - Decoded exec events and trigger matching
//! - [`dispatcher`] - Sequential event loop driving the reconcilers
//! - [`reconcilers`] - North-south, `EndpointSlice` and east-west reconciliation
//! - [`pod_index`] / [`service_index`] - Watch-fed lookup tables
//! - [`cluster`] - The Kubernetes API seam
//!
//! ## Example
//!
//! ```rust
//! use cmxsafe_controller::resources::{east_west_target, north_south_hostname};
//!
//! assert_eq!(
//!     north_south_hostname("dynamic-service-", "alice", ".myservices.local"),
//!     "dynamic-service-alice.myservices.local"
//! );
//! assert_eq!(
//!     east_west_target("team1", "10.0.0.5"),
//!     "10-0-0-5.cmxsafe-gw.team1.svc.cluster.local"
//! );
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod http;
pub mod labels;
pub mod metrics;
pub mod patches;
pub mod pod_index;
pub mod reconcilers;
pub mod resources;
pub mod service_index;
pub mod tetragon;
pub mod watch;
