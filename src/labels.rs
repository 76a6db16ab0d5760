// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines the Kubernetes-standard and cmxsafe-specific labels and
//! annotations that mark an object as managed, so every reconciler and watch
//! agrees on the same keys.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/reference/labels-annotations-taints/
// ============================================================================

/// Label tying an `EndpointSlice` to the Service it backs
pub const K8S_SERVICE_NAME: &str = "kubernetes.io/service-name";

/// Label naming the controller that owns a hand-managed `EndpointSlice`
pub const ENDPOINT_SLICE_MANAGED_BY: &str = "endpointslice.kubernetes.io/managed-by";

// ============================================================================
// Third-Party Annotations
// ============================================================================

/// Hostname annotation consumed by external-dns
pub const EXTERNAL_DNS_HOSTNAME: &str = "external-dns.alpha.kubernetes.io/hostname";

// ============================================================================
// cmxsafe-Specific Labels
// ============================================================================

/// Label marking a north-south Service as created by this controller
pub const CMXSAFE_MANAGED_LABEL: &str = "cmxsafe.io/managed";

/// Value of [`CMXSAFE_MANAGED_LABEL`] on managed Services
pub const CMXSAFE_MANAGED_VALUE: &str = "true";

/// Value for [`ENDPOINT_SLICE_MANAGED_BY`] on slices created by this controller
pub const MANAGED_BY_CMXSAFE: &str = "cmxsafe.io/controller";
