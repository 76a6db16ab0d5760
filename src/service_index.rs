// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service reference index: DNS label key → set of `namespace/name` references.
//!
//! A Service is indexed when it is of type `LoadBalancer` and carries an
//! external-DNS hostname annotation ending in the managed suffix. The key is
//! the hostname with that suffix stripped (for example
//! `dynamic-service-alice.myservices.local` is indexed under
//! `dynamic-service-alice`).
//!
//! Membership is exact: each key holds a set, so adding a reference twice
//! keeps one copy, and removing `ns/svc` never touches `ns/svcA`.

use crate::constants::SERVICE_TYPE_LOAD_BALANCER;
use crate::errors::ReconcileError;
use crate::labels::EXTERNAL_DNS_HOSTNAME;
use crate::metrics;
use crate::watch::WatchHandler;
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Reference to a Service by namespace and name.
///
/// Displays and parses as `namespace/name`. The index stores typed references,
/// so parsing is only needed for references that arrive as text, such as a
/// `namespace/name` copied out of a log line; malformed input is rejected with
/// [`ReconcileError::MalformedReference`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceRef {
    namespace: String,
    name: String,
}

impl ServiceRef {
    /// Create a reference from its parts.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reference to a watched Service.
    #[must_use]
    pub fn from_service(service: &Service) -> Self {
        Self::new(service.namespace().unwrap_or_default(), service.name_any())
    }

    /// Namespace of the referenced Service.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the referenced Service.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ServiceRef {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(namespace, name))
            }
            _ => Err(ReconcileError::MalformedReference {
                reference: s.to_string(),
            }),
        }
    }
}

/// Concurrent map from DNS label key to the Services claiming it.
#[derive(Debug)]
pub struct ServiceRefIndex {
    suffix: String,
    refs: RwLock<HashMap<String, BTreeSet<ServiceRef>>>,
}

impl ServiceRefIndex {
    /// Create an empty index for hostnames ending in `suffix`.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            refs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert `reference` into the set for `key`.
    ///
    /// Returns `true` if the reference was not already present.
    pub fn append(&self, key: &str, reference: ServiceRef) -> bool {
        let (inserted, len) = {
            let mut refs = self.refs.write();
            let inserted = refs.entry(key.to_string()).or_default().insert(reference);
            (inserted, refs.len())
        };
        metrics::set_index_size("service", len);
        inserted
    }

    /// Remove exactly `reference` from the set for `key`.
    ///
    /// The key itself is dropped once its set is empty. Returns `true` if the
    /// reference was present.
    pub fn remove(&self, key: &str, reference: &ServiceRef) -> bool {
        let (removed, len) = {
            let mut refs = self.refs.write();
            let removed = match refs.get_mut(key) {
                Some(set) => {
                    let removed = set.remove(reference);
                    if set.is_empty() {
                        refs.remove(key);
                    }
                    removed
                }
                None => false,
            };
            (removed, refs.len())
        };
        metrics::set_index_size("service", len);
        removed
    }

    /// Sorted copy of the references currently held for `key`.
    ///
    /// An absent key yields an empty vector.
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Vec<ServiceRef> {
        self.refs
            .read()
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns true if at least one reference is held for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.refs.read().contains_key(key)
    }

    /// Number of keys in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.read().len()
    }

    /// Returns true if the index holds no key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.read().is_empty()
    }

    /// DNS key a Service is indexed under, if it is a managed load balancer.
    #[must_use]
    pub fn dns_key(&self, service: &Service) -> Option<String> {
        let is_load_balancer = service
            .spec
            .as_ref()
            .and_then(|spec| spec.type_.as_deref())
            == Some(SERVICE_TYPE_LOAD_BALANCER);
        if !is_load_balancer {
            return None;
        }

        service
            .annotations()
            .get(EXTERNAL_DNS_HOSTNAME)
            .and_then(|hostname| hostname.strip_suffix(self.suffix.as_str()))
            .filter(|key| !key.is_empty())
            .map(ToString::to_string)
    }
}

impl WatchHandler<Service> for ServiceRefIndex {
    fn on_add(&self, obj: &Service) {
        if let Some(key) = self.dns_key(obj) {
            let reference = ServiceRef::from_service(obj);
            debug!(key = %key, service = %reference, "Indexing managed Service");
            self.append(&key, reference);
        }
    }

    fn on_update(&self, old: &Service, new: &Service) {
        let old_key = self.dns_key(old);
        let new_key = self.dns_key(new);

        if let Some(old_key) = old_key.as_deref() {
            if new_key.as_deref() != Some(old_key) {
                let reference = ServiceRef::from_service(old);
                debug!(key = %old_key, service = %reference, "Service left DNS key");
                self.remove(old_key, &reference);
            }
        }
        if let Some(new_key) = new_key {
            self.append(&new_key, ServiceRef::from_service(new));
        }
    }

    fn on_delete(&self, obj: &Service) {
        if let Some(key) = self.dns_key(obj) {
            let reference = ServiceRef::from_service(obj);
            debug!(key = %key, service = %reference, "Managed Service deleted");
            self.remove(&key, &reference);
        }
    }
}

#[cfg(test)]
#[path = "service_index_tests.rs"]
mod service_index_tests;
