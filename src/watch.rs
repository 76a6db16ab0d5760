// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Watch subscriptions that keep the in-memory indexes current.
//!
//! The kube watcher delivers `Apply`/`Delete` events plus relist markers. The
//! indexes want informer-style callbacks instead, including the previous
//! object on update so that a changed DNS key can be moved. [`WatchDispatcher`]
//! remembers the last object seen for every `namespace/name` and replays the
//! watcher stream as `on_add` / `on_update` / `on_delete` calls on a
//! [`WatchHandler`]. After a relist (`Init` .. `InitDone`) objects that were
//! not re-announced are reported as deleted.

use crate::constants::WATCH_ERROR_BACKOFF_SECS;
use crate::metrics;
use futures::StreamExt;
use kube::runtime::watcher::{self, Event};
use kube::{Api, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Subscription interface for watched objects.
///
/// Implementations must be cheap and non-blocking: they are called inline from
/// the watch task.
pub trait WatchHandler<K>: Send + Sync {
    /// A new object was observed.
    fn on_add(&self, obj: &K);

    /// A known object changed. `old` is the last version this handler saw.
    fn on_update(&self, old: &K, new: &K);

    /// An object was deleted (or vanished across a relist).
    fn on_delete(&self, obj: &K);
}

type ObjectKey = (String, String);

fn object_key<K: ResourceExt>(obj: &K) -> ObjectKey {
    (obj.namespace().unwrap_or_default(), obj.name_any())
}

/// Replays watcher events as informer-style callbacks.
pub struct WatchDispatcher<K> {
    seen: HashMap<ObjectKey, K>,
    relisting: Option<HashSet<ObjectKey>>,
}

impl<K> Default for WatchDispatcher<K> {
    fn default() -> Self {
        Self {
            seen: HashMap::new(),
            relisting: None,
        }
    }
}

impl<K> WatchDispatcher<K>
where
    K: ResourceExt + Clone,
{
    /// Feed one watcher event into the handler.
    pub fn apply<H>(&mut self, event: Event<K>, handler: &H)
    where
        H: WatchHandler<K> + ?Sized,
    {
        match event {
            Event::Init => {
                self.relisting = Some(HashSet::new());
            }
            Event::InitApply(obj) => {
                if let Some(relisted) = self.relisting.as_mut() {
                    relisted.insert(object_key(&obj));
                }
                self.upsert(obj, handler);
            }
            Event::InitDone => {
                if let Some(relisted) = self.relisting.take() {
                    let vanished: Vec<ObjectKey> = self
                        .seen
                        .keys()
                        .filter(|key| !relisted.contains(*key))
                        .cloned()
                        .collect();
                    for key in vanished {
                        if let Some(obj) = self.seen.remove(&key) {
                            debug!(namespace = %key.0, name = %key.1, "Object vanished during relist");
                            handler.on_delete(&obj);
                        }
                    }
                }
            }
            Event::Apply(obj) => self.upsert(obj, handler),
            Event::Delete(obj) => {
                self.seen.remove(&object_key(&obj));
                handler.on_delete(&obj);
            }
        }
    }

    /// Number of objects currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if no object is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn upsert<H>(&mut self, obj: K, handler: &H)
    where
        H: WatchHandler<K> + ?Sized,
    {
        match self.seen.insert(object_key(&obj), obj.clone()) {
            Some(old) => handler.on_update(&old, &obj),
            None => handler.on_add(&obj),
        }
    }
}

/// Run a watch on `api` forever, dispatching events into `handler`.
///
/// Watch errors are logged and the stream is polled again after a short
/// delay; the kube watcher re-establishes the connection and relists.
///
/// # Errors
///
/// Returns an error only if the underlying watcher stream terminates, which
/// the kube watcher never does in practice.
pub async fn run_watch<K, H>(
    api: Api<K>,
    config: watcher::Config,
    handler: Arc<H>,
    resource: &'static str,
) -> anyhow::Result<()>
where
    K: Resource + ResourceExt + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default,
    H: WatchHandler<K> + ?Sized,
{
    info!(resource = resource, "Starting watch");

    let mut dispatcher = WatchDispatcher::default();
    let stream = watcher::watcher(api, config);
    let mut stream = std::pin::pin!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(event) => {
                metrics::record_watch_event(resource, event_kind(&event));
                dispatcher.apply(event, handler.as_ref());
            }
            Err(e) => {
                metrics::record_watch_event(resource, "error");
                warn!(resource = resource, error = %e, "Watch error, will retry");
                tokio::time::sleep(Duration::from_secs(WATCH_ERROR_BACKOFF_SECS)).await;
            }
        }
    }

    anyhow::bail!("{resource} watch stream ended")
}

fn event_kind<K>(event: &Event<K>) -> &'static str {
    match event {
        Event::Apply(_) => "apply",
        Event::Delete(_) => "delete",
        Event::Init => "init",
        Event::InitApply(_) => "init_apply",
        Event::InitDone => "init_done",
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;
