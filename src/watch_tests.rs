// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `watch.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use k8s_openapi::api::core::v1::{Pod, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    fn ip_of(pod: &Pod) -> String {
        pod.status
            .as_ref()
            .and_then(|s| s.pod_ip.clone())
            .unwrap_or_default()
    }

    impl WatchHandler<Pod> for Recorder {
        fn on_add(&self, obj: &Pod) {
            self.calls
                .lock()
                .push(format!("add {} {}", obj.name_any(), ip_of(obj)));
        }

        fn on_update(&self, old: &Pod, new: &Pod) {
            self.calls.lock().push(format!(
                "update {} {}->{}",
                new.name_any(),
                ip_of(old),
                ip_of(new)
            ));
        }

        fn on_delete(&self, obj: &Pod) {
            self.calls.lock().push(format!("delete {}", obj.name_any()));
        }
    }

    fn pod(name: &str, ip: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            status: Some(PodStatus {
                pod_ip: Some(ip.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_apply_is_add_then_update() {
        let recorder = Recorder::default();
        let mut dispatcher = WatchDispatcher::default();

        dispatcher.apply(Event::Apply(pod("p1", "10.0.0.5")), &recorder);
        dispatcher.apply(Event::Apply(pod("p1", "10.0.0.9")), &recorder);

        assert_eq!(
            recorder.calls(),
            vec!["add p1 10.0.0.5", "update p1 10.0.0.5->10.0.0.9"]
        );
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_delete_forgets_object() {
        let recorder = Recorder::default();
        let mut dispatcher = WatchDispatcher::default();

        dispatcher.apply(Event::Apply(pod("p1", "10.0.0.5")), &recorder);
        dispatcher.apply(Event::Delete(pod("p1", "10.0.0.5")), &recorder);
        dispatcher.apply(Event::Apply(pod("p1", "10.0.0.6")), &recorder);

        assert_eq!(
            recorder.calls(),
            vec!["add p1 10.0.0.5", "delete p1", "add p1 10.0.0.6"]
        );
    }

    #[test]
    fn test_relist_reports_vanished_objects_as_deleted() {
        let recorder = Recorder::default();
        let mut dispatcher = WatchDispatcher::default();

        dispatcher.apply(Event::Apply(pod("p1", "10.0.0.1")), &recorder);
        dispatcher.apply(Event::Apply(pod("p2", "10.0.0.2")), &recorder);

        dispatcher.apply(Event::Init, &recorder);
        dispatcher.apply(Event::InitApply(pod("p2", "10.0.0.2")), &recorder);
        dispatcher.apply(Event::InitApply(pod("p3", "10.0.0.3")), &recorder);
        dispatcher.apply(Event::InitDone, &recorder);

        let calls = recorder.calls();
        assert_eq!(
            calls,
            vec![
                "add p1 10.0.0.1",
                "add p2 10.0.0.2",
                "update p2 10.0.0.2->10.0.0.2",
                "add p3 10.0.0.3",
                "delete p1",
            ]
        );
        assert_eq!(dispatcher.len(), 2);
    }

    #[test]
    fn test_initial_list_on_empty_dispatcher() {
        let recorder = Recorder::default();
        let mut dispatcher: WatchDispatcher<Pod> = WatchDispatcher::default();
        assert!(dispatcher.is_empty());

        dispatcher.apply(Event::Init, &recorder);
        dispatcher.apply(Event::InitApply(pod("p1", "10.0.0.1")), &recorder);
        dispatcher.apply(Event::InitDone, &recorder);

        assert_eq!(recorder.calls(), vec!["add p1 10.0.0.1"]);
    }
}
