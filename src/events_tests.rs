// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `events.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::tetragon::{Pod, Process, ProcessExec};

    fn signature() -> ScriptSignature {
        ScriptSignature::default()
    }

    fn event(binary: &str, pod: &str, arguments: &str, cwd: &str) -> ExecEvent {
        ExecEvent {
            node_name: "worker-1".to_string(),
            exec_id: "exec-1".to_string(),
            pod_namespace: "team1".to_string(),
            pod_name: pod.to_string(),
            binary: binary.to_string(),
            arguments: arguments.to_string(),
            cwd: cwd.to_string(),
        }
    }

    fn response(pod: Option<Pod>) -> GetEventsResponse {
        GetEventsResponse {
            event: Some(get_events_response::Event::ProcessExec(ProcessExec {
                process: Some(Process {
                    exec_id: "exec-1".to_string(),
                    cwd: "/home/alice/scripts".to_string(),
                    binary: "/usr/bin/logger".to_string(),
                    arguments: "-t createservice.sh".to_string(),
                    pod,
                }),
                parent: None,
            })),
            node_name: "worker-1".to_string(),
        }
    }

    #[test]
    fn test_extract_user() {
        assert_eq!(extract_user("/home/alice/scripts"), Some("alice"));
        assert_eq!(extract_user("/home/alice"), Some("alice"));
        assert_eq!(extract_user("/home/"), None);
        assert_eq!(extract_user("/home"), None);
        assert_eq!(extract_user("/srv/alice/scripts"), None);
        assert_eq!(extract_user("home/alice"), None);
        assert_eq!(extract_user(""), None);
    }

    #[test]
    fn test_from_response_decodes_exec() {
        let decoded = ExecEvent::from_response(response(Some(Pod {
            namespace: "team1".to_string(),
            name: "cmxsafe-gw-p1".to_string(),
        })))
        .unwrap();

        assert_eq!(
            decoded,
            event(
                "/usr/bin/logger",
                "cmxsafe-gw-p1",
                "-t createservice.sh",
                "/home/alice/scripts"
            )
        );
        assert_eq!(decoded.user(), Some("alice"));
    }

    #[test]
    fn test_from_response_skips_host_process() {
        assert_eq!(ExecEvent::from_response(response(None)), None);
    }

    #[test]
    fn test_from_response_skips_empty_event() {
        let empty = GetEventsResponse {
            event: None,
            node_name: "worker-1".to_string(),
        };
        assert_eq!(ExecEvent::from_response(empty), None);
    }

    #[test]
    fn test_signature_matches() {
        let sig = signature();

        assert!(sig.matches(&event(
            "/usr/bin/logger",
            "cmxsafe-gw-p1",
            "-t createservice.sh",
            "/home/alice"
        )));
        assert!(sig.matches(&event(
            "/usr/bin/logger",
            "cmxsafe-gw-p1",
            "hello",
            "/home/alice/createservice.sh.d"
        )));

        assert!(!sig.matches(&event(
            "/bin/logger",
            "cmxsafe-gw-p1",
            "createservice.sh",
            "/home/alice"
        )));
        assert!(!sig.matches(&event(
            "/usr/bin/logger",
            "web-p1",
            "createservice.sh",
            "/home/alice"
        )));
        assert!(!sig.matches(&event(
            "/usr/bin/logger",
            "cmxsafe-gw-p1",
            "other.sh",
            "/home/alice"
        )));
    }

    #[test]
    fn test_signature_filter_escapes_regex() {
        let filter = signature().filter();

        assert_eq!(filter.event_set, vec![EventType::ProcessExec as i32]);
        assert_eq!(filter.binary_regex, vec![r"^/usr/bin/logger$".to_string()]);
        assert_eq!(filter.pod_regex, vec![r"^cmxsafe\-gw\-.*".to_string()]);
        assert_eq!(
            filter.arguments_regex,
            vec![r".*createservice\.sh.*".to_string()]
        );
        assert!(filter.namespace.is_empty());
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let json = serde_json::to_value(event(
            "/usr/bin/logger",
            "cmxsafe-gw-p1",
            "createservice.sh",
            "/home/alice",
        ))
        .unwrap();

        assert_eq!(json["podNamespace"], "team1");
        assert_eq!(json["podName"], "cmxsafe-gw-p1");
        assert_eq!(json["nodeName"], "worker-1");
    }
}
