// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `tetragon.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use prost::Message;

    fn field(tag: u8, value: &[u8]) -> Vec<u8> {
        let mut out = vec![(tag << 3) | 2, u8::try_from(value.len()).unwrap()];
        out.extend_from_slice(value);
        out
    }

    #[test]
    fn test_process_decodes_upstream_tags() {
        let pod = [field(1, b"team1"), field(2, b"cmxsafe-gw-p1")].concat();
        let bytes = [
            field(1, b"exec-1"),
            field(4, b"/home/alice/scripts"),
            field(5, b"/usr/bin/logger"),
            field(6, b"createservice.sh start"),
            field(10, &pod),
        ]
        .concat();

        let process = Process::decode(bytes.as_slice()).unwrap();

        assert_eq!(process.exec_id, "exec-1");
        assert_eq!(process.cwd, "/home/alice/scripts");
        assert_eq!(process.binary, "/usr/bin/logger");
        assert_eq!(process.arguments, "createservice.sh start");
        let pod = process.pod.unwrap();
        assert_eq!(pod.namespace, "team1");
        assert_eq!(pod.name, "cmxsafe-gw-p1");
    }

    #[test]
    fn test_node_name_uses_tag_1000() {
        // Key for field 1000, wire type 2, as a two-byte varint.
        let bytes = [0xC2, 0x3E, 0x02, b'n', b'1'];

        let response = GetEventsResponse::decode(bytes.as_slice()).unwrap();

        assert_eq!(response.node_name, "n1");
        assert!(response.event.is_none());
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        // Field 3 (uid-like data) is not modelled.
        let bytes = [field(3, b"ignored"), field(5, b"/bin/sh")].concat();

        let process = Process::decode(bytes.as_slice()).unwrap();

        assert_eq!(process.binary, "/bin/sh");
    }

    #[test]
    fn test_process_exec_oneof_round_trips() {
        let response = GetEventsResponse {
            event: Some(get_events_response::Event::ProcessExec(ProcessExec {
                process: Some(Process {
                    binary: "/usr/bin/logger".to_string(),
                    ..Default::default()
                }),
                parent: None,
            })),
            node_name: "worker-1".to_string(),
        };

        let decoded = GetEventsResponse::decode(response.encode_to_vec().as_slice()).unwrap();

        assert_eq!(decoded, response);
    }

    #[test]
    fn test_event_type_values() {
        assert_eq!(EventType::ProcessExec as i32, 1);
        assert_eq!(EventType::ProcessExit as i32, 5);
        assert_eq!(EventType::try_from(1).unwrap(), EventType::ProcessExec);
    }
}
