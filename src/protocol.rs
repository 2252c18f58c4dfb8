use crate::error::{PlumError, Result};
use crate::subscription::{Event, FrameError};
use crate::types::{DeviceAnnouncement, ANNOUNCEMENT_PREFIX};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::net::IpAddr;

/// Shared shape of every event frame, read only to find its type tag
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

// Absent or null fields decode as zero; only a present, mistyped field is an error.

#[derive(Debug, Deserialize)]
struct DimmerChangeBody {
    #[serde(default)]
    level: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PowerBody {
    #[serde(default)]
    watts: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PirSignalBody {
    #[serde(default)]
    signal: Option<i64>,
}

/// Decode a heartbeat datagram payload
///
/// The payload must read `PLUM 8888 <device id> <port>`, split on single
/// spaces.
pub fn parse_announcement(payload: &str, source: IpAddr) -> Result<DeviceAnnouncement> {
    if !payload.starts_with(ANNOUNCEMENT_PREFIX) {
        return Err(PlumError::InvalidAnnouncement(format!(
            "missing {:?} prefix",
            ANNOUNCEMENT_PREFIX
        )));
    }

    let tokens: Vec<&str> = payload.split(' ').collect();
    if tokens.len() != 4 {
        return Err(PlumError::InvalidAnnouncement(format!(
            "expected 4 tokens, got {}",
            tokens.len()
        )));
    }

    let listen_port = tokens[3].parse::<u16>().map_err(|_| {
        PlumError::InvalidAnnouncement(format!("couldn't parse port {:?}", tokens[3]))
    })?;

    Ok(DeviceAnnouncement {
        device_id: tokens[2].to_string(),
        source_address: source,
        listen_port,
    })
}

/// Strip surrounding whitespace and the optional trailing `.` from a frame
pub fn trim_frame(frame: &str) -> &str {
    let frame = frame.trim();
    frame.strip_suffix('.').unwrap_or(frame)
}

/// Turn one frame of a lightpad's event stream into an [`Event`]
///
/// Every frame yields exactly one event: unrecognized types become
/// [`Event::Unknown`] and undecodable frames become [`Event::Malformed`].
/// Field names match regardless of case (`Level`, `level`, `LEVEL`), while
/// the type tag itself is compared exactly.
pub fn classify_frame(frame: &str) -> Event {
    let message = trim_frame(frame);

    let fields = match serde_json::from_str::<Value>(message) {
        Ok(value) => lowercase_keys(value),
        Err(e) => return malformed(message, e),
    };

    let kind = match Envelope::deserialize(&fields) {
        Ok(envelope) => envelope.kind.unwrap_or_default(),
        Err(e) => return malformed(message, e),
    };

    match kind.as_str() {
        "dimmerchange" => decode_body(&fields, message, &kind, |b: DimmerChangeBody| {
            Event::DimmerChange {
                level: b.level.unwrap_or_default(),
            }
        }),
        "power" => decode_body(&fields, message, &kind, |b: PowerBody| Event::PowerChange {
            watts: b.watts.unwrap_or_default(),
        }),
        "pirSignal" => decode_body(&fields, message, &kind, |b: PirSignalBody| {
            Event::MotionSignal {
                signal: b.signal.unwrap_or_default(),
            }
        }),
        _ => Event::Unknown {
            message: message.to_string(),
        },
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (key.to_lowercase(), v))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

fn malformed(message: &str, e: serde_json::Error) -> Event {
    Event::Malformed(FrameError::Malformed {
        frame: message.to_string(),
        reason: e.to_string(),
    })
}

fn decode_body<'de, B, F>(fields: &'de Value, message: &str, kind: &str, build: F) -> Event
where
    B: Deserialize<'de>,
    F: FnOnce(B) -> Event,
{
    match B::deserialize(fields) {
        Ok(body) => build(body),
        Err(e) => Event::Malformed(FrameError::InvalidPayload {
            kind: kind.to_string(),
            frame: message.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LIGHTPAD_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 91));

    #[test]
    fn parses_heartbeat() {
        let ann = parse_announcement(
            "PLUM 8888 8429176c-bf88-4aee-be07-b6a9064cf1ab 8443",
            LIGHTPAD_IP,
        )
        .unwrap();
        assert_eq!(
            ann,
            DeviceAnnouncement {
                device_id: "8429176c-bf88-4aee-be07-b6a9064cf1ab".to_string(),
                source_address: LIGHTPAD_IP,
                listen_port: 8443,
            }
        );
    }

    #[test]
    fn rejects_wrong_token_count() {
        let err = parse_announcement("PLUM 8888 onlythreetokens", LIGHTPAD_IP).unwrap_err();
        assert!(matches!(err, PlumError::InvalidAnnouncement(_)));
        assert!(parse_announcement("PLUM 8888 id 8443 extra", LIGHTPAD_IP).is_err());
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert!(parse_announcement("HELLO 1234 x y", LIGHTPAD_IP).is_err());
    }

    #[test]
    fn rejects_bad_port() {
        assert!(parse_announcement("PLUM 8888 id port", LIGHTPAD_IP).is_err());
        assert!(parse_announcement("PLUM 8888 id 70000", LIGHTPAD_IP).is_err());
        // a trailing newline is part of the fourth token
        assert!(parse_announcement("PLUM 8888 id 8443\n", LIGHTPAD_IP).is_err());
    }

    #[test]
    fn double_space_changes_token_count() {
        assert!(parse_announcement("PLUM 8888  id 8443", LIGHTPAD_IP).is_err());
    }

    #[test]
    fn routes_known_types() {
        assert_eq!(
            classify_frame(r#"{"type":"dimmerchange","Level":77}"#),
            Event::DimmerChange { level: 77 }
        );
        assert_eq!(
            classify_frame(r#"{"type":"power","Watts":42}"#),
            Event::PowerChange { watts: 42 }
        );
        assert_eq!(
            classify_frame(r#"{"type":"pirSignal","Signal":5}"#),
            Event::MotionSignal { signal: 5 }
        );
    }

    #[test]
    fn field_names_match_any_case() {
        assert_eq!(
            classify_frame(r#"{"type":"dimmerchange","level":12}"#),
            Event::DimmerChange { level: 12 }
        );
        assert_eq!(
            classify_frame(r#"{"TYPE":"power","WATTS":3}"#),
            Event::PowerChange { watts: 3 }
        );
    }

    #[test]
    fn type_tag_is_case_sensitive() {
        assert!(matches!(
            classify_frame(r#"{"type":"POWER","Watts":3}"#),
            Event::Unknown { .. }
        ));
    }

    #[test]
    fn missing_body_field_decodes_as_zero() {
        assert_eq!(classify_frame(r#"{"type":"power"}"#), Event::PowerChange { watts: 0 });
        assert_eq!(
            classify_frame(r#"{"type":"dimmerchange","Level":null}"#),
            Event::DimmerChange { level: 0 }
        );
        assert_eq!(
            classify_frame(r#"{"type":"pirSignal"}"#),
            Event::MotionSignal { signal: 0 }
        );
    }

    #[test]
    fn unknown_type_keeps_frame() {
        assert_eq!(
            classify_frame(r#"{"type":"glowchange"}"#),
            Event::Unknown {
                message: r#"{"type":"glowchange"}"#.to_string()
            }
        );
    }

    #[test]
    fn missing_type_is_unknown() {
        assert!(matches!(
            classify_frame(r#"{"Level":3}"#),
            Event::Unknown { .. }
        ));
    }

    #[test]
    fn trailing_period_is_ignored() {
        assert_eq!(
            classify_frame("{\"type\":\"power\",\"Watts\":10}.\r\n"),
            classify_frame(r#"{"type":"power","Watts":10}"#)
        );
    }

    #[test]
    fn not_json_is_malformed() {
        match classify_frame("not json") {
            Event::Malformed(FrameError::Malformed { frame, .. }) => assert_eq!(frame, "not json"),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(classify_frame("").is_malformed());
        assert!(classify_frame(".").is_malformed());
    }

    #[test]
    fn bad_payload_for_known_type_is_malformed() {
        match classify_frame(r#"{"type":"power","Watts":"lots"}"#) {
            Event::Malformed(FrameError::InvalidPayload { kind, .. }) => assert_eq!(kind, "power"),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(classify_frame(r#"{"type":"dimmerchange","Level":2.5}"#).is_malformed());
    }

    #[test]
    fn one_event_per_frame() {
        let frames = [
            r#"{"type":"dimmerchange","Level":1}"#,
            "not json",
            r#"{"type":"power","Watts":2}."#,
            r#"{"type":"glowchange"}"#,
            r#"{"type":"pirSignal"}"#,
        ];
        let events: Vec<Event> = frames.iter().map(|f| classify_frame(f)).collect();
        assert_eq!(events.len(), frames.len());
        assert_eq!(events[0], Event::DimmerChange { level: 1 });
        assert!(events[1].is_malformed());
        assert_eq!(events[2], Event::PowerChange { watts: 2 });
        assert!(matches!(events[3], Event::Unknown { .. }));
        assert_eq!(events[4], Event::MotionSignal { signal: 0 });
    }
}
