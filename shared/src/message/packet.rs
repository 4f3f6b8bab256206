//! Socket.IO (v5) over Engine.IO (v4) text packet codec
//!
//! Only the packets a websocket-only client meets are modelled:
//!
//! | text            | packet                  |
//! |-----------------|-------------------------|
//! | `0{...}`        | Engine.IO open          |
//! | `1`             | Engine.IO close         |
//! | `2` / `3`       | ping / pong             |
//! | `40` / `40{..}` | Socket.IO connect (ack) |
//! | `41`            | Socket.IO disconnect    |
//! | `42[..]`        | Socket.IO event         |
//! | `44{..}`        | Socket.IO connect error |
//!
//! Everything else decodes as [`Packet::Other`] so the caller can skip it.
//! Only the default namespace is supported.

use super::ChannelFrame;
use crate::error::PayloadError;

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(serde_json::Value),
    Close,
    Ping,
    Pong,
    Connect(Option<serde_json::Value>),
    Disconnect,
    Event(ChannelFrame),
    ConnectError(serde_json::Value),
    Other(String),
}

impl Packet {
    /// Decode one websocket text message
    pub fn decode(text: &str) -> Result<Self, PayloadError> {
        let mut chars = text.chars();
        let Some(engine_type) = chars.next() else {
            return Err(PayloadError::InvalidPacket("empty packet".into()));
        };
        let rest = chars.as_str();

        match engine_type {
            '0' => Ok(Packet::Open(parse_json(rest)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => decode_socket_packet(rest),
            _ => Ok(Packet::Other(text.to_string())),
        }
    }

    /// Encode for sending as a websocket text message
    pub fn encode(&self) -> Result<String, PayloadError> {
        Ok(match self {
            Packet::Open(value) => format!("0{}", serde_json::to_string(value)?),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Connect(None) => "40".to_string(),
            Packet::Connect(Some(value)) => format!("40{}", serde_json::to_string(value)?),
            Packet::Disconnect => "41".to_string(),
            Packet::Event(frame) => {
                let args = serde_json::Value::Array(vec![
                    serde_json::Value::String(frame.event.clone()),
                    frame.data.clone(),
                ]);
                format!("42{}", serde_json::to_string(&args)?)
            }
            Packet::ConnectError(value) => format!("44{}", serde_json::to_string(value)?),
            Packet::Other(raw) => raw.clone(),
        })
    }
}

fn decode_socket_packet(rest: &str) -> Result<Packet, PayloadError> {
    let mut chars = rest.chars();
    let Some(socket_type) = chars.next() else {
        return Err(PayloadError::InvalidPacket("missing socket.io type".into()));
    };
    let body = chars.as_str();

    match socket_type {
        '0' if body.is_empty() => Ok(Packet::Connect(None)),
        '0' => Ok(Packet::Connect(Some(parse_json(body)?))),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(body),
        '4' => Ok(Packet::ConnectError(parse_json(body)?)),
        _ => Ok(Packet::Other(format!("4{rest}"))),
    }
}

fn decode_event(body: &str) -> Result<Packet, PayloadError> {
    if body.starts_with('/') {
        return Err(PayloadError::InvalidPacket(
            "namespaced events are not supported".into(),
        ));
    }

    // Optional ack id precedes the argument array
    let args = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let serde_json::Value::Array(mut args) = parse_json(args)? else {
        return Err(PayloadError::InvalidPacket("event arguments are not an array".into()));
    };
    if args.is_empty() {
        return Err(PayloadError::InvalidPacket("event without a name".into()));
    }

    let serde_json::Value::String(event) = args.remove(0) else {
        return Err(PayloadError::InvalidPacket("event name is not a string".into()));
    };
    let data = if args.is_empty() {
        serde_json::Value::Null
    } else {
        args.swap_remove(0)
    };

    Ok(Packet::Event(ChannelFrame::new(event, data)))
}

fn parse_json(text: &str) -> Result<serde_json::Value, PayloadError> {
    serde_json::from_str(text).map_err(PayloadError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_control_packets() {
        assert_eq!(Packet::decode("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::decode("3").unwrap(), Packet::Pong);
        assert_eq!(Packet::decode("1").unwrap(), Packet::Close);
        assert_eq!(Packet::decode("40").unwrap(), Packet::Connect(None));
        assert_eq!(Packet::decode("41").unwrap(), Packet::Disconnect);
        assert!(matches!(
            Packet::decode(r#"0{"sid":"abc","pingInterval":25000}"#).unwrap(),
            Packet::Open(v) if v["sid"] == "abc"
        ));
        assert!(matches!(
            Packet::decode(r#"40{"sid":"xyz"}"#).unwrap(),
            Packet::Connect(Some(v)) if v["sid"] == "xyz"
        ));
    }

    #[test]
    fn test_decode_event() {
        let packet =
            Packet::decode(r#"42["order-update",{"eventType":"ORDER_CREATED","data":{}}]"#).unwrap();
        let Packet::Event(frame) = packet else {
            panic!("expected event");
        };
        assert_eq!(frame.event, "order-update");
        assert_eq!(frame.data["eventType"], "ORDER_CREATED");
    }

    #[test]
    fn test_decode_event_with_ack_id_and_no_data() {
        let Packet::Event(frame) = Packet::decode(r#"4217["client-joined"]"#).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(frame.event, "client-joined");
        assert_eq!(frame.data, serde_json::Value::Null);
    }

    #[test]
    fn test_encode_join_event() {
        let text = Packet::Event(ChannelFrame::join("t1")).encode().unwrap();
        assert_eq!(text, r#"42["join",{"tenantId":"t1"}]"#);
        assert_eq!(Packet::Connect(None).encode().unwrap(), "40");
        assert_eq!(Packet::Pong.encode().unwrap(), "3");
    }

    #[test]
    fn test_event_frame_survives_encode_decode() {
        let frame = ChannelFrame::new("order-update", json!({ "eventType": "PAYMENT_STATUS_UPDATE" }));
        let text = Packet::Event(frame.clone()).encode().unwrap();
        assert_eq!(Packet::decode(&text).unwrap(), Packet::Event(frame));
    }

    #[test]
    fn test_invalid_packets() {
        assert!(Packet::decode("").is_err());
        assert!(Packet::decode("4").is_err());
        assert!(Packet::decode("42{not json").is_err());
        assert!(Packet::decode(r#"42/admin,["x",1]"#).is_err());
        assert!(Packet::decode("42[]").is_err());
        assert!(Packet::decode("42[1,2]").is_err());
        assert!(matches!(Packet::decode("6").unwrap(), Packet::Other(_)));
    }
}
