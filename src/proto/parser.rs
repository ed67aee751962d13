// src/proto/parser.rs
use std::{collections::BTreeMap, str::FromStr};

use thiserror::Error;

use super::command::{BridgeMsg, LineLevel};
use crate::codec::Protocol;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("missing tag")]
    MissingTag,
    #[error("malformed key=value pair: {0}")]
    BadPair(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid integer for {0}: {1}")]
    BadInt(&'static str, String),
    #[error("invalid enum for {0}: {1}")]
    BadEnum(&'static str, String),
    #[error("invalid timing list for {0}: {1}")]
    BadTimings(&'static str, String),
    #[error("unknown tag: {0}")]
    UnknownTag(String),
}

/// Public API: serialize a message to a CRLF-terminated line.
pub fn format_msg(msg: &BridgeMsg) -> String {
    use BridgeMsg as M;
    let mut out = String::new();

    macro_rules! push_pair {
        ($k:literal, $v:expr) => {{
            out.push(' ');
            out.push_str($k);
            out.push('=');
            out.push_str(&$v.to_string());
        }};
    }

    out.push_str(msg.tag());
    match msg {
        M::Hello { id } | M::Ack { id } => {
            push_pair!("id", id);
        }

        M::Level { level } => {
            push_pair!("level", level_to_str(*level));
        }
        M::Led { on } => {
            push_pair!("state", if *on { "on" } else { "off" });
        }

        M::Encode {
            protocol,
            value,
            bits,
        } => {
            push_pair!("type", protocol_to_str(Some(*protocol)));
            push_pair!("value", format!("0x{:08X}", value));
            push_pair!("bits", bits);
        }
        M::EncodeRaw { khz, timings } => {
            push_pair!("khz", khz);
            push_pair!("timings", join_timings(timings));
        }
        M::CaptureDone {
            protocol,
            value,
            bits,
            raw,
        } => {
            push_pair!("type", protocol_to_str(*protocol));
            push_pair!("value", format!("0x{:08X}", value));
            push_pair!("bits", bits);
            push_pair!("raw", join_timings(raw));
        }

        M::Err { reason } => {
            push_pair!("reason", escape_reason(reason));
        }

        M::Sense | M::CaptureArm | M::CapturePoll | M::CapturePending | M::Ok => {}
    }

    out.push_str("\r\n");
    out
}

/// Public API: parse a CR/LF-terminated line into a message.
pub fn parse_msg(line: &str) -> Result<BridgeMsg, ParseError> {
    let s = line.trim_matches(|c| c == '\r' || c == '\n' || c == ' ');
    if s.is_empty() {
        return Err(ParseError::Empty);
    }

    // Everything before the first k=v token is the (possibly multi-word) tag.
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let kv_start = tokens
        .iter()
        .position(|t| t.contains('='))
        .unwrap_or(tokens.len());
    if kv_start == 0 {
        return Err(ParseError::MissingTag);
    }
    let tag = tokens[..kv_start].join(" ");
    let mut map = BTreeMap::<String, String>::new();

    for &tok in &tokens[kv_start..] {
        let (k, v) = tok
            .split_once('=')
            .ok_or_else(|| ParseError::BadPair(tok.to_string()))?;
        if k.is_empty() {
            return Err(ParseError::BadPair(tok.to_string()));
        }
        map.insert(k.to_string(), v.to_string());
    }

    use BridgeMsg as M;

    match tag.as_str() {
        // ---- Discovery
        "HELLO" => Ok(M::Hello {
            id: req_s(&map, "id")?.to_string(),
        }),
        "ACK" => Ok(M::Ack {
            id: req_s(&map, "id")?.to_string(),
        }),

        // ---- Pins
        "SENSE" => Ok(M::Sense),
        "LEVEL" => Ok(M::Level {
            level: req_enum(&map, "level")?,
        }),
        "LED" => {
            let v = req_s(&map, "state")?;
            let on = match v.to_ascii_lowercase().as_str() {
                "on" => true,
                "off" => false,
                _ => return Err(ParseError::BadEnum("state", v.to_string())),
            };
            Ok(M::Led { on })
        }

        // ---- Codec
        "ENCODE" => Ok(M::Encode {
            protocol: req_enum(&map, "type")?,
            value: req_hex_u32(&map, "value")?,
            bits: req_u8(&map, "bits")?,
        }),
        "ENCODE RAW" => Ok(M::EncodeRaw {
            khz: req_u32(&map, "khz")?,
            timings: req_timings(&map, "timings")?,
        }),
        "CAPTURE ARM" => Ok(M::CaptureArm),
        "CAPTURE POLL" => Ok(M::CapturePoll),
        "CAPTURE PENDING" => Ok(M::CapturePending),
        "CAPTURE DONE" => {
            let ty = req_s(&map, "type")?;
            let protocol = if ty.eq_ignore_ascii_case("unknown") {
                None
            } else {
                Some(
                    Protocol::from_str(ty)
                        .map_err(|_| ParseError::BadEnum("type", ty.to_string()))?,
                )
            };
            Ok(M::CaptureDone {
                protocol,
                value: req_hex_u32(&map, "value")?,
                bits: req_u8(&map, "bits")?,
                raw: req_timings(&map, "raw")?,
            })
        }

        // ---- Generic replies
        "OK" => Ok(M::Ok),
        "ERR" => Ok(M::Err {
            reason: map
                .get("reason")
                .map(|s| unescape_reason(s))
                .unwrap_or_default(),
        }),

        _ => Err(ParseError::UnknownTag(tag)),
    }
}

/* ---------- helpers ---------- */

fn req_s<'a>(map: &'a BTreeMap<String, String>, k: &'static str) -> Result<&'a str, ParseError> {
    map.get(k)
        .map(|s| s.as_str())
        .ok_or(ParseError::MissingField(k))
}

fn req_u8(map: &BTreeMap<String, String>, k: &'static str) -> Result<u8, ParseError> {
    map.get(k).ok_or(ParseError::MissingField(k)).and_then(|v| {
        v.parse::<u8>()
            .map_err(|_| ParseError::BadInt(k, v.clone()))
    })
}
fn req_u32(map: &BTreeMap<String, String>, k: &'static str) -> Result<u32, ParseError> {
    map.get(k).ok_or(ParseError::MissingField(k)).and_then(|v| {
        v.parse::<u32>()
            .map_err(|_| ParseError::BadInt(k, v.clone()))
    })
}
fn req_hex_u32(map: &BTreeMap<String, String>, k: &'static str) -> Result<u32, ParseError> {
    map.get(k).ok_or(ParseError::MissingField(k)).and_then(|v| {
        let digits = v
            .strip_prefix("0x")
            .or_else(|| v.strip_prefix("0X"))
            .unwrap_or(v);
        u32::from_str_radix(digits, 16).map_err(|_| ParseError::BadInt(k, v.clone()))
    })
}

fn req_timings(map: &BTreeMap<String, String>, k: &'static str) -> Result<Vec<u16>, ParseError> {
    let v = map.get(k).ok_or(ParseError::MissingField(k))?;
    if v.is_empty() {
        return Ok(Vec::new());
    }
    v.split(',')
        .map(|t| t.parse::<u16>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ParseError::BadTimings(k, v.clone()))
}

fn req_enum<T: FromStr>(map: &BTreeMap<String, String>, k: &'static str) -> Result<T, ParseError> {
    map.get(k)
        .ok_or(ParseError::MissingField(k))
        .and_then(|v| T::from_str(v).map_err(|_| ParseError::BadEnum(k, v.clone())))
}

fn join_timings(timings: &[u16]) -> String {
    timings
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/* ---------- enum string helpers & FromStr impls ---------- */

fn level_to_str(l: LineLevel) -> &'static str {
    match l {
        LineLevel::High => "high",
        LineLevel::Low => "low",
    }
}
fn protocol_to_str(p: Option<Protocol>) -> &'static str {
    match p {
        Some(Protocol::Nec) => "nec",
        Some(Protocol::Sony) => "sony",
        Some(Protocol::Rc5) => "rc5",
        Some(Protocol::Rc6) => "rc6",
        None => "unknown",
    }
}

impl FromStr for LineLevel {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(LineLevel::High),
            "low" => Ok(LineLevel::Low),
            _ => Err(()),
        }
    }
}

/* ---------- value escaping for reason ---------- */

fn escape_reason(s: &str) -> String {
    // Values can't contain spaces; the bridge sends underscores instead.
    s.replace(' ', "_")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}
fn unescape_reason(s: &str) -> String {
    s.replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace('_', " ")
}

/* ---------- tests ---------- */
