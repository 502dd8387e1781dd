//! OSC packet to `IncomingMessage` conversion.

use log::debug;
use rosc::{OscPacket, OscType};

use tracklink_types::{IncomingMessage, RuntimeArgument, Value};

/// Strips the address prefix and converts OSC arguments into runtime values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoder {
    prefix: String,
}

impl Decoder {
    /// `prefix` is stripped from every address; an empty prefix accepts
    /// every address unchanged.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Decode a raw datagram (or TCP frame payload). Malformed data yields
    /// no messages.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Vec<IncomingMessage> {
        match rosc::decoder::decode_udp(bytes) {
            Ok((_, packet)) => self.decode_packet(&packet),
            Err(e) => {
                debug!(target: "osc", "dropping malformed packet ({} bytes): {:?}", bytes.len(), e);
                Vec::new()
            }
        }
    }

    /// Flatten a packet, bundles included, into messages in packet order.
    pub fn decode_packet(&self, packet: &OscPacket) -> Vec<IncomingMessage> {
        let mut out = Vec::new();
        self.collect(packet, &mut out);
        out
    }

    fn collect(&self, packet: &OscPacket, out: &mut Vec<IncomingMessage>) {
        match packet {
            OscPacket::Message(msg) => match self.strip(&msg.addr) {
                Some(pattern) => out.push(IncomingMessage::new(
                    pattern,
                    msg.args.iter().map(convert).collect(),
                )),
                None => debug!(target: "osc", "ignoring {} (outside {})", msg.addr, self.prefix),
            },
            OscPacket::Bundle(bundle) => {
                for p in &bundle.content {
                    self.collect(p, out);
                }
            }
        }
    }

    fn strip(&self, addr: &str) -> Option<String> {
        if self.prefix.is_empty() {
            return Some(addr.to_string());
        }
        let rest = addr.strip_prefix(&self.prefix)?;
        if rest.starts_with('/') && rest.len() > 1 {
            Some(rest.to_string())
        } else {
            None
        }
    }
}

/// Map one OSC argument to a runtime argument, keeping its wire tag.
/// Types with no runtime counterpart become `Nil` so validation rejects them.
pub fn convert(arg: &OscType) -> RuntimeArgument {
    match arg {
        OscType::Int(v) => RuntimeArgument::new('i', Value::Number(*v as f64)),
        OscType::Long(v) => RuntimeArgument::new('h', Value::Number(*v as f64)),
        OscType::Float(v) => RuntimeArgument::new('f', Value::Number(*v as f64)),
        OscType::Double(v) => RuntimeArgument::new('d', Value::Number(*v)),
        OscType::String(s) => RuntimeArgument::new('s', Value::String(s.clone())),
        OscType::Bool(b) => RuntimeArgument::boolean(*b),
        OscType::Nil => RuntimeArgument::nil(),
        other => RuntimeArgument::new(unsupported_tag(other), Value::Nil),
    }
}

fn unsupported_tag(arg: &OscType) -> char {
    match arg {
        OscType::Blob(_) => 'b',
        OscType::Time(_) => 't',
        OscType::Char(_) => 'c',
        OscType::Color(_) => 'r',
        OscType::Midi(_) => 'm',
        OscType::Inf => 'I',
        OscType::Array(_) => '[',
        _ => '?',
    }
}

#[cfg(test)]
mod tests {
    use rosc::{OscBundle, OscMessage, OscTime};

    use super::*;

    fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    #[test]
    fn strips_prefix() {
        let decoder = Decoder::new("/tracklink");
        let msgs = decoder.decode_packet(&message("/tracklink/song/bpm", vec![OscType::Int(140)]));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].pattern, "/song/bpm");
        assert_eq!(msgs[0].arguments[0].tag, 'i');
        assert_eq!(msgs[0].arguments[0].value, Value::Number(140.0));
    }

    #[test]
    fn drops_foreign_addresses() {
        let decoder = Decoder::new("/tracklink/");
        assert!(decoder.decode_packet(&message("/other/song/bpm", vec![])).is_empty());
        assert!(decoder.decode_packet(&message("/tracklinkx/song", vec![])).is_empty());
        assert!(decoder.decode_packet(&message("/tracklink", vec![])).is_empty());
    }

    #[test]
    fn trailing_slash_dropped_from_prefix() {
        assert_eq!(Decoder::new("/tracklink/").prefix(), "/tracklink");
        assert_eq!(Decoder::new("").prefix(), "");
    }

    #[test]
    fn empty_prefix_passes_through() {
        let decoder = Decoder::new("");
        let msgs = decoder.decode_packet(&message("/transport/start", vec![]));
        assert_eq!(msgs[0].pattern, "/transport/start");
    }

    #[test]
    fn bundles_flatten_in_order() {
        let decoder = Decoder::new("/tracklink");
        let inner = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![message("/tracklink/b", vec![])],
        });
        let packet = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![message("/tracklink/a", vec![]), inner, message("/tracklink/c", vec![])],
        });
        let patterns: Vec<String> = decoder
            .decode_packet(&packet)
            .into_iter()
            .map(|m| m.pattern)
            .collect();
        assert_eq!(patterns, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn argument_mapping() {
        assert_eq!(convert(&OscType::Double(0.5)).value, Value::Number(0.5));
        assert_eq!(convert(&OscType::String("x".into())).value, Value::String("x".into()));
        assert_eq!(convert(&OscType::Bool(false)).tag, 'F');
        assert_eq!(convert(&OscType::Nil).tag, 'N');

        let blob = convert(&OscType::Blob(vec![1, 2, 3]));
        assert_eq!(blob.tag, 'b');
        assert_eq!(blob.value, Value::Nil);
    }

    #[test]
    fn malformed_bytes_yield_nothing() {
        let decoder = Decoder::new("/tracklink");
        assert!(decoder.decode_bytes(b"not osc").is_empty());
    }

    #[test]
    fn decodes_encoded_bytes() {
        let decoder = Decoder::new("/tracklink");
        let bytes = rosc::encoder::encode(&message(
            "/tracklink/evaluate",
            vec![OscType::String("1+1".into())],
        ))
        .unwrap();
        let msgs = decoder.decode_bytes(&bytes);
        assert_eq!(msgs[0].pattern, "/evaluate");
        assert_eq!(msgs[0].arguments[0].value.as_str(), Some("1+1"));
    }
}
