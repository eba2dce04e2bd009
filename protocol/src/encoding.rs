//! Serde helpers for byte payloads.
//!
//! Payloads travel as hex strings in JSON and as raw bytes in `bincode`,
//! matching how [`Address`](crate::Address) behaves.

/// `#[serde(with = "custody_protocol::encoding::hex_bytes")]`
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            decode(&s).map_err(serde::de::Error::custom)
        } else {
            <Vec<u8>>::deserialize(deserializer)
        }
    }

    /// Decodes hex with an optional `0x` prefix.
    pub fn decode(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(s.strip_prefix("0x").unwrap_or(s))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::hex_bytes")]
        payload: Vec<u8>,
    }

    #[test]
    fn json_hex_round_trip() {
        let w = Wrapper {
            payload: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"payload":"0xdeadbeef"}"#);
        assert_eq!(serde_json::from_str::<Wrapper>(&json).unwrap(), w);
    }

    #[test]
    fn accepts_unprefixed_hex() {
        let w: Wrapper = serde_json::from_str(r#"{"payload":"00ff"}"#).unwrap();
        assert_eq!(w.payload, vec![0x00, 0xff]);
    }

    #[test]
    fn empty_payload() {
        let w: Wrapper = serde_json::from_str(r#"{"payload":"0x"}"#).unwrap();
        assert!(w.payload.is_empty());
    }
}
