//! Payload envelopes
//!
//! A payload carries one encoded record together with the identifier of its
//! schema, so a receiver can pick the right factory before decoding.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};

/// Type-tagged envelope `{Type, Data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(rename = "Data")]
    pub data: PayloadData,
}

/// Encoded record body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadData {
    /// UTF-8 JSON text
    Bytes(Vec<u8>),
    /// In-process object, not encoded
    Object(serde_json::Value),
}

/// Encoder/decoder pair for [`PayloadData`]
pub trait PayloadCodec: Send + Sync {
    fn name(&self) -> &'static str;
    fn encode(&self, object: &serde_json::Value) -> Result<PayloadData>;
    fn decode(&self, data: &PayloadData) -> Result<serde_json::Value>;
}

/// JSON text as UTF-8 bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBytesCodec;

impl PayloadCodec for JsonBytesCodec {
    fn name(&self) -> &'static str {
        "json-bytes"
    }

    fn encode(&self, object: &serde_json::Value) -> Result<PayloadData> {
        serde_json::to_vec(object)
            .map(PayloadData::Bytes)
            .map_err(|e| BindingError::Encode(e.to_string()))
    }

    fn decode(&self, data: &PayloadData) -> Result<serde_json::Value> {
        match data {
            PayloadData::Bytes(bytes) => {
                serde_json::from_slice(bytes).map_err(|e| BindingError::Decode(e.to_string()))
            }
            PayloadData::Object(_) => Err(BindingError::Decode(
                "expected encoded bytes, got an object".to_string(),
            )),
        }
    }
}

/// Identity transport for in-process use
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughCodec;

impl PayloadCodec for PassThroughCodec {
    fn name(&self) -> &'static str {
        "pass-through"
    }

    fn encode(&self, object: &serde_json::Value) -> Result<PayloadData> {
        Ok(PayloadData::Object(object.clone()))
    }

    fn decode(&self, data: &PayloadData) -> Result<serde_json::Value> {
        match data {
            PayloadData::Object(object) => Ok(object.clone()),
            PayloadData::Bytes(_) => Err(BindingError::Decode(
                "expected an object, got encoded bytes".to_string(),
            )),
        }
    }
}

/// Look a built-in codec up by its configuration name.
pub fn codec_by_name(name: &str) -> Option<Arc<dyn PayloadCodec>> {
    match name {
        "json-bytes" | "json" => Some(Arc::new(JsonBytesCodec)),
        "pass-through" | "identity" => Some(Arc::new(PassThroughCodec)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_bytes_codec() {
        let codec = JsonBytesCodec;
        let data = codec.encode(&json!({"a": 1})).unwrap();
        assert_eq!(data, PayloadData::Bytes(br#"{"a":1}"#.to_vec()));
        assert_eq!(codec.decode(&data).unwrap(), json!({"a": 1}));
        assert!(codec.decode(&PayloadData::Bytes(b"{broken".to_vec())).is_err());
    }

    #[test]
    fn test_pass_through_codec() {
        let codec = PassThroughCodec;
        let data = codec.encode(&json!({"a": 1})).unwrap();
        assert_eq!(data, PayloadData::Object(json!({"a": 1})));
        assert_eq!(codec.decode(&data).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_envelope_field_names() {
        let payload = Payload {
            type_name: "https://Simple".to_string(),
            data: PayloadData::Object(json!({"x": true})),
        };
        let text = serde_json::to_value(&payload).unwrap();
        assert_eq!(text, json!({"Type": "https://Simple", "Data": {"x": true}}));
        let back: Payload = serde_json::from_value(text).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_codec_by_name() {
        assert_eq!(codec_by_name("json-bytes").map(|c| c.name()), Some("json-bytes"));
        assert_eq!(codec_by_name("pass-through").map(|c| c.name()), Some("pass-through"));
        assert!(codec_by_name("msgpack").is_none());
    }
}
