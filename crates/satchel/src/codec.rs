//! Blob encoding for session values and session data.
//!
//! A [`Codec`] turns typed values into opaque bytes and back. Decoding an
//! empty or truncated blob is not an error: it yields `Ok(None)` so callers
//! can treat it as "no data present".

use std::io::ErrorKind;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Encode/decode pair used for both individual session values and whole blobs.
pub trait Codec: Send + Sync + 'static {
    /// Encode a value into a blob.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a blob into a value.
    ///
    /// Returns `Ok(None)` when the input ends before a value could be read.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Option<T>>;
}

/// MessagePack codec backed by `rmp-serde`. The default for sessions.
///
/// Structs are written as maps keyed by field name, so adding a field with a
/// default does not break blobs written by an older build.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl MsgPackCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for MsgPackCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Option<T>> {
        use rmp_serde::decode::Error as DecodeError;

        match rmp_serde::from_slice(bytes) {
            Ok(value) => Ok(Some(value)),
            Err(DecodeError::InvalidMarkerRead(e) | DecodeError::InvalidDataRead(e))
                if e.kind() == ErrorKind::UnexpectedEof =>
            {
                Ok(None)
            }
            Err(e) => Err(Error::Codec(e.to_string())),
        }
    }
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Compact JSON output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented JSON output, handy when inspecting files on disk.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Option<T>> {
        match serde_json::from_slice(bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_eof() => Ok(None),
            Err(e) => Err(Error::Codec(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_msgpack_empty_blob_is_no_data() {
        let codec = MsgPackCodec::new();
        let decoded: Option<BTreeMap<String, Vec<u8>>> = codec.decode(b"").unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_msgpack_truncated_blob_is_no_data() {
        let codec = MsgPackCodec::new();
        let blob = codec.encode(&vec![1u32, 2, 3]).unwrap();

        let decoded: Option<Vec<u32>> = codec.decode(&blob[..blob.len() - 1]).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_msgpack_wrong_shape_is_error() {
        let codec = MsgPackCodec::new();
        let blob = codec.encode("a string").unwrap();
        let result: Result<Option<BTreeMap<String, u8>>> = codec.decode(&blob);
        assert!(matches!(result, Err(Error::Codec(_))));
    }

    #[test]
    fn test_msgpack_round_trip() {
        let codec = MsgPackCodec::new();
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), "alice".to_string());

        let blob = codec.encode(&map).unwrap();
        let back: BTreeMap<String, String> = codec.decode(&blob).unwrap().unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_empty_blob_is_no_data() {
        let codec = JsonCodec::new();
        let decoded: Option<BTreeMap<String, Vec<u8>>> = codec.decode(b"").unwrap();
        assert!(decoded.is_none());

        let decoded: Option<i64> = codec.decode(b"   ").unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_truncated_blob_is_no_data() {
        let codec = JsonCodec::new();
        let decoded: Option<Vec<u32>> = codec.decode(b"[1, 2").unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_garbage_is_error() {
        let codec = JsonCodec::new();
        let result: Result<Option<i64>> = codec.decode(b"not json");
        assert!(matches!(result, Err(Error::Codec(_))));
    }

    #[test]
    fn test_pretty_output_decodes() {
        let codec = JsonCodec::pretty();
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), vec![1u8, 2]);

        let blob = codec.encode(&map).unwrap();
        assert!(blob.contains(&b'\n'));

        let back: BTreeMap<String, Vec<u8>> = codec.decode(&blob).unwrap().unwrap();
        assert_eq!(back, map);
    }
}
