//! Codecs between typed queue values and the byte blobs a [`Driver`] stores.
//!
//! Converters run inside the queue worker, at the boundary between the
//! actor and the driver. They must be pure: no I/O beyond the bytes they
//! are handed, and every failure reported as a [`ConversionError`].
//!
//! [`Driver`]: crate::storage::Driver

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A value could not be encoded to, or decoded from, its binary form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("conversion error: {message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(err: serde_json::Error) -> Self {
        ConversionError::new(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for ConversionError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ConversionError::new(err.to_string())
    }
}

/// Converts queue values into bytes and back.
///
/// # Example: a fixed-width codec
///
/// ```rust
/// use spool_q::{ConversionError, Converter};
///
/// struct TicketConverter;
///
/// impl Converter<u32> for TicketConverter {
///     fn encode(&self, value: &u32) -> Result<Vec<u8>, ConversionError> {
///         Ok(value.to_be_bytes().to_vec())
///     }
///
///     fn decode(&self, bytes: &[u8]) -> Result<u32, ConversionError> {
///         let raw: [u8; 4] = bytes
///             .try_into()
///             .map_err(|_| ConversionError::new(format!("expected 4 bytes, got {}", bytes.len())))?;
///         Ok(u32::from_be_bytes(raw))
///     }
/// }
/// ```
pub trait Converter<T>: Send + Sync + 'static {
    /// Encode `value` into its binary representation.
    fn encode(&self, value: &T) -> Result<Vec<u8>, ConversionError>;

    /// Decode a value previously produced by [`Converter::encode`].
    fn decode(&self, bytes: &[u8]) -> Result<T, ConversionError>;
}

/// JSON codec backed by `serde_json`.
pub struct JsonConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonConverter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonConverter<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonConverter").finish()
    }
}

impl<T> Converter<T> for JsonConverter<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, ConversionError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, ConversionError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// UTF-8 text codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Converter;

impl Converter<String> for Utf8Converter {
    fn encode(&self, value: &String) -> Result<Vec<u8>, ConversionError> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, ConversionError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// Identity codec for callers that already work with bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawConverter;

impl Converter<Vec<u8>> for RawConverter {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, ConversionError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, ConversionError> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Upload {
        id: u32,
        path: String,
    }

    #[test]
    fn test_json_converter_preserves_fields() {
        let converter = JsonConverter::<Upload>::new();
        let upload = Upload {
            id: 7,
            path: "/tmp/a.bin".to_string(),
        };

        let bytes = converter.encode(&upload).unwrap();
        assert_eq!(converter.decode(&bytes).unwrap(), upload);
    }

    #[test]
    fn test_json_converter_rejects_malformed_bytes() {
        let converter = JsonConverter::<Upload>::new();
        let err = converter.decode(b"{\"id\": \"nope\"").unwrap_err();
        assert!(err.message.contains("line"), "unexpected message: {}", err);
    }

    #[test]
    fn test_utf8_converter_rejects_invalid_utf8() {
        let err = Utf8Converter.decode(&[0xff, 0xfe]).unwrap_err();
        assert!(err.to_string().starts_with("conversion error"));
    }
}
