//! Envelope codec.
//!
//! The [`Codec`] trait is the seam between the controller and the wire
//! format. [`JsonCodec`] implements it with `serde_json`, one JSON object
//! per text frame.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;

use super::envelope::{Envelope, ID_FIELD};

// ============================================================================
// Codec
// ============================================================================

/// Encodes outbound messages and decodes inbound frames.
pub trait Codec: Send + Sync + 'static {
    /// Returns a fresh correlation id.
    fn new_correlation_id(&self) -> CorrelationId {
        CorrelationId::generate()
    }

    /// Produces wire text from a structured message.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] or [`Error::Json`] if the message cannot be
    /// serialized.
    fn encode(&self, message: &Value) -> Result<String>;

    /// Parses wire text into an envelope.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if the text is not a structured message.
    fn decode(&self, text: &str) -> Result<Envelope>;
}

// ============================================================================
// JsonCodec
// ============================================================================

/// JSON text codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &Value) -> Result<String> {
        Ok(serde_json::to_string(message)?)
    }

    fn decode(&self, text: &str) -> Result<Envelope> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => Ok(Envelope::new(fields)),
            Ok(other) => Err(Error::decode(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
            Err(e) => Err(Error::decode(e.to_string())),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds an outbound message from a caller payload, injecting `id`.
///
/// The payload is serialized into a fresh value, so caller data is never
/// touched. An existing `id` field is overwritten.
///
/// # Errors
///
/// - [`Error::Json`] if the payload cannot be serialized
/// - [`Error::Encoding`] if it does not serialize to a JSON object
pub fn with_correlation_id<T>(payload: &T, id: Option<&CorrelationId>) -> Result<Value>
where
    T: Serialize + ?Sized,
{
    let mut value = serde_json::to_value(payload)?;

    let fields = match &mut value {
        Value::Object(fields) => fields,
        other => {
            return Err(Error::encoding(format!(
                "payload must be a JSON object, got {}",
                json_type_name(other)
            )));
        }
    };

    if let Some(id) = id {
        fields.insert(ID_FIELD.to_string(), Value::String(id.as_str().to_owned()));
    }

    Ok(value)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
