//! Responses delivered to request completions.
//!
//! The controller never fails a request because the server reported an
//! error. It hands over the envelope together with the classification and
//! the caller decides.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CorrelationId, SessionId};

use super::envelope::{Envelope, kind};

// ============================================================================
// Classification
// ============================================================================

/// Returns `true` if an envelope reports a failure.
///
/// That is the case when `msg` is `"error"` or `"failed"`, or when a
/// non-null `error` field is present.
#[must_use]
pub fn is_error(envelope: &Envelope) -> bool {
    matches!(envelope.kind(), Some(kind::ERROR | kind::FAILED)) || envelope.error_field().is_some()
}

// ============================================================================
// SocketResponse
// ============================================================================

/// A response routed to the request that carried the same correlation id.
#[derive(Debug, Clone)]
pub struct SocketResponse {
    envelope: Envelope,
    session: SessionId,
}

impl SocketResponse {
    /// Creates a response received on `session`.
    #[inline]
    #[must_use]
    pub fn new(envelope: Envelope, session: SessionId) -> Self {
        Self { envelope, session }
    }

    /// Returns `true` if the server reported a failure.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        is_error(&self.envelope)
    }

    /// Returns the decoded envelope.
    #[inline]
    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Returns the session the response arrived on.
    #[inline]
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Returns the correlation id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<CorrelationId> {
        self.envelope.correlation_id()
    }

    /// Returns the raw response as JSON.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.envelope.into_value()
    }

    /// Returns the raw response, or an error if it was classified as one.
    ///
    /// # Errors
    ///
    /// [`Error::Application`] carrying the server's reason, message or
    /// error text, in that order of preference.
    pub fn into_result(self) -> Result<Value> {
        if !self.is_error() {
            return Ok(self.into_value());
        }

        Err(Error::application(self.error_message()))
    }

    fn error_message(&self) -> String {
        let error = self.envelope.error_field();

        let text = |value: Option<&Value>, key: &str| {
            value
                .and_then(|v| v.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        text(error, "reason")
            .or_else(|| text(error, "message"))
            .or_else(|| error.and_then(Value::as_str).map(str::to_owned))
            .or_else(|| error.map(Value::to_string))
            .or_else(|| self.envelope.kind().map(str::to_owned))
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::protocol::{Codec, JsonCodec};

    fn response(value: Value) -> SocketResponse {
        let text = value.to_string();
        SocketResponse::new(JsonCodec.decode(&text).expect("decode"), SessionId::new(1))
    }

    #[test]
    fn test_classification_table() {
        let cases = [
            (json!({"msg": "result", "id": "a"}), false),
            (json!({"msg": "error", "id": "a"}), true),
            (json!({"msg": "failed", "version": "1"}), true),
            (json!({"msg": "result", "id": "a", "error": {"error": 403}}), true),
            (json!({"msg": "error", "id": "a", "error": "boom"}), true),
            (json!({"id": "a"}), false),
            (json!({"id": "a", "error": null}), false),
            (json!({"id": "a", "error": "boom"}), true),
        ];

        for (value, expected) in cases {
            assert_eq!(response(value.clone()).is_error(), expected, "{value}");
        }
    }

    #[test]
    fn test_into_result_success() {
        let value = response(json!({"msg": "result", "id": "a", "result": 42}))
            .into_result()
            .expect("success");
        assert_eq!(value["result"], 42);
    }

    #[test]
    fn test_into_result_prefers_reason() {
        let err = response(json!({
            "msg": "result",
            "id": "a",
            "error": {"error": 403, "reason": "User has no password set"}
        }))
        .into_result()
        .unwrap_err();
        assert_eq!(err.to_string(), "Application error: User has no password set");
    }

    #[test]
    fn test_into_result_falls_back_to_kind() {
        let err = response(json!({"msg": "failed", "version": "1"}))
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "Application error: failed");
    }

    #[test]
    fn test_response_accessors() {
        let res = response(json!({"msg": "result", "id": "abc"}));
        assert_eq!(res.id(), Some(CorrelationId::from("abc")));
        assert_eq!(res.session(), SessionId::new(1));
        assert_eq!(res.envelope().kind(), Some("result"));
    }

    proptest! {
        #[test]
        fn prop_is_error_iff_error_kind_or_field(
            kind in prop_oneof![
                Just("error".to_string()),
                Just("failed".to_string()),
                "[a-z]{1,12}",
            ],
            error_field in proptest::option::of("[a-z ]{0,16}"),
        ) {
            let mut value = json!({"msg": kind.clone(), "id": "x"});
            if let Some(err) = &error_field {
                value["error"] = json!(err);
            }
            let expected = kind == "error" || kind == "failed" || error_field.is_some();
            prop_assert_eq!(response(value).is_error(), expected);
        }
    }
}
