//! # Result Envelope
//!
//! Fallible backend calls answer with a [`ResultEnvelope`] instead of failing the transport.
//! Consumers match it exhaustively; nothing in this crate stores an envelope past its first use.

use super::error::ErrorCode;
use serde::{Deserialize, Serialize};

/// Tagged success/failure answer from the backend.
///
/// Serialized as `{"ok": ...}` or `{"err": "code"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultEnvelope<T> {
    Ok(T),
    Err(ErrorCode),
}

impl<T> ResultEnvelope<T> {
    pub fn is_err(&self) -> bool {
        matches!(self, ResultEnvelope::Err(_))
    }

    pub fn into_result(self) -> Result<T, ErrorCode> {
        match self {
            ResultEnvelope::Ok(value) => Ok(value),
            ResultEnvelope::Err(code) => Err(code),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultEnvelope<U> {
        match self {
            ResultEnvelope::Ok(value) => ResultEnvelope::Ok(f(value)),
            ResultEnvelope::Err(code) => ResultEnvelope::Err(code),
        }
    }
}

impl<T> From<Result<T, ErrorCode>> for ResultEnvelope<T> {
    fn from(result: Result<T, ErrorCode>) -> Self {
        match result {
            Ok(value) => ResultEnvelope::Ok(value),
            Err(code) => ResultEnvelope::Err(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_format() {
        let ok: ResultEnvelope<u32> = serde_json::from_str(r#"{"ok":7}"#).unwrap();
        assert_eq!(ok, ResultEnvelope::Ok(7));

        let err: ResultEnvelope<u32> = serde_json::from_str(r#"{"err":"unauthorized"}"#).unwrap();
        assert_eq!(err.into_result(), Err(ErrorCode::Unauthorized));
    }
}
