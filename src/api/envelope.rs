//! Uniform response envelope
//!
//! Every endpoint answers `{success, data?, error?, errorCode?, debug?}`.
//! Degraded responses keep a well-formed `data` payload so clients can
//! render a reduced experience instead of an error page.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

impl<T: Serialize> ResponseEnvelope<T> {
    /// Successful response
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
            debug: None,
        }
    }

    /// Failed response that still carries an empty-but-well-formed payload
    pub fn degraded(data: T, error: impl Into<String>, error_code: &'static str) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error.into()),
            error_code: Some(error_code),
            debug: None,
        }
    }

    pub fn with_debug(mut self, debug: Value) -> Self {
        self.debug = Some(debug);
        self
    }
}
