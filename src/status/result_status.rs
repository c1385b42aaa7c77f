//! Uniform result envelope
//!
//! Every table-level operation reports through a `ResultStatus`:
//!
//! ```json
//! { "status": { "code": 200, "text": "..." }, "data": ... }
//! ```
//!
//! `data` is omitted when absent. Failures always carry code 500, the error
//! text, and no data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Success code
pub const HTTP_OK: u16 = 200;

/// Failure code
pub const HTTP_INTERNAL_SERVER_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLine {
    pub code: u16,
    pub text: String,
}

/// Success or failure envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultStatus {
    status: StatusLine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl ResultStatus {
    /// Success with a message and optional data
    pub fn make_status(text: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: StatusLine {
                code: HTTP_OK,
                text: text.into(),
            },
            data,
        }
    }

    /// Success with a message and no data
    pub fn ok(text: impl Into<String>) -> Self {
        Self::make_status(text, None)
    }

    /// Failure with a message
    pub fn make_500_status(text: impl Into<String>) -> Self {
        Self {
            status: StatusLine {
                code: HTTP_INTERNAL_SERVER_ERROR,
                text: text.into(),
            },
            data: None,
        }
    }

    /// Attaches data to a success; failures stay data-free
    pub fn with_data(mut self, data: Value) -> Self {
        if self.is_ok() {
            self.data = Some(data);
        }
        self
    }

    pub fn code(&self) -> u16 {
        self.status.code
    }

    pub fn text(&self) -> &str {
        &self.status.text
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    pub fn is_ok(&self) -> bool {
        self.status.code == HTTP_OK
    }

    /// Serializes the envelope
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<E: std::error::Error> From<&E> for ResultStatus {
    fn from(err: &E) -> Self {
        Self::make_500_status(err.to_string())
    }
}
