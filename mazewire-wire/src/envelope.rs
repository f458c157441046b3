//! Response envelope for successful API calls.

use crate::error::WireError;
use crate::value::Value;

/// Decoded body of a 200 response: `{body, warn?}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// Endpoint-specific payload; `Nil` if the server sent none.
    pub body: Value,
    /// Human-readable warnings to surface to the operator.
    pub warn: Vec<String>,
}

impl Envelope {
    /// Creates an envelope without warnings.
    pub fn ok(body: impl Into<Value>) -> Self {
        Self {
            body: body.into(),
            warn: Vec::new(),
        }
    }

    /// Appends a warning for the operator.
    pub fn with_warning(mut self, msg: impl Into<String>) -> Self {
        self.warn.push(msg.into());
        self
    }

    /// Interprets a decoded value as an envelope.
    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let kind = value.kind();
        let Value::Map(mut fields) = value else {
            return Err(WireError::Envelope(format!("expected map, got {}", kind)));
        };

        let body = fields.remove("body").unwrap_or(Value::Nil);
        let warn = match fields.remove("warn") {
            None | Some(Value::Nil) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(WireError::Envelope(format!(
                        "warning is {}, not a string",
                        other.kind()
                    ))),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(WireError::Envelope(format!(
                    "warn is {}, not an array",
                    other.kind()
                )))
            }
        };

        Ok(Self { body, warn })
    }

    /// Builds the wire value; `warn` is omitted when empty.
    pub fn to_value(&self) -> Value {
        let mut v = Value::map();
        v.insert("body", self.body.clone());
        if !self.warn.is_empty() {
            v.insert(
                "warn",
                Value::Array(self.warn.iter().cloned().map(Value::String).collect()),
            );
        }
        v
    }

    /// Returns whether the server attached any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warn.is_empty()
    }
}
