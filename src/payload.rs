use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("not an object")]
    NotAnObject,

    #[error("not an array")]
    NotAnArray,
}

/// A response body as received. Nothing is decoded until one of the
/// accessors asks for it.
#[derive(Debug, Clone)]
pub struct Payload {
    body: Vec<u8>,
    content_type: Option<String>,
}

impl Payload {
    pub fn new(body: Vec<u8>, content_type: Option<String>) -> Self {
        Self { body, content_type }
    }

    /// Declared content type. Informational only, decoding never looks at it.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.body.iter().all(|b| b.is_ascii_whitespace())
    }

    /// Generic decode. A whitespace-only body decodes to `null`.
    pub fn as_value(&self) -> Result<Value, PayloadError> {
        if self.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body).map_err(PayloadError::Decode)
    }

    pub fn as_object(&self) -> Result<Map<String, Value>, PayloadError> {
        match self.as_value()? {
            Value::Object(map) => Ok(map),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    /// A top-level object is returned as a one-element array.
    pub fn as_array(&self) -> Result<Vec<Value>, PayloadError> {
        match self.as_value()? {
            Value::Array(items) => Ok(items),
            obj @ Value::Object(_) => Ok(vec![obj]),
            _ => Err(PayloadError::NotAnArray),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }
}
