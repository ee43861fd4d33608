use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;

use crate::adapter::{Adapter, AdapterError};
use crate::payload::Payload;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Vec<u8>>,
}

impl RecordedCall {
    pub fn body_json(&self) -> Value {
        let body = self.body.as_deref().expect("call has no body");
        serde_json::from_slice(body).expect("body is JSON")
    }
}

/// Records every call and answers from a queue of canned responses.
/// An empty queue answers `{}`.
#[derive(Default)]
pub struct RecordingAdapter {
    skip_gateway: bool,
    responses: RefCell<VecDeque<Result<Payload, AdapterError>>>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direct() -> Self {
        Self {
            skip_gateway: true,
            ..Self::default()
        }
    }

    pub fn respond_json(self, body: Value) -> Self {
        let bytes = serde_json::to_vec(&body).expect("serialize");
        let payload = Payload::new(bytes, Some("application/json".to_string()));
        self.responses.borrow_mut().push_back(Ok(payload));
        self
    }

    pub fn respond_err(self, err: AdapterError) -> Self {
        self.responses.borrow_mut().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    fn record(
        &self,
        method: &'static str,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Payload, AdapterError> {
        self.calls.borrow_mut().push(RecordedCall {
            method,
            path: path.to_string(),
            body,
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(Payload::new(b"{}".to_vec(), None)))
    }
}

impl Adapter for RecordingAdapter {
    fn get(&self, path: &str) -> Result<Payload, AdapterError> {
        self.record("GET", path, None)
    }

    fn post(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError> {
        self.record("POST", path, Some(body))
    }

    fn put(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError> {
        self.record("PUT", path, Some(body))
    }

    fn patch(&self, path: &str, body: Vec<u8>) -> Result<Payload, AdapterError> {
        self.record("PATCH", path, Some(body))
    }

    fn delete(&self, path: &str) -> Result<Payload, AdapterError> {
        self.record("DELETE", path, None)
    }

    fn skip_gateway(&self) -> bool {
        self.skip_gateway
    }
}
