use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RFC 6902 operation on an aspect document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Copy { from: String, path: String },
    Move { from: String, path: String },
}
