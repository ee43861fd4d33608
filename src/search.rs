use anyhow::Result;

use crate::adapter::Adapter;
use crate::payload::Payload;
use crate::query::QueryString;

#[derive(Debug, Clone)]
pub struct DatasetSearchRequest {
    pub query: String,
    pub offset: i64,
    pub limit: i64,
    /// Organisation names to filter by.
    pub publishers: Vec<String>,
}

impl Default for DatasetSearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            offset: -1,
            limit: -1,
            publishers: Vec::new(),
        }
    }
}

pub fn datasets(req: &DatasetSearchRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let path = if adapter.skip_gateway() {
        "/v0/datasets"
    } else {
        "/api/v0/search/datasets"
    };
    let mut q = QueryString::new();
    q.push_non_empty("query", &req.query);
    q.push_index("start", req.offset);
    q.push_index("limit", req.limit);
    for publisher in &req.publishers {
        q.push_non_empty("publisher", publisher);
    }
    Ok(adapter.get(&q.append_to(path.to_string()))?)
}
