use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::adapter::Adapter;
use crate::patch::PatchOp;
use crate::payload::Payload;
use crate::query::{QueryString, QueryTerm};

#[derive(Debug, Clone)]
pub struct ListRequest {
    /// Comma separated aspect names.
    pub aspects: String,
    pub and_query: Vec<QueryTerm>,
    pub or_query: Vec<QueryTerm>,
    pub page_token: String,
    pub offset: i64,
    pub limit: i64,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            aspects: String::new(),
            and_query: Vec::new(),
            or_query: Vec::new(),
            page_token: String::new(),
            offset: -1,
            limit: -1,
        }
    }
}

pub fn list(req: &ListRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let mut q = QueryString::new();
    q.push_list("aspect", &req.aspects);
    q.push_terms("aspectQuery", &req.and_query);
    q.push_terms("aspectOrQuery", &req.or_query);
    q.push_non_empty("pageToken", &req.page_token);
    q.push_index("start", req.offset);
    q.push_index("limit", req.limit);
    let path = q.append_to(record_path(adapter, None));
    Ok(adapter.get(&path)?)
}

/// Body of a record create or update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateRequest {
    pub id: String,
    pub name: String,
    pub aspects: Map<String, Value>,
    #[serde(rename = "sourceTag", skip_serializing_if = "Option::is_none")]
    pub source_tag: Option<String>,
}

pub type UpdateRequest = CreateRequest;

pub fn create(req: &CreateRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let mut record = req.clone();
    if record.id.is_empty() {
        record.id = Uuid::new_v4().to_string();
        log::debug!("generated record id {}", record.id);
    }
    let body = serde_json::to_vec_pretty(&record).context("serialize record")?;
    Ok(adapter.post(&record_path(adapter, None), body)?)
}

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub id: String,
    /// Comma separated aspects to include in the full record.
    pub add_aspects: String,
    /// Return only this aspect.
    pub aspect: String,
}

pub fn read(req: &ReadRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let path = if !req.add_aspects.is_empty() {
        let mut q = QueryString::new();
        q.push_list("aspect", &req.add_aspects);
        q.append_to(record_path(adapter, Some(&req.id)))
    } else if !req.aspect.is_empty() {
        aspect_path(adapter, &req.id, &req.aspect)
    } else {
        format!(
            "{}/summary/{}",
            record_path(adapter, None),
            urlencoding::encode(&req.id)
        )
    };
    Ok(adapter.get(&path)?)
}

/// The registry requires `name` on update. Without one the current name is
/// read first and the update is not sent if that fails.
pub fn update(req: &UpdateRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let path = record_path(adapter, Some(&req.id));
    let mut record = req.clone();
    if record.name.is_empty() {
        record.name = current_name(adapter, &path)
            .with_context(|| format!("looking up name of record {}", req.id))?;
        log::debug!("keeping existing record name {:?}", record.name);
    }
    let body = serde_json::to_vec_pretty(&record).context("serialize record")?;
    Ok(adapter.put(&path, body)?)
}

/// Fetches `path` and returns its `name` attribute.
pub(crate) fn current_name(adapter: &dyn Adapter, path: &str) -> Result<String> {
    let obj = adapter.get(path)?.as_object().map_err(|err| {
        log::error!("no object found in body of {}: {}", path, err);
        err
    })?;
    match obj.get("name") {
        Some(Value::String(name)) => Ok(name.clone()),
        _ => {
            log::error!("no 'name' attribute in {}", path);
            Err(anyhow!("response for {path} has no 'name' attribute"))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub id: String,
    /// Delete only this aspect.
    pub aspect_name: String,
}

pub fn delete(req: &DeleteRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let path = if req.aspect_name.is_empty() {
        record_path(adapter, Some(&req.id))
    } else {
        aspect_path(adapter, &req.id, &req.aspect_name)
    };
    Ok(adapter.delete(&path)?)
}

#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub id: String,
    pub event_id: String,
    pub page_token: String,
    pub offset: i64,
    pub limit: i64,
}

impl Default for HistoryRequest {
    fn default() -> Self {
        Self {
            id: String::new(),
            event_id: String::new(),
            page_token: String::new(),
            offset: -1,
            limit: -1,
        }
    }
}

pub fn history(req: &HistoryRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let mut path = format!("{}/history", record_path(adapter, Some(&req.id)));
    if !req.event_id.is_empty() {
        path = format!("{}/{}", path, urlencoding::encode(&req.event_id));
    }
    let mut q = QueryString::new();
    q.push_non_empty("pageToken", &req.page_token);
    q.push_index("start", req.offset);
    q.push_index("limit", req.limit);
    Ok(adapter.get(&q.append_to(path))?)
}

#[derive(Debug, Clone, Default)]
pub struct PatchAspectRequest {
    pub id: String,
    pub aspect: String,
    pub patch: Vec<PatchOp>,
}

pub fn patch_aspect(req: &PatchAspectRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let path = aspect_path(adapter, &req.id, &req.aspect);
    let body = serde_json::to_vec_pretty(&req.patch).context("serialize patch")?;
    Ok(adapter.patch(&path, body)?)
}

pub fn record_path(adapter: &dyn Adapter, id: Option<&str>) -> String {
    let base = if adapter.skip_gateway() {
        "/v0/records"
    } else {
        "/api/v0/registry/records"
    };
    match id {
        Some(id) => format!("{}/{}", base, urlencoding::encode(id)),
        None => base.to_string(),
    }
}

fn aspect_path(adapter: &dyn Adapter, id: &str, aspect: &str) -> String {
    format!(
        "{}/aspects/{}",
        record_path(adapter, Some(id)),
        urlencoding::encode(aspect)
    )
}
