use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapter::Adapter;
use crate::payload::Payload;

/// Events every minion subscribes to.
pub const EVENT_TYPES: [&str; 6] = [
    "CreateRecord",
    "CreateAspectDefinition",
    "CreateRecordAspect",
    "PatchRecord",
    "PatchAspectDefinition",
    "PatchRecordAspect",
];

pub fn list(adapter: &dyn Adapter) -> Result<Payload> {
    let payload = adapter.get(&hook_path(adapter, None))?;
    if let Ok(hooks) = payload.as_array() {
        log::debug!("{} minion hooks registered", hooks.len());
    }
    Ok(payload)
}

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub id: String,
    pub url: String,
    pub aspects: Vec<String>,
    pub optional_aspects: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HookBody<'a> {
    id: &'a str,
    name: &'a str,
    url: &'a str,
    active: bool,
    enabled: bool,
    event_types: &'a [&'a str],
    config: HookConfig<'a>,
    retry_count: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HookConfig<'a> {
    aspects: &'a [String],
    optional_aspects: &'a [String],
    include_events: bool,
    include_records: bool,
    include_aspect_definitions: bool,
    dereference: bool,
}

pub fn create(req: &CreateRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let hook = HookBody {
        id: &req.id,
        name: &req.id,
        url: &req.url,
        active: true,
        enabled: true,
        event_types: &EVENT_TYPES,
        config: HookConfig {
            aspects: &req.aspects,
            optional_aspects: &req.optional_aspects,
            include_events: false,
            include_records: true,
            include_aspect_definitions: false,
            dereference: true,
        },
        retry_count: 0,
    };
    let body = serde_json::to_vec_pretty(&hook).context("serialize hook")?;
    log::debug!("registering minion {} -> {}", req.id, req.url);
    Ok(adapter.post(&hook_path(adapter, None), body)?)
}

pub fn delete(id: &str, adapter: &dyn Adapter) -> Result<Payload> {
    Ok(adapter.delete(&hook_path(adapter, Some(id)))?)
}

fn hook_path(adapter: &dyn Adapter, id: Option<&str>) -> String {
    let base = if adapter.skip_gateway() {
        "/v0/hooks"
    } else {
        "/api/v0/registry/hooks"
    };
    match id {
        Some(id) => format!("{}/{}", base, urlencoding::encode(id)),
        None => base.to_string(),
    }
}
