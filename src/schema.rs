use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::adapter::Adapter;
use crate::payload::Payload;
use crate::record::current_name;

pub fn list(adapter: &dyn Adapter) -> Result<Payload> {
    let payload = adapter.get(&aspect_path(adapter, None))?;
    if let Ok(schemas) = payload.as_array() {
        log::debug!("{} aspect schemas defined", schemas.len());
    }
    Ok(payload)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateRequest {
    pub id: String,
    pub name: String,
    #[serde(rename = "jsonSchema")]
    pub schema: Map<String, Value>,
}

pub type UpdateRequest = CreateRequest;

pub fn create(req: &CreateRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let body = serde_json::to_vec_pretty(req).context("serialize schema")?;
    Ok(adapter.post(&aspect_path(adapter, None), body)?)
}

pub fn read(id: &str, adapter: &dyn Adapter) -> Result<Payload> {
    Ok(adapter.get(&aspect_path(adapter, Some(id)))?)
}

pub fn update(req: &UpdateRequest, adapter: &dyn Adapter) -> Result<Payload> {
    let path = aspect_path(adapter, Some(&req.id));
    let mut schema = req.clone();
    if schema.name.is_empty() {
        schema.name = current_name(adapter, &path)
            .with_context(|| format!("looking up name of schema {}", req.id))?;
        log::debug!("keeping existing schema name {:?}", schema.name);
    }
    let body = serde_json::to_vec_pretty(&schema).context("serialize schema")?;
    Ok(adapter.put(&path, body)?)
}

fn aspect_path(adapter: &dyn Adapter, id: Option<&str>) -> String {
    let base = if adapter.skip_gateway() {
        "/v0/aspects"
    } else {
        "/api/v0/registry/aspects"
    };
    match id {
        Some(id) => format!("{}/{}", base, urlencoding::encode(id)),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterError;
    use crate::test_support::RecordingAdapter;
    use serde_json::json;

    fn schema_body() -> Map<String, Value> {
        let schema = json!({"type": "object", "properties": {"n": {"type": "number"}}});
        schema.as_object().cloned().unwrap()
    }

    #[test]
    fn list_and_read_paths() {
        let adapter = RecordingAdapter::new();
        list(&adapter).unwrap();
        read("dcat-dataset-strings", &adapter).unwrap();
        let direct = RecordingAdapter::direct();
        read("source", &direct).unwrap();

        let calls = adapter.calls();
        assert_eq!(calls[0].path, "/api/v0/registry/aspects");
        assert_eq!(
            calls[1].path,
            "/api/v0/registry/aspects/dcat-dataset-strings"
        );
        assert_eq!(direct.calls()[0].path, "/v0/aspects/source");
    }

    #[test]
    fn create_posts_json_schema() {
        let adapter = RecordingAdapter::new();
        let req = CreateRequest {
            id: "rating".to_string(),
            name: "Rating".to_string(),
            schema: schema_body(),
        };
        create(&req, &adapter).unwrap();
        let call = &adapter.calls()[0];
        assert_eq!(call.method, "POST");
        assert_eq!(call.path, "/api/v0/registry/aspects");
        let expected = json!({"id": "rating", "name": "Rating", "jsonSchema": schema_body()});
        assert_eq!(call.body_json(), expected);
    }

    #[test]
    fn update_keeps_existing_name() {
        let current = json!({"id": "rating", "name": "Rating", "jsonSchema": {}});
        let adapter = RecordingAdapter::direct().respond_json(current);
        let req = UpdateRequest {
            id: "rating".to_string(),
            schema: schema_body(),
            ..Default::default()
        };
        update(&req, &adapter).unwrap();
        let calls = adapter.calls();
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].path, "/v0/aspects/rating");
        assert_eq!(calls[1].method, "PUT");
        assert_eq!(calls[1].path, "/v0/aspects/rating");
        assert_eq!(calls[1].body_json()["name"], json!("Rating"));
    }

    #[test]
    fn read_missing_schema_is_not_found() {
        let adapter = RecordingAdapter::new().respond_err(AdapterError::NotFound {
            path: "/api/v0/registry/aspects/missing-id".to_string(),
        });
        let err = read("missing-id", &adapter).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdapterError>(),
            Some(AdapterError::NotFound { .. })
        ));
    }

    #[test]
    fn update_without_name_attribute_is_an_error() {
        let adapter = RecordingAdapter::new().respond_json(json!({"id": "rating"}));
        let req = UpdateRequest {
            id: "rating".to_string(),
            ..Default::default()
        };
        assert!(update(&req, &adapter).is_err());
        assert_eq!(adapter.calls().len(), 1);
    }
}
