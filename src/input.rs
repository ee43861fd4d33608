use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Auto,
    Json,
    Yaml,
}

impl InputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "auto" => Ok(Self::Auto),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(anyhow!(
                "invalid --input-format value {other} (expected: auto|json|yaml)"
            )),
        }
    }
}

/// Loads a JSON or YAML document from `-` (stdin) or a file path. Paths may
/// carry an `@` or `file://` prefix.
pub fn load_value(source: &str, format: InputFormat) -> Result<Value> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read stdin")?;
        return parse(&text, format, "stdin");
    }
    let path = local_path(source);
    let origin = path.display().to_string();
    let text = std::fs::read_to_string(&path).with_context(|| format!("read {origin}"))?;
    let format = match format {
        InputFormat::Auto if is_yaml_path(&path) => InputFormat::Yaml,
        InputFormat::Auto => InputFormat::Json,
        explicit => explicit,
    };
    parse(&text, format, &origin)
}

/// Like [`load_value`] but the document must be an object.
pub fn load_object(source: &str, format: InputFormat) -> Result<Map<String, Value>> {
    match load_value(source, format)? {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("{source} must contain a JSON/YAML object")),
    }
}

fn parse(text: &str, format: InputFormat, origin: &str) -> Result<Value> {
    match format {
        InputFormat::Json => {
            serde_json::from_str(text).with_context(|| format!("invalid JSON in {origin}"))
        }
        InputFormat::Yaml => {
            serde_yaml::from_str(text).with_context(|| format!("invalid YAML in {origin}"))
        }
        InputFormat::Auto => serde_json::from_str(text).or_else(|_| {
            serde_yaml::from_str(text)
                .with_context(|| format!("{origin} is neither valid JSON nor YAML"))
        }),
    }
}

fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

fn local_path(value: &str) -> PathBuf {
    if let Some(path) = value.strip_prefix('@') {
        return PathBuf::from(path);
    }
    if let Some(path) = value.strip_prefix("file://") {
        return PathBuf::from(path);
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn json_file_by_extension_and_prefixes() {
        let file = temp_file(".json", r#"{"type": "object"}"#);
        let path = file.path().display().to_string();
        assert_eq!(
            load_value(&path, InputFormat::Auto).unwrap(),
            json!({"type": "object"})
        );
        assert!(load_object(&format!("@{path}"), InputFormat::Auto).is_ok());
        assert!(load_object(&format!("file://{path}"), InputFormat::Json).is_ok());
    }

    #[test]
    fn yaml_file_by_extension() {
        let file = temp_file(".yaml", "type: object\nrequired:\n  - name\n");
        let value = load_value(&file.path().display().to_string(), InputFormat::Auto).unwrap();
        assert_eq!(value, json!({"type": "object", "required": ["name"]}));
    }

    #[test]
    fn explicit_format_overrides_extension() {
        let file = temp_file(".txt", "a: 1\n");
        let path = file.path().display().to_string();
        assert!(load_value(&path, InputFormat::Auto).is_err());
        let value = load_value(&path, InputFormat::Yaml).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn auto_falls_back_to_yaml() {
        assert_eq!(
            parse("- op: remove\n  path: /a\n", InputFormat::Auto, "stdin").unwrap(),
            json!([{"op": "remove", "path": "/a"}])
        );
    }

    #[test]
    fn object_required_and_missing_files_reported() {
        let file = temp_file(".json", "[1, 2]");
        assert!(load_object(&file.path().display().to_string(), InputFormat::Auto).is_err());
        let err = load_value("/definitely/not/here.json", InputFormat::Auto).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn input_format_values() {
        assert_eq!(InputFormat::parse("yaml").unwrap(), InputFormat::Yaml);
        assert!(InputFormat::parse("toml").is_err());
    }
}
