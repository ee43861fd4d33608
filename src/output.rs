use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;

use crate::payload::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    /// Response body exactly as received.
    Raw,
}

pub fn print_payload(payload: &Payload, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Raw {
        let mut out = std::io::stdout().lock();
        return write_or_exit(&mut out, payload.as_bytes());
    }
    if payload.is_empty() {
        return Ok(());
    }
    let value = payload.as_value().context("decode response")?;
    write_stdout_line(&render(&value, format)?)
}

fn render(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => {
            let text = serde_yaml::to_string(value).context("render yaml")?;
            Ok(text.trim_end().to_string())
        }
        _ => Ok(serde_json::to_string_pretty(value)?),
    }
}

pub fn write_stdout_line(value: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    write_or_exit(&mut out, value.as_bytes())?;
    write_or_exit(&mut out, b"\n")
}

fn write_or_exit(out: &mut impl Write, bytes: &[u8]) -> Result<()> {
    if let Err(err) = out.write_all(bytes) {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_is_indented_with_two_spaces() {
        let text = render(&json!({"id": "r1", "name": "Foo"}), OutputFormat::Json).unwrap();
        assert_eq!(text, "{\n  \"id\": \"r1\",\n  \"name\": \"Foo\"\n}");
    }

    #[test]
    fn yaml_rendering() {
        let text = render(&json!({"name": "Foo", "tags": ["a"]}), OutputFormat::Yaml).unwrap();
        assert_eq!(text, "name: Foo\ntags:\n- a");
    }
}
