use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_json::ser::PrettyFormatter;
use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::layout::ResolvedLayout;
use crate::prompt::{Prompter, prompt_until};

pub const DEFAULT_PORT: &str = "2333";
const PORT_PROMPT: &str = "Please enter the port for lavalink";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOutcome {
    Skipped,
    Written { port: u64 },
}

/// Digits only; the numeric range is not checked.
pub fn is_port_input(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

pub fn ports_already_configured(layout: &ResolvedLayout) -> bool {
    layout.checkout_lavalink_json().is_file() && layout.lavalink_config.is_file()
}

pub fn configure_ports<P: Prompter + ?Sized>(
    layout: &ResolvedLayout,
    prompter: &mut P,
) -> Result<PortOutcome> {
    if ports_already_configured(layout) {
        return Ok(PortOutcome::Skipped);
    }

    let answer = prompt_until(prompter, PORT_PROMPT, Some(DEFAULT_PORT), is_port_input)?;
    let port = answer
        .parse::<u64>()
        .with_context(|| format!("port {answer} does not fit in an integer"))?;

    write_lavalink_json_port(&layout.template_lavalink_json, port)?;
    write_application_yml_port(&layout.template_application_yml, port)?;
    Ok(PortOutcome::Written { port })
}

/// Sets `nodes[0].port` and rewrites the file with four-space indentation.
pub fn write_lavalink_json_port(path: &Path, port: u64) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut data: JsonValue = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let node = data
        .get_mut("nodes")
        .and_then(JsonValue::as_array_mut)
        .and_then(|nodes| nodes.first_mut())
        .and_then(JsonValue::as_object_mut)
        .ok_or_else(|| anyhow!("{} has no nodes[0] object", path.display()))?;
    node.insert("port".to_string(), JsonValue::from(port));

    let mut rendered = Vec::with_capacity(content.len());
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut rendered, PrettyFormatter::with_indent(b"    "));
    data.serialize(&mut serializer)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), port, "updated lavalink node port");
    Ok(())
}

/// Sets `server.port`; other keys keep their order.
pub fn write_application_yml_port(path: &Path, port: u64) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut data: YamlValue = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let server = data
        .get_mut("server")
        .and_then(YamlValue::as_mapping_mut)
        .ok_or_else(|| anyhow!("{} has no server mapping", path.display()))?;
    server.insert(
        YamlValue::String("port".to_string()),
        YamlValue::Number(port.into()),
    );

    let rendered = serde_yaml::to_string(&data)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), port, "updated lavalink server port");
    Ok(())
}
