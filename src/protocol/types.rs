//! MCP building blocks shared by the results in [`super::messages`]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the `tools/list` catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Wire name used in `tools/call`
    pub name: String,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// What the tool does, written for the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the `arguments` object
    pub input_schema: Value,
    /// Behaviour hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Behaviour hints; every tool here only reads from AniList
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// No side effects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// Same arguments, same effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    /// Talks to a service outside this process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// Content item of a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
}

/// Implementation name and version (`serverInfo`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Capabilities announced in `initialize`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Present when the server offers tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    /// Whether `notifications/tools/list_changed` is ever sent; the catalogue is fixed
    #[serde(default)]
    pub list_changed: bool,
}
