use serde::Deserialize;

pub const DEFAULT_SHELL_HTML: &str = "<!DOCTYPE html><html><head></head><body></body></html>";
pub const DEFAULT_ENGINE_ENTRY_POINT: &str = "__engine_callback";

/// Driver settings. Every field has a default, so a partial JSON object is enough.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DriverConfig {
    /// HTML the live document is parsed from before the first batch.
    pub shell_html: String,
    /// Tag names created in the SVG namespace.
    pub svg_tags: Vec<String>,
    /// Route same-origin anchor clicks through the history collaborator.
    pub intercept_links: bool,
    /// Install the document-level `dragover` listener that allows drops.
    pub guard_dragover: bool,
    /// Global function QuickJS engines expose for callback delivery.
    pub engine_entry_point: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            shell_html: DEFAULT_SHELL_HTML.to_string(),
            svg_tags: vec!["svg".to_string(), "path".to_string()],
            intercept_links: true,
            guard_dragover: true,
            engine_entry_point: DEFAULT_ENGINE_ENTRY_POINT.to_string(),
        }
    }
}

impl DriverConfig {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn is_svg_tag(&self, name: &str) -> bool {
        self.svg_tags.iter().any(|tag| tag == name)
    }
}
