use crate::{ComputedStyle, DomError, HostDom, Layout, MemoryDom, NodeId, Rect, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to build document: {0}")]
    Dom(#[from] DomError),
}

/// A captured page: route, viewport and element tree with geometry.
///
/// ```json
/// {
///   "path": "/c/123",
///   "viewport": { "width": 1920, "height": 1080 },
///   "root": { "tag": "div", "class": "overflow-y-auto", "children": [] }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub viewport: Viewport,
    pub root: SnapshotNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rect: Rect,
    /// Defaults to `rect.height` when absent.
    #[serde(default)]
    pub scroll_height: Option<f64>,
    #[serde(default)]
    pub scroll_top: f64,
    /// Defaults to `rect.height` when absent.
    #[serde(default)]
    pub client_height: Option<f64>,
    #[serde(default)]
    pub style: ComputedStyle,
    /// Emit this node this many times in a row; handy for long conversations.
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    #[serde(default)]
    pub children: Vec<SnapshotNode>,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_tag() -> String {
    "div".to_string()
}

fn default_repeat() -> usize {
    1
}

impl SnapshotNode {
    fn layout(&self) -> Layout {
        Layout {
            rect: self.rect,
            scroll_height: self.scroll_height.unwrap_or(self.rect.height),
            scroll_top: self.scroll_top,
            client_height: self.client_height.unwrap_or(self.rect.height),
        }
    }

    fn build(&self, dom: &mut MemoryDom, parent: NodeId) -> Result<(), SnapshotError> {
        for _ in 0..self.repeat {
            let node = dom.create_element(&self.tag);
            if let Some(class) = &self.class {
                dom.set_attribute(node, "class", class)?;
            }
            for (name, value) in &self.attrs {
                dom.set_attribute(node, name, value)?;
            }
            if let Some(text) = &self.text {
                dom.set_text(node, text)?;
            }
            dom.set_layout(node, self.layout())?;
            dom.set_style(node, self.style)?;
            dom.insert_before(parent, node, None)?;
            for child in &self.children {
                child.build(dom, node)?;
            }
        }
        Ok(())
    }
}

impl PageSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Builds a [`MemoryDom`] with `root` appended under the document body.
    pub fn into_dom(self) -> Result<MemoryDom, SnapshotError> {
        let mut dom = MemoryDom::new(self.viewport, self.path);
        let body = dom.root();
        self.root.build(&mut dom, body)?;
        Ok(dom)
    }
}
