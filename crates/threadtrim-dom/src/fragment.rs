use crate::Layout;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Detached, owned copy of an element subtree.
///
/// Used when message blocks are stored serialized instead of as live nodes.
/// Listeners or other imperative state attached to the original node do not
/// survive the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Fragment>,
}

impl Fragment {
    /// Number of elements in the subtree, including the root.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Fragment::node_count).sum::<usize>()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Renders the subtree as HTML for diagnostics. Layout is not included.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        for (name, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape(value, true));
        }
        out.push('>');
        if self.tag == "img" {
            return;
        }
        if let Some(text) = &self.text {
            out.push_str(&escape(text, false));
        }
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn escape(input: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tag: &str) -> Fragment {
        Fragment {
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: None,
            layout: Layout::default(),
            children: Vec::new(),
        }
    }

    #[test]
    fn renders_nested_html_with_escaping() {
        let mut img = leaf("img");
        img.attrs.push(("src".to_string(), "a.png?x=1&y=\"2\"".to_string()));
        let mut block = leaf("div");
        block.attrs.push(("class".to_string(), "turn".to_string()));
        block.text = Some("1 < 2".to_string());
        block.children.push(img);

        assert_eq!(
            block.to_html(),
            r#"<div class="turn">1 &lt; 2<img src="a.png?x=1&amp;y=&quot;2&quot;"></div>"#
        );
        assert_eq!(block.node_count(), 2);
        assert_eq!(block.attribute("class"), Some("turn"));
    }
}
