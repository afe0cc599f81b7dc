//! The single summary node standing in for detached blocks.

use threadtrim_dom::{DomError, HostDom, NodeId};

pub const PLACEHOLDER_ATTR: &str = "data-threadtrim-placeholder";
pub const PLACEHOLDER_CLASS: &str = "threadtrim-placeholder";
const HIDDEN_COUNT_ATTR: &str = "data-hidden-count";
const HIDDEN_EXTENT_ATTR: &str = "data-hidden-extent";

pub fn is_placeholder<D: HostDom + ?Sized>(dom: &D, node: NodeId) -> bool {
    dom.attribute(node, PLACEHOLDER_ATTR).is_some()
}

pub fn summary_text(hidden_count: usize, hidden_extent: f64) -> String {
    let noun = if hidden_count == 1 {
        "message"
    } else {
        "messages"
    };
    format!(
        "{hidden_count} earlier {noun} hidden ({:.0}px). Click to restore.",
        hidden_extent.max(0.0)
    )
}

/// Creates the placeholder or updates it in place, and positions it directly
/// before `anchor` (the first resident block). With no anchor it goes first.
pub fn upsert<D: HostDom + ?Sized>(
    dom: &mut D,
    content_parent: NodeId,
    existing: Option<NodeId>,
    anchor: Option<NodeId>,
    hidden_count: usize,
    hidden_extent: f64,
) -> Result<NodeId, DomError> {
    let node = match existing {
        Some(node) => node,
        None => {
            let node = dom.create_element("div");
            dom.set_attribute(node, PLACEHOLDER_ATTR, "")?;
            dom.set_attribute(node, "class", PLACEHOLDER_CLASS)?;
            dom.set_attribute(node, "role", "button")?;
            node
        }
    };

    dom.set_attribute(node, HIDDEN_COUNT_ATTR, &hidden_count.to_string())?;
    dom.set_attribute(node, HIDDEN_EXTENT_ATTR, &format!("{hidden_extent:.0}"))?;
    dom.set_text(node, &summary_text(hidden_count, hidden_extent))?;

    let reference = anchor
        .filter(|&anchor| anchor != node && dom.parent(anchor) == Some(content_parent))
        .or_else(|| dom.children(content_parent).first().copied());
    let already_placed = dom.parent(node) == Some(content_parent)
        && reference.is_some_and(|r| dom.next_sibling(node) == Some(r));
    if !already_placed {
        dom.insert_before(content_parent, node, reference)?;
    }
    Ok(node)
}

/// Detaches the placeholder if it is still attached anywhere.
pub fn remove<D: HostDom + ?Sized>(dom: &mut D, node: NodeId) -> Result<(), DomError> {
    if dom.parent(node).is_some() {
        dom.remove(node)?;
    }
    Ok(())
}

pub fn hidden_count<D: HostDom + ?Sized>(dom: &D, node: NodeId) -> Option<usize> {
    dom.attribute(node, HIDDEN_COUNT_ATTR)?.parse().ok()
}
