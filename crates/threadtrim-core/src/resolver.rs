//! Locates the element whose direct children are the message blocks.
//!
//! The descent is greedy: at each level only the DIV child with the largest
//! scroll extent is followed. A conversation nested inside a smaller sibling
//! branch is missed; an exhaustive search would catch it at the cost of
//! walking the whole subtree.

use threadtrim_dom::{HostDom, NodeId};
use tracing::trace;

use crate::config::ResolverConfig;
use crate::placeholder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentParent {
    pub node: NodeId,
    /// Levels below the container; zero when the container itself qualifies.
    pub depth: usize,
    pub block_count: usize,
}

/// Element children with the block tag, skipping the placeholder.
pub fn block_children<D: HostDom + ?Sized>(
    dom: &D,
    node: NodeId,
    config: &ResolverConfig,
) -> Vec<NodeId> {
    dom.children(node)
        .into_iter()
        .filter(|&child| {
            dom.tag_name(child)
                .is_some_and(|tag| tag.eq_ignore_ascii_case(&config.block_tag))
                && !placeholder::is_placeholder(dom, child)
        })
        .collect()
}

pub fn is_qualifying_block<D: HostDom + ?Sized>(
    dom: &D,
    node: NodeId,
    config: &ResolverConfig,
) -> bool {
    let rect = dom.layout(node).rect;
    rect.height >= config.min_block_height && rect.width >= config.min_block_width
}

pub fn qualifying_count<D: HostDom + ?Sized>(
    dom: &D,
    node: NodeId,
    config: &ResolverConfig,
) -> usize {
    block_children(dom, node, config)
        .into_iter()
        .filter(|&child| is_qualifying_block(dom, child, config))
        .count()
}

pub fn resolve_content_parent<D: HostDom + ?Sized>(
    dom: &D,
    container: NodeId,
    config: &ResolverConfig,
) -> Option<ContentParent> {
    let mut best: Option<ContentParent> = None;
    let mut current = container;

    for depth in 0..=config.depth_cap {
        let children = block_children(dom, current, config);
        let count = children
            .iter()
            .filter(|&&child| is_qualifying_block(dom, child, config))
            .count();
        trace!(node = %current, depth, count, "Resolver level");

        if count >= 2 && best.is_none_or(|b| count > b.block_count) {
            best = Some(ContentParent {
                node: current,
                depth,
                block_count: count,
            });
        }

        let mut next: Option<(NodeId, f64)> = None;
        for child in children {
            let extent = dom.layout(child).scroll_height;
            if next.is_none_or(|(_, best_extent)| extent > best_extent) {
                next = Some((child, extent));
            }
        }
        match next {
            Some((child, _)) => current = child,
            None => break,
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::conversation_page;
    use threadtrim_dom::{Layout, MemoryDom, Rect, Viewport};

    #[test]
    fn finds_the_message_list_below_wrappers() {
        let page = conversation_page(&[400.0; 6]).unwrap();
        let resolved =
            resolve_content_parent(&page.dom, page.container, &ResolverConfig::default()).unwrap();

        assert_eq!(resolved.node, page.content_parent);
        assert_eq!(resolved.depth, 1);
        assert_eq!(resolved.block_count, 6);
    }

    #[test]
    fn requires_two_qualifying_children() {
        let page = conversation_page(&[400.0]).unwrap();
        assert_eq!(
            resolve_content_parent(&page.dom, page.container, &ResolverConfig::default()),
            None
        );
    }

    #[test]
    fn undersized_children_do_not_qualify() {
        let page = conversation_page(&[10.0, 10.0, 10.0]).unwrap();
        assert_eq!(
            resolve_content_parent(&page.dom, page.container, &ResolverConfig::default()),
            None
        );
    }

    #[test]
    fn descent_stops_at_depth_cap() {
        let mut dom = MemoryDom::new(Viewport::default(), "/c/deep");
        let mut current = dom.root();
        let container = dom.append_element(current, "div", "overflow-y-auto").unwrap();
        current = container;
        for _ in 0..5 {
            current = dom.append_element(current, "div", "wrap").unwrap();
            dom.set_layout(current, Layout::from_rect(Rect::new(0.0, 0.0, 800.0, 900.0)))
                .unwrap();
        }
        for _ in 0..3 {
            let block = dom.append_element(current, "div", "msg").unwrap();
            dom.set_layout(block, Layout::from_rect(Rect::new(0.0, 0.0, 800.0, 300.0)))
                .unwrap();
        }

        let shallow = ResolverConfig {
            depth_cap: 3,
            ..ResolverConfig::default()
        };
        assert_eq!(resolve_content_parent(&dom, container, &shallow), None);
        let deep = resolve_content_parent(&dom, container, &ResolverConfig::default()).unwrap();
        assert_eq!(deep.node, current);
        assert_eq!(deep.depth, 5);
    }
}
