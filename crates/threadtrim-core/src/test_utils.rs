//! Test utilities for threadtrim-core
//!
//! Page fixtures shared by unit and integration tests.

use threadtrim_dom::{DomError, HostDom, Layout, MemoryDom, NodeId, Rect, Viewport};

pub const FIXTURE_PATH: &str = "/c/fixture";
pub const SIDEBAR_WIDTH: f64 = 260.0;
pub const BLOCK_WIDTH: f64 = 800.0;

/// A chat-style page: a left sidebar and a main scroll pane holding one
/// flex column of message blocks.
#[derive(Debug, Clone)]
pub struct ConversationPage {
    pub dom: MemoryDom,
    pub sidebar: NodeId,
    pub container: NodeId,
    pub content_parent: NodeId,
    pub blocks: Vec<NodeId>,
}

impl ConversationPage {
    pub fn total_extent(&self) -> f64 {
        self.blocks
            .iter()
            .map(|&block| self.dom.layout(block).rect.height)
            .sum()
    }
}

/// Builds a page with one message block per entry in `heights`. Every block
/// carries text `message {i}` and an image with source `/img/{i}.png`.
pub fn conversation_page(heights: &[f64]) -> Result<ConversationPage, DomError> {
    conversation_page_at(FIXTURE_PATH, heights)
}

pub fn conversation_page_at(path: &str, heights: &[f64]) -> Result<ConversationPage, DomError> {
    let viewport = Viewport::default();
    let mut dom = MemoryDom::new(viewport, path);
    let root = dom.root();
    let total: f64 = heights.iter().sum();

    let sidebar = dom.append_element(root, "nav", "sidebar overflow-y-auto")?;
    dom.set_layout(
        sidebar,
        Layout::from_rect(Rect::new(0.0, 0.0, SIDEBAR_WIDTH, viewport.height))
            .with_scroll_height(3000.0),
    )?;

    let main_width = viewport.width - SIDEBAR_WIDTH;
    let container = dom.append_element(root, "div", "h-full overflow-y-auto")?;
    dom.set_layout(
        container,
        Layout::from_rect(Rect::new(SIDEBAR_WIDTH, 0.0, main_width, viewport.height))
            .with_scroll_height(total.max(viewport.height)),
    )?;
    dom.set_scroll_top(container, total)?;

    let content_parent = dom.append_element(container, "div", "flex flex-col")?;
    dom.set_layout(
        content_parent,
        Layout::from_rect(Rect::new(SIDEBAR_WIDTH, 0.0, main_width, total)),
    )?;

    let mut blocks = Vec::with_capacity(heights.len());
    let mut top = 0.0;
    for (i, &height) in heights.iter().enumerate() {
        let block = dom.append_element(content_parent, "div", "message")?;
        dom.set_layout(
            block,
            Layout::from_rect(Rect::new(SIDEBAR_WIDTH, top, BLOCK_WIDTH, height)),
        )?;
        dom.set_text(block, &format!("message {i}"))?;
        let image = dom.append_element(block, "img", "")?;
        dom.set_attribute(image, "src", &format!("/img/{i}.png"))?;
        top += height;
        blocks.push(block);
    }

    Ok(ConversationPage {
        dom,
        sidebar,
        container,
        content_parent,
        blocks,
    })
}

/// Appends a new message block, as a streaming reply would.
pub fn append_block(
    dom: &mut MemoryDom,
    content_parent: NodeId,
    height: f64,
) -> Result<NodeId, DomError> {
    let block = dom.append_element(content_parent, "div", "message")?;
    dom.set_layout(
        block,
        Layout::from_rect(Rect::new(SIDEBAR_WIDTH, 0.0, BLOCK_WIDTH, height)),
    )?;
    Ok(block)
}

/// Message blocks currently attached under `content_parent`, in order.
pub fn resident_blocks<D: HostDom + ?Sized>(dom: &D, content_parent: NodeId) -> Vec<NodeId> {
    dom.children(content_parent)
        .into_iter()
        .filter(|&child| !crate::placeholder::is_placeholder(dom, child))
        .collect()
}
