//! Budgeted detachment of the oldest message blocks.
//!
//! A pass always starts from a fully restored content parent so that every
//! height is measured fresh. All geometry is read in one pass before the
//! first write to the page.

mod cut;

pub use cut::{CutPlan, compute_cut};

use serde::Serialize;
use threadtrim_dom::{HostDom, NodeId};
use tracing::{debug, warn};

use crate::config::{DetachStrategy, ResolverConfig, WindowConfig};
use crate::error::Result;
use crate::ledger::{BlockPayload, Ledger, LedgerEntry, UnloadedResource};
use crate::placeholder;
use crate::resolver;
use crate::restore;

const IMAGE_SOURCE_ATTRS: [&str; 2] = ["src", "srcset"];

/// Windowing state owned by a session once a content parent is known.
#[derive(Debug, Clone)]
pub struct WindowState {
    pub content_parent: NodeId,
    pub ledger: Ledger,
    pub placeholder: Option<NodeId>,
    /// Measured extent of every block at the last pass, hidden or not.
    pub total_extent: f64,
}

impl WindowState {
    pub fn new(content_parent: NodeId) -> Self {
        Self {
            content_parent,
            ledger: Ledger::new(),
            placeholder: None,
            total_extent: 0.0,
        }
    }

    pub fn hidden_extent(&self) -> f64 {
        self.ledger.total_extent()
    }

    pub fn visible_extent(&self) -> f64 {
        (self.total_extent - self.hidden_extent()).max(0.0)
    }

    pub fn is_windowed(&self) -> bool {
        !self.ledger.is_empty()
    }

    pub fn outcome(&self) -> WindowOutcome {
        WindowOutcome {
            hidden_count: self.ledger.len(),
            hidden_extent: self.hidden_extent(),
            visible_extent: self.visible_extent(),
            total_extent: self.total_extent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOutcome {
    pub hidden_count: usize,
    pub hidden_extent: f64,
    pub visible_extent: f64,
    pub total_extent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredBlock {
    pub node: NodeId,
    pub height: f64,
}

/// Every DIV child of the content parent except the placeholder, in document
/// order. The size filter used by the resolver is not applied here: skipping
/// a small block would let it drift out of order on restore.
pub fn enumerate_blocks<D: HostDom + ?Sized>(
    dom: &D,
    content_parent: NodeId,
    config: &ResolverConfig,
) -> Vec<NodeId> {
    resolver::block_children(dom, content_parent, config)
}

pub fn measure_blocks<D: HostDom + ?Sized>(dom: &D, blocks: &[NodeId]) -> Vec<MeasuredBlock> {
    blocks
        .iter()
        .map(|&node| MeasuredBlock {
            node,
            height: dom.layout(node).rect.height,
        })
        .collect()
}

/// Whether the measured total and the container's own scroll extent disagree
/// by more than `ratio` of the larger of the two.
pub fn diverges(measured: f64, reported: f64, ratio: f64) -> bool {
    let larger = measured.max(reported);
    larger > 0.0 && (measured - reported).abs() / larger > ratio
}

/// Strips image sources under `node`, returning what was removed.
pub fn unload_images<D: HostDom + ?Sized>(
    dom: &mut D,
    node: NodeId,
) -> Result<Vec<UnloadedResource>> {
    let mut unloaded = Vec::new();
    for (image_index, image) in dom.descendants_by_tag(node, "img").into_iter().enumerate() {
        for attribute in IMAGE_SOURCE_ATTRS {
            if let Some(value) = dom.remove_attribute(image, attribute)? {
                unloaded.push(UnloadedResource {
                    image_index,
                    attribute: attribute.to_string(),
                    value,
                });
            }
        }
    }
    Ok(unloaded)
}

pub fn reload_images<D: HostDom + ?Sized>(
    dom: &mut D,
    node: NodeId,
    unloaded: &[UnloadedResource],
) -> Result<()> {
    if unloaded.is_empty() {
        return Ok(());
    }
    let images = dom.descendants_by_tag(node, "img");
    for resource in unloaded {
        match images.get(resource.image_index) {
            Some(&image) => dom.set_attribute(image, &resource.attribute, &resource.value)?,
            None => debug!(
                block = %node,
                image_index = resource.image_index,
                "Image vanished from restored block"
            ),
        }
    }
    Ok(())
}

/// Restores anything previously hidden, re-measures, and detaches the blocks
/// above the budget.
pub fn apply_window<D: HostDom + ?Sized>(
    dom: &mut D,
    state: &mut WindowState,
    config: &WindowConfig,
    resolver_config: &ResolverConfig,
    budget: f64,
) -> Result<WindowOutcome> {
    restore::restore_all(dom, state)?;

    let blocks = enumerate_blocks(dom, state.content_parent, resolver_config);
    let measured = measure_blocks(dom, &blocks);
    let heights: Vec<f64> = measured.iter().map(|block| block.height).collect();
    let plan = compute_cut(&heights, budget);
    state.total_extent = plan.total_extent;

    debug!(
        blocks = measured.len(),
        budget,
        hidden_count = plan.hidden_count,
        hidden_extent = plan.hidden_extent,
        "Computed window cut"
    );

    if plan.is_noop() {
        return Ok(state.outcome());
    }

    for (order, block) in measured.iter().take(plan.hidden_count).enumerate() {
        let entry = detach_block(dom, block, order, config)?;
        state.ledger.push(entry);
    }

    let anchor = measured.get(plan.hidden_count).map(|block| block.node);
    let node = placeholder::upsert(
        dom,
        state.content_parent,
        state.placeholder.take(),
        anchor,
        state.ledger.len(),
        state.ledger.total_extent(),
    )?;
    state.placeholder = Some(node);

    Ok(state.outcome())
}

fn detach_block<D: HostDom + ?Sized>(
    dom: &mut D,
    block: &MeasuredBlock,
    order: usize,
    config: &WindowConfig,
) -> Result<LedgerEntry> {
    let unloaded = if config.unload_images {
        unload_images(dom, block.node)?
    } else {
        Vec::new()
    };

    let payload = match config.detach_strategy {
        DetachStrategy::RetainNodes => BlockPayload::Live(block.node),
        DetachStrategy::Serialize => BlockPayload::Serialized(dom.serialize(block.node)?),
    };

    if let Err(err) = dom.remove(block.node) {
        warn!(block = %block.node, error = %err, "Failed to detach block, leaving it in place");
        reload_images(dom, block.node, &unloaded)?;
        return Err(err.into());
    }

    Ok(LedgerEntry {
        payload,
        height: block.height,
        unloaded,
        order,
    })
}
