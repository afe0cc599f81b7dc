//! Putting detached blocks back.
//!
//! Both operations reinsert entries in their original relative order. When
//! the expected insertion point is gone (the host page rebuilt part of the
//! list) blocks are appended to the content parent instead.

use serde::Serialize;
use threadtrim_dom::{HostDom, NodeId};
use tracing::{debug, warn};

use crate::error::Result;
use crate::ledger::{BlockPayload, Ledger, LedgerEntry};
use crate::placeholder;
use crate::window::{WindowState, reload_images};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub restored: usize,
    pub restored_extent: f64,
    pub remaining: usize,
    /// Blocks were appended because no insertion point was found.
    pub fell_back: bool,
}

/// Restores every ledger entry and removes the placeholder. A no-op on an
/// empty ledger apart from dropping a stray placeholder.
pub fn restore_all<D: HostDom + ?Sized>(
    dom: &mut D,
    state: &mut WindowState,
) -> Result<RestoreOutcome> {
    let entries = state.ledger.take_all();
    let attached = attached_placeholder(dom, state);
    let reference = attached.or_else(|| first_child(dom, state.content_parent));

    let outcome = reinsert(dom, &mut state.ledger, state.content_parent, entries, reference)?;

    if let Some(node) = state.placeholder.take() {
        placeholder::remove(dom, node)?;
    }
    if outcome.restored > 0 {
        debug!(restored = outcome.restored, "Restored all hidden blocks");
    }
    Ok(outcome)
}

/// Restores up to `count` of the hidden blocks nearest the placeholder.
///
/// When `container` is given its scroll offset is pushed down by the restored
/// extent so the content on screen does not jump.
pub fn restore_batch<D: HostDom + ?Sized>(
    dom: &mut D,
    state: &mut WindowState,
    count: usize,
    container: Option<NodeId>,
) -> Result<RestoreOutcome> {
    if state.ledger.is_empty() {
        return restore_all(dom, state);
    }

    let entries = state.ledger.take_newest(count);
    // Restored blocks belong between the placeholder and the first resident block.
    let reference = match attached_placeholder(dom, state) {
        Some(node) => dom.next_sibling(node),
        None => first_child(dom, state.content_parent),
    };

    let mut outcome = reinsert(dom, &mut state.ledger, state.content_parent, entries, reference)?;
    outcome.remaining = state.ledger.len();

    if state.ledger.is_empty() {
        if let Some(node) = state.placeholder.take() {
            placeholder::remove(dom, node)?;
        }
    } else {
        let first_resident =
            attached_placeholder(dom, state).and_then(|node| dom.next_sibling(node));
        let node = placeholder::upsert(
            dom,
            state.content_parent,
            state.placeholder.take(),
            first_resident,
            state.ledger.len(),
            state.ledger.total_extent(),
        )?;
        state.placeholder = Some(node);
    }

    if let Some(container) = container
        && outcome.restored_extent > 0.0
    {
        let scroll_top = dom.layout(container).scroll_top;
        dom.set_scroll_top(container, scroll_top + outcome.restored_extent)?;
    }

    debug!(
        restored = outcome.restored,
        remaining = outcome.remaining,
        "Restored batch of hidden blocks"
    );
    Ok(outcome)
}

fn attached_placeholder<D: HostDom + ?Sized>(dom: &D, state: &WindowState) -> Option<NodeId> {
    state
        .placeholder
        .filter(|&node| dom.parent(node) == Some(state.content_parent))
}

fn first_child<D: HostDom + ?Sized>(dom: &D, parent: NodeId) -> Option<NodeId> {
    dom.children(parent).first().copied()
}

fn materialize<D: HostDom + ?Sized>(dom: &mut D, payload: &BlockPayload) -> NodeId {
    match payload {
        BlockPayload::Live(node) => *node,
        BlockPayload::Serialized(fragment) => dom.instantiate(fragment),
    }
}

/// Inserts `entries` in order before `reference`. If a block cannot be put
/// back, it and every later entry return to `ledger` before the error is
/// reported, so no block is lost.
fn reinsert<D: HostDom + ?Sized>(
    dom: &mut D,
    ledger: &mut Ledger,
    content_parent: NodeId,
    entries: Vec<LedgerEntry>,
    reference: Option<NodeId>,
) -> Result<RestoreOutcome> {
    let mut outcome = RestoreOutcome::default();
    let mut reference = reference;
    let mut pending = entries.into_iter();

    while let Some(entry) = pending.next() {
        if let Err(err) = reinsert_one(dom, content_parent, &entry, &mut reference, &mut outcome) {
            warn!(
                error = %err,
                unrestored = pending.len() + 1,
                "Restore interrupted, keeping remaining blocks hidden"
            );
            ledger.return_unrestored(std::iter::once(entry).chain(pending));
            return Err(err);
        }
        outcome.restored += 1;
        outcome.restored_extent += entry.height;
    }
    Ok(outcome)
}

fn reinsert_one<D: HostDom + ?Sized>(
    dom: &mut D,
    content_parent: NodeId,
    entry: &LedgerEntry,
    reference: &mut Option<NodeId>,
    outcome: &mut RestoreOutcome,
) -> Result<()> {
    let node = materialize(dom, &entry.payload);
    reload_images(dom, node, &entry.unloaded)?;

    if let Err(err) = dom.insert_before(content_parent, node, *reference) {
        warn!(
            block = %node,
            error = %err,
            "Insertion point lost, appending restored block"
        );
        dom.insert_before(content_parent, node, None)?;
        *reference = None;
        outcome.fell_back = true;
    }
    Ok(())
}
