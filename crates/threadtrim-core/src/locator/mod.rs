//! Finds the single scrollable element that hosts the conversation.
//!
//! The locator is read-only. Callers cache its result; see
//! [`crate::session::Session::cached_container`].

pub mod score;

use serde::{Deserialize, Serialize};
use threadtrim_dom::{HostDom, NodeId};
use tracing::debug;

use crate::config::LocatorConfig;
pub use score::{CandidateMetrics, Exclusion, ScoreBreakdown};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub node: NodeId,
    pub metrics: CandidateMetrics,
    pub breakdown: ScoreBreakdown,
}

impl ScoredCandidate {
    pub fn score(&self) -> f64 {
        self.breakdown.total()
    }
}

/// What is remembered about a session's container so a return visit can
/// skip the full scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionHint {
    pub container_class: String,
    pub content_depth: usize,
}

/// Elements carrying a scrollable class signal, or the first
/// `div_scan_cap` DIVs when no element does.
pub fn collect_candidates<D: HostDom + ?Sized>(dom: &D, config: &LocatorConfig) -> Vec<NodeId> {
    let signalled = dom.elements_with_class_containing(&config.scrollable_signals);
    if signalled.is_empty() {
        debug!(
            cap = config.div_scan_cap,
            "No scrollable class signals found, scanning DIVs"
        );
        dom.elements_by_tag("div", config.div_scan_cap)
    } else {
        signalled
    }
}

pub fn score_candidates<D: HostDom + ?Sized>(
    dom: &D,
    candidates: &[NodeId],
    config: &LocatorConfig,
) -> Vec<ScoredCandidate> {
    let viewport = dom.viewport();
    candidates
        .iter()
        .map(|&node| {
            let metrics = CandidateMetrics::read(dom, node);
            let breakdown = score::score(&metrics, viewport, config);
            ScoredCandidate {
                node,
                metrics,
                breakdown,
            }
        })
        .collect()
}

/// Highest positive score wins. Equal scores keep the earliest candidate in
/// document order.
pub fn best(scored: &[ScoredCandidate]) -> Option<&ScoredCandidate> {
    let mut winner: Option<&ScoredCandidate> = None;
    for candidate in scored {
        if candidate.score() <= 0.0 {
            continue;
        }
        if winner.is_none_or(|current| candidate.score() > current.score()) {
            winner = Some(candidate);
        }
    }
    winner
}

pub fn locate_container<D: HostDom + ?Sized>(dom: &D, config: &LocatorConfig) -> Option<NodeId> {
    let candidates = collect_candidates(dom, config);
    let scored = score_candidates(dom, &candidates, config);
    let winner = best(&scored).map(|candidate| candidate.node);
    debug!(
        candidates = candidates.len(),
        winner = ?winner,
        "Container scan complete"
    );
    winner
}

/// Whether a previously chosen container is still worth reusing.
pub fn is_plausible<D: HostDom + ?Sized>(dom: &D, node: NodeId, config: &LocatorConfig) -> bool {
    dom.is_connected(node) && dom.layout(node).scroll_height >= config.plausible_scroll_extent
}

/// Tries the hinted container first, then falls back to a full scan.
pub fn locate<D: HostDom + ?Sized>(
    dom: &D,
    config: &LocatorConfig,
    hint: Option<&DetectionHint>,
) -> Option<NodeId> {
    if let Some(hint) = hint
        && let Some(node) = match_hint(dom, config, hint)
    {
        debug!(container = %node, "Reusing container from session hint");
        return Some(node);
    }
    locate_container(dom, config)
}

fn match_hint<D: HostDom + ?Sized>(
    dom: &D,
    config: &LocatorConfig,
    hint: &DetectionHint,
) -> Option<NodeId> {
    if hint.container_class.is_empty() {
        return None;
    }
    let viewport = dom.viewport();
    dom.elements_with_class_containing(std::slice::from_ref(&hint.container_class))
        .into_iter()
        .filter(|&node| dom.class_name(node) == hint.container_class)
        .find(|&node| {
            let metrics = CandidateMetrics::read(dom, node);
            score::exclusion(&metrics, viewport, config).is_none()
                && is_plausible(dom, node, config)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::conversation_page;
    use threadtrim_dom::{Layout, MemoryDom, Rect, Viewport};

    #[test]
    fn picks_main_pane_over_taller_sidebar() {
        let page = conversation_page(&[1000.0; 15]).unwrap();
        let mut dom = page.dom;
        dom.set_layout(
            page.sidebar,
            Layout::from_rect(Rect::new(0.0, 0.0, 260.0, 1080.0)).with_scroll_height(90_000.0),
        )
        .unwrap();

        assert_eq!(
            locate_container(&dom, &LocatorConfig::default()),
            Some(page.container)
        );
    }

    #[test]
    fn falls_back_to_div_scan_without_class_signals() {
        let mut dom = MemoryDom::new(Viewport::default(), "/c/1");
        let root = dom.root();
        let pane = dom.append_element(root, "div", "main").unwrap();
        dom.set_layout(
            pane,
            Layout::from_rect(Rect::new(300.0, 0.0, 1500.0, 1000.0)).with_scroll_height(8000.0),
        )
        .unwrap();

        let config = LocatorConfig::default();
        assert_eq!(collect_candidates(&dom, &config), vec![pane]);
        assert_eq!(locate_container(&dom, &config), Some(pane));
    }

    #[test]
    fn returns_none_when_everything_is_excluded() {
        let mut dom = MemoryDom::new(Viewport::default(), "/c/1");
        let root = dom.root();
        let tiny = dom.append_element(root, "div", "overflow-y-auto").unwrap();
        dom.set_layout(tiny, Layout::from_rect(Rect::new(500.0, 0.0, 100.0, 100.0)))
            .unwrap();

        assert_eq!(locate_container(&dom, &LocatorConfig::default()), None);
    }

    #[test]
    fn ties_keep_document_order() {
        let mut dom = MemoryDom::new(Viewport::default(), "/c/1");
        let root = dom.root();
        let layout =
            Layout::from_rect(Rect::new(300.0, 0.0, 1500.0, 1000.0)).with_scroll_height(5000.0);
        let first = dom.append_element(root, "div", "overflow-y-auto a").unwrap();
        let second = dom.append_element(root, "div", "overflow-y-auto b").unwrap();
        dom.set_layout(first, layout).unwrap();
        dom.set_layout(second, layout).unwrap();

        assert_eq!(locate_container(&dom, &LocatorConfig::default()), Some(first));
    }

    #[test]
    fn hint_is_used_only_while_still_valid() {
        let page = conversation_page(&[1000.0; 10]).unwrap();
        let config = LocatorConfig::default();
        let hint = DetectionHint {
            container_class: page.dom.class_name(page.container).to_string(),
            content_depth: 1,
        };
        assert_eq!(locate(&page.dom, &config, Some(&hint)), Some(page.container));

        let stale = DetectionHint {
            container_class: "gone".to_string(),
            content_depth: 1,
        };
        assert_eq!(locate(&page.dom, &config, Some(&stale)), Some(page.container));
    }
}
