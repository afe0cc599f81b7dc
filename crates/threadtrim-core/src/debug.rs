//! Diagnostic container scan.
//!
//! Bypasses every cache, scores all candidates and tags each one on the page
//! with its score so the result can be inspected in the host's dev tools.

use serde::Serialize;
use threadtrim_dom::{HostDom, NodeId};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::locator::{self, ScoreBreakdown, ScoredCandidate};
use crate::resolver;

pub const DEBUG_SCORE_ATTR: &str = "data-threadtrim-score";
pub const DEBUG_REPORT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateReport {
    pub node: NodeId,
    pub class_name: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl From<&ScoredCandidate> for CandidateReport {
    fn from(candidate: &ScoredCandidate) -> Self {
        Self {
            node: candidate.node,
            class_name: candidate.metrics.class_name.clone(),
            score: candidate.score(),
            breakdown: candidate.breakdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    pub candidate_count: usize,
    pub scoring_count: usize,
    /// Highest scores first, at most [`DEBUG_REPORT_LIMIT`].
    pub top_candidates: Vec<CandidateReport>,
    pub container: Option<CandidateReport>,
    pub content_parent: Option<NodeId>,
    pub content_block_count: usize,
    #[serde(skip)]
    pub marked: Vec<NodeId>,
}

fn mark_value(candidate: &ScoredCandidate) -> String {
    match candidate.breakdown.exclusion {
        Some(reason) => format!("0 ({reason})"),
        None => format!("{:.0}", candidate.score()),
    }
}

/// Clears marks left by `previous_marks`, rescans, and marks every candidate.
pub fn debug_scan<D: HostDom + ?Sized>(
    dom: &mut D,
    config: &EngineConfig,
    previous_marks: &[NodeId],
) -> Result<DebugReport> {
    for &node in previous_marks {
        if let Err(err) = dom.remove_attribute(node, DEBUG_SCORE_ATTR) {
            debug!(node = %node, error = %err, "Could not clear stale debug mark");
        }
    }

    let candidates = locator::collect_candidates(dom, &config.locator);
    let scored = locator::score_candidates(dom, &candidates, &config.locator);
    let winner = locator::best(&scored).map(CandidateReport::from);

    let (content_parent, content_block_count) = winner
        .as_ref()
        .and_then(|container| {
            resolver::resolve_content_parent(dom, container.node, &config.resolver)
        })
        .map_or((None, 0), |resolved| {
            (Some(resolved.node), resolved.block_count)
        });

    let mut ranked: Vec<&ScoredCandidate> = scored.iter().collect();
    ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));
    let top_candidates = ranked
        .into_iter()
        .take(DEBUG_REPORT_LIMIT)
        .map(CandidateReport::from)
        .collect();

    let mut marked = Vec::with_capacity(scored.len());
    for candidate in &scored {
        dom.set_attribute(candidate.node, DEBUG_SCORE_ATTR, &mark_value(candidate))?;
        marked.push(candidate.node);
    }

    Ok(DebugReport {
        candidate_count: scored.len(),
        scoring_count: scored.iter().filter(|c| c.score() > 0.0).count(),
        top_candidates,
        container: winner,
        content_parent,
        content_block_count,
        marked,
    })
}
