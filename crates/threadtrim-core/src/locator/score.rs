//! Pure scoring of container candidates.
//!
//! Each exclusion rule and bonus tier is its own function so it can be tested
//! in isolation; [`score`] only combines them.

use serde::Serialize;
use strum::Display;
use threadtrim_dom::{ComputedStyle, HostDom, NodeId, Rect, Viewport};

use crate::config::{BonusTier, LocatorConfig};

/// Geometry and class data read once per candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMetrics {
    pub rect: Rect,
    pub scroll_height: f64,
    pub class_name: String,
    pub style: ComputedStyle,
}

impl CandidateMetrics {
    pub fn read<D: HostDom + ?Sized>(dom: &D, node: NodeId) -> Self {
        let layout = dom.layout(node);
        Self {
            rect: layout.rect,
            scroll_height: layout.scroll_height,
            class_name: dom.class_name(node).to_string(),
            style: dom.computed_style(node),
        }
    }
}

/// Hard exclusion reasons. Any of these forces the score to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Exclusion {
    TooSmall,
    SidebarClass,
    NarrowLeftEdge,
    FixedShrinkNarrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub extent: f64,
    pub height_bonus: f64,
    pub width_bonus: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<Exclusion>,
}

impl ScoreBreakdown {
    pub fn excluded(reason: Exclusion) -> Self {
        Self {
            exclusion: Some(reason),
            ..Self::default()
        }
    }

    pub fn total(&self) -> f64 {
        if self.exclusion.is_some() {
            0.0
        } else {
            self.extent + self.height_bonus + self.width_bonus
        }
    }
}

pub fn is_too_small(metrics: &CandidateMetrics, config: &LocatorConfig) -> bool {
    metrics.rect.width < config.min_width
        || metrics.rect.height < config.min_height
        || metrics.scroll_height < config.min_scroll_extent
}

pub fn has_sidebar_signal(class_name: &str, config: &LocatorConfig) -> bool {
    let class_name = class_name.to_ascii_lowercase();
    config
        .sidebar_signals
        .iter()
        .filter(|signal| !signal.is_empty())
        .any(|signal| class_name.contains(&signal.to_ascii_lowercase()))
}

pub fn is_narrow_left_edge(
    metrics: &CandidateMetrics,
    viewport: Viewport,
    config: &LocatorConfig,
) -> bool {
    metrics.rect.left <= config.left_edge_tolerance
        && viewport.width_ratio(metrics.rect.width) < config.narrow_width_ratio
}

pub fn is_fixed_shrink_narrow(
    metrics: &CandidateMetrics,
    viewport: Viewport,
    config: &LocatorConfig,
) -> bool {
    metrics.style.is_fixed_layout()
        && viewport.width_ratio(metrics.rect.width) < config.fixed_shrink_width_ratio
}

/// First exclusion rule that applies, cheapest checks first.
pub fn exclusion(
    metrics: &CandidateMetrics,
    viewport: Viewport,
    config: &LocatorConfig,
) -> Option<Exclusion> {
    if is_too_small(metrics, config) {
        Some(Exclusion::TooSmall)
    } else if has_sidebar_signal(&metrics.class_name, config) {
        Some(Exclusion::SidebarClass)
    } else if is_narrow_left_edge(metrics, viewport, config) {
        Some(Exclusion::NarrowLeftEdge)
    } else if is_fixed_shrink_narrow(metrics, viewport, config) {
        Some(Exclusion::FixedShrinkNarrow)
    } else {
        None
    }
}

/// Sum of the bonuses of every tier whose ratio is strictly exceeded.
pub fn tier_bonus(ratio: f64, tiers: &[BonusTier]) -> f64 {
    tiers
        .iter()
        .filter(|tier| ratio > tier.ratio)
        .map(|tier| tier.bonus)
        .sum()
}

pub fn score(
    metrics: &CandidateMetrics,
    viewport: Viewport,
    config: &LocatorConfig,
) -> ScoreBreakdown {
    if let Some(reason) = exclusion(metrics, viewport, config) {
        return ScoreBreakdown::excluded(reason);
    }

    ScoreBreakdown {
        extent: metrics.scroll_height,
        height_bonus: tier_bonus(
            viewport.height_ratio(metrics.rect.height),
            &config.height_tiers,
        ),
        width_bonus: tier_bonus(viewport.width_ratio(metrics.rect.width), &config.width_tiers),
        exclusion: None,
    }
}
