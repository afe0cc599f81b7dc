//! Tunable thresholds for detection, windowing and scheduling.
//!
//! Every heuristic constant lives here under a name instead of inline in the
//! algorithms. All structs deserialize from TOML with per-field defaults, so
//! an override file only needs the values it changes.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{Error, Result};

pub const DEFAULT_DIV_SCAN_CAP: usize = 2000;
pub const DEFAULT_MIN_CONTAINER_WIDTH: f64 = 200.0;
pub const DEFAULT_MIN_CONTAINER_HEIGHT: f64 = 200.0;
pub const DEFAULT_MIN_SCROLL_EXTENT: f64 = 300.0;
pub const DEFAULT_LEFT_EDGE_TOLERANCE: f64 = 10.0;
pub const DEFAULT_NARROW_WIDTH_RATIO: f64 = 0.3;
pub const DEFAULT_FIXED_SHRINK_WIDTH_RATIO: f64 = 0.4;
pub const DEFAULT_PLAUSIBLE_SCROLL_EXTENT: f64 = 500.0;

pub const DEFAULT_RESOLVER_DEPTH_CAP: usize = 15;
pub const DEFAULT_MIN_BLOCK_HEIGHT: f64 = 20.0;
pub const DEFAULT_MIN_BLOCK_WIDTH: f64 = 50.0;

pub const DEFAULT_RESTORE_BATCH_SIZE: usize = 3;
pub const DEFAULT_SCROLL_RESTORE_THRESHOLD: f64 = 200.0;
pub const DEFAULT_DIVERGENCE_RATIO: f64 = 0.5;

pub const DEFAULT_SCROLL_DEBOUNCE_MS: u64 = 150;
pub const DEFAULT_MUTATION_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_NAVIGATION_POLL_MS: u64 = 500;
pub const DEFAULT_NAVIGATION_RETRY_MS: [u64; 3] = [500, 1500, 3000];

/// One step of a tiered bonus: crossing `ratio` adds `bonus`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusTier {
    pub ratio: f64,
    pub bonus: f64,
}

impl BonusTier {
    pub const fn new(ratio: f64, bonus: f64) -> Self {
        Self { ratio, bonus }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Class substrings that mark an element as a likely scroll region.
    pub scrollable_signals: Vec<String>,
    /// Class substrings that mark navigation panels; these always score zero.
    pub sidebar_signals: Vec<String>,
    /// Upper bound on DIVs inspected by the fallback scan.
    pub div_scan_cap: usize,
    pub min_width: f64,
    pub min_height: f64,
    pub min_scroll_extent: f64,
    /// Elements whose left edge is within this many pixels of the viewport
    /// edge count as left-docked.
    pub left_edge_tolerance: f64,
    /// Left-docked elements narrower than this share of the viewport are panels.
    pub narrow_width_ratio: f64,
    /// `flex-shrink: 0` elements narrower than this share are panels.
    pub fixed_shrink_width_ratio: f64,
    pub height_tiers: Vec<BonusTier>,
    pub width_tiers: Vec<BonusTier>,
    /// A cached container whose scroll extent drops below this is re-detected.
    pub plausible_scroll_extent: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            scrollable_signals: ["overflow-y-auto", "overflow-auto", "scroll"]
                .into_iter()
                .map(String::from)
                .collect(),
            sidebar_signals: ["sidebar", "sidenav", "side-nav", "navigation", "drawer", "menu"]
                .into_iter()
                .map(String::from)
                .collect(),
            div_scan_cap: DEFAULT_DIV_SCAN_CAP,
            min_width: DEFAULT_MIN_CONTAINER_WIDTH,
            min_height: DEFAULT_MIN_CONTAINER_HEIGHT,
            min_scroll_extent: DEFAULT_MIN_SCROLL_EXTENT,
            left_edge_tolerance: DEFAULT_LEFT_EDGE_TOLERANCE,
            narrow_width_ratio: DEFAULT_NARROW_WIDTH_RATIO,
            fixed_shrink_width_ratio: DEFAULT_FIXED_SHRINK_WIDTH_RATIO,
            height_tiers: vec![BonusTier::new(0.5, 500.0), BonusTier::new(0.7, 1000.0)],
            width_tiers: vec![BonusTier::new(0.4, 500.0), BonusTier::new(0.6, 1000.0)],
            plausible_scroll_extent: DEFAULT_PLAUSIBLE_SCROLL_EXTENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub depth_cap: usize,
    pub min_block_height: f64,
    pub min_block_width: f64,
    pub block_tag: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            depth_cap: DEFAULT_RESOLVER_DEPTH_CAP,
            min_block_height: DEFAULT_MIN_BLOCK_HEIGHT,
            min_block_width: DEFAULT_MIN_BLOCK_WIDTH,
            block_tag: "div".to_string(),
        }
    }
}

/// How detached blocks are kept until restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DetachStrategy {
    /// Keep the detached node itself. Listeners and framework state survive.
    #[default]
    RetainNodes,
    /// Keep a serialized copy and drop the node. Smaller, but anything the
    /// host attached imperatively to the node is gone after restore.
    Serialize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub detach_strategy: DetachStrategy,
    /// Strip image sources from detached blocks until they come back.
    pub unload_images: bool,
    pub restore_batch_size: usize,
    /// Scroll offset (px from top) under which an upward scroll restores a batch.
    pub scroll_restore_threshold: f64,
    /// Relative gap between measured total and container scroll extent that
    /// is logged as a measurement inconsistency.
    pub divergence_ratio: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            detach_strategy: DetachStrategy::default(),
            unload_images: true,
            restore_batch_size: DEFAULT_RESTORE_BATCH_SIZE,
            scroll_restore_threshold: DEFAULT_SCROLL_RESTORE_THRESHOLD,
            divergence_ratio: DEFAULT_DIVERGENCE_RATIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub scroll_debounce_ms: u64,
    pub mutation_debounce_ms: u64,
    pub navigation_poll_ms: u64,
    /// Delays after a navigation at which windowing is re-attempted.
    pub navigation_retry_ms: Vec<u64>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scroll_debounce_ms: DEFAULT_SCROLL_DEBOUNCE_MS,
            mutation_debounce_ms: DEFAULT_MUTATION_DEBOUNCE_MS,
            navigation_poll_ms: DEFAULT_NAVIGATION_POLL_MS,
            navigation_retry_ms: DEFAULT_NAVIGATION_RETRY_MS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub locator: LocatorConfig,
    pub resolver: ResolverConfig,
    pub window: WindowConfig,
    pub timing: TimingConfig,
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("Failed to parse engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.restore_batch_size == 0 {
            return Err(Error::Configuration(
                "window.restore_batch_size must be > 0".to_string(),
            ));
        }
        if self.resolver.depth_cap == 0 {
            return Err(Error::Configuration(
                "resolver.depth_cap must be > 0".to_string(),
            ));
        }
        if self.timing.navigation_poll_ms == 0 {
            return Err(Error::Configuration(
                "timing.navigation_poll_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [window]
            detach_strategy = "serialize"
            restore_batch_size = 5

            [timing]
            navigation_retry_ms = [250]
            "#,
        )
        .unwrap();

        assert_eq!(config.window.detach_strategy, DetachStrategy::Serialize);
        assert_eq!(config.window.restore_batch_size, 5);
        assert!(config.window.unload_images);
        assert_eq!(config.timing.navigation_retry_ms, vec![250]);
        assert_eq!(config.timing.scroll_debounce_ms, DEFAULT_SCROLL_DEBOUNCE_MS);
        assert_eq!(config.locator, LocatorConfig::default());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = EngineConfig::from_toml_str("[window]\nrestore_batch_size = 0\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn rejects_unparseable_toml() {
        let err = EngineConfig::from_toml_str("[window\n").unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
