use serde::{Deserialize, Serialize};
use strum::Display;

/// Bounding client rectangle in layout pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// `extent / width`, or zero for a degenerate viewport.
    pub fn width_ratio(&self, extent: f64) -> f64 {
        if self.width > 0.0 {
            extent / self.width
        } else {
            0.0
        }
    }

    /// `extent / height`, or zero for a degenerate viewport.
    pub fn height_ratio(&self, extent: f64) -> f64 {
        if self.height > 0.0 {
            extent / self.height
        } else {
            0.0
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

/// The few computed-style flags the locator looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComputedStyle {
    pub flex_shrink: f64,
    pub position: Position,
}

impl ComputedStyle {
    /// `flex-shrink: 0`, typical of fixed-width side panels.
    pub fn is_fixed_shrink(&self) -> bool {
        self.flex_shrink.abs() < f64::EPSILON
    }

    /// Pinned out of the normal flow, as drawers and overlays are.
    pub fn is_fixed_position(&self) -> bool {
        self.position == Position::Fixed
    }

    /// Either signal of a fixed-width panel rather than a content pane.
    pub fn is_fixed_layout(&self) -> bool {
        self.is_fixed_shrink() || self.is_fixed_position()
    }
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            flex_shrink: 1.0,
            position: Position::Static,
        }
    }
}

/// Rendered geometry of an element as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Layout {
    pub rect: Rect,
    pub scroll_height: f64,
    pub scroll_top: f64,
    pub client_height: f64,
}

impl Layout {
    /// Layout for a non-scrolling box of the given rect.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            rect,
            scroll_height: rect.height,
            scroll_top: 0.0,
            client_height: rect.height,
        }
    }

    pub fn with_scroll_height(mut self, scroll_height: f64) -> Self {
        self.scroll_height = scroll_height;
        self
    }
}
