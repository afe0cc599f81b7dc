//! Navigation-scoped windowing state.
//!
//! One [`Session`] exists per route. Navigating away drops it outright: the
//! host has already thrown away the nodes its ledger and placeholder point at.

use lru::LruCache;
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use strum::Display;
use threadtrim_dom::{HostDom, NodeId};

use crate::config::LocatorConfig;
use crate::locator::{self, DetectionHint};
use crate::navigation::normalize_path;
use crate::preferences::Surface;
use crate::window::WindowState;

pub const RECENT_SESSION_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn from_path(path: &str) -> Self {
        Self(normalize_path(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SessionPhase {
    /// Nothing hidden.
    Empty,
    /// Ledger non-empty and a placeholder on the page.
    Windowed,
    /// An incremental restore is scheduled and has not run yet.
    Restoring,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub generation: u64,
    pub surface: Surface,
    pub container: Option<NodeId>,
    pub content_depth: Option<usize>,
    pub window: Option<WindowState>,
    pub phase: SessionPhase,
}

impl Session {
    pub fn new(id: SessionId, generation: u64) -> Self {
        let surface = Surface::from_path(id.as_str());
        Self {
            id,
            generation,
            surface,
            container: None,
            content_depth: None,
            window: None,
            phase: SessionPhase::Empty,
        }
    }

    /// The cached container while it is still attached and plausibly the
    /// conversation pane.
    pub fn cached_container<D: HostDom + ?Sized>(
        &self,
        dom: &D,
        config: &LocatorConfig,
    ) -> Option<NodeId> {
        self.container
            .filter(|&node| locator::is_plausible(dom, node, config))
    }

    pub fn hint<D: HostDom + ?Sized>(&self, dom: &D) -> Option<DetectionHint> {
        let container = self.container?;
        Some(DetectionHint {
            container_class: dom.class_name(container).to_string(),
            content_depth: self.content_depth?,
        })
    }

    pub fn is_windowed(&self) -> bool {
        self.window.as_ref().is_some_and(WindowState::is_windowed)
    }

    pub fn hidden_count(&self) -> usize {
        self.window.as_ref().map_or(0, |window| window.ledger.len())
    }

    /// Recomputes the steady phase from the ledger.
    pub fn settle_phase(&mut self) {
        self.phase = if self.is_windowed() {
            SessionPhase::Windowed
        } else {
            SessionPhase::Empty
        };
    }

    /// Forgets cached nodes so the next pass detects from scratch. The
    /// ledger is dropped without restoring.
    pub fn invalidate(&mut self) {
        self.container = None;
        self.content_depth = None;
        self.window = None;
        self.phase = SessionPhase::Empty;
    }
}

/// Detection hints for recently visited routes.
#[derive(Debug)]
pub struct RecentSessions {
    hints: LruCache<SessionId, DetectionHint>,
}

impl RecentSessions {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            hints: LruCache::new(capacity),
        }
    }

    pub fn remember(&mut self, id: SessionId, hint: DetectionHint) {
        self.hints.put(id, hint);
    }

    pub fn hint(&mut self, id: &SessionId) -> Option<DetectionHint> {
        self.hints.get(id).cloned()
    }

    pub fn forget(&mut self, id: &SessionId) {
        self.hints.pop(id);
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

impl Default for RecentSessions {
    fn default() -> Self {
        Self::new(RECENT_SESSION_CAPACITY)
    }
}
