//! Route change detection.
//!
//! History hooks call [`crate::Engine::on_history_change`] directly; the poll
//! timer covers hosts where those hooks never fire. Both end up in
//! [`NavigationWatcher::observe`].

/// Drops query and fragment and any trailing slash. The root stays `/`.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[derive(Debug, Clone)]
pub struct NavigationWatcher {
    current: String,
}

impl NavigationWatcher {
    pub fn new(initial_path: &str) -> Self {
        Self {
            current: normalize_path(initial_path),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Records `path` and returns the normalized path if it differs from the
    /// last one seen.
    pub fn observe(&mut self, path: &str) -> Option<String> {
        let normalized = normalize_path(path);
        if normalized == self.current {
            return None;
        }
        self.current.clone_from(&normalized);
        Some(normalized)
    }
}
