//! The per-page windowing engine.
//!
//! Every entry point is synchronous and runs to completion against a single
//! DOM snapshot. Time is injected as milliseconds so the same engine runs
//! under the tokio runtime actor, a CLI replay, or a test with a fake clock.

use serde::Serialize;
use serde_json::Value;
use threadtrim_dom::{HostDom, NodeId};
use tracing::{debug, info, trace, warn};

use crate::command::{ApplyWindowParams, Request, Response};
use crate::config::EngineConfig;
use crate::debug::{self, DebugReport};
use crate::error::{DetectionFailure, Error, Result};
use crate::locator;
use crate::navigation::NavigationWatcher;
use crate::placeholder;
use crate::preferences::{PreferenceStore, Preferences};
use crate::resolver;
use crate::restore::{self, RestoreOutcome};
use crate::scheduler::{Scheduler, TimerKind};
use crate::session::{RecentSessions, Session, SessionId, SessionPhase};
use crate::status::{StatusEvent, StatusReport, StatusSink};
use crate::window::{self, WindowOutcome, WindowState};

pub struct Engine<D: HostDom> {
    dom: D,
    config: EngineConfig,
    store: Box<dyn PreferenceStore>,
    preferences: Preferences,
    sink: Box<dyn StatusSink>,
    session: Session,
    recent: RecentSessions,
    navigation: NavigationWatcher,
    scheduler: Scheduler,
    generation: u64,
    /// Set while a pass is mutating the page. A second pass is refused.
    busy: bool,
    debug_marks: Vec<NodeId>,
    last_scroll_top: Option<f64>,
}

impl<D: HostDom> Engine<D> {
    pub fn new(
        dom: D,
        config: EngineConfig,
        store: Box<dyn PreferenceStore>,
        sink: Box<dyn StatusSink>,
    ) -> Self {
        let preferences = load_preferences(store.as_ref());
        let path = dom.location_path();
        let navigation = NavigationWatcher::new(&path);
        let generation = 1;
        let session = Session::new(SessionId::from_path(navigation.current()), generation);

        Self {
            dom,
            config,
            store,
            preferences,
            sink,
            session,
            recent: RecentSessions::default(),
            navigation,
            scheduler: Scheduler::new(),
            generation,
            busy: false,
            debug_marks: Vec::new(),
            last_scroll_top: None,
        }
    }

    /// Arms the navigation poll and makes the first windowing attempt. If the
    /// page has not rendered its conversation yet, staged retries follow.
    pub fn start(&mut self, now_ms: u64) {
        self.scheduler.arm(
            TimerKind::NavigationPoll,
            now_ms,
            self.config.timing.navigation_poll_ms,
            self.generation,
        );

        match self.automatic_pass() {
            Ok(_) => {}
            Err(Error::Unavailable(
                failure @ (DetectionFailure::NoContainer | DetectionFailure::NoContentParent),
            )) => {
                debug!(
                    session_id = %self.session.id,
                    %failure,
                    "Initial pass found nothing, scheduling retries"
                );
                self.arm_navigation_retries(now_ms);
            }
            Err(err) => self.log_background_error(None, &err),
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// Direct access for embedders simulating host activity. Mutations made
    /// here are seen by the observer like any host change.
    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn into_dom(self) -> D {
        self.dom
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    pub fn status(&self) -> StatusReport {
        let window = self.session.window.as_ref();
        StatusReport {
            available: window.is_some(),
            total_extent: window.map_or(0.0, |w| w.total_extent),
            hidden_extent: window.map_or(0.0, WindowState::hidden_extent),
            visible_extent: window.map_or(0.0, WindowState::visible_extent),
            hidden_count: self.session.hidden_count(),
            windowed: self.session.is_windowed(),
            session_id: self.session.id.to_string(),
            phase: self.session.phase,
        }
    }

    /// Handles one inbound message. Never fails: every error becomes a
    /// structured failure response.
    pub fn handle_message(&mut self, message: &Value) -> Response {
        let request = match Request::parse(message) {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "Rejected inbound message");
                return Response::from_error(&Error::from(err));
            }
        };

        let name = request.name();
        match self.handle_request(request) {
            Ok(data) => Response::ok(data),
            Err(err) => {
                debug!(command = name, kind = err.kind(), error = %err, "Command failed");
                Response::from_error(&err)
            }
        }
    }

    pub fn handle_request(&mut self, request: Request) -> Result<Value> {
        match request {
            Request::ApplyWindow(params) => {
                self.apply_preferences(params)?;
                if self.preferences.windowing_allowed(self.session.surface) {
                    self.window_pass()?;
                } else {
                    self.restore_pass()?;
                }
                to_value(&self.status())
            }
            Request::GetStatus => to_value(&self.status()),
            Request::DebugScan => to_value(&self.debug_scan()?),
            Request::Restore => {
                self.restore_pass()?;
                to_value(&self.status())
            }
        }
    }

    /// Restores everything if `node` is the placeholder. Returns `None` for
    /// clicks anywhere else.
    pub fn on_click(&mut self, node: NodeId) -> Result<Option<RestoreOutcome>> {
        let placeholder = self.session.window.as_ref().and_then(|w| w.placeholder);
        if placeholder != Some(node) {
            return Ok(None);
        }
        debug!(session_id = %self.session.id, "Placeholder clicked");
        self.restore_pass().map(Some)
    }

    /// Arms a debounced incremental restore when the user scrolls upward into
    /// the top of a windowed container.
    pub fn on_scroll(&mut self, now_ms: u64) {
        let Some(container) = self.session.container else {
            return;
        };
        let scroll_top = self.dom.layout(container).scroll_top;
        let previous = self.last_scroll_top.replace(scroll_top);
        if !self.session.is_windowed() {
            return;
        }

        let upward = previous.is_some_and(|previous| scroll_top < previous);
        if upward && scroll_top < self.config.window.scroll_restore_threshold {
            self.scheduler.arm(
                TimerKind::ScrollRestore,
                now_ms,
                self.config.timing.scroll_debounce_ms,
                self.generation,
            );
            self.session.phase = SessionPhase::Restoring;
        }
    }

    /// Drains observed child-list changes and arms a debounced re-window when
    /// qualifying blocks were added to the content parent of a windowed
    /// session. After a restore the history stays visible until the next
    /// explicit apply.
    pub fn on_mutations(&mut self, now_ms: u64) {
        let records = self.dom.take_mutation_records();
        if records.is_empty()
            || !self.session.is_windowed()
            || !self.preferences.windowing_allowed(self.session.surface)
        {
            return;
        }
        let Some(content_parent) = self.session.window.as_ref().map(|w| w.content_parent) else {
            return;
        };

        let blocks = &self.config.resolver;
        let is_block = |node: NodeId| {
            self.dom
                .tag_name(node)
                .is_some_and(|tag| tag.eq_ignore_ascii_case(&blocks.block_tag))
                && resolver::is_qualifying_block(&self.dom, node, blocks)
                && !placeholder::is_placeholder(&self.dom, node)
        };
        let (mut added, mut removed) = (0usize, 0usize);
        for record in records.iter().filter(|record| record.target == content_parent) {
            added += record.added.iter().filter(|&&node| is_block(node)).count();
            removed += record.removed.iter().filter(|&&node| is_block(node)).count();
        }

        if added > removed {
            trace!(added, removed, "New blocks under content parent");
            self.scheduler.arm(
                TimerKind::MutationRewindow,
                now_ms,
                self.config.timing.mutation_debounce_ms,
                self.generation,
            );
        }
    }

    /// Called by history hooks. The poll timer does the same check.
    pub fn on_history_change(&mut self, now_ms: u64) {
        self.check_navigation(now_ms);
    }

    /// Fires every timer due at `now_ms` and returns the kinds that ran.
    pub fn advance(&mut self, now_ms: u64) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        for timer in self.scheduler.take_due(now_ms) {
            if timer.kind != TimerKind::NavigationPoll && timer.generation != self.generation {
                debug!(timer = %timer.kind, "Discarding timer from a previous session");
                continue;
            }
            // An earlier retry in this batch may already have found the page.
            if matches!(timer.kind, TimerKind::NavigationRetry(_)) && self.session.window.is_some()
            {
                trace!(timer = %timer.kind, "Conversation already detected, skipping retry");
                continue;
            }
            fired.push(timer.kind);

            match timer.kind {
                TimerKind::NavigationPoll => {
                    self.check_navigation(now_ms);
                    self.scheduler.arm(
                        TimerKind::NavigationPoll,
                        now_ms,
                        self.config.timing.navigation_poll_ms,
                        self.generation,
                    );
                }
                TimerKind::NavigationRetry(attempt) => match self.automatic_pass() {
                    Ok(_) => self.scheduler.cancel_navigation_retries(),
                    Err(err) => {
                        let retries = self.config.timing.navigation_retry_ms.len();
                        if usize::from(attempt) + 1 >= retries {
                            info!(
                                session_id = %self.session.id,
                                error = %err,
                                "Giving up windowing after navigation"
                            );
                        } else {
                            self.log_background_error(Some(timer.kind), &err);
                        }
                    }
                },
                TimerKind::MutationRewindow => {
                    if let Err(err) = self.automatic_pass() {
                        self.log_background_error(Some(timer.kind), &err);
                    }
                }
                TimerKind::ScrollRestore => {
                    if self.session.phase == SessionPhase::Restoring
                        && let Err(err) = self.scroll_restore_pass()
                    {
                        self.log_background_error(Some(timer.kind), &err);
                    }
                }
            }
        }
        fired
    }

    fn apply_preferences(&mut self, params: ApplyWindowParams) -> Result<()> {
        // A refused command must not leave new preferences behind.
        if self.busy {
            return Err(Error::Busy);
        }
        let mut next = self.preferences;
        next.target_budget = params.target_budget;
        next.enabled = params.enabled;
        if let Some(surfaces) = params.surfaces {
            next.surfaces = surfaces;
        }
        if next != self.preferences {
            self.store.save(&next)?;
            self.preferences = next;
        }
        Ok(())
    }

    fn automatic_pass(&mut self) -> Result<WindowOutcome> {
        if !self.preferences.windowing_allowed(self.session.surface) {
            return Err(DetectionFailure::SurfaceDisabled.into());
        }
        self.window_pass()
    }

    fn enter_pass(&mut self) -> Result<()> {
        if self.busy {
            return Err(Error::Busy);
        }
        self.busy = true;
        Ok(())
    }

    fn window_pass(&mut self) -> Result<WindowOutcome> {
        self.enter_pass()?;
        let result = self.run_window_pass();
        self.busy = false;
        result
    }

    fn run_window_pass(&mut self) -> Result<WindowOutcome> {
        let content_parent = self.ensure_window_state()?;
        let container = self.session.container;
        let budget = self.preferences.budget();
        let Some(window) = self.session.window.as_mut() else {
            return Err(DetectionFailure::NoContentParent.into());
        };

        pause_observer(&mut self.dom);
        let result = cut_window(&mut self.dom, window, &self.config, container, budget);
        self.dom.observe(content_parent);
        self.session.settle_phase();
        let outcome = result?;

        self.scheduler.cancel_navigation_retries();
        self.last_scroll_top = container.map(|node| self.dom.layout(node).scroll_top);
        info!(
            session_id = %self.session.id,
            hidden_count = outcome.hidden_count,
            hidden_extent = outcome.hidden_extent,
            visible_extent = outcome.visible_extent,
            budget,
            "Applied window"
        );
        self.publish_status();
        Ok(outcome)
    }

    fn restore_pass(&mut self) -> Result<RestoreOutcome> {
        self.enter_pass()?;
        let result = self.run_restore_pass();
        self.busy = false;
        result
    }

    fn run_restore_pass(&mut self) -> Result<RestoreOutcome> {
        self.scheduler.cancel(TimerKind::ScrollRestore);
        self.scheduler.cancel(TimerKind::MutationRewindow);
        let Some(window) = self.session.window.as_mut() else {
            return Ok(RestoreOutcome::default());
        };
        let content_parent = window.content_parent;

        pause_observer(&mut self.dom);
        let result = restore::restore_all(&mut self.dom, window);
        self.dom.observe(content_parent);
        self.session.settle_phase();
        let outcome = result?;

        if outcome.restored > 0 {
            info!(
                session_id = %self.session.id,
                restored = outcome.restored,
                "Restored all hidden blocks"
            );
        }
        self.publish_status();
        Ok(outcome)
    }

    fn scroll_restore_pass(&mut self) -> Result<RestoreOutcome> {
        self.enter_pass()?;
        let result = self.run_scroll_restore_pass();
        self.busy = false;
        result
    }

    fn run_scroll_restore_pass(&mut self) -> Result<RestoreOutcome> {
        let container = self.session.container;
        let batch_size = self.config.window.restore_batch_size;
        let Some(window) = self.session.window.as_mut() else {
            self.session.settle_phase();
            return Ok(RestoreOutcome::default());
        };
        let content_parent = window.content_parent;

        pause_observer(&mut self.dom);
        let result = restore::restore_batch(&mut self.dom, window, batch_size, container);
        self.dom.observe(content_parent);
        self.session.settle_phase();
        let outcome = result?;

        self.last_scroll_top = container.map(|node| self.dom.layout(node).scroll_top);
        debug!(
            session_id = %self.session.id,
            restored = outcome.restored,
            remaining = outcome.remaining,
            "Scroll restore"
        );
        self.publish_status();
        Ok(outcome)
    }

    fn debug_scan(&mut self) -> Result<DebugReport> {
        self.enter_pass()?;
        let result = debug::debug_scan(&mut self.dom, &self.config, &self.debug_marks);
        self.busy = false;
        let report = result?;
        self.debug_marks.clone_from(&report.marked);
        info!(
            candidates = report.candidate_count,
            scoring = report.scoring_count,
            content_blocks = report.content_block_count,
            "Debug scan"
        );
        Ok(report)
    }

    /// Returns the content parent for this session, detecting it if the cached
    /// one is gone.
    fn ensure_window_state(&mut self) -> Result<NodeId> {
        if let Some(window) = &self.session.window {
            if self.dom.is_connected(window.content_parent) {
                return Ok(window.content_parent);
            }
            if window.is_windowed() {
                warn!(
                    session_id = %self.session.id,
                    hidden_count = window.ledger.len(),
                    "Content parent was replaced by the page, dropping its hidden blocks"
                );
            }
            self.session.window = None;
        }

        let hint = self.recent.hint(&self.session.id);
        let container = match self
            .session
            .cached_container(&self.dom, &self.config.locator)
        {
            Some(container) => container,
            None => locator::locate(&self.dom, &self.config.locator, hint.as_ref())
                .ok_or(DetectionFailure::NoContainer)?,
        };
        let resolved = resolver::resolve_content_parent(&self.dom, container, &self.config.resolver)
            .ok_or(DetectionFailure::NoContentParent)?;

        if let Some(hint) = &hint
            && hint.content_depth != resolved.depth
        {
            debug!(
                was = hint.content_depth,
                now = resolved.depth,
                "Content parent depth changed since last visit"
            );
        }

        self.session.container = Some(container);
        self.session.content_depth = Some(resolved.depth);
        self.session.window = Some(WindowState::new(resolved.node));
        if let Some(hint) = self.session.hint(&self.dom) {
            self.recent.remember(self.session.id.clone(), hint);
        }
        debug!(
            session_id = %self.session.id,
            container = %container,
            content_parent = %resolved.node,
            depth = resolved.depth,
            blocks = resolved.block_count,
            "Detected conversation"
        );
        Ok(resolved.node)
    }

    fn check_navigation(&mut self, now_ms: u64) {
        let path = self.dom.location_path();
        if let Some(path) = self.navigation.observe(&path) {
            self.begin_session(&path, now_ms);
        }
    }

    fn begin_session(&mut self, path: &str, now_ms: u64) {
        self.generation += 1;
        let previous = std::mem::replace(
            &mut self.session,
            Session::new(SessionId::from_path(path), self.generation),
        );
        info!(
            from = %previous.id,
            to = %self.session.id,
            dropped = previous.hidden_count(),
            "Navigation detected, starting new session"
        );

        self.dom.disconnect();
        self.scheduler.cancel(TimerKind::ScrollRestore);
        self.scheduler.cancel(TimerKind::MutationRewindow);
        self.scheduler.cancel_navigation_retries();
        self.last_scroll_top = None;
        self.debug_marks.clear();
        self.preferences = load_preferences(self.store.as_ref());
        self.arm_navigation_retries(now_ms);
    }

    fn arm_navigation_retries(&mut self, now_ms: u64) {
        let delays = self.config.timing.navigation_retry_ms.clone();
        for (attempt, delay) in (0..=u8::MAX).zip(delays) {
            self.scheduler.arm(
                TimerKind::NavigationRetry(attempt),
                now_ms,
                delay,
                self.generation,
            );
        }
    }

    fn publish_status(&mut self) {
        let event = match &self.session.window {
            Some(window) => StatusEvent {
                visible_extent: window.visible_extent(),
                total_extent: window.total_extent,
                windowed: window.is_windowed(),
            },
            None => self.status().event(),
        };
        self.sink.publish(event);
    }

    fn log_background_error(&self, timer: Option<TimerKind>, err: &Error) {
        let timer = timer.map(|kind| kind.to_string()).unwrap_or_default();
        match err {
            Error::Busy => debug!(timer = %timer, "Pass already in flight, dropping trigger"),
            Error::Unavailable(failure) => {
                debug!(
                    timer = %timer,
                    session_id = %self.session.id,
                    %failure,
                    "Windowing unavailable"
                );
            }
            other => {
                warn!(
                    timer = %timer,
                    session_id = %self.session.id,
                    error = %other,
                    "Background pass failed"
                );
            }
        }
    }
}

/// Drains records caused by the host before the engine writes, then stops
/// observing so the engine's own writes are never recorded.
fn pause_observer<D: HostDom>(dom: &mut D) {
    let pending = dom.take_mutation_records();
    if !pending.is_empty() {
        trace!(records = pending.len(), "Discarding host mutations before pass");
    }
    dom.disconnect();
}

fn cut_window<D: HostDom>(
    dom: &mut D,
    window: &mut WindowState,
    config: &EngineConfig,
    container: Option<NodeId>,
    budget: f64,
) -> Result<WindowOutcome> {
    restore::restore_all(dom, window)?;
    let reported = container.map(|node| dom.layout(node).scroll_height);
    let outcome = window::apply_window(dom, window, &config.window, &config.resolver, budget)?;

    if let Some(reported) = reported
        && window::diverges(outcome.total_extent, reported, config.window.divergence_ratio)
    {
        warn!(
            measured = outcome.total_extent,
            reported,
            "Measured block extent disagrees with container scroll extent"
        );
    }
    Ok(outcome)
}

fn load_preferences(store: &dyn PreferenceStore) -> Preferences {
    match store.load() {
        Ok(preferences) => preferences,
        Err(err) => {
            warn!(error = %err, "Failed to load preferences, using defaults");
            Preferences::default()
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
}
