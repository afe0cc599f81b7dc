//! Pending timers driven by an injected millisecond clock.
//!
//! The scheduler never sleeps. The runtime asks for [`Scheduler::next_deadline`]
//! and calls back with the current time; tests pass the time directly.

use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TimerKind {
    /// Debounced incremental restore after an upward scroll near the top.
    ScrollRestore,
    /// Debounced re-window after new blocks appear.
    MutationRewindow,
    /// Staged re-application after a navigation; the index into the retry
    /// schedule.
    NavigationRetry(u8),
    /// Fallback location poll for hosts whose history calls are not hooked.
    NavigationPoll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub due_ms: u64,
    /// Session generation the timer was armed under. A timer from an older
    /// generation is discarded when it fires.
    pub generation: u64,
}

#[derive(Debug, Default, Clone)]
pub struct Scheduler {
    timers: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind` to fire `delay_ms` from `now_ms`. Re-arming a pending kind
    /// moves its deadline, which is what makes scroll and mutation timers
    /// debounce.
    pub fn arm(&mut self, kind: TimerKind, now_ms: u64, delay_ms: u64, generation: u64) {
        let timer = Timer {
            kind,
            due_ms: now_ms.saturating_add(delay_ms),
            generation,
        };
        match self.timers.iter_mut().find(|pending| pending.kind == kind) {
            Some(pending) => *pending = timer,
            None => self.timers.push(timer),
        }
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.kind != kind);
        self.timers.len() != before
    }

    pub fn cancel_navigation_retries(&mut self) {
        self.timers
            .retain(|timer| !matches!(timer.kind, TimerKind::NavigationRetry(_)));
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|timer| timer.kind == kind)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.iter().map(|timer| timer.due_ms).min()
    }

    /// Removes and returns every timer due at `now_ms`, earliest first.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<Timer> {
        let (mut due, pending): (Vec<Timer>, Vec<Timer>) = self
            .timers
            .drain(..)
            .partition(|timer| timer.due_ms <= now_ms);
        self.timers = pending;
        due.sort_by_key(|timer| timer.due_ms);
        due
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearming_debounces() {
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::ScrollRestore, 0, 150, 1);
        scheduler.arm(TimerKind::ScrollRestore, 100, 150, 1);

        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.take_due(200).is_empty());
        let fired = scheduler.take_due(250);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, TimerKind::ScrollRestore);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn due_timers_come_out_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::NavigationRetry(1), 0, 1500, 2);
        scheduler.arm(TimerKind::NavigationRetry(0), 0, 500, 2);
        scheduler.arm(TimerKind::NavigationPoll, 0, 500, 2);
        scheduler.arm(TimerKind::MutationRewindow, 0, 300, 2);

        assert_eq!(scheduler.next_deadline(), Some(300));
        let kinds: Vec<TimerKind> = scheduler.take_due(1500).iter().map(|t| t.kind).collect();
        assert_eq!(kinds[0], TimerKind::MutationRewindow);
        assert_eq!(kinds[3], TimerKind::NavigationRetry(1));
    }

    #[test]
    fn cancelling_retries_leaves_other_timers() {
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::NavigationRetry(0), 0, 500, 1);
        scheduler.arm(TimerKind::NavigationRetry(2), 0, 3000, 1);
        scheduler.arm(TimerKind::NavigationPoll, 0, 500, 1);

        scheduler.cancel_navigation_retries();
        assert!(scheduler.is_armed(TimerKind::NavigationPoll));
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.cancel(TimerKind::NavigationPoll));
        assert!(!scheduler.cancel(TimerKind::NavigationPoll));
        assert_eq!(scheduler.next_deadline(), None);
    }
}
