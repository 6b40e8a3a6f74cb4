//! Scheduled entries on a session-local clock.
//!
//! Nothing here reads wall time. The owner advances the clock explicitly and
//! gets back whatever fell due, in `(due, scheduling order)` order. Every entry
//! carries a [`TimerToken`] so it can be cancelled before it fires.

use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct Entry<A> {
    token: TimerToken,
    due: Duration,
    action: A,
}

#[derive(Debug)]
pub struct Timeline<A> {
    now: Duration,
    next_token: u64,
    pending: Vec<Entry<A>>,
}

impl<A> Default for Timeline<A> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_token: 0,
            pending: Vec::new(),
        }
    }
}

impl<A> Timeline<A> {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn schedule(&mut self, after: Duration, action: A) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.pending.push(Entry {
            token,
            due: self.now + after,
            action,
        });
        token
    }

    /// Returns false if the entry already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.token != token);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Pops the earliest entry due at or before `until`, moving the clock to
    /// its due time. Callers loop on this so that entries scheduled while
    /// handling an earlier one can still fire within the same advance.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerToken, A)> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= until)
            .min_by_key(|(_, e)| (e.due, e.token))
            .map(|(i, _)| i)?;
        let entry = self.pending.swap_remove(idx);
        self.now = self.now.max(entry.due);
        Some((entry.token, entry.action))
    }

    /// Moves the clock forward without firing anything.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}
