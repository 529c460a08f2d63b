use quill_core::RenderConfig;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// When touched messages are re-rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Right after each change
    #[default]
    Immediate,
    /// Once per window, for every message touched within it
    Coalesce(Duration),
}

impl UpdatePolicy {
    pub fn from_config(config: &RenderConfig) -> Self {
        match config.coalesce_window() {
            Some(window) => UpdatePolicy::Coalesce(window),
            None => UpdatePolicy::Immediate,
        }
    }
}

/// Tracks dirty messages and the coalescing deadline
#[derive(Debug, Clone, Default)]
pub struct UpdateScheduler {
    policy: UpdatePolicy,
    dirty: BTreeSet<usize>,
    deadline: Option<Instant>,
}

impl UpdateScheduler {
    pub fn new(policy: UpdatePolicy) -> Self {
        Self { policy, dirty: BTreeSet::new(), deadline: None }
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    /// Record a change to message `index`; true when it must render now
    pub fn mark_dirty(&mut self, index: usize, now: Instant) -> bool {
        match self.policy {
            UpdatePolicy::Immediate => true,
            UpdatePolicy::Coalesce(window) => {
                self.dirty.insert(index);
                if self.deadline.is_none() {
                    self.deadline = Some(now + window);
                    tracing::trace!(index, ?window, "coalescing window opened");
                }
                false
            }
        }
    }

    /// Dirty indices whose window has elapsed, in ascending order
    pub fn due(&mut self, now: Instant) -> Option<Vec<usize>> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        let dirty = std::mem::take(&mut self.dirty);
        Some(dirty.into_iter().collect())
    }

    /// Drop pending work
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            tracing::trace!(pending = self.dirty.len(), "coalescing window cancelled");
        }
        self.dirty.clear();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty()
    }
}
