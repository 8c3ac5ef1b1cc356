use crate::scheduler::{EventQueue, Pending, Source};
use crate::types::GameEvent;
use std::time::Instant;

/// Fixed-period pulse source. Only one pulse is ever pending: the
/// coordinator re-arms the clock each time a tick is folded.
#[derive(Debug, Clone)]
pub struct GameClock {
    period_ms: u64,
    armed: u64,
}

impl GameClock {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            armed: 0,
        }
    }

    /// Schedule the next pulse. Tick `n` is due at `n * period_ms`; the
    /// first tick is 1, so tick 0 is the state before any pulse.
    pub fn arm(&mut self, queue: &mut EventQueue) {
        self.armed += 1;
        queue.schedule(
            self.armed * self.period_ms,
            Source::Clock,
            Pending::Game(GameEvent::Tick(self.armed)),
        );
    }

    /// Counter of the most recently armed pulse.
    pub fn armed(&self) -> u64 {
        self.armed
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic wall clock for a live session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_schedules_increasing_ticks() {
        let mut q = EventQueue::new();
        let mut clock = GameClock::new(20);
        clock.arm(&mut q);
        assert_eq!(q.pop(), Some((20, Pending::Game(GameEvent::Tick(1)))));
        clock.arm(&mut q);
        assert_eq!(q.pop(), Some((40, Pending::Game(GameEvent::Tick(2)))));
        assert_eq!(clock.armed(), 2);
    }
}
