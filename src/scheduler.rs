//! The merged event channel.
//!
//! Every timed source (chart timeline, scripted input, clock pulses, sustain
//! timeouts) pushes into one `EventQueue`; the coordinator pops in
//! `(due_ms, source, seq)` order. Events due at the same millisecond are
//! resolved by `Source` declaration order, then by scheduling order.

use crate::types::{GameEvent, KeyEdge, Lane, NoteId};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Origin of a queued item. Declaration order is the same-instant tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Timeline,
    Input,
    Clock,
    Sustain,
}

/// What the coordinator should do when an entry comes due.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    /// Fold straight into the state.
    Game(GameEvent),
    /// Raw key edge; goes through input capture first.
    Key(KeyEdge),
    /// A held note's nominal duration elapsed.
    SustainTimeout { lane: Lane, id: NoteId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry {
    due_ms: u64,
    source: Source,
    seq: u64,
    pending: Pending,
}

impl Entry {
    fn key(&self) -> (u64, Source, u64) {
        (self.due_ms, self.source, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap and we want the earliest entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Entry>,
    cancelled: HashSet<u64>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: u64, source: Source, pending: Pending) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            due_ms,
            source,
            seq,
            pending,
        });
        TimerId(seq)
    }

    /// Cancel a scheduled entry. It will never be returned by `pop`.
    pub fn cancel(&mut self, id: TimerId) {
        self.cancelled.insert(id.0);
    }

    /// Due time of the earliest live entry.
    pub fn next_due(&mut self) -> Option<u64> {
        self.discard_cancelled();
        self.heap.peek().map(|e| e.due_ms)
    }

    /// Pop the earliest live entry regardless of the current time.
    pub fn pop(&mut self) -> Option<(u64, Pending)> {
        self.discard_cancelled();
        self.heap.pop().map(|e| (e.due_ms, e.pending))
    }

    /// Pop the earliest live entry if it is due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, Pending)> {
        match self.next_due() {
            Some(due) if due <= now_ms => self.pop(),
            _ => None,
        }
    }

    /// Abandon everything still scheduled. Returns how many live entries
    /// were dropped.
    pub fn clear(&mut self) -> usize {
        let live = self.len();
        self.heap.clear();
        self.cancelled.clear();
        live
    }

    /// Number of live (non-cancelled) entries.
    pub fn len(&self) -> usize {
        self.heap
            .iter()
            .filter(|e| !self.cancelled.contains(&e.seq))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.cancelled.remove(&top.seq) {
                self.heap.pop();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(n: u64) -> Pending {
        Pending::Game(GameEvent::Tick(n))
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut q = EventQueue::new();
        q.schedule(40, Source::Clock, tick(2));
        q.schedule(20, Source::Clock, tick(1));
        q.schedule(60, Source::Clock, tick(3));
        let order: Vec<u64> = std::iter::from_fn(|| q.pop().map(|(due, _)| due)).collect();
        assert_eq!(order, vec![20, 40, 60]);
    }

    #[test]
    fn test_same_instant_uses_source_order() {
        let mut q = EventQueue::new();
        q.schedule(100, Source::Sustain, Pending::SustainTimeout {
            lane: Lane::from_pitch(0),
            id: NoteId(0),
        });
        q.schedule(100, Source::Clock, tick(5));
        q.schedule(100, Source::Input, Pending::Key(KeyEdge::down('d')));
        q.schedule(100, Source::Timeline, Pending::Game(GameEvent::GameEnd));

        assert_eq!(q.pop().unwrap().1, Pending::Game(GameEvent::GameEnd));
        assert_eq!(q.pop().unwrap().1, Pending::Key(KeyEdge::down('d')));
        assert_eq!(q.pop().unwrap().1, tick(5));
        assert!(matches!(q.pop().unwrap().1, Pending::SustainTimeout { .. }));
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_same_source_same_instant_is_fifo() {
        let mut q = EventQueue::new();
        q.schedule(10, Source::Input, Pending::Key(KeyEdge::down('d')));
        q.schedule(10, Source::Input, Pending::Key(KeyEdge::up('d')));
        assert_eq!(q.pop().unwrap().1, Pending::Key(KeyEdge::down('d')));
        assert_eq!(q.pop().unwrap().1, Pending::Key(KeyEdge::up('d')));
    }

    #[test]
    fn test_cancelled_entries_never_fire() {
        let mut q = EventQueue::new();
        let t = q.schedule(10, Source::Clock, tick(1));
        q.schedule(20, Source::Clock, tick(2));
        q.cancel(t);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_due(), Some(20));
        assert_eq!(q.pop().unwrap().1, tick(2));
        assert!(q.is_empty());
    }

    #[test]
    fn test_pop_due_respects_now() {
        let mut q = EventQueue::new();
        q.schedule(50, Source::Clock, tick(1));
        assert!(q.pop_due(49).is_none());
        assert!(q.pop_due(50).is_some());
    }

    #[test]
    fn test_clear_abandons_everything() {
        let mut q = EventQueue::new();
        for n in 0..5 {
            q.schedule(n * 10, Source::Timeline, tick(n));
        }
        let t = q.schedule(99, Source::Clock, tick(99));
        q.cancel(t);
        assert_eq!(q.clear(), 5);
        assert!(q.pop().is_none());
    }
}
