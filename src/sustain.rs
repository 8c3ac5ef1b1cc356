use crate::scheduler::TimerId;
use crate::types::{Lane, NoteId, LANE_COUNT};

/// A sustain note currently sounding on a lane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeldNote {
    pub id: NoteId,
    /// Chart end time in seconds; what a key release publishes.
    pub end: f64,
    /// The pending duration timeout.
    pub timer: TimerId,
}

/// Resolves the race between a lane's key release and its held note's
/// duration timeout. Whichever resolves first takes the hold out of the
/// tracker; the other then finds nothing and does nothing.
#[derive(Debug, Default)]
pub struct SustainTracker {
    held: [Option<HeldNote>; LANE_COUNT],
}

impl SustainTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start holding a note. Returns a previous hold on the same lane,
    /// which the caller must release.
    pub fn hold(&mut self, lane: Lane, note: HeldNote) -> Option<HeldNote> {
        self.held[lane.index()].replace(note)
    }

    /// Key release won. The caller cancels the returned timer and publishes
    /// the end time.
    pub fn release(&mut self, lane: Lane) -> Option<HeldNote> {
        self.held[lane.index()].take()
    }

    /// Timeout won. Only resolves if `id` is still the note held on `lane`.
    pub fn timeout(&mut self, lane: Lane, id: NoteId) -> Option<HeldNote> {
        let slot = &mut self.held[lane.index()];
        if slot.map(|h| h.id) == Some(id) {
            slot.take()
        } else {
            None
        }
    }

    pub fn active(&self) -> usize {
        self.held.iter().flatten().count()
    }
}
