use crate::types::{KeyEdge, Lane, LANE_COUNT};
use crossbeam_channel::Sender;
use log::{debug, info};
use std::io::BufRead;

/// De-duplicated per-lane edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneEdge {
    Press(Lane),
    Release(Lane),
}

/// Maps raw key edges for the four bound keys to lane edges.
///
/// A press fires once per physical key-down: auto-repeat downs while the
/// key is held are dropped, as are releases of keys that are not down.
pub struct InputCapture {
    bindings: [char; LANE_COUNT],
    held: [bool; LANE_COUNT],
}

impl InputCapture {
    pub fn new(bindings: [char; LANE_COUNT]) -> Self {
        Self {
            bindings: bindings.map(|k| k.to_ascii_lowercase()),
            held: [false; LANE_COUNT],
        }
    }

    pub fn lane_for(&self, key: char) -> Option<Lane> {
        let key = key.to_ascii_lowercase();
        self.bindings
            .iter()
            .position(|&k| k == key)
            .and_then(Lane::new)
    }

    pub fn capture(&mut self, edge: KeyEdge) -> Option<LaneEdge> {
        let Some(lane) = self.lane_for(edge.key) else {
            debug!("unbound key {:?}", edge.key);
            return None;
        };
        let held = &mut self.held[lane.index()];
        match (edge.pressed, *held) {
            (true, false) => {
                *held = true;
                Some(LaneEdge::Press(lane))
            }
            (false, true) => {
                *held = false;
                Some(LaneEdge::Release(lane))
            }
            _ => None,
        }
    }

    pub fn is_held(&self, lane: Lane) -> bool {
        self.held[lane.index()]
    }
}

// ─── Stdin key reader ───────────────────────────────────────────────────────

/// Reads key edges from a line-oriented stream: each lowercase character is
/// a key-down, each uppercase character the matching key-up.
///
/// `djJD` presses d, presses j, releases j, releases d. Blocks the calling
/// thread until EOF or until the receiver is gone.
pub fn read_key_edges<R: BufRead>(reader: R, tx: Sender<KeyEdge>) {
    info!("Reading keys from stdin (lowercase = down, uppercase = up)");
    for line in reader.lines() {
        let Ok(line) = line else { break };
        for c in line.chars().filter(|c| c.is_alphabetic()) {
            let edge = if c.is_lowercase() {
                KeyEdge::down(c)
            } else {
                KeyEdge::up(c.to_ascii_lowercase())
            };
            if tx.send(edge).is_err() {
                return;
            }
        }
    }
    info!("Key input closed");
}
