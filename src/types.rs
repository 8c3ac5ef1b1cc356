use crate::config::GameConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ─── Lanes ──────────────────────────────────────────────────────────────────

pub const LANE_COUNT: usize = 4;

/// One of the four parallel note columns. Chart notes pick their lane by
/// `pitch mod 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lane(u8);

impl Lane {
    pub const ALL: [Lane; LANE_COUNT] = [Lane(0), Lane(1), Lane(2), Lane(3)];

    /// Returns None for indices outside 0..4.
    pub fn new(index: usize) -> Option<Self> {
        if index < LANE_COUNT {
            Some(Lane(index as u8))
        } else {
            None
        }
    }

    pub fn from_pitch(pitch: u8) -> Self {
        Lane(pitch % LANE_COUNT as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane{}", self.0)
    }
}

// ─── Identities ─────────────────────────────────────────────────────────────

/// Identity of a live player note. Allocated from the monotone
/// `GameState::note_count`, so ids are never reused within a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note-{}", self.0)
    }
}

/// Identity of a sustain tail, derived from the note that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TailId(pub NoteId);

impl fmt::Display for TailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tail-{}", (self.0).0)
    }
}

/// Anything with a visual primitive on the display surface, keyed for
/// upsert/delete by the presentation side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementId {
    Note(NoteId),
    Tail(TailId),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Note(id) => id.fmt(f),
            ElementId::Tail(id) => id.fmt(f),
        }
    }
}

// ─── Chart records ──────────────────────────────────────────────────────────

/// One validated chart row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartNote {
    /// Player-controlled (judged) or ambient (auto-played).
    pub user_played: bool,
    pub instrument: String,
    /// Normalized 0.0–1.0 (the chart stores MIDI velocity 0–127).
    pub velocity: f32,
    /// MIDI note number 0–127.
    pub pitch: u8,
    /// Seconds from chart start.
    pub start: f64,
    pub end: f64,
}

impl ChartNote {
    pub fn lane(&self) -> Lane {
        Lane::from_pitch(self.pitch)
    }

    /// Sustain length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

// ─── Notes and tails ────────────────────────────────────────────────────────

/// A falling unit. Player notes carry an id; ambient notes and the
/// sound-only copies handed to the executor may not.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Option<NoteId>,
    /// Tick count when the note was spawned.
    pub create_time: u64,
    pub user_played: bool,
    pub instrument: String,
    pub velocity: f32,
    pub pitch: u8,
    pub start: f64,
    pub end: f64,
    /// Lane column on the display surface.
    pub cx: f64,
    /// Distance travelled from the spawn line. Starts at 0.
    pub cy: f64,
    /// The sustain tail spawned with this note, if its duration qualified.
    pub tail: Option<TailId>,
}

impl Note {
    pub fn from_chart(chart: &ChartNote, id: Option<NoteId>, time: u64, config: &GameConfig) -> Self {
        Self {
            id,
            create_time: time,
            user_played: chart.user_played,
            instrument: chart.instrument.clone(),
            velocity: chart.velocity,
            pitch: chart.pitch,
            start: chart.start,
            end: chart.end,
            cx: config.lane_columns[chart.lane().index()],
            cy: 0.0,
            tail: None,
        }
    }

    pub fn lane(&self) -> Lane {
        Lane::from_pitch(self.pitch)
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn sound_request(&self) -> SoundRequest {
        SoundRequest {
            instrument: self.instrument.clone(),
            pitch: self.pitch,
            velocity: self.velocity,
            duration: self.duration(),
        }
    }
}

/// Sustain bar drawn above a held note.
///
/// `y` is the offset of the bar's top edge along the path; the leading
/// (bottom) edge is at `y + height`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tail {
    pub id: TailId,
    pub create_time: u64,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    /// Seconds (note end − start).
    pub duration: f64,
    pub style: String,
}

impl Tail {
    /// Geometry for a freshly spawned note: the bar sits directly above the
    /// note head, so its bottom edge starts on the spawn line.
    pub fn for_note(note: &Note, id: NoteId, config: &GameConfig) -> Self {
        let height = config.tail_length(note.duration());
        Self {
            id: TailId(id),
            create_time: note.create_time,
            width: config.tail_width,
            height,
            x: note.cx - config.tail_width / 2.0,
            y: -height,
            duration: note.duration(),
            style: config.lane_colors[note.lane().index()].clone(),
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

// ─── Game state ─────────────────────────────────────────────────────────────

/// The single authoritative aggregate, replaced wholesale by every fold.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    /// Tick count of the last processed clock pulse.
    pub time: u64,
    pub game_end: bool,
    /// Live player notes, in spawn order.
    pub notes: BTreeMap<NoteId, Note>,
    /// Live tails, keyed by the note that spawned them. A tail outlives its
    /// note when the note is hit; it leaves only by its own expiry.
    pub tails: BTreeMap<NoteId, Tail>,
    /// Elements removed during the current tick.
    pub exit: Vec<ElementId>,
    pub note_count: u64,
    pub score: f64,
    /// Notes whose sound must fire this tick.
    pub play_note: Vec<Note>,
    /// Ambient notes spawned this tick (also present in `play_note`).
    pub background_note: Vec<Note>,
    /// One entry per mis-press this tick, for filler sound.
    pub random_notes: Vec<Lane>,
    pub consecutive_hits: u32,
    pub multiplier: f64,
    /// Total notes missed so far.
    pub misses: u32,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            time: 0,
            game_end: false,
            notes: BTreeMap::new(),
            tails: BTreeMap::new(),
            exit: Vec::new(),
            note_count: 0,
            score: 0.0,
            play_note: Vec::new(),
            background_note: Vec::new(),
            random_notes: Vec::new(),
            consecutive_hits: 0,
            multiplier: 1.0,
            misses: 0,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>6}  score={:<8.1} x{:.1}  streak={:<4} miss={:<4} notes={} tails={}{}",
            self.time,
            self.score,
            self.multiplier,
            self.consecutive_hits,
            self.misses,
            self.notes.len(),
            self.tails.len(),
            if self.game_end { "  [END]" } else { "" },
        )
    }
}

// ─── Events ─────────────────────────────────────────────────────────────────

/// Everything the reducer folds. The merge channel carries nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Clock pulse tagged with its tick counter.
    Tick(u64),
    /// Player note reaches the top of the lane.
    Spawn(ChartNote),
    /// Ambient note whose sound is due now.
    BackgroundSpawn(ChartNote),
    LanePress(Lane),
    /// A held note was released by the player; carries the note's chart
    /// end time in seconds.
    TailRelease(f64),
    GameEnd,
}

/// Raw keyboard edge before lane mapping and de-duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEdge {
    pub key: char,
    pub pressed: bool,
}

impl KeyEdge {
    pub fn down(key: char) -> Self {
        Self { key, pressed: true }
    }

    pub fn up(key: char) -> Self {
        Self {
            key,
            pressed: false,
        }
    }
}

// ─── Sound requests ─────────────────────────────────────────────────────────

/// What the executor asks a sound device to play.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRequest {
    pub instrument: String,
    pub pitch: u8,
    pub velocity: f32,
    /// Seconds.
    pub duration: f64,
}

// ─── Compact serialization ──────────────────────────────────────────────────

/// Short-key representation of a published state for JSONL session logs.
/// Field mapping: t=time, sc=score, mu=multiplier, st=consecutive_hits,
/// ms=misses, n=live notes (id, cx, cy), tl=tails (owner id, x, y, height),
/// ex=exit ids, pl=played pitches, rn=mis-press count, end=game_end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactFrame {
    pub t: u64,
    pub sc: f64,
    pub mu: f64,
    pub st: u32,
    pub ms: u32,
    pub n: Vec<(u64, f64, f64)>,
    pub tl: Vec<(u64, f64, f64, f64)>,
    pub ex: Vec<String>,
    pub pl: Vec<u8>,
    pub rn: usize,
    pub end: bool,
}

impl From<&GameState> for CompactFrame {
    fn from(s: &GameState) -> Self {
        Self {
            t: s.time,
            sc: s.score,
            mu: s.multiplier,
            st: s.consecutive_hits,
            ms: s.misses,
            n: s.notes.values().filter_map(|n| n.id.map(|id| (id.0, n.cx, n.cy))).collect(),
            tl: s
                .tails
                .iter()
                .map(|(id, t)| (id.0, t.x, t.y, t.height))
                .collect(),
            ex: s.exit.iter().map(|e| e.to_string()).collect(),
            pl: s.play_note.iter().map(|n| n.pitch).collect(),
            rn: s.random_notes.len(),
            end: s.game_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_from_pitch() {
        assert_eq!(Lane::from_pitch(0).index(), 0);
        assert_eq!(Lane::from_pitch(61).index(), 1);
        assert_eq!(Lane::from_pitch(127).index(), 3);
        assert!(Lane::new(4).is_none());
    }

    #[test]
    fn test_element_ids_display() {
        assert_eq!(ElementId::Note(NoteId(7)).to_string(), "note-7");
        assert_eq!(ElementId::Tail(TailId(NoteId(7))).to_string(), "tail-7");
    }

    #[test]
    fn test_tail_starts_above_note() {
        let config = GameConfig::default();
        let chart = ChartNote {
            user_played: true,
            instrument: "piano".into(),
            velocity: 0.5,
            pitch: 2,
            start: 1.0,
            end: 3.0,
        };
        let note = Note::from_chart(&chart, Some(NoteId(0)), 0, &config);
        let tail = Tail::for_note(&note, NoteId(0), &config);
        assert!((tail.height - config.tail_length(2.0)).abs() < 1e-9);
        assert!(tail.bottom().abs() < 1e-9);
        assert_eq!(note.cx, config.lane_columns[2]);
    }

    #[test]
    fn test_new_state_has_unit_multiplier() {
        let s = GameState::new();
        assert_eq!(s.multiplier, 1.0);
        assert_eq!(s.score, 0.0);
        assert!(!s.game_end);
    }
}
