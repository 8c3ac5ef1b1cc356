//! The game-state fold.
//!
//! `reduce` is pure and total: it takes the previous state by value and
//! returns the next one, never fails, and performs no I/O beyond logging an
//! internal fault. Sound and display effects are described in the state
//! (`play_note`, `random_notes`, `exit`) for the executor to carry out.

use crate::config::GameConfig;
use crate::error::GameError;
use crate::types::*;
use log::{debug, error, trace};

/// Hits needed per multiplier step.
pub const STREAK_STEP: u32 = 10;
pub const MULTIPLIER_STEP: f64 = 0.2;
/// Base points for a judged hit, before the multiplier.
pub const HIT_POINTS: f64 = 1.0;

pub fn reduce(state: GameState, event: &GameEvent, config: &GameConfig) -> GameState {
    if state.game_end {
        trace!("ignoring {:?} after game end", event);
        return state;
    }
    match event {
        GameEvent::Tick(tick) => on_tick(state, *tick, config),
        GameEvent::Spawn(chart) => on_spawn(state, chart, config),
        GameEvent::BackgroundSpawn(chart) => on_background(state, chart, config),
        GameEvent::LanePress(lane) => on_press(state, *lane, config),
        GameEvent::TailRelease(end) => on_tail_release(state, *end, config),
        GameEvent::GameEnd => {
            let mut next = state;
            next.game_end = true;
            next
        }
    }
}

// ─── Clock ──────────────────────────────────────────────────────────────────

fn on_tick(mut state: GameState, tick: u64, config: &GameConfig) -> GameState {
    if tick <= state.time {
        debug!("stale tick {} at time {}", tick, state.time);
        return state;
    }
    state.time = tick;
    state.exit.clear();
    state.play_note.clear();
    state.background_note.clear();
    state.random_notes.clear();

    let velocity = config.velocity_per_tick();
    let note_lifetime = config.note_lifetime_ticks();
    let GameState {
        notes,
        tails,
        exit,
        misses,
        ..
    } = &mut state;

    let mut missed = 0;
    notes.retain(|id, note| {
        let elapsed = (tick - note.create_time) as f64;
        if elapsed > note_lifetime {
            exit.push(ElementId::Note(*id));
            if note.tail.is_none() {
                missed += 1;
            }
            false
        } else {
            note.cy += velocity;
            true
        }
    });

    tails.retain(|_, tail| {
        let elapsed = (tick - tail.create_time) as f64;
        if elapsed > config.tail_lifetime_ticks(tail.duration) {
            exit.push(ElementId::Tail(tail.id));
            false
        } else {
            advance_tail(tail, velocity, config.hit_line);
            true
        }
    });

    if missed > 0 {
        *misses += missed;
        debug!("t={}: {} note(s) missed", tick, missed);
        reset_streak(&mut state);
    }
    state
}

/// Slide the tail down until its leading edge meets the hit line, then
/// shrink it from the trailing edge with the bottom pinned to the line.
pub fn advance_tail(tail: &mut Tail, velocity: f64, hit_line: f64) {
    if tail.bottom() < hit_line {
        tail.y += velocity;
    } else {
        tail.height = (tail.height - velocity).max(0.0);
        tail.y = hit_line - tail.height;
    }
}

// ─── Spawning ───────────────────────────────────────────────────────────────

fn on_spawn(mut state: GameState, chart: &ChartNote, config: &GameConfig) -> GameState {
    let id = NoteId(state.note_count);
    state.note_count += 1;

    let mut note = Note::from_chart(chart, Some(id), state.time, config);
    if chart.duration() >= config.sustain_threshold_s {
        let tail = Tail::for_note(&note, id, config);
        note.tail = Some(tail.id);
        state.tails.insert(id, tail);
    }
    trace!("spawn {} pitch={} {}", id, note.pitch, note.lane());

    if state.notes.insert(id, note).is_some() {
        error!("{}", GameError::DuplicateIdentity(id));
    }
    state
}

fn on_background(mut state: GameState, chart: &ChartNote, config: &GameConfig) -> GameState {
    let note = Note::from_chart(chart, None, state.time, config);
    state.background_note.push(note.clone());
    state.play_note.push(note);
    state
}

// ─── Judgement ──────────────────────────────────────────────────────────────

/// Position window around the hit line.
pub fn is_aligned(note: &Note, config: &GameConfig) -> bool {
    (note.cy - config.hit_line).abs() <= config.hit_tolerance
}

/// Time window around the moment a sustain's end crosses the hit line.
pub fn is_release_aligned(time: u64, end: f64, config: &GameConfig) -> bool {
    let now = time as f64 * config.tick_seconds();
    (now - end - config.travel_seconds()).abs() <= config.release_tolerance_s
}

fn on_press(mut state: GameState, lane: Lane, config: &GameConfig) -> GameState {
    // First live note of the lane in spawn order, not the closest one.
    let target = state
        .notes
        .iter()
        .find(|(_, note)| note.lane() == lane)
        .map(|(id, note)| (*id, is_aligned(note, config)));

    let id = match target {
        Some((id, true)) => id,
        _ => {
            trace!("t={}: stray press on {}", state.time, lane);
            state.random_notes.push(lane);
            return state;
        }
    };

    let Some(note) = state.notes.remove(&id) else {
        return state;
    };
    state.exit.push(ElementId::Note(id));
    let sustained = note.tail.is_some();
    state.play_note.push(note);

    if sustained {
        debug!("t={}: holding {}", state.time, id);
    } else {
        debug!("t={}: hit {}", state.time, id);
        register_hit(&mut state);
    }
    state
}

fn on_tail_release(mut state: GameState, end: f64, config: &GameConfig) -> GameState {
    if is_release_aligned(state.time, end, config) {
        debug!("t={}: clean release (end={:.2}s)", state.time, end);
        register_hit(&mut state);
    } else {
        debug!("t={}: sloppy release (end={:.2}s)", state.time, end);
        reset_streak(&mut state);
    }
    state
}

// ─── Scoring ────────────────────────────────────────────────────────────────

fn register_hit(state: &mut GameState) {
    state.consecutive_hits += 1;
    if state.consecutive_hits % STREAK_STEP == 0 {
        state.multiplier = round1(state.multiplier + MULTIPLIER_STEP);
    }
    state.score = round1(state.score + HIT_POINTS * state.multiplier);
}

fn reset_streak(state: &mut GameState) {
    state.consecutive_hits = 0;
    state.multiplier = 1.0;
}

/// Round to one decimal place.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
