//! Audio side of the executor: turns published frames into sound calls.
//!
//! Sound devices are reached through the `SoundBank` trait and live in an
//! `ExecutorContext` that is created before the game and shut down after
//! it, so no voice outlives the session.

use crate::config::GameConfig;
use crate::coordinator::Frame;
use crate::error::GameError;
use crate::filler::FillerGenerator;
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// Instrument sound devices.
///
/// Sustained notes are addressed by a voice token (the note id) so that two
/// simultaneous sustains of the same instrument and pitch stay independent.
pub trait SoundBank {
    /// Attack and release in one call; the device stops the note after
    /// `req.duration`.
    fn trigger(&mut self, req: &SoundRequest) -> Result<(), GameError>;
    /// Start a sustained voice that sounds until `release`.
    fn attack(&mut self, voice: NoteId, req: &SoundRequest) -> Result<(), GameError>;
    fn release(&mut self, voice: NoteId);
}

/// Sound bank that only knows which instruments exist and logs what it
/// would play. Used for headless runs and tests.
#[derive(Debug, Default)]
pub struct LogSoundBank {
    instruments: HashSet<String>,
    active: HashMap<NoteId, SoundRequest>,
    pub triggered: Vec<SoundRequest>,
    pub attacked: Vec<NoteId>,
    pub released: Vec<NoteId>,
}

impl LogSoundBank {
    pub fn new(instruments: &[String]) -> Self {
        Self {
            instruments: instruments.iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub fn active_voices(&self) -> usize {
        self.active.len()
    }

    fn check(&self, req: &SoundRequest) -> Result<(), GameError> {
        if self.instruments.contains(&req.instrument) {
            Ok(())
        } else {
            Err(GameError::MissingVoice(req.instrument.clone()))
        }
    }
}

impl SoundBank for LogSoundBank {
    fn trigger(&mut self, req: &SoundRequest) -> Result<(), GameError> {
        self.check(req)?;
        debug!(
            "♪ {} pitch={} vel={:.2} for {:.2}s",
            req.instrument, req.pitch, req.velocity, req.duration
        );
        self.triggered.push(req.clone());
        Ok(())
    }

    fn attack(&mut self, voice: NoteId, req: &SoundRequest) -> Result<(), GameError> {
        self.check(req)?;
        debug!("♪ {} attack {} pitch={}", voice, req.instrument, req.pitch);
        self.active.insert(voice, req.clone());
        self.attacked.push(voice);
        Ok(())
    }

    fn release(&mut self, voice: NoteId) {
        if self.active.remove(&voice).is_some() {
            debug!("♪ {} release", voice);
            self.released.push(voice);
        }
    }
}

// ─── Context ────────────────────────────────────────────────────────────────

/// Everything the executor needs at runtime: the sound devices, the filler
/// palette and its generator.
pub struct ExecutorContext<S: SoundBank> {
    pub sound: S,
    filler: FillerGenerator,
    instruments: Vec<String>,
    sustained: HashSet<NoteId>,
    skipped: u64,
}

impl<S: SoundBank> ExecutorContext<S> {
    pub fn new(sound: S, config: &GameConfig) -> Self {
        Self {
            sound,
            filler: FillerGenerator::new(config.filler_seeds, config.instruments.len()),
            instruments: config.instruments.clone(),
            sustained: HashSet::new(),
            skipped: 0,
        }
    }

    /// Carry out one frame's sound effects.
    ///
    /// Attacks run before releases: a sustain pressed and let go within one
    /// tick period arrives with both in the same frame.
    pub fn apply(&mut self, frame: &Frame) {
        for note in &frame.state.play_note {
            let req = note.sound_request();
            let result = match (note.id, note.tail) {
                (Some(id), Some(_)) => self.sound.attack(id, &req).map(|()| {
                    self.sustained.insert(id);
                }),
                _ => self.sound.trigger(&req),
            };
            self.report(result);
        }

        for _ in &frame.state.random_notes {
            let filler = self.filler.next_note();
            let Some(req) = filler.sound_request(&self.instruments) else {
                continue;
            };
            let result = self.sound.trigger(&req);
            self.report(result);
        }

        for id in &frame.voice_releases {
            if self.sustained.remove(id) {
                self.sound.release(*id);
            }
        }
    }

    fn report(&mut self, result: Result<(), GameError>) {
        if let Err(e) = result {
            self.skipped += 1;
            warn!("{}; skipping sound", e);
        }
    }

    /// Stop every voice still sounding.
    pub fn shutdown(&mut self) {
        for id in self.sustained.drain() {
            self.sound.release(id);
        }
        info!(
            "Audio executor shut down ({} filler notes, {} sounds skipped)",
            self.filler.triggers(),
            self.skipped
        );
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

/// Consumes frames and plays their sounds until the game ends or the
/// coordinator goes away.
pub struct AudioExecutor<S: SoundBank> {
    rx: Receiver<Frame>,
    ctx: ExecutorContext<S>,
}

impl<S: SoundBank> AudioExecutor<S> {
    pub fn new(rx: Receiver<Frame>, ctx: ExecutorContext<S>) -> Self {
        Self { rx, ctx }
    }

    /// Blocks the calling thread. Returns the context after teardown.
    pub fn run(mut self) -> ExecutorContext<S> {
        info!("Audio executor running");
        for frame in self.rx.iter() {
            self.ctx.apply(&frame);
            if frame.state.game_end {
                break;
            }
        }
        self.ctx.shutdown();
        self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: Option<u64>, instrument: &str, tail: bool) -> Note {
        Note {
            id: id.map(NoteId),
            create_time: 0,
            user_played: id.is_some(),
            instrument: instrument.into(),
            velocity: 0.7,
            pitch: 60,
            start: 0.0,
            end: if tail { 2.0 } else { 0.25 },
            cx: 100.0,
            cy: 0.0,
            tail: if tail { id.map(|n| TailId(NoteId(n))) } else { None },
        }
    }

    fn frame(play: Vec<Note>, random: usize, releases: Vec<NoteId>) -> Frame {
        let mut state = GameState::new();
        state.play_note = play;
        state.random_notes = vec![Lane::ALL[0]; random];
        Frame {
            state,
            voice_releases: releases,
        }
    }

    fn ctx() -> ExecutorContext<LogSoundBank> {
        let config = GameConfig::default();
        ExecutorContext::new(LogSoundBank::new(&config.instruments), &config)
    }

    #[test]
    fn test_taps_trigger_and_sustains_attack() {
        let mut c = ctx();
        c.apply(&frame(
            vec![note(Some(0), "piano", false), note(Some(1), "piano", true)],
            0,
            vec![],
        ));
        assert_eq!(c.sound.triggered.len(), 1);
        assert_eq!(c.sound.attacked, vec![NoteId(1)]);
        assert_eq!(c.sound.active_voices(), 1);

        c.apply(&frame(vec![], 0, vec![NoteId(1)]));
        assert_eq!(c.sound.released, vec![NoteId(1)]);
        assert_eq!(c.sound.active_voices(), 0);
    }

    #[test]
    fn test_missing_voice_is_skipped() {
        let mut c = ctx();
        c.apply(&frame(
            vec![note(None, "theremin", false), note(None, "piano", false)],
            0,
            vec![],
        ));
        assert_eq!(c.skipped(), 1);
        assert_eq!(c.sound.triggered.len(), 1);
    }

    #[test]
    fn test_filler_per_mis_press() {
        let mut c = ctx();
        c.apply(&frame(vec![], 3, vec![]));
        assert_eq!(c.sound.triggered.len(), 3);
        for req in &c.sound.triggered {
            assert!(req.pitch <= 90);
            assert!(req.duration <= 0.5);
        }
    }

    #[test]
    fn test_same_pitch_sustains_do_not_contend() {
        let mut c = ctx();
        c.apply(&frame(
            vec![note(Some(4), "piano", true), note(Some(5), "piano", true)],
            0,
            vec![],
        ));
        assert_eq!(c.sound.active_voices(), 2);
        c.apply(&frame(vec![], 0, vec![NoteId(4)]));
        assert_eq!(c.sound.active_voices(), 1);
    }

    #[test]
    fn test_attack_and_release_in_one_frame() {
        let mut c = ctx();
        c.apply(&frame(vec![note(Some(3), "guitar", true)], 0, vec![NoteId(3)]));
        assert_eq!(c.sound.attacked, vec![NoteId(3)]);
        assert_eq!(c.sound.released, vec![NoteId(3)]);
        assert_eq!(c.sound.active_voices(), 0);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut c = ctx();
        c.apply(&frame(vec![note(Some(2), "bass", true)], 0, vec![]));
        c.shutdown();
        assert_eq!(c.sound.active_voices(), 0);
        assert_eq!(c.sound.released, vec![NoteId(2)]);
    }
}
