use crate::chart::Chart;
use crate::clock::{GameClock, SessionClock};
use crate::config::GameConfig;
use crate::input::{InputCapture, LaneEdge};
use crate::reducer::reduce;
use crate::scheduler::{EventQueue, Pending, Source};
use crate::sustain::{HeldNote, SustainTracker};
use crate::timeline;
use crate::types::*;
use crossbeam_channel::{never, select, Receiver, Sender};
use log::{debug, info, trace};
use std::time::Duration;

/// What consumers receive: the state accumulated over one tick period,
/// plus the sustain voices that stopped during it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub state: GameState,
    /// Held notes whose sound must stop, by voice token (the note id).
    pub voice_releases: Vec<NoteId>,
}

/// The coordinator owns the merged event queue and the authoritative
/// `GameState`. It pops events in order, routes raw key edges through input
/// capture and the sustain tracker, folds the resulting game events with
/// `reduce`, and publishes frames to downstream consumers.
///
/// # Frame publication
///
/// A frame is published just before each tick is folded, so it carries one
/// whole tick period of transient output (`exit`, `play_note`,
/// `background_note`, `random_notes`) and every transient entry is seen
/// exactly once. A final frame follows the game-end signal.
///
/// # Game end
///
/// After `GameEnd` the queue is cleared: spawns, ambient notes, ticks and
/// sustain timeouts that have not fired are abandoned, and the frame
/// senders are dropped so consumer threads exit.
pub struct Coordinator {
    config: GameConfig,
    queue: EventQueue,
    clock: GameClock,
    input: InputCapture,
    sustain: SustainTracker,
    state: GameState,
    frame_txs: Vec<Sender<Frame>>,
    voice_releases: Vec<NoteId>,
    events_folded: u64,
}

impl Coordinator {
    pub fn new(config: GameConfig, chart: &Chart, frame_txs: Vec<Sender<Frame>>) -> Self {
        let mut queue = EventQueue::new();
        timeline::enqueue(chart, &config, &mut queue);
        let mut clock = GameClock::new(config.tick_ms);
        clock.arm(&mut queue);

        Self {
            input: InputCapture::new(config.key_bindings),
            config,
            queue,
            clock,
            sustain: SustainTracker::new(),
            state: GameState::new(),
            frame_txs,
            voice_releases: Vec::new(),
            events_folded: 0,
        }
    }

    /// Pre-schedule key edges, e.g. from autoplay or a test script.
    pub fn schedule_keys(&mut self, edges: impl IntoIterator<Item = (u64, KeyEdge)>) {
        for (due_ms, edge) in edges {
            self.queue.schedule(due_ms, Source::Input, Pending::Key(edge));
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Run in virtual time: every queued entry fires in order with no
    /// waiting. Deterministic; used for headless runs and tests.
    pub fn run_virtual(mut self) -> GameState {
        info!("Coordinator running (virtual time)");
        while !self.state.game_end {
            let Some((due_ms, pending)) = self.queue.pop() else {
                break;
            };
            self.handle(due_ms, pending);
        }
        self.finish()
    }

    /// Run against the wall clock. Scheduled entries fire when due; live key
    /// edges are handled as they arrive, stamped with the current time.
    /// Blocks the calling thread until the game ends.
    pub fn run_live(mut self, keys: Receiver<KeyEdge>, clock: SessionClock) -> GameState {
        info!("Coordinator running (live, {} ms ticks)", self.config.tick_ms);
        let mut keys = keys;
        let mut keys_closed = false;

        while !self.state.game_end {
            let now = clock.now_ms();
            if let Some((due_ms, pending)) = self.queue.pop_due(now) {
                self.handle(due_ms, pending);
                continue;
            }
            let Some(due_ms) = self.queue.next_due() else {
                break;
            };

            select! {
                recv(keys) -> msg => match msg {
                    Ok(edge) => self.handle(clock.now_ms(), Pending::Key(edge)),
                    Err(_) => keys_closed = true,
                },
                default(Duration::from_millis(due_ms - now)) => {}
            }
            if keys_closed {
                debug!("key source closed");
                keys = never();
                keys_closed = false;
            }
        }
        self.finish()
    }

    fn handle(&mut self, now_ms: u64, pending: Pending) {
        match pending {
            Pending::Game(event @ GameEvent::Tick(_)) => {
                self.publish();
                self.apply(now_ms, event);
                self.clock.arm(&mut self.queue);
            }
            Pending::Game(event) => self.apply(now_ms, event),
            Pending::Key(edge) => match self.input.capture(edge) {
                Some(LaneEdge::Press(lane)) => self.apply(now_ms, GameEvent::LanePress(lane)),
                Some(LaneEdge::Release(lane)) => {
                    if let Some(held) = self.sustain.release(lane) {
                        self.queue.cancel(held.timer);
                        self.voice_releases.push(held.id);
                        self.apply(now_ms, GameEvent::TailRelease(held.end));
                    }
                }
                None => {}
            },
            Pending::SustainTimeout { lane, id } => {
                if let Some(held) = self.sustain.timeout(lane, id) {
                    debug!("{} sustain ran out on {}", held.id, lane);
                    self.voice_releases.push(held.id);
                }
            }
        }
    }

    fn apply(&mut self, now_ms: u64, event: GameEvent) {
        let played_before = self.state.play_note.len();
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, &event, &self.config);
        self.events_folded += 1;

        // A tailed player note that just started sounding begins a hold.
        let new_holds: Vec<(Lane, NoteId, f64, f64)> = self
            .state
            .play_note
            .iter()
            .skip(played_before)
            .filter(|n| n.tail.is_some())
            .filter_map(|n| n.id.map(|id| (n.lane(), id, n.end, n.duration())))
            .collect();
        for (lane, id, end, duration) in new_holds {
            self.start_hold(now_ms, lane, id, end, duration);
        }

        if self.events_folded % 1000 == 0 {
            let keys_down = Lane::ALL.iter().filter(|l| self.input.is_held(**l)).count();
            trace!(
                "Coordinator: {}  ({} ms ticks, {} keys down, {} holds)",
                self.state,
                self.clock.period_ms(),
                keys_down,
                self.sustain.active()
            );
        }
    }

    fn start_hold(&mut self, now_ms: u64, lane: Lane, id: NoteId, end: f64, duration: f64) {
        let due_ms = now_ms + timeline::seconds_to_ms(duration);
        let timer = self
            .queue
            .schedule(due_ms, Source::Sustain, Pending::SustainTimeout { lane, id });
        let held = HeldNote { id, end, timer };
        if let Some(prev) = self.sustain.hold(lane, held) {
            self.queue.cancel(prev.timer);
            self.voice_releases.push(prev.id);
        }
    }

    fn publish(&mut self) {
        let frame = Frame {
            state: self.state.clone(),
            voice_releases: std::mem::take(&mut self.voice_releases),
        };
        for tx in &self.frame_txs {
            let _ = tx.send(frame.clone());
        }
    }

    fn finish(mut self) -> GameState {
        // Release anything still sounding so no voice outlives the game.
        for lane in Lane::ALL {
            if let Some(held) = self.sustain.release(lane) {
                self.voice_releases.push(held.id);
            }
        }
        self.publish();
        let abandoned = self.queue.clear();
        info!(
            "Coordinator finished after {} events: score {:.1}, {} misses, {} pending events abandoned",
            self.events_folded, self.state.score, self.state.misses, abandoned
        );
        self.state
    }
}
