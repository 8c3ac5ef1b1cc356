use crate::chart::Chart;
use crate::config::GameConfig;
use crate::scheduler::{EventQueue, Pending, Source};
use crate::types::GameEvent;
use log::debug;

/// A chart event with its release time in milliseconds from game start.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub due_ms: u64,
    pub event: GameEvent,
}

/// Turn a chart into its spawn schedule.
///
/// Player notes spawn at their chart start. Ambient notes are held back a
/// further travel duration so they sound when a player note with the same
/// start would cross the hit line. The game ends one travel duration after
/// the final row's end. The result is sorted by due time; rows with equal
/// due times keep chart order.
pub fn schedule(chart: &Chart, config: &GameConfig) -> Vec<TimedEvent> {
    let mut events: Vec<TimedEvent> = chart
        .notes
        .iter()
        .map(|note| {
            let start_ms = seconds_to_ms(note.start);
            if note.user_played {
                TimedEvent {
                    due_ms: start_ms,
                    event: GameEvent::Spawn(note.clone()),
                }
            } else {
                TimedEvent {
                    due_ms: start_ms + config.travel_ms,
                    event: GameEvent::BackgroundSpawn(note.clone()),
                }
            }
        })
        .collect();

    events.push(TimedEvent {
        due_ms: seconds_to_ms(chart.duration()) + config.travel_ms,
        event: GameEvent::GameEnd,
    });

    events.sort_by_key(|e| e.due_ms);
    events
}

/// Push a chart's schedule onto the merged queue.
pub fn enqueue(chart: &Chart, config: &GameConfig, queue: &mut EventQueue) -> usize {
    let events = schedule(chart, config);
    let count = events.len();
    for e in events {
        queue.schedule(e.due_ms, Source::Timeline, Pending::Game(e.event));
    }
    debug!("timeline: {} events scheduled", count);
    count
}

pub fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round().max(0.0) as u64
}
