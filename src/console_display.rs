use crate::config::GameConfig;
use crate::coordinator::Frame;
use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Height of the rendered playfield in text rows.
const ROWS: usize = 20;
const LANE_WIDTH: usize = 5;

/// Renders the playfield and score panel in the terminal.
pub struct ConsoleDisplay {
    rx: Receiver<Frame>,
    update_hz: u32,
    config: GameConfig,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<Frame>, update_hz: u32, config: GameConfig) -> Self {
        Self {
            rx,
            update_hz,
            config,
        }
    }

    pub fn run(&self) {
        let frames_per_sec = (1000 / self.config.tick_ms.max(1)).max(1);
        let skip = if self.update_hz == 0 {
            1
        } else {
            (frames_per_sec / self.update_hz as u64).max(1)
        };
        let mut count: u64 = 0;
        let mut stdout = io::stdout();

        for frame in self.rx.iter() {
            if frame.state.game_end {
                print!("\x1b[2J\x1b[H");
                println!("{}", game_over_screen(&frame.state));
                let _ = stdout.flush();
                break;
            }

            count += 1;
            if count % skip != 0 {
                continue;
            }

            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");
            println!("{}", render_playfield(&frame.state, &self.config));
            println!("{}", render_panel(&frame.state));
            let _ = stdout.flush();
        }
    }
}

/// Row a path distance falls on, or None if it is off the field.
fn row_for(distance: f64, config: &GameConfig) -> Option<usize> {
    if distance < 0.0 || distance > config.path_length {
        return None;
    }
    let row = (distance / config.path_length * (ROWS - 1) as f64).round() as usize;
    Some(row.min(ROWS - 1))
}

pub fn render_playfield(state: &GameState, config: &GameConfig) -> String {
    let mut grid = vec![[' '; LANE_COUNT]; ROWS];

    for tail in state.tails.values() {
        let lane = nearest_lane(tail.x + tail.width / 2.0, config);
        let top = tail.y.max(0.0);
        let bottom = tail.bottom().min(config.path_length);
        if let (Some(from), Some(to)) = (row_for(top, config), row_for(bottom, config)) {
            for row in grid.iter_mut().take(to + 1).skip(from) {
                row[lane] = '┃';
            }
        }
    }
    for note in state.notes.values() {
        if let Some(row) = row_for(note.cy, config) {
            grid[row][note.lane().index()] = '●';
        }
    }

    let hit_row = row_for(config.hit_line, config).unwrap_or(ROWS - 1);
    let mut out = String::new();
    for (r, cells) in grid.iter().enumerate() {
        let fill = if r == hit_row { '═' } else { ' ' };
        out.push('│');
        for &c in cells {
            let pad = fill.to_string().repeat(LANE_WIDTH / 2);
            let cell = if c == ' ' { fill } else { c };
            out.push_str(&pad);
            out.push(cell);
            out.push_str(&pad);
        }
        out.push_str("│\n");
    }
    out.push('└');
    out.push_str(&"─".repeat(LANE_WIDTH * LANE_COUNT));
    out.push('┘');
    out
}

pub fn render_panel(state: &GameState) -> String {
    format!(
        "  Score: {:<8.1} x{:.1}   Streak: {:<4} Misses: {}",
        state.score, state.multiplier, state.consecutive_hits, state.misses
    )
}

pub fn game_over_screen(state: &GameState) -> String {
    let mut out = String::new();
    out.push_str("╔══════════════════════════════╗\n");
    out.push_str("║          GAME  OVER          ║\n");
    out.push_str("╠══════════════════════════════╣\n");
    out.push_str(&format!("║  Score:      {:<16.1}║\n", state.score));
    out.push_str(&format!("║  Multiplier: x{:<15.1}║\n", state.multiplier));
    out.push_str(&format!("║  Streak:     {:<16}║\n", state.consecutive_hits));
    out.push_str(&format!("║  Misses:     {:<16}║\n", state.misses));
    out.push_str("╚══════════════════════════════╝");
    out
}

fn nearest_lane(x: f64, config: &GameConfig) -> usize {
    config
        .lane_columns
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 - x).abs().total_cmp(&(b.1 - x).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_note(pitch: u8, cy: f64) -> GameState {
        let config = GameConfig::default();
        let chart = ChartNote {
            user_played: true,
            instrument: "piano".into(),
            velocity: 0.5,
            pitch,
            start: 0.0,
            end: 0.25,
        };
        let mut note = Note::from_chart(&chart, Some(NoteId(0)), 0, &config);
        note.cy = cy;
        let mut state = GameState::new();
        state.notes.insert(NoteId(0), note);
        state
    }

    #[test]
    fn test_note_drawn_in_its_lane() {
        let config = GameConfig::default();
        let field = render_playfield(&state_with_note(2, 0.0), &config);
        let first_row: Vec<char> = field.lines().next().unwrap().chars().collect();
        let col = first_row.iter().position(|&c| c == '●').unwrap();
        // border + two full lanes + half a lane
        assert_eq!(col, 1 + 2 * LANE_WIDTH + LANE_WIDTH / 2);
    }

    #[test]
    fn test_playfield_dimensions() {
        let config = GameConfig::default();
        let field = render_playfield(&GameState::new(), &config);
        assert_eq!(field.lines().count(), ROWS + 1);
    }

    #[test]
    fn test_panel_and_game_over() {
        let mut s = GameState::new();
        s.score = 12.4;
        s.multiplier = 1.2;
        s.consecutive_hits = 11;
        assert!(render_panel(&s).contains("12.4"));
        let screen = game_over_screen(&s);
        assert!(screen.contains("GAME  OVER"));
        assert!(screen.contains("x1.2"));
    }

    #[test]
    fn test_nearest_lane() {
        let config = GameConfig::default();
        assert_eq!(nearest_lane(194.0, &config), 1);
        assert_eq!(nearest_lane(1000.0, &config), 3);
    }
}
