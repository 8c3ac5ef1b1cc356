use crate::chart::Chart;
use crate::config::GameConfig;
use crate::timeline::seconds_to_ms;
use crate::types::*;
use log::info;

/// Scripted player: turns a chart into the key edges a perfect player would
/// produce, so the whole pipeline can run without a keyboard.
///
/// Presses land one tick before a note reaches the end of its path, which
/// puts the note inside the hit window. Sustains are released one tick
/// before their end crosses the hit line; short notes are tapped.
pub struct Autoplay {
    config: GameConfig,
    /// Deliberately let every n-th player note through.
    miss_every: Option<usize>,
}

impl Autoplay {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            config: config.clone(),
            miss_every: None,
        }
    }

    pub fn with_miss_every(mut self, n: usize) -> Self {
        self.miss_every = if n == 0 { None } else { Some(n) };
        self
    }

    pub fn key_edges(&self, chart: &Chart) -> Vec<(u64, KeyEdge)> {
        let tick = self.config.tick_ms;
        let travel = self.config.travel_ms;
        let mut edges = Vec::new();
        let mut skipped = 0;

        for (i, note) in chart.player_notes().enumerate() {
            if let Some(n) = self.miss_every {
                if (i + 1) % n == 0 {
                    skipped += 1;
                    continue;
                }
            }
            let key = self.config.key_bindings[note.lane().index()];
            let press = (seconds_to_ms(note.start) + travel).saturating_sub(tick);
            let release = if note.duration() >= self.config.sustain_threshold_s {
                (seconds_to_ms(note.end) + travel).saturating_sub(tick)
            } else {
                press + tick
            };
            edges.push((press, KeyEdge::down(key)));
            edges.push((release.max(press + 1), KeyEdge::up(key)));
        }

        edges.sort_by_key(|(due, _)| *due);
        info!(
            "Autoplay: {} key edges ({} notes skipped)",
            edges.len(),
            skipped
        );
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parse_chart;

    fn chart() -> Chart {
        parse_chart(
            "header\n\
             True,piano,100,60,0.0,0.25\n\
             False,bass,100,33,0.0,4.0\n\
             True,piano,100,61,1.0,3.0\n\
             True,piano,100,62,2.0,2.5\n",
        )
        .unwrap()
    }

    #[test]
    fn test_edges_for_tap_and_sustain() {
        let config = GameConfig::default();
        let edges = Autoplay::new(&config).key_edges(&chart());
        assert_eq!(edges.len(), 6);
        assert!(edges.contains(&(1980, KeyEdge::down('d'))));
        assert!(edges.contains(&(2000, KeyEdge::up('d'))));
        // lane 1 sustain: held until just before 3.0s + travel
        assert!(edges.contains(&(2980, KeyEdge::down('f'))));
        assert!(edges.contains(&(4980, KeyEdge::up('f'))));
        assert!(edges.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_ambient_notes_not_played() {
        let config = GameConfig::default();
        let edges = Autoplay::new(&config).key_edges(&chart());
        // lane 1 is also pitch 33's lane; only the player note presses it
        let f_downs = edges.iter().filter(|(_, e)| *e == KeyEdge::down('f')).count();
        assert_eq!(f_downs, 1);
    }

    #[test]
    fn test_miss_every() {
        let config = GameConfig::default();
        let edges = Autoplay::new(&config).with_miss_every(2).key_edges(&chart());
        assert_eq!(edges.len(), 4);
        assert!(!edges.iter().any(|(_, e)| e.key == 'f'));
    }
}
