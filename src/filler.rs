use crate::prng::PrngStream;
use crate::types::SoundRequest;
use log::trace;

/// One randomly generated ambient note, played on mis-presses.
#[derive(Debug, Clone, PartialEq)]
pub struct FillerNote {
    pub instrument_index: usize,
    /// 0.5–0.8
    pub velocity: f32,
    /// MIDI 0–90
    pub pitch: u8,
    /// Seconds, 0.0–0.5
    pub duration: f64,
}

/// Produces filler notes from four independent seeded streams: one each
/// for instrument, velocity, pitch and duration.
pub struct FillerGenerator {
    instrument: PrngStream,
    velocity: PrngStream,
    pitch: PrngStream,
    duration: PrngStream,
    instrument_count: usize,
    triggers: u64,
}

impl FillerGenerator {
    pub fn new(seeds: [u64; 4], instrument_count: usize) -> Self {
        Self {
            instrument: PrngStream::new(seeds[0]),
            velocity: PrngStream::new(seeds[1]),
            pitch: PrngStream::new(seeds[2]),
            duration: PrngStream::new(seeds[3]),
            instrument_count: instrument_count.max(1),
            triggers: 0,
        }
    }

    pub fn next_note(&mut self) -> FillerNote {
        self.triggers += 1;
        let i = self.instrument.next_unit();
        let v = self.velocity.next_unit();
        let p = self.pitch.next_unit();
        let d = self.duration.next_unit();

        let note = FillerNote {
            instrument_index: ((i * self.instrument_count as f64) as usize)
                .min(self.instrument_count - 1),
            velocity: (0.5 + v * 0.3) as f32,
            pitch: (p * 91.0) as u8,
            duration: d * 0.5,
        };
        trace!("filler #{}: {:?}", self.triggers, note);
        note
    }

    pub fn triggers(&self) -> u64 {
        self.triggers
    }
}

impl FillerNote {
    pub fn sound_request(&self, instruments: &[String]) -> Option<SoundRequest> {
        instruments.get(self.instrument_index).map(|name| SoundRequest {
            instrument: name.clone(),
            pitch: self.pitch,
            velocity: self.velocity,
            duration: self.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        let mut g = FillerGenerator::new([1, 7, 42, 1337], 4);
        for _ in 0..2000 {
            let n = g.next_note();
            assert!(n.instrument_index < 4);
            assert!((0.5..=0.8).contains(&n.velocity), "velocity {}", n.velocity);
            assert!(n.pitch <= 90);
            assert!((0.0..=0.5).contains(&n.duration));
        }
        assert_eq!(g.triggers(), 2000);
    }

    #[test]
    fn test_same_seeds_same_notes() {
        let mut a = FillerGenerator::new([3, 5, 8, 13], 3);
        let mut b = FillerGenerator::new([3, 5, 8, 13], 3);
        for _ in 0..20 {
            assert_eq!(a.next_note(), b.next_note());
        }
    }

    #[test]
    fn test_sound_request_uses_palette() {
        let palette = vec!["piano".to_string(), "bass".to_string()];
        let note = FillerNote {
            instrument_index: 1,
            velocity: 0.6,
            pitch: 40,
            duration: 0.25,
        };
        let req = note.sound_request(&palette).unwrap();
        assert_eq!(req.instrument, "bass");
        assert_eq!(req.pitch, 40);
    }
}
