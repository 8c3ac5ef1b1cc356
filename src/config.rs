//! Game tuning: clock period, note travel, geometry, judgement windows,
//! key bindings and the filler-note voice list.
//!
//! Every field has a default, so a JSON config file only needs the keys it
//! wants to change.

use crate::error::GameError;
use crate::types::LANE_COUNT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Clock period in milliseconds.
    pub tick_ms: u64,
    /// Time a note takes to fall from the spawn line to the end of its path.
    pub travel_ms: u64,
    /// Path length in px-equivalent units.
    pub path_length: f64,
    /// Distance from the spawn line to the hit line.
    pub hit_line: f64,
    /// Allowed position error when judging a press.
    pub hit_tolerance: f64,
    /// Allowed time error (seconds) when judging a tail release.
    pub release_tolerance_s: f64,
    /// Minimum note duration (seconds) that gets a tail.
    pub sustain_threshold_s: f64,
    /// Tails expire after this many multiples of their duration.
    pub tail_expiry_factor: f64,
    pub tail_width: f64,
    pub lane_columns: [f64; LANE_COUNT],
    pub lane_colors: [String; LANE_COUNT],
    /// Physical keys bound to lanes 0–3.
    pub key_bindings: [char; LANE_COUNT],
    /// Instrument names that have a sound device; also the filler palette.
    pub instruments: Vec<String>,
    /// Seeds for the instrument, velocity, pitch and duration streams.
    pub filler_seeds: [u64; 4],
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            travel_ms: 2000,
            path_length: 600.0,
            hit_line: 600.0,
            hit_tolerance: 30.0,
            release_tolerance_s: 0.25,
            sustain_threshold_s: 1.0,
            tail_expiry_factor: 5.0,
            tail_width: 12.0,
            lane_columns: [100.0, 200.0, 300.0, 400.0],
            lane_colors: [
                "#e74c3c".to_string(),
                "#f1c40f".to_string(),
                "#2ecc71".to_string(),
                "#3498db".to_string(),
            ],
            key_bindings: ['d', 'f', 'j', 'k'],
            instruments: vec![
                "piano".to_string(),
                "guitar".to_string(),
                "bass".to_string(),
                "strings".to_string(),
            ],
            filler_seeds: [1, 7, 42, 1337],
        }
    }
}

impl GameConfig {
    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, GameError> {
        let text = fs::read_to_string(path)?;
        let config: GameConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.tick_ms == 0 {
            return Err(GameError::Config("tick_ms must be positive".into()));
        }
        if self.travel_ms < self.tick_ms {
            return Err(GameError::Config(format!(
                "travel_ms ({}) must be at least one tick ({})",
                self.travel_ms, self.tick_ms
            )));
        }
        if self.path_length.is_nan() || self.path_length <= 0.0 {
            return Err(GameError::Config("path_length must be positive".into()));
        }
        if [self.hit_tolerance, self.release_tolerance_s]
            .iter()
            .any(|t| t.is_nan() || *t < 0.0)
        {
            return Err(GameError::Config("tolerances must not be negative".into()));
        }
        if self.hit_line.is_nan() || self.hit_line < 0.0 || self.hit_line > self.path_length {
            return Err(GameError::Config(format!(
                "hit_line ({}) must lie on the path (0..={})",
                self.hit_line, self.path_length
            )));
        }
        if self.sustain_threshold_s.is_nan() || self.sustain_threshold_s < 0.0 {
            return Err(GameError::Config("sustain_threshold_s must not be negative".into()));
        }
        if self.tail_expiry_factor.is_nan() || self.tail_expiry_factor <= 0.0 {
            return Err(GameError::Config("tail_expiry_factor must be positive".into()));
        }
        if self.instruments.is_empty() {
            return Err(GameError::Config("at least one instrument is required".into()));
        }
        let mut keys: Vec<char> = self.key_bindings.iter().map(|k| k.to_ascii_lowercase()).collect();
        keys.sort_unstable();
        keys.dedup();
        if keys.len() != LANE_COUNT {
            return Err(GameError::Config("key bindings must be distinct".into()));
        }
        Ok(())
    }

    pub fn tick_seconds(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }

    pub fn travel_seconds(&self) -> f64 {
        self.travel_ms as f64 / 1000.0
    }

    /// Ticks a note may live before it expires.
    pub fn note_lifetime_ticks(&self) -> f64 {
        self.travel_ms as f64 / self.tick_ms as f64
    }

    /// Ticks a tail of `duration` seconds may live before it expires.
    pub fn tail_lifetime_ticks(&self, duration: f64) -> f64 {
        self.tail_expiry_factor * duration * 1000.0 / self.tick_ms as f64
    }

    /// Constant descent per tick.
    pub fn velocity_per_tick(&self) -> f64 {
        self.path_length / (self.travel_ms as f64 / self.tick_ms as f64)
    }

    /// Tail length for a sustain of `duration` seconds.
    pub fn tail_length(&self, duration: f64) -> f64 {
        self.path_length / self.travel_ms as f64 * duration * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_derived_values() {
        let c = GameConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.velocity_per_tick(), 6.0);
        assert_eq!(c.note_lifetime_ticks(), 100.0);
        assert!((c.tail_lifetime_ticks(2.0) - 500.0).abs() < 1e-9);
        assert!((c.tail_length(2.0) - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c: GameConfig = serde_json::from_str(r#"{"tick_ms": 10}"#).unwrap();
        assert_eq!(c.tick_ms, 10);
        assert_eq!(c.travel_ms, 2000);
        assert_eq!(c.key_bindings, ['d', 'f', 'j', 'k']);
        assert_eq!(c.velocity_per_tick(), 3.0);
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let c = GameConfig {
            tick_ms: 0,
            ..GameConfig::default()
        };
        assert!(matches!(c.validate(), Err(GameError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_judgement_values() {
        let bad = [
            GameConfig { hit_tolerance: f64::NAN, ..GameConfig::default() },
            GameConfig { release_tolerance_s: f64::NAN, ..GameConfig::default() },
            GameConfig { release_tolerance_s: -0.1, ..GameConfig::default() },
            GameConfig { hit_line: -1.0, ..GameConfig::default() },
            GameConfig { hit_line: 700.0, ..GameConfig::default() },
            GameConfig { sustain_threshold_s: -1.0, ..GameConfig::default() },
            GameConfig { tail_expiry_factor: -5.0, ..GameConfig::default() },
            GameConfig { tail_expiry_factor: f64::NAN, ..GameConfig::default() },
        ];
        for c in &bad {
            assert!(matches!(c.validate(), Err(GameError::Config(_))), "{:?}", c);
        }
    }

    #[test]
    fn test_load_rejects_negative_expiry_factor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        fs::write(&path, r#"{"tail_expiry_factor": -2.0}"#).unwrap();
        assert!(matches!(GameConfig::load(&path), Err(GameError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let c = GameConfig {
            key_bindings: ['d', 'D', 'j', 'k'],
            ..GameConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        fs::write(&path, r#"{"travel_ms": 1000, "hit_line": 580.0}"#).unwrap();
        let c = GameConfig::load(&path).unwrap();
        assert_eq!(c.travel_ms, 1000);
        assert_eq!(c.hit_line, 580.0);
    }
}
