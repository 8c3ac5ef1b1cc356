//! Chart table parser.
//!
//! A chart is newline-delimited text. The first line is a header and is
//! discarded; every other non-blank line is
//! `userPlayed,instrument,velocity,pitch,start,end` with velocity and pitch
//! in 0–127 and times in seconds. Any malformed row fails the whole load.

use crate::error::GameError;
use crate::types::ChartNote;
use log::info;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub notes: Vec<ChartNote>,
}

impl Chart {
    pub fn load(path: &Path) -> Result<Self, GameError> {
        let text = fs::read_to_string(path)?;
        let chart = parse_chart(&text)?;
        info!(
            "Chart {:?}: {} notes ({} player), {:.2}s",
            path.file_name().unwrap_or_default(),
            chart.notes.len(),
            chart.player_notes().count(),
            chart.duration(),
        );
        Ok(chart)
    }

    /// Total game length in seconds: the final row's end time.
    pub fn duration(&self) -> f64 {
        self.notes.last().map(|n| n.end).unwrap_or(0.0)
    }

    pub fn player_notes(&self) -> impl Iterator<Item = &ChartNote> {
        self.notes.iter().filter(|n| n.user_played)
    }
}

pub fn parse_chart(text: &str) -> Result<Chart, GameError> {
    let mut notes = Vec::new();
    for (idx, line) in text.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        notes.push(parse_row(idx + 1, line)?);
    }
    if notes.is_empty() {
        return Err(GameError::EmptyChart);
    }
    Ok(Chart { notes })
}

fn parse_row(line_no: usize, line: &str) -> Result<ChartNote, GameError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 6 {
        return Err(GameError::chart(
            line_no,
            format!("expected 6 fields, found {}", fields.len()),
        ));
    }

    let instrument = fields[1];
    if instrument.is_empty() {
        return Err(GameError::chart(line_no, "empty instrument name"));
    }

    let velocity = parse_midi(line_no, "velocity", fields[2])?;
    let pitch = parse_midi(line_no, "pitch", fields[3])?;
    let start = parse_seconds(line_no, "start", fields[4])?;
    let end = parse_seconds(line_no, "end", fields[5])?;
    if end < start {
        return Err(GameError::chart(
            line_no,
            format!("end {} precedes start {}", end, start),
        ));
    }

    Ok(ChartNote {
        user_played: fields[0] == "True",
        instrument: instrument.to_string(),
        velocity: velocity as f32 / 127.0,
        pitch: pitch as u8,
        start,
        end,
    })
}

/// MIDI fields are written as integers, sometimes with a trailing `.0`.
fn parse_midi(line_no: usize, name: &str, field: &str) -> Result<u32, GameError> {
    let value: f64 = field
        .parse()
        .map_err(|_| GameError::chart(line_no, format!("{} {:?} is not a number", name, field)))?;
    if value.fract() != 0.0 || !(0.0..=127.0).contains(&value) {
        return Err(GameError::chart(
            line_no,
            format!("{} {} outside 0..=127", name, field),
        ));
    }
    Ok(value as u32)
}

fn parse_seconds(line_no: usize, name: &str, field: &str) -> Result<f64, GameError> {
    let value: f64 = field
        .parse()
        .map_err(|_| GameError::chart(line_no, format!("{} {:?} is not a number", name, field)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(GameError::chart(
            line_no,
            format!("{} {} must be a non-negative time", name, field),
        ));
    }
    Ok(value)
}
