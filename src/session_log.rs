use crate::config::GameConfig;
use crate::coordinator::Frame;
use crate::error::GameError;
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{error, info};
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Records every published frame of a session as JSON lines, plus a
/// manifest and a final summary.
pub struct SessionLogger {
    rx: Receiver<Frame>,
    session_dir: PathBuf,
    config: GameConfig,
    chart_name: String,
}

impl SessionLogger {
    pub fn new(
        rx: Receiver<Frame>,
        output_dir: &Path,
        config: GameConfig,
        chart_name: &str,
    ) -> Result<Self, GameError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let session_dir = output_dir.join(format!("session_{}", timestamp));
        fs::create_dir_all(&session_dir)?;

        Ok(Self {
            rx,
            session_dir,
            config,
            chart_name: chart_name.to_string(),
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger. Blocks the calling thread until the final frame.
    pub fn run(&self) -> Result<u64, GameError> {
        info!("Session logger → {:?}", self.session_dir);
        self.write_manifest()?;

        let frames_path = self.session_dir.join("frames.jsonl");
        let mut frames_writer = BufWriter::new(File::create(&frames_path)?);
        let mut frame_count: u64 = 0;
        let mut last: Option<GameState> = None;

        for frame in self.rx.iter() {
            let line = serde_json::to_string(&CompactFrame::from(&frame.state))?;
            writeln!(frames_writer, "{}", line)?;
            frame_count += 1;

            if frame_count % 1000 == 0 {
                frames_writer.flush()?;
                info!("Logged {} frames", frame_count);
            }

            let end = frame.state.game_end;
            last = Some(frame.state);
            if end {
                break;
            }
        }
        frames_writer.flush()?;

        let last = last.unwrap_or_default();
        let summary = json!({
            "total_frames": frame_count,
            "final_time": last.time,
            "score": last.score,
            "multiplier": last.multiplier,
            "consecutive_hits": last.consecutive_hits,
            "misses": last.misses,
            "notes_spawned": last.note_count,
            "completed": last.game_end,
        });
        fs::write(
            self.session_dir.join("summary.json"),
            serde_json::to_string_pretty(&summary)?,
        )?;

        info!(
            "Session saved: {} frames, score {:.1} → {:?}",
            frame_count, last.score, self.session_dir
        );
        Ok(frame_count)
    }

    /// Thread entry point: logs instead of returning the error.
    pub fn run_logged(&self) {
        if let Err(e) = self.run() {
            error!("Session log failed: {}", e);
        }
    }

    fn write_manifest(&self) -> Result<(), GameError> {
        let manifest = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "system": "lane-rush",
            "chart": self.chart_name,
            "config": self.config,
        });
        fs::write(
            self.session_dir.join("manifest.json"),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn frame(time: u64, score: f64, end: bool) -> Frame {
        let mut state = GameState::new();
        state.time = time;
        state.score = score;
        state.game_end = end;
        Frame {
            state,
            voice_releases: Vec::new(),
        }
    }

    #[test]
    fn test_writes_frames_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = unbounded();
        tx.send(frame(1, 0.0, false)).unwrap();
        tx.send(frame(2, 1.0, false)).unwrap();
        tx.send(frame(2, 1.0, true)).unwrap();
        // Anything after the final frame is ignored
        tx.send(frame(3, 9.0, false)).unwrap();

        let logger = SessionLogger::new(rx, dir.path(), GameConfig::default(), "demo.csv").unwrap();
        assert_eq!(logger.run().unwrap(), 3);

        let frames = fs::read_to_string(logger.session_dir().join("frames.jsonl")).unwrap();
        let parsed: Vec<CompactFrame> = frames
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[2].end);

        let summary: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(logger.session_dir().join("summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["score"], 1.0);
        assert_eq!(summary["completed"], true);

        let manifest = fs::read_to_string(logger.session_dir().join("manifest.json")).unwrap();
        assert!(manifest.contains("demo.csv"));
    }

    #[test]
    fn test_closed_channel_still_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = unbounded::<Frame>();
        drop(tx);
        let logger = SessionLogger::new(rx, dir.path(), GameConfig::default(), "x").unwrap();
        assert_eq!(logger.run().unwrap(), 0);
        assert!(logger.session_dir().join("summary.json").exists());
    }
}
