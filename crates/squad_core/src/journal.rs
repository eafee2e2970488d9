//! Run journal persistence.
//!
//! Each run gets its own directory:
//! ```text
//! <output>/.squad/runs/<run-id>/
//! ├── transitions.jsonl   # Append-only stage transition log
//! └── summary.json        # Written once the run ends
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::run::{Stage, TransitionRecord};

const TRANSITIONS_FILE: &str = "transitions.jsonl";
const SUMMARY_FILE: &str = "summary.json";

/// Append-only log of one run's transitions.
#[derive(Debug, Clone)]
pub struct RunJournal {
    dir: PathBuf,
}

impl RunJournal {
    /// Directory holding every run journal under `output`.
    pub fn runs_dir(output: &Path) -> PathBuf {
        output.join(".squad").join("runs")
    }

    /// Create the journal directory for `run_id` under `output`.
    pub fn create(output: &Path, run_id: Uuid) -> CoreResult<Self> {
        let dir = Self::runs_dir(output).join(run_id.to_string());
        fs::create_dir_all(&dir)?;
        debug!("Created run journal at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn transitions_path(&self) -> PathBuf {
        self.dir.join(TRANSITIONS_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE)
    }

    /// Append one transition as a JSON line.
    pub fn append(&self, record: &TransitionRecord) -> CoreResult<()> {
        let line =
            serde_json::to_string(record).map_err(|e| CoreError::Serialization(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.transitions_path())?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Write the end-of-run summary.
    pub fn write_summary<T: Serialize>(&self, summary: &T) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(summary)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(self.summary_path(), json)?;
        debug!("Saved run summary to {:?}", self.summary_path());
        Ok(())
    }

    /// Read every transition from a `transitions.jsonl` file.
    pub fn load(path: &Path) -> CoreResult<Vec<TransitionRecord>> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: TransitionRecord = serde_json::from_str(&line)
                .map_err(|e| CoreError::Serialization(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Re-walk a loaded log, checking every step, and return the final stage.
    pub fn replay(records: &[TransitionRecord]) -> CoreResult<Stage> {
        let first = records
            .first()
            .ok_or_else(|| CoreError::InvalidState("empty transition log".to_string()))?;
        if first.stage != Stage::RequirementsAnalysis {
            return Err(CoreError::InvalidState(format!(
                "log starts at {} instead of {}",
                first.stage,
                Stage::RequirementsAnalysis
            )));
        }

        let mut stage = first.stage;
        for record in &records[1..] {
            if !stage.can_transition_to(record.stage) {
                return Err(CoreError::InvalidStage {
                    from: stage,
                    to: record.stage,
                });
            }
            stage = record.stage;
        }
        Ok(stage)
    }
}
