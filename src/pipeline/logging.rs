use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::StageRecord;
use crate::types::{RunId, now_millis};

const STAGES_FILE: &str = "stages.jsonl";

/// Appends one JSON line per pipeline event to `<log_dir>/stages.jsonl`.
pub struct PipelineLogger {
    run_id: Option<RunId>,
    file: Mutex<File>,
}

impl PipelineLogger {
    pub fn new(log_dir: PathBuf) -> io::Result<Self> {
        create_dir_all(&log_dir)?;
        let path = log_dir.join(STAGES_FILE);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            run_id: None,
            file: Mutex::new(file),
        })
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn log_stage(&self, record: &StageRecord) -> io::Result<()> {
        let data = serde_json::to_value(record).map_err(io::Error::other)?;
        self.log_event("stage", data)
    }

    /// Note: `flush` only pushes to OS buffers; it does not guarantee durability on disk.
    pub fn log_event(&self, kind: &str, data: serde_json::Value) -> io::Result<()> {
        let mut event = serde_json::Map::new();
        event.insert(
            "kind".to_string(),
            serde_json::Value::String(kind.to_string()),
        );
        event.insert("data".to_string(), data);
        event.insert("ts".to_string(), serde_json::Value::Number(now_millis().into()));

        if let Some(run_id) = &self.run_id {
            event.insert(
                "run_id".to_string(),
                serde_json::Value::String(run_id.to_string()),
            );
        }

        let line = serde_json::to_string(&event).map_err(io::Error::other)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("logger mutex poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{StageKind, StageOutcome};

    #[test]
    fn stage_record_written_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let logger = PipelineLogger::new(dir.path().to_path_buf())
            .unwrap()
            .with_run_id(RunId::new("run-7"));
        logger
            .log_stage(&StageRecord {
                stage: StageKind::Describe,
                started_ms: 0,
                response_ms: 30,
                outcome: StageOutcome::Completed,
            })
            .unwrap();
        logger
            .log_event("handoff", serde_json::json!({"link": "/guess?poem=x"}))
            .unwrap();

        let entries = std::fs::read_to_string(dir.path().join(STAGES_FILE)).unwrap();
        let lines: Vec<serde_json::Value> = entries
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "stage");
        assert_eq!(lines[0]["run_id"], "run-7");
        assert_eq!(lines[0]["data"]["stage"], "describe");
        assert_eq!(lines[1]["data"]["link"], "/guess?poem=x");
    }
}
