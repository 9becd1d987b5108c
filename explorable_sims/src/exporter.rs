//! JSON exporter for headless runs.
//!
//! Records one entry per rendered frame so a run can be inspected or diffed
//! against another seed.

use explorable_simlib::{ControlValue, Failure, MountedView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One rendered frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Vsync index within the run
    pub frame: u64,

    /// Host clock at the frame (seconds)
    pub wall_time: f64,

    /// Accumulated simulation time (seconds)
    pub sim_time: f64,

    pub updates: u64,
    pub renders: u64,

    /// Paint operations on the surface after the frame
    pub ops: usize,

    pub visible: bool,

    /// Live control values at the frame
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub controls: BTreeMap<String, ControlValue>,
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Catalog name of the simulation
    pub simulation: String,

    /// Seed used
    pub seed: u64,

    pub title: String,
    pub description: String,

    /// Host time covered by the recorded frames (seconds)
    pub duration_sec: f64,

    /// Rendered frames
    pub frames: Vec<FrameRecord>,

    /// Mounted view at the end of the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_view: Option<MountedView>,

    /// Boundary failure that stopped the run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,

    /// True if the run finished without tripping the error boundary
    pub passed: bool,
}

impl RunExport {
    /// Creates a new export container.
    pub fn new(simulation: &str, seed: u64) -> Self {
        Self {
            simulation: simulation.to_string(),
            seed,
            title: String::new(),
            description: String::new(),
            duration_sec: 0.0,
            frames: Vec::new(),
            final_view: None,
            failure: None,
            passed: false,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: FrameRecord) {
        self.duration_sec = frame.wall_time;
        self.frames.push(frame);
    }

    /// Finalizes the export with the last view and the boundary state.
    pub fn finalize(&mut self, view: MountedView, failure: Option<Failure>) {
        self.title = view.title.clone();
        self.description = view.description.clone();
        self.passed = failure.is_none();
        self.failure = failure;
        self.final_view = Some(view);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(frame: u64, wall_time: f64) -> FrameRecord {
        FrameRecord {
            frame,
            wall_time,
            sim_time: wall_time,
            updates: frame,
            renders: frame,
            ops: 3,
            visible: true,
            controls: BTreeMap::from([("k".to_string(), ControlValue::Number(0.5))]),
        }
    }

    #[test]
    fn test_duration_follows_last_frame() {
        let mut export = RunExport::new("ising", 42);
        export.add_frame(record(1, 0.016));
        export.add_frame(record(2, 0.033));
        assert_eq!(export.frames.len(), 2);
        assert_eq!(export.duration_sec, 0.033);
        assert!(!export.passed);
    }

    #[test]
    fn test_json_shape() {
        let mut export = RunExport::new("fish", 7);
        export.add_frame(record(1, 0.5));
        let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();

        assert_eq!(json["simulation"], "fish");
        assert_eq!(json["seed"], 7);
        assert_eq!(json["frames"][0]["controls"]["k"], 0.5);
        // Unset optional sections are omitted
        assert!(json.get("failure").is_none());
        assert!(json.get("final_view").is_none());
    }

    #[test]
    fn test_write_to_file() {
        let mut export = RunExport::new("fireflies", 1);
        export.add_frame(record(1, 0.1));
        let name = format!("explorable-export-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);

        export.write_to_file(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let back: RunExport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.frames, export.frames);
    }
}
