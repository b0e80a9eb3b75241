//! Dataset persistence: PNG frames and per-agent calibration metadata.
//!
//! Layout under the configured save path:
//!
//! ```text
//! <save_path>/agents/<agent_index>/sensors.json
//! <save_path>/agents/<agent_index>/<sensor_name>/<frame_index>.png
//! ```
//!
//! Every write failure is fatal: a skipped frame would desynchronize the
//! shared frame index across sensors and agents.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use contracts::{CameraFrame, HarvestError, Result, RigCalibrationFile};
use tracing::{debug, instrument};

/// Writes frames and metadata under a dataset root, caching created
/// directories to avoid re-stating them on every frame.
pub struct DatasetWriter {
    root: PathBuf,
    created_dirs: HashSet<PathBuf>,
}

impl DatasetWriter {
    /// Create a writer rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| HarvestError::persistence(root.clone(), e.to_string()))?;
        Ok(Self {
            root,
            created_dirs: HashSet::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn agent_dir(&self, agent_index: usize) -> PathBuf {
        self.root.join("agents").join(agent_index.to_string())
    }

    fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
        if !self.created_dirs.contains(dir) {
            fs::create_dir_all(dir)
                .map_err(|e| HarvestError::persistence(dir.to_path_buf(), e.to_string()))?;
            self.created_dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    /// Persist one RGB frame as `agents/<agent>/<sensor>/<frame_index>.png`
    pub fn write_frame(
        &mut self,
        agent_index: usize,
        sensor_name: &str,
        frame_index: u64,
        frame: &CameraFrame,
    ) -> Result<PathBuf> {
        let sensor_dir = self.agent_dir(agent_index).join(sensor_name);
        self.ensure_dir(&sensor_dir)?;

        let path = sensor_dir.join(format!("{frame_index}.png"));
        image::save_buffer(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgb8,
        )
        .map_err(|e| HarvestError::persistence(path.clone(), e.to_string()))?;

        Ok(path)
    }

    /// Persist the per-agent calibration metadata as
    /// `agents/<agent>/sensors.json`
    #[instrument(name = "write_calibration", skip(self, calibration), fields(agent_index))]
    pub fn write_calibration(
        &mut self,
        agent_index: usize,
        calibration: &RigCalibrationFile,
    ) -> Result<PathBuf> {
        let agent_dir = self.agent_dir(agent_index);
        self.ensure_dir(&agent_dir)?;

        let path = agent_dir.join("sensors.json");
        let file = File::create(&path)
            .map_err(|e| HarvestError::persistence(path.clone(), e.to_string()))?;
        serde_json::to_writer(file, calibration)
            .map_err(|e| HarvestError::persistence(path.clone(), e.to_string()))?;

        debug!(path = %path.display(), sensors = calibration.sensors.len(), "calibration written");
        Ok(path)
    }
}

/// Number of frames already persisted for agent 0's reference sensor.
///
/// Used to seed the frame index when no explicit start index is configured,
/// so a re-run appends to the dataset instead of overwriting it. A missing
/// directory counts as zero.
pub fn resume_count(root: &Path, reference_sensor: &str) -> Result<u64> {
    let dir = root.join("agents").join("0").join(reference_sensor);
    if !dir.is_dir() {
        return Ok(0);
    }
    let count = fs::read_dir(&dir)?.filter_map(|entry| entry.ok()).count();
    Ok(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, value: u8) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: vec![value; (width * height * 3) as usize].into(),
        }
    }

    #[test]
    fn writes_png_under_agent_sensor_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DatasetWriter::new(dir.path()).unwrap();

        let path = writer
            .write_frame(0, "front_camera", 17, &frame(4, 2, 128))
            .unwrap();

        assert_eq!(
            path,
            dir.path().join("agents").join("0").join("front_camera").join("17.png")
        );
        assert!(path.is_file());
    }

    #[test]
    fn resume_counts_reference_sensor_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DatasetWriter::new(dir.path()).unwrap();

        for index in 0..3 {
            writer
                .write_frame(0, "back_camera", index, &frame(4, 2, 0))
                .unwrap();
        }
        // Frames of other sensors and agents must not affect the count
        writer.write_frame(0, "front_camera", 9, &frame(4, 2, 0)).unwrap();
        writer.write_frame(1, "back_camera", 9, &frame(4, 2, 0)).unwrap();

        assert_eq!(resume_count(dir.path(), "back_camera").unwrap(), 3);
    }

    #[test]
    fn resume_is_zero_for_fresh_dataset() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resume_count(dir.path(), "back_camera").unwrap(), 0);
    }

    #[test]
    fn calibration_lands_next_to_sensor_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DatasetWriter::new(dir.path()).unwrap();

        let path = writer
            .write_calibration(2, &RigCalibrationFile::default())
            .unwrap();
        assert_eq!(path, dir.path().join("agents").join("2").join("sensors.json"));

        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("\"sensors\""));
    }
}
