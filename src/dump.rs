use std::fs;
use std::path::{Path, PathBuf};
use crate::errors::SinkError;
use crate::models::point::Point;
use crate::sink::PointSink;
use crate::tariff::Utility;

/// Writes points as pretty printed json, one file per utility
pub struct JsonDump {
    dir: PathBuf,
}

impl JsonDump {
    /// Returns a new JsonDump
    ///
    /// # Arguments
    ///
    /// * 'dir' - directory to write files to, must exist
    pub fn new(dir: &str) -> JsonDump {
        JsonDump { dir: Path::new(dir).to_path_buf() }
    }
}

impl PointSink for JsonDump {
    fn write(&self, utility: Utility, points: &[Point]) -> Result<(), SinkError> {
        let file_path = self.dir.join(format!("{}.json", utility));

        let json = serde_json::to_string_pretty(points)?;
        fs::write(file_path, json)?;

        Ok(())
    }
}
