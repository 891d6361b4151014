use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::depth::ColoredPoint;
use crate::error::Result;

/// 一帧带颜色的点云
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FramePointsSave {
    pub name: String,
    pub timestamp: f64,
    pub points: Vec<ColoredPoint>,
}

impl FramePointsSave {
    pub fn new(name: &str, timestamp: f64, points: Vec<ColoredPoint>) -> Self {
        Self {
            name: name.to_string(),
            timestamp,
            points,
        }
    }

    /// 保存到 `<dir>/<name>.json`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let path = dir.as_ref().join(format!("{}.json", self.name));
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

#[test]
fn test_save_points() {
    let dir = tempfile::tempdir().unwrap();
    let frame = FramePointsSave::new(
        "000003",
        0.3,
        vec![ColoredPoint {
            point: [0.1, 0.2, 4.0],
            rgb: [255, 128, 0],
        }],
    );
    frame.save(dir.path()).unwrap();
    let text = std::fs::read_to_string(dir.path().join("000003.json")).unwrap();
    let loaded: FramePointsSave = serde_json::from_str(&text).unwrap();
    assert_eq!(loaded.points, frame.points);
}
