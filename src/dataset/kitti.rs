use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use super::{content_lines, DatasetTrait};

/// KITTI raw：`timestamps.txt` + `data/0000000000.png`
///
/// 时间戳形如 `2011-09-26 13:02:25.964389445`，转换为相对第一帧的秒数。
#[derive(Debug, Default)]
pub struct KittiDataset {
    pub cam0s: Vec<(f64, PathBuf)>,
}

impl KittiDataset {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let lines = content_lines(&path.join("timestamps.txt"))?;
        let mut t0 = None;
        let mut cam0s = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            let t = Self::seconds_of_day(line)
                .with_context(|| format!("bad KITTI timestamp '{}'", line))?;
            let t0 = *t0.get_or_insert(t);
            let image = path.join("data").join(format!("{:010}.png", idx));
            cam0s.push((t - t0, image));
        }
        Ok(Self { cam0s })
    }

    fn seconds_of_day(line: &str) -> anyhow::Result<f64> {
        let Some(time) = line.split_whitespace().nth(1) else {
            bail!("missing time of day");
        };
        let fields: Vec<&str> = time.split(':').collect();
        if fields.len() != 3 {
            bail!("expected HH:MM:SS.f");
        }
        let h: f64 = fields[0].parse()?;
        let m: f64 = fields[1].parse()?;
        let s: f64 = fields[2].parse()?;
        Ok(h * 3600.0 + m * 60.0 + s)
    }
}

impl DatasetTrait for KittiDataset {
    fn read_t_cam0_list(&self) -> &Vec<(f64, PathBuf)> {
        &self.cam0s
    }
}

/// KITTI odometry：`times.txt` (秒) + `data/000000.png`
#[derive(Debug, Default)]
pub struct KittiOdometryDataset {
    pub cam0s: Vec<(f64, PathBuf)>,
}

impl KittiOdometryDataset {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let cam0s = content_lines(&path.join("times.txt"))?
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let t: f64 = line
                    .parse()
                    .with_context(|| format!("bad timestamp '{}'", line))?;
                Ok((t, path.join("data").join(format!("{:06}.png", idx))))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { cam0s })
    }
}

impl DatasetTrait for KittiOdometryDataset {
    fn read_t_cam0_list(&self) -> &Vec<(f64, PathBuf)> {
        &self.cam0s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_kitti_raw() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("timestamps.txt"),
            "2011-09-26 13:02:25.964389445\n2011-09-26 13:02:26.067700374\n",
        )
        .unwrap();
        let dataset = KittiDataset::new(dir.path()).unwrap();
        let list = dataset.read_t_cam0_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].0, 0.0);
        assert!((list[1].0 - 0.103310929).abs() < 1e-6);
        assert_eq!(list[1].1, dir.path().join("data/0000000001.png"));
    }

    #[test]
    fn test_read_kitti_odometry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("times.txt"), "0.000000e+00\n1.036224e-01\n").unwrap();
        let dataset = KittiOdometryDataset::new(dir.path()).unwrap();
        let list = dataset.read_t_cam0_list();
        assert_eq!(list[1].0, 1.036224e-01);
        assert_eq!(list[1].1, dir.path().join("data/000001.png"));
    }

    #[test]
    fn test_missing_times_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(KittiOdometryDataset::new(dir.path()).is_err());
    }
}
