use std::path::{Path, PathBuf};

use anyhow::Context;

use super::DatasetTrait;
use crate::global_types::ImuSample;

/// 纳秒时间戳转换为秒
const NS_TO_S: f64 = 1e-9;

#[derive(Debug, Default)]
pub struct EuRoCDataset {
    pub cam0s: Vec<(f64, PathBuf)>,
    pub cam1s: Vec<(f64, PathBuf)>,
    pub imu0s: Vec<ImuSample>,
}

impl EuRoCDataset {
    const EUROC_CAM0_PATH: &'static str = "mav0/cam0/";
    const EUROC_CAM1_PATH: &'static str = "mav0/cam1/";
    const EUROC_IMU0_PATH: &'static str = "mav0/imu0/";

    fn parse_field(record: &csv::StringRecord, i: usize) -> anyhow::Result<f64> {
        let field = record.get(i).context("missing csv field")?;
        Ok(field.trim().parse::<f64>()?)
    }

    /// `timestamp [ns], w_x, w_y, w_z, a_x, a_y, a_z`
    pub fn read_imu(path: &Path) -> anyhow::Result<Vec<ImuSample>> {
        let csv_path = path.join("data.csv");
        let mut reader = csv::Reader::from_path(&csv_path)
            .with_context(|| format!("failed to open {}", csv_path.display()))?;
        reader
            .records()
            .map(|record| {
                let record = record?;
                let timestamp = Self::parse_field(&record, 0)? * NS_TO_S;
                let mut v = [0.0; 6];
                for (i, x) in v.iter_mut().enumerate() {
                    *x = Self::parse_field(&record, i + 1)?;
                }
                Ok(ImuSample::new(timestamp, [v[3], v[4], v[5]], [v[0], v[1], v[2]]))
            })
            .collect()
    }

    /// `timestamp [ns], filename`
    pub fn read_cam(path: &Path) -> anyhow::Result<Vec<(f64, PathBuf)>> {
        let csv_path = path.join("data.csv");
        let data_path = path.join("data");
        let mut reader = csv::Reader::from_path(&csv_path)
            .with_context(|| format!("failed to open {}", csv_path.display()))?;
        reader
            .records()
            .map(|record| {
                let record = record?;
                let timestamp = Self::parse_field(&record, 0)? * NS_TO_S;
                let name = record.get(1).context("missing image name")?.trim();
                Ok((timestamp, data_path.join(name)))
            })
            .collect()
    }

    pub fn new(path: &Path) -> anyhow::Result<Self> {
        // read cam0
        let cam0s = Self::read_cam(&path.join(Self::EUROC_CAM0_PATH))?;
        // cam1 和 imu0 可选
        let cam1_base_path = path.join(Self::EUROC_CAM1_PATH);
        let cam1s = if cam1_base_path.exists() {
            Self::read_cam(&cam1_base_path)?
        } else {
            Vec::new()
        };
        let imu0_base_path = path.join(Self::EUROC_IMU0_PATH);
        let imu0s = if imu0_base_path.exists() {
            Self::read_imu(&imu0_base_path)?
        } else {
            Vec::new()
        };
        log::info!(
            "EuRoC {:?}: {} cam0, {} cam1, {} imu0",
            path,
            cam0s.len(),
            cam1s.len(),
            imu0s.len()
        );
        Ok(Self {
            cam0s,
            cam1s,
            imu0s,
        })
    }
}

impl DatasetTrait for EuRoCDataset {
    fn read_t_cam0_list(&self) -> &Vec<(f64, PathBuf)> {
        &self.cam0s
    }

    fn read_t_cam1_list(&self) -> Option<&Vec<(f64, PathBuf)>> {
        if self.cam1s.is_empty() {
            None
        } else {
            Some(&self.cam1s)
        }
    }

    fn imu(&self) -> &[ImuSample] {
        &self.imu0s
    }
}
