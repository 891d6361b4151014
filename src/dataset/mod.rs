//! 数据集处理
//!
//! 只提供把图像按时间顺序交给流水线所需的最小接口：时间戳 (秒)、图像路径，
//! 以及可选的右目图像和 IMU 数据。
//!
//! - KITTI raw / odometry  https://www.cvlibs.net/datasets/kitti/
//! - TUM RGB-D  https://cvg.cit.tum.de/data/datasets/rgbd-dataset
//! - EuRoC Dataset  https://paperswithcode.com/dataset/euroc-mav
mod euroc;
mod kitti;
mod tum;

pub use euroc::EuRoCDataset;
pub use kitti::{KittiDataset, KittiOdometryDataset};
pub use tum::TumDataset;

use std::path::{Path, PathBuf};

use crate::depth::DepthEncoding;
use crate::global_types::ImuSample;

pub trait DatasetTrait {
    /// 读取图像列表
    /// 返回时间戳和图像路径
    fn read_t_cam0_list(&self) -> &Vec<(f64, PathBuf)>;

    /// 右目图像列表，单目数据集没有
    fn read_t_cam1_list(&self) -> Option<&Vec<(f64, PathBuf)>> {
        None
    }

    /// 按时间排序的 IMU 数据
    fn imu(&self) -> &[ImuSample] {
        &[]
    }

    /// `(t0, t1]` 之间的 IMU 数据
    fn imu_between(&self, t0: f64, t1: f64) -> Vec<ImuSample> {
        self.imu()
            .iter()
            .filter(|s| s.timestamp > t0 && s.timestamp <= t1)
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DataType {
    Kitti,
    KittiVo,
    Tum,
    Euroc,
}

impl DataType {
    /// 真值深度图的编码
    pub fn depth_encoding(&self) -> DepthEncoding {
        match self {
            DataType::Tum => DepthEncoding::Tum,
            _ => DepthEncoding::Kitti,
        }
    }

    pub fn open(&self, path: &Path) -> anyhow::Result<Box<dyn DatasetTrait>> {
        Ok(match self {
            DataType::Kitti => Box::new(KittiDataset::new(path)?),
            DataType::KittiVo => Box::new(KittiOdometryDataset::new(path)?),
            DataType::Tum => Box::new(TumDataset::new(path, TumDataset::DEFAULT_LIST)?),
            DataType::Euroc => Box::new(EuRoCDataset::new(path)?),
        })
    }
}

/// 读取文本文件中非空、非 `#` 注释的行
fn content_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    use anyhow::Context;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
