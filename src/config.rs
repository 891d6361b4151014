use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 没有观测到深度的像素
pub const DEPTH_SENTINEL: f64 = -1.0;
/// 16 位深度图的编码系数: `round(depth * 256)`
pub const PNG_DEPTH_SCALE: f64 = 256.0;
/// TUM RGB-D 深度图的编码系数
pub const TUM_DEPTH_FACTOR: f64 = 5000.0;

pub const MIN_DEPTH: f64 = 1e-3;
pub const KITTI_MAX_DEPTH: f64 = 100.0;
pub const TUM_MAX_DEPTH: f64 = 10.0;

/// ATE 滑动窗口长度
pub const TRACK_LENGTH: usize = 5;
/// 最优尺度分母中的小常数
pub const ATE_EPSILON: f64 = 1e-5;

/// pose.txt 中的小数位数
pub const LEDGER_PRECISION: usize = 10;

/// 旋转块正交性检查的容差，超出时退回一般矩阵求逆
pub const RIGID_TOLERANCE: f64 = 1e-6;

/// 设置文件
///
/// ```yaml
/// SLAM.alg: Replay
/// SLAM.settings_path: session.json
/// SLAM.vocab_path: ORBvoc.txt
/// Viewer.ViewpointX: 0.0
/// ```
///
/// 除 `SLAM.*` 之外的键（例如可视化参数）原样保留在 [Settings::extra] 中。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "SLAM.alg")]
    pub alg: String,
    #[serde(rename = "SLAM.settings_path")]
    pub settings_path: PathBuf,
    #[serde(rename = "SLAM.vocab_path", default)]
    pub vocab_path: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Settings {
    pub fn read_from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Config(format!(
                "cannot find setting file at {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)?;
        let mut settings: Settings = serde_yaml::from_str(&text)?;

        // 相对路径相对于设置文件所在目录
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        settings.settings_path = resolve(base, &settings.settings_path);
        settings.vocab_path = settings.vocab_path.map(|p| resolve(base, &p));
        log::info!("settings: {:?}", path);
        Ok(settings)
    }

    pub fn write_to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_yaml::to_string(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// 检查后端引用的文件是否存在
    pub fn validate(&self) -> Result<()> {
        if !self.settings_path.exists() {
            return Err(Error::Config(format!(
                "{} not found",
                self.settings_path.display()
            )));
        }
        if let Some(vocab) = &self.vocab_path {
            if !vocab.exists() {
                return Err(Error::Config(format!("{} not found", vocab.display())));
            }
        }
        Ok(())
    }

    pub fn viewer_param(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(|v| v.as_f64())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
