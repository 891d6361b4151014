//! SLAM 后端接口
//!
//! 具体的 SLAM 算法对本 crate 不透明，只通过 [SlamBackend] 访问：逐帧处理、
//! 当前位姿、当前点云 (相机坐标系) 和相机内参。后端在加载配置时通过
//! [SlamAlgorithm] 选择。

mod replay;
mod system;

pub use replay::{ReplayBackend, ReplayFrame, ReplaySession};
pub use system::System;

use std::fmt::Display;
use std::str::FromStr;

use image::RgbImage;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::depth::DepthImage;
use crate::error::{Error, Result};
use crate::global_types::ImuSample;
use crate::pose::Pose;

/// 传感器类型，一个会话内固定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sensor {
    Monocular,
    Stereo,
    MonocularImu,
    StereoImu,
    Rgbd,
}

impl Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Sensor::Monocular => "MONOCULAR",
            Sensor::Stereo => "STEREO",
            Sensor::MonocularImu => "MONOCULAR_IMU",
            Sensor::StereoImu => "STEREO_IMU",
            Sensor::Rgbd => "RGBD",
        };
        write!(f, "{}", name)
    }
}

/// 每帧的跟踪状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingState {
    Ok,
    Lost,
    NotInitialized,
    #[default]
    SystemNotReady,
}

impl TrackingState {
    #[inline]
    pub fn is_ok(&self) -> bool {
        *self == TrackingState::Ok
    }
}

impl Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TrackingState::Ok => "OK",
            TrackingState::Lost => "LOST",
            TrackingState::NotInitialized => "NOT_INITIALIZED",
            TrackingState::SystemNotReady => "SYSTEM_NOT_READY",
        };
        write!(f, "{}", name)
    }
}

/// 一帧的输入，和传感器类型一一对应
#[derive(Debug, Clone)]
pub enum FrameInput {
    Mono(RgbImage),
    Stereo {
        left: RgbImage,
        right: RgbImage,
    },
    MonoImu {
        image: RgbImage,
        imu: Vec<ImuSample>,
    },
    StereoImu {
        left: RgbImage,
        right: RgbImage,
        imu: Vec<ImuSample>,
    },
    Rgbd {
        image: RgbImage,
        depth: DepthImage,
    },
}

impl FrameInput {
    pub fn sensor(&self) -> Sensor {
        match self {
            FrameInput::Mono(_) => Sensor::Monocular,
            FrameInput::Stereo { .. } => Sensor::Stereo,
            FrameInput::MonoImu { .. } => Sensor::MonocularImu,
            FrameInput::StereoImu { .. } => Sensor::StereoImu,
            FrameInput::Rgbd { .. } => Sensor::Rgbd,
        }
    }

    /// 用于投影和取色的图像 (双目时为左图)
    pub fn image(&self) -> &RgbImage {
        match self {
            FrameInput::Mono(image)
            | FrameInput::MonoImu { image, .. }
            | FrameInput::Rgbd { image, .. } => image,
            FrameInput::Stereo { left, .. } | FrameInput::StereoImu { left, .. } => left,
        }
    }

    pub fn into_image(self) -> RgbImage {
        match self {
            FrameInput::Mono(image)
            | FrameInput::MonoImu { image, .. }
            | FrameInput::Rgbd { image, .. } => image,
            FrameInput::Stereo { left, .. } | FrameInput::StereoImu { left, .. } => left,
        }
    }
}

/// 外部 SLAM 引擎
///
/// 引擎内部状态不可重入，调用方必须按时间戳顺序逐帧调用 [SlamBackend::process]。
pub trait SlamBackend {
    /// 处理一帧并返回跟踪状态
    fn process(&mut self, input: &FrameInput, timestamp: f64) -> Result<TrackingState>;
    fn tracking_state(&self) -> TrackingState;
    /// 当前相机到第 0 帧的位姿，跟踪失败时为 `None`
    fn current_pose(&self) -> Option<Pose>;
    /// 当前相机坐标系下的稀疏点云，跟踪失败时为 `None`
    fn current_points(&self) -> Option<Vec<Vector3<f64>>>;
    fn camera_intrinsics(&self) -> Matrix3<f64>;
    fn reset(&mut self);
    fn shutdown(&mut self);
}

/// 可选的后端，对应设置文件中的 `SLAM.alg`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlamAlgorithm {
    /// 回放录制好的引擎输出
    Replay,
}

impl SlamAlgorithm {
    pub const ALL: [SlamAlgorithm; 1] = [SlamAlgorithm::Replay];

    pub fn name(&self) -> &'static str {
        match self {
            SlamAlgorithm::Replay => "Replay",
        }
    }

    /// 根据设置构建后端
    pub fn build(&self, settings: &Settings, sensor: Sensor) -> Result<Box<dyn SlamBackend>> {
        settings.validate()?;
        match self {
            SlamAlgorithm::Replay => Ok(Box::new(ReplayBackend::from_file(
                &settings.settings_path,
                sensor,
            )?)),
        }
    }
}

impl FromStr for SlamAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|a| a.name()).collect();
                Error::Config(format!(
                    "unknown SLAM.alg '{}', available: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_lookup() {
        assert_eq!("Replay".parse::<SlamAlgorithm>().unwrap(), SlamAlgorithm::Replay);
        assert_eq!("replay".parse::<SlamAlgorithm>().unwrap(), SlamAlgorithm::Replay);
        assert!(matches!(
            "OrbSlam9".parse::<SlamAlgorithm>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn frame_input_reports_sensor() {
        let image = RgbImage::new(2, 2);
        let input = FrameInput::Stereo {
            left: image.clone(),
            right: image,
        };
        assert_eq!(input.sensor(), Sensor::Stereo);
        assert_eq!(input.image().dimensions(), (2, 2));
    }

    #[test]
    fn tracking_state_names() {
        assert_eq!(TrackingState::NotInitialized.to_string(), "NOT_INITIALIZED");
        let state: TrackingState = serde_json::from_str("\"SYSTEM_NOT_READY\"").unwrap();
        assert_eq!(state, TrackingState::SystemNotReady);
    }
}
