use std::path::Path;

use image::RgbImage;
use nalgebra::{Matrix3, Vector3};

use super::{FrameInput, Sensor, SlamAlgorithm, SlamBackend, TrackingState};
use crate::camera::PinholeCamera;
use crate::config::Settings;
use crate::depth::{
    ColoredPoint, DepthImage, DepthProjector, DepthWriteMode, Observation, Projection,
};
use crate::error::{Error, Result};
use crate::global_types::ImuSample;
use crate::pose::{pose_to_target, Pose, PoseHistory};

/// 一次 SLAM 会话
///
/// 持有后端、传感器类型、追加式的位姿历史以及最近一帧的图像。
/// 跟踪失败的帧上所有查询都返回 `None`，和 "跟踪成功但没有观测" 区分开。
pub struct System {
    backend: Box<dyn SlamBackend>,
    sensor: Sensor,
    /// 每个跟踪成功的帧一个绝对位姿
    pose_history: PoseHistory,
    image: Option<RgbImage>,
    write_mode: DepthWriteMode,
}

impl System {
    /// 读取设置文件并构建 `SLAM.alg` 对应的后端
    pub fn new(params_file: impl AsRef<Path>, sensor: Sensor) -> Result<Self> {
        let settings = Settings::read_from_yaml(params_file)?;
        let algorithm: SlamAlgorithm = settings.alg.parse()?;
        log::info!("SLAM backend {} with sensor {}", algorithm.name(), sensor);
        let backend = algorithm.build(&settings, sensor)?;
        Ok(Self::with_backend(backend, sensor))
    }

    pub fn with_backend(backend: Box<dyn SlamBackend>, sensor: Sensor) -> Self {
        Self {
            backend,
            sensor,
            pose_history: PoseHistory::new(),
            image: None,
            write_mode: DepthWriteMode::default(),
        }
    }

    pub fn set_depth_write_mode(&mut self, mode: DepthWriteMode) {
        if mode != DepthWriteMode::LastWins {
            log::info!("depth write mode {:?}", mode);
        }
        self.write_mode = mode;
    }

    pub fn sensor(&self) -> Sensor {
        self.sensor
    }

    /// 处理一帧，跟踪成功时追加当前位姿
    pub fn process_frame(&mut self, input: FrameInput, tframe: f64) -> Result<TrackingState> {
        if input.sensor() != self.sensor {
            return Err(Error::SensorMismatch {
                expected: self.sensor,
                got: input.sensor(),
            });
        }
        let state = self.backend.process(&input, tframe)?;
        self.image = Some(input.into_image());
        if state.is_ok() {
            let pose = self.backend.current_pose().ok_or_else(|| {
                Error::Backend("tracking is OK but the backend has no pose".to_string())
            })?;
            self.pose_history.push(pose);
        } else {
            log::warn!("tracking state {} at t={:.6}", state, tframe);
        }
        Ok(state)
    }

    pub fn process_image_mono(&mut self, image: RgbImage, tframe: f64) -> Result<TrackingState> {
        self.process_frame(FrameInput::Mono(image), tframe)
    }

    pub fn process_image_stereo(
        &mut self,
        left: RgbImage,
        right: RgbImage,
        tframe: f64,
    ) -> Result<TrackingState> {
        self.process_frame(FrameInput::Stereo { left, right }, tframe)
    }

    pub fn process_image_imu_mono(
        &mut self,
        image: RgbImage,
        tframe: f64,
        imu: Vec<ImuSample>,
    ) -> Result<TrackingState> {
        self.process_frame(FrameInput::MonoImu { image, imu }, tframe)
    }

    pub fn process_image_imu_stereo(
        &mut self,
        left: RgbImage,
        right: RgbImage,
        tframe: f64,
        imu: Vec<ImuSample>,
    ) -> Result<TrackingState> {
        self.process_frame(FrameInput::StereoImu { left, right, imu }, tframe)
    }

    pub fn process_image_rgbd(
        &mut self,
        image: RgbImage,
        depth: DepthImage,
        tframe: f64,
    ) -> Result<TrackingState> {
        self.process_frame(FrameInput::Rgbd { image, depth }, tframe)
    }

    pub fn get_state(&self) -> TrackingState {
        self.backend.tracking_state()
    }

    pub fn pose_history(&self) -> &PoseHistory {
        &self.pose_history
    }

    fn current_pose(&self) -> Option<Pose> {
        if self.get_state().is_ok() {
            self.backend.current_pose()
        } else {
            None
        }
    }

    /// 第 `T - precedent_frame` 帧到当前帧 `T` 的位姿
    ///
    /// ```text
    /// get_pose_to_target(None)    // 0 -> T
    /// get_pose_to_target(Some(1)) // (T-1) -> T
    /// get_pose_to_target(Some(2)) // (T-2) -> T
    /// ```
    pub fn get_pose_to_target(&self, precedent_frame: Option<usize>) -> Result<Option<Pose>> {
        match self.current_pose() {
            Some(current) => {
                pose_to_target(&current, &self.pose_history, precedent_frame).map(Some)
            }
            None => Ok(None),
        }
    }

    /// 当前帧 `T` 到第 0 帧的位姿
    pub fn get_pose_from_target(&self) -> Result<Option<Pose>> {
        self.current_pose().map(|p| p.inverse()).transpose()
    }

    pub fn get_camera_matrix(&self) -> Matrix3<f64> {
        self.backend.camera_intrinsics()
    }

    fn projection(&self) -> Option<Projection> {
        let pose = self.current_pose()?;
        let image = self.image.as_ref()?;
        let points = self.backend.current_points()?;
        let camera = PinholeCamera::from_camera_matrix(&self.get_camera_matrix());
        let (width, height) = image.dimensions();
        let projector = DepthProjector::new(camera, height as usize, width as usize);
        Some(projector.project(&points, &pose))
    }

    /// 落在图像内的投影点，用于深度评估
    pub fn get_observations(&self) -> Option<Vec<Observation>> {
        self.projection().map(|p| p.observations)
    }

    /// 当前相机坐标系下的点云
    pub fn get_point_cloud(&self) -> Option<Vec<Vector3<f64>>> {
        self.projection().map(|p| p.camera_points())
    }

    /// 经过当前位姿变换到第 0 帧坐标系的点云
    pub fn get_world_point_cloud(&self) -> Option<Vec<Vector3<f64>>> {
        self.projection().map(|p| p.world_points())
    }

    /// 当前相机坐标系下的点云及其 RGB 颜色
    pub fn get_point_cloud_colored(&self) -> Option<Vec<ColoredPoint>> {
        let image = self.image.as_ref()?;
        self.projection().map(|p| p.colored_points(image))
    }

    /// 当前帧的稠密深度图，没有观测的像素为 -1
    pub fn get_depth(&self) -> Option<DepthImage> {
        self.projection().map(|p| p.depth_image(self.write_mode))
    }

    pub fn reset(&mut self) {
        log::info!("reset SLAM system");
        self.backend.reset();
        self.pose_history.clear();
        self.image = None;
    }

    pub fn shutdown(&mut self) {
        log::info!("shutdown SLAM system");
        self.backend.shutdown();
        self.pose_history.clear();
        self.image = None;
    }
}
