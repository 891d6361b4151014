use image::RgbImage;
use nalgebra::Vector3;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::DepthImage;
use crate::camera::CameraTrait;
use crate::config::DEPTH_SENTINEL;
use crate::pose::Pose;

/// 多个点投影到同一像素时的写入方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepthWriteMode {
    /// 按点云顺序覆盖，最后一个点生效，不做遮挡处理
    #[default]
    LastWins,
    /// 保留最小深度 (z-buffer)。会改变输出，需要显式开启
    Nearest,
}

/// 一个落在图像内的投影点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// 当前相机坐标系下的点
    pub camera_point: Vector3<f64>,
    /// 经过位姿变换后的点
    pub world_point: Vector3<f64>,
    /// (row, col)
    pub pixel: (usize, usize),
}

impl Observation {
    #[inline]
    pub fn depth(&self) -> f64 {
        self.camera_point.z
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColoredPoint {
    pub point: [f64; 3],
    pub rgb: [u8; 3],
}

/// 单帧的投影结果
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub height: usize,
    pub width: usize,
    pub observations: Vec<Observation>,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// 稠密深度图，未观测的像素为 [DEPTH_SENTINEL]
    pub fn depth_image(&self, mode: DepthWriteMode) -> DepthImage {
        let mut depth = Array2::from_elem((self.height, self.width), DEPTH_SENTINEL);
        for obs in &self.observations {
            let z = obs.depth();
            let cell = &mut depth[[obs.pixel.0, obs.pixel.1]];
            match mode {
                DepthWriteMode::LastWins => *cell = z,
                DepthWriteMode::Nearest => {
                    if *cell < 0.0 || z < *cell {
                        *cell = z;
                    }
                }
            }
        }
        depth
    }

    pub fn camera_points(&self) -> Vec<Vector3<f64>> {
        self.observations.iter().map(|o| o.camera_point).collect()
    }

    pub fn world_points(&self) -> Vec<Vector3<f64>> {
        self.observations.iter().map(|o| o.world_point).collect()
    }

    /// 相机坐标系下的点及其在源图像上的颜色
    pub fn colored_points(&self, image: &RgbImage) -> Vec<ColoredPoint> {
        self.observations
            .iter()
            .filter_map(|o| {
                let (row, col) = o.pixel;
                image
                    .get_pixel_checked(col as u32, row as u32)
                    .map(|px| ColoredPoint {
                        point: [o.camera_point.x, o.camera_point.y, o.camera_point.z],
                        rgb: px.0,
                    })
            })
            .collect()
    }
}

/// 把当前帧的稀疏点云投影为稠密深度图
#[derive(Debug, Clone)]
pub struct DepthProjector<Camera>
where
    Camera: CameraTrait,
{
    camera: Camera,
    height: usize,
    width: usize,
}

impl<Camera> DepthProjector<Camera>
where
    Camera: CameraTrait,
{
    pub fn new(camera: Camera, height: usize, width: usize) -> Self {
        Self {
            camera,
            height,
            width,
        }
    }

    /// `points` 为当前相机坐标系下的点，`pose` 把它们变换到目标坐标系。
    /// 投影使用相机坐标系下的点，保留 `z >= 0` 且落在图像内的点，顺序与输入一致。
    pub fn project(&self, points: &[Vector3<f64>], pose: &Pose) -> Projection {
        let mut observations = Vec::with_capacity(points.len());
        for c in points {
            let w = pose.transform_point(c);
            let Some(uv) = self.camera.project(c) else {
                continue;
            };
            // 向零取整，(-1, 0) 内的坐标落在第 0 行/列
            let (u, v) = (uv.x.trunc(), uv.y.trunc());
            if u < 0.0 || v < 0.0 || v >= self.height as f64 || u >= self.width as f64 {
                continue;
            }
            observations.push(Observation {
                camera_point: *c,
                world_point: w,
                pixel: (v as usize, u as usize),
            });
        }
        log::debug!(
            "projected {} of {} points into {}x{}",
            observations.len(),
            points.len(),
            self.height,
            self.width
        );
        Projection {
            height: self.height,
            width: self.width,
            observations,
        }
    }
}
