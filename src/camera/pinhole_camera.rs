use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

use super::CameraTrait;

/// 针孔相机内参，不考虑畸变
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PinholeParameters {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl PinholeParameters {
    pub fn from_camera_matrix(k: &Matrix3<f64>) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PinholeCamera {
    pub parameters: PinholeParameters,
}

impl PinholeCamera {
    pub fn new(parameters: PinholeParameters) -> Self {
        Self { parameters }
    }

    pub fn from_camera_matrix(k: &Matrix3<f64>) -> Self {
        Self::new(PinholeParameters::from_camera_matrix(k))
    }
}

impl CameraTrait for PinholeCamera {
    fn project(&self, p: &Vector3<f64>) -> Option<Point2<f64>> {
        if p.z < 0.0 {
            return None;
        }
        let u = self.parameters.fx * (p.x / p.z) + self.parameters.cx;
        let v = self.parameters.fy * (p.y / p.z) + self.parameters.cy;
        // z == 0 时结果为 inf 或 NaN
        if u.is_finite() && v.is_finite() {
            Some(Point2::new(u, v))
        } else {
            None
        }
    }
}
