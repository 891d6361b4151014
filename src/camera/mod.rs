mod pinhole_camera;
pub use pinhole_camera::{PinholeCamera, PinholeParameters};

use nalgebra::{Point2, Vector3};

/// 相机的trait
pub trait CameraTrait {
    /// 相机坐标系下的点投影到像素平面 `(u, v)`，`u` 为列，`v` 为行。
    /// 点在相机后方 (`z < 0`) 或投影非有限时返回 `None`。
    fn project(&self, p: &Vector3<f64>) -> Option<Point2<f64>>;
}
