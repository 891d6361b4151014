//! 位姿
//!
//! 4x4 刚体变换以及相对位姿的合成

mod composer;

pub use composer::{pose_to_target, PoseHistory};

use std::fmt::Display;
use std::ops::Mul;

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

use crate::config::RIGID_TOLERANCE;
use crate::error::{Error, Result};

/// 齐次刚体变换，把点从一个相机坐标系变换到另一个坐标系
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose(pub Matrix4<f64>);

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Pose {
    pub fn identity() -> Self {
        Pose(Matrix4::identity())
    }

    pub fn from_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Pose(m)
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_parts(&Matrix3::identity(), &translation)
    }

    /// 旋转块
    pub fn rotation(&self) -> Matrix3<f64> {
        self.0.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// 平移向量，即相机中心在目标坐标系下的位置
    pub fn translation(&self) -> Vector3<f64> {
        self.0.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// `self * other`
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose(self.0 * other.0)
    }

    fn is_rigid(&self) -> bool {
        let r = self.rotation();
        let orthonormal = (r.transpose() * r - Matrix3::identity()).amax() < RIGID_TOLERANCE;
        let bottom = self.0.row(3);
        orthonormal
            && bottom[0] == 0.0
            && bottom[1] == 0.0
            && bottom[2] == 0.0
            && bottom[3] == 1.0
    }

    /// 逆变换
    ///
    /// 刚体变换使用闭式解 `(R^T, -R^T t)`；旋转块不正交时退回一般矩阵求逆。
    pub fn inverse(&self) -> Result<Pose> {
        if self.is_rigid() {
            let rt = self.rotation().transpose();
            let t = -(rt * self.translation());
            Ok(Pose::from_parts(&rt, &t))
        } else {
            log::debug!("pose is not rigid, falling back to general inverse");
            self.0.try_inverse().map(Pose).ok_or(Error::SingularPose)
        }
    }

    /// 齐次化后变换一个三维点
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        let h = self.0 * Vector4::new(p.x, p.y, p.z, 1.0);
        Vector3::new(h.x, h.y, h.z)
    }

    /// 上方 3x4 块，行优先
    pub fn upper_rows(&self) -> [f64; 12] {
        let mut out = [0.0; 12];
        for i in 0..3 {
            for j in 0..4 {
                out[i * 4 + j] = self.0[(i, j)];
            }
        }
        out
    }
}

impl Mul for Pose {
    type Output = Pose;
    fn mul(self, rhs: Pose) -> Pose {
        self.compose(&rhs)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    pub(crate) fn sample_pose(angle: f64, t: [f64; 3]) -> Pose {
        let rotation = Rotation3::from_euler_angles(0.1 * angle, angle, -0.3 * angle);
        Pose::from_parts(rotation.matrix(), &Vector3::new(t[0], t[1], t[2]))
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let pose = sample_pose(0.7, [1.5, -2.0, 12.25]);
        let inv = pose.inverse().unwrap();
        assert_relative_eq!((pose * inv).0, Matrix4::identity(), epsilon = 1e-9);
        assert_relative_eq!((inv * pose).0, Matrix4::identity(), epsilon = 1e-9);
    }

    #[test]
    fn rigid_inverse_matches_general_inverse() {
        let pose = sample_pose(-1.2, [0.3, 4.0, -7.0]);
        let general = pose.0.try_inverse().unwrap();
        assert_relative_eq!(pose.inverse().unwrap().0, general, epsilon = 1e-12);
    }

    #[test]
    fn non_rigid_falls_back_to_general_inverse() {
        let mut m = Matrix4::identity();
        m[(0, 0)] = 2.0;
        m[(1, 3)] = 1.0;
        let pose = Pose(m);
        let inv = pose.inverse().unwrap();
        assert_relative_eq!((pose * inv).0, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn singular_pose_is_rejected() {
        let pose = Pose(Matrix4::zeros());
        assert!(matches!(pose.inverse(), Err(Error::SingularPose)));
    }

    #[test]
    fn transform_point_applies_translation() {
        let pose = Pose::from_translation(Vector3::new(1.0, 2.0, 3.0));
        let p = pose.transform_point(&Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vector3::new(2.0, 3.0, 4.0));
    }
}
