//! 轨迹误差
//!
//! 在长度固定的滑动窗口上计算带最优尺度的 ATE。每个窗口内先把相对位姿
//! 从原点依次累乘得到相机中心，再平移对齐首点，最后用闭式最小二乘求尺度。

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::{ATE_EPSILON, TRACK_LENGTH};
use crate::error::{Error, Result};
use crate::pose::Pose;
use crate::utility::Utility;

/// 从单位位姿开始依次右乘相对位姿，返回每一步的相机中心 (包括原点)
pub fn accumulate_positions(relative_poses: &[Pose]) -> Vec<Vector3<f64>> {
    let mut cam_to_world = Pose::identity();
    let mut xyzs = Vec::with_capacity(relative_poses.len() + 1);
    xyzs.push(cam_to_world.translation());
    for pose in relative_poses {
        cam_to_world = cam_to_world.compose(pose);
        xyzs.push(cam_to_world.translation());
    }
    xyzs
}

/// 最优尺度 `sum(gt * pred) / (sum(pred^2) + eps)`
pub fn optimal_scale(gt: &[Vector3<f64>], pred: &[Vector3<f64>]) -> f64 {
    let num: f64 = gt.iter().zip(pred).map(|(g, p)| g.dot(p)).sum();
    let den: f64 = pred.iter().map(|p| p.norm_squared()).sum();
    num / (den + ATE_EPSILON)
}

/// 一个窗口的 ATE
///
/// 不做旋转对齐：两条轨迹都以窗口首帧为原点。误差为 `sqrt(sum |e|^2) / n`。
pub fn compute_ate(gt: &[Vector3<f64>], pred: &[Vector3<f64>]) -> Result<f64> {
    if gt.is_empty() || gt.len() != pred.len() {
        return Err(Error::Degenerate(format!(
            "cannot align {} predicted positions with {} ground truth positions",
            pred.len(),
            gt.len()
        )));
    }
    let offset = gt[0] - pred[0];
    let pred: Vec<Vector3<f64>> = pred.iter().map(|p| p + offset).collect();
    let scale = optimal_scale(gt, &pred);
    let sq: f64 = gt
        .iter()
        .zip(&pred)
        .map(|(g, p)| (p * scale - g).norm_squared())
        .sum();
    Ok(sq.sqrt() / gt.len() as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryError {
    pub mean: f64,
    pub std: f64,
    /// 每个窗口的 ATE
    pub windows: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct TrajectoryEvaluator {
    /// 窗口内的帧数，每个窗口使用 `track_length - 1` 个相对位姿
    pub track_length: usize,
}

impl Default for TrajectoryEvaluator {
    fn default() -> Self {
        Self {
            track_length: TRACK_LENGTH,
        }
    }
}

impl TrajectoryEvaluator {
    pub fn new(track_length: usize) -> Self {
        Self { track_length }
    }

    /// `pred` 和 `gt` 是逐帧的相对位姿序列，长度必须相同。
    /// 窗口起点为 `0..N-W-1`，共 `N - W - 1` 个窗口，至少需要 `W + 2` 个位姿。
    pub fn evaluate(&self, pred: &[Pose], gt: &[Pose]) -> Result<TrajectoryError> {
        if pred.len() != gt.len() {
            return Err(Error::Degenerate(format!(
                "{} predicted poses for {} ground truth poses",
                pred.len(),
                gt.len()
            )));
        }
        if self.track_length < 2 {
            return Err(Error::Degenerate(format!(
                "track length {} leaves no relative pose per window",
                self.track_length
            )));
        }
        let n = gt.len();
        if n < self.track_length + 2 {
            return Err(Error::Degenerate(format!(
                "{} poses are not enough for a window of {}",
                n, self.track_length
            )));
        }
        let span = self.track_length - 1;
        let windows = (0..n - self.track_length - 1)
            .map(|i| {
                let pred_xyz = accumulate_positions(&pred[i..i + span]);
                let gt_xyz = accumulate_positions(&gt[i..i + span]);
                compute_ate(&gt_xyz, &pred_xyz)
            })
            .collect::<Result<Vec<f64>>>()?;
        let (mean, std) = Utility::mean_std(&windows)
            .ok_or_else(|| Error::Degenerate("no trajectory windows".to_string()))?;
        log::info!(
            "trajectory error: {:.3}, std: {:.3} over {} windows",
            mean,
            std,
            windows.len()
        );
        Ok(TrajectoryError { mean, std, windows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::tests::sample_pose;
    use approx::assert_relative_eq;

    fn forward(steps: &[[f64; 3]]) -> Vec<Pose> {
        steps
            .iter()
            .map(|t| Pose::from_translation(Vector3::new(t[0], t[1], t[2])))
            .collect()
    }

    #[test]
    fn positions_start_at_origin() {
        let xyz = accumulate_positions(&forward(&[[0.0, 0.0, 1.0], [1.0, 0.0, 1.0]]));
        assert_eq!(
            xyz,
            vec![
                Vector3::zeros(),
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(1.0, 0.0, 2.0)
            ]
        );
    }

    #[test]
    fn positions_follow_rotation() {
        let first = sample_pose(0.4, [0.0, 0.0, 1.0]);
        let second = Pose::from_translation(Vector3::new(0.0, 0.0, 1.0));
        let xyz = accumulate_positions(&[first, second]);
        let expected = first.translation() + first.rotation() * Vector3::new(0.0, 0.0, 1.0);
        assert_relative_eq!(xyz[2], expected, epsilon = 1e-12);
    }

    #[test]
    fn identical_two_pose_window_has_zero_error() {
        let gt = accumulate_positions(&forward(&[[0.3, -0.1, 1.2]]));
        assert_eq!(gt.len(), 2);
        // 只剩分母中 eps 带来的偏差
        assert!(compute_ate(&gt, &gt.clone()).unwrap() < 1e-5);
    }

    #[test]
    fn doubled_prediction_recovers_half_scale() {
        let gt = accumulate_positions(&forward(&[
            [0.0, 0.0, 1.0],
            [0.5, 0.0, 1.0],
            [0.0, 0.2, 0.8],
        ]));
        let pred: Vec<_> = gt.iter().map(|p| p * 2.0).collect();
        assert_relative_eq!(optimal_scale(&gt, &pred), 0.5, epsilon = 1e-5);
        assert!(compute_ate(&gt, &pred).unwrap() < 1e-5);
    }

    #[test]
    fn offset_is_removed_before_scaling() {
        let gt = vec![Vector3::new(1.0, 1.0, 1.0), Vector3::new(1.0, 1.0, 2.0)];
        let pred = vec![Vector3::new(5.0, 5.0, 5.0), Vector3::new(5.0, 5.0, 6.0)];
        assert!(compute_ate(&gt, &pred).unwrap() < 1e-5);
    }

    #[test]
    fn evaluate_counts_windows() {
        let gt = forward(&[[0.0, 0.0, 1.0]; 9]);
        let pred = forward(&[[0.0, 0.0, 3.0]; 9]);
        let result = TrajectoryEvaluator::default().evaluate(&pred, &gt).unwrap();
        assert_eq!(result.windows.len(), 3);
        assert!(result.mean < 1e-5);
        assert!(result.std < 1e-5);
    }

    #[test]
    fn evaluate_rejects_short_or_mismatched_input() {
        let evaluator = TrajectoryEvaluator::default();
        let five = forward(&[[0.0, 0.0, 1.0]; 5]);
        let six = forward(&[[0.0, 0.0, 1.0]; 6]);
        let seven = forward(&[[0.0, 0.0, 1.0]; 7]);
        assert!(matches!(evaluator.evaluate(&five, &five), Err(Error::Degenerate(_))));
        assert!(matches!(evaluator.evaluate(&six, &six), Err(Error::Degenerate(_))));
        assert!(matches!(evaluator.evaluate(&five, &six), Err(Error::Degenerate(_))));
        assert!(TrajectoryEvaluator::new(1).evaluate(&seven, &seven).is_err());
        assert_eq!(evaluator.evaluate(&seven, &seven).unwrap().windows.len(), 1);
    }
}
