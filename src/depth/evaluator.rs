use serde::{Deserialize, Serialize};

use super::{DepthImage, Observation};
use crate::error::{Error, Result};
use crate::utility::Utility;

/// 单帧的七项深度误差
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthErrors {
    pub abs_rel: f64,
    pub sq_rel: f64,
    pub rmse: f64,
    pub rmse_log: f64,
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
}

impl DepthErrors {
    pub const HEADERS: [&'static str; 7] =
        ["abs_rel", "sq_rel", "rmse", "rmse_log", "a1", "a2", "a3"];

    pub fn as_array(&self) -> [f64; 7] {
        [
            self.abs_rel,
            self.sq_rel,
            self.rmse,
            self.rmse_log,
            self.a1,
            self.a2,
            self.a3,
        ]
    }

    fn from_array(v: [f64; 7]) -> Self {
        Self {
            abs_rel: v[0],
            sq_rel: v[1],
            rmse: v[2],
            rmse_log: v[3],
            a1: v[4],
            a2: v[5],
            a3: v[6],
        }
    }

    /// 逐项平均
    pub fn mean(records: &[DepthErrors]) -> Result<DepthErrors> {
        if records.is_empty() {
            return Err(Error::Degenerate("no evaluated frames to average".to_string()));
        }
        let mut sum = [0.0; 7];
        for r in records {
            for (s, v) in sum.iter_mut().zip(r.as_array()) {
                *s += v;
            }
        }
        Ok(Self::from_array(sum.map(|s| s / records.len() as f64)))
    }
}

/// 预测深度在尺度对齐后被裁剪到的范围
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthRange {
    pub min: f64,
    pub max: f64,
}

impl DepthRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clip(&self, d: f64) -> f64 {
        d.clamp(self.min, self.max)
    }
}

/// 误差指标，`gt` 和 `pred` 一一对应且都应为正
pub fn compute_errors(gt: &[f64], pred: &[f64]) -> Result<DepthErrors> {
    if gt.len() != pred.len() {
        return Err(Error::Degenerate(format!(
            "{} ground truth values for {} predictions",
            gt.len(),
            pred.len()
        )));
    }
    if gt.is_empty() {
        return Err(Error::Degenerate("no valid pixels to evaluate".to_string()));
    }
    let n = gt.len() as f64;
    let (mut abs_rel, mut sq_rel, mut sq, mut sq_log) = (0.0, 0.0, 0.0, 0.0);
    let (mut a1, mut a2, mut a3) = (0usize, 0usize, 0usize);
    for (&g, &p) in gt.iter().zip(pred) {
        let thresh = (g / p).max(p / g);
        if thresh < 1.25 {
            a1 += 1;
        }
        if thresh < 1.25_f64.powi(2) {
            a2 += 1;
        }
        if thresh < 1.25_f64.powi(3) {
            a3 += 1;
        }
        let diff = g - p;
        abs_rel += diff.abs() / g;
        sq_rel += diff * diff / g;
        sq += diff * diff;
        sq_log += (g.ln() - p.ln()).powi(2);
    }
    let errors = DepthErrors {
        abs_rel: abs_rel / n,
        sq_rel: sq_rel / n,
        rmse: (sq / n).sqrt(),
        rmse_log: (sq_log / n).sqrt(),
        a1: a1 as f64 / n,
        a2: a2 as f64 / n,
        a3: a3 as f64 / n,
    };
    if errors.as_array().iter().any(|v| !v.is_finite()) {
        return Err(Error::Degenerate(format!("non-finite depth error {:?}", errors)));
    }
    Ok(errors)
}

fn ground_truth_at(gt: &DepthImage, obs: &Observation) -> Result<f64> {
    let (row, col) = obs.pixel;
    gt.get([row, col]).copied().ok_or_else(|| {
        Error::Degenerate(format!(
            "pixel ({}, {}) outside ground truth {:?}",
            row,
            col,
            gt.dim()
        ))
    })
}

fn median_ratio(gt: &[f64], pred: &[f64]) -> Result<f64> {
    let (Some(gt_median), Some(pred_median)) = (Utility::median(gt), Utility::median(pred)) else {
        return Err(Error::Degenerate("no valid pixels to align scale".to_string()));
    };
    let ratio = gt_median / pred_median;
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(Error::Degenerate(format!(
            "invalid scale {} (median gt {}, median prediction {})",
            ratio, gt_median, pred_median
        )));
    }
    Ok(ratio)
}

/// 尺度 `median(gt) / median(pred)`，只统计真值有效 (> 0) 的观测像素
pub fn scale_from_observations(observations: &[Observation], gt: &DepthImage) -> Result<f64> {
    let mut gt_depth = Vec::with_capacity(observations.len());
    let mut pred_depth = Vec::with_capacity(observations.len());
    for obs in observations {
        let g = ground_truth_at(gt, obs)?;
        if g > 0.0 {
            gt_depth.push(g);
            pred_depth.push(obs.depth());
        }
    }
    median_ratio(&gt_depth, &pred_depth)
}

/// 投影点与真值深度图之间的误差
///
/// 预测深度乘以中位数尺度后裁剪到 `range`，只在预测和真值都大于 0 的像素上计算。
pub fn evaluate_observations(
    observations: &[Observation],
    gt: &DepthImage,
    range: DepthRange,
) -> Result<DepthErrors> {
    let scale = scale_from_observations(observations, gt)?;
    let mut gt_depth = Vec::with_capacity(observations.len());
    let mut pred_depth = Vec::with_capacity(observations.len());
    for obs in observations {
        let g = ground_truth_at(gt, obs)?;
        let p = obs.depth();
        if g > 0.0 && p > 0.0 {
            gt_depth.push(g);
            pred_depth.push(range.clip(p * scale));
        }
    }
    log::debug!("scale {:.4} over {} pixels", scale, gt_depth.len());
    compute_errors(&gt_depth, &pred_depth)
}

/// 稠密预测深度图与真值之间的误差，先取有效像素再计算尺度
pub fn evaluate_depth_map(
    pred: &DepthImage,
    gt: &DepthImage,
    range: DepthRange,
) -> Result<DepthErrors> {
    if pred.dim() != gt.dim() {
        return Err(Error::Degenerate(format!(
            "prediction {:?} and ground truth {:?} differ in shape",
            pred.dim(),
            gt.dim()
        )));
    }
    let (gt_depth, pred_depth): (Vec<f64>, Vec<f64>) = gt
        .iter()
        .zip(pred.iter())
        .filter(|(g, p)| **g > 0.0 && **p > 0.0)
        .map(|(&g, &p)| (g, p))
        .unzip();
    let scale = median_ratio(&gt_depth, &pred_depth)?;
    let pred_depth: Vec<f64> = pred_depth.iter().map(|p| range.clip(p * scale)).collect();
    compute_errors(&gt_depth, &pred_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEPTH_SENTINEL;
    use nalgebra::Vector3;
    use ndarray::Array2;

    const RANGE: DepthRange = DepthRange {
        min: 1e-3,
        max: 100.0,
    };

    fn obs(row: usize, col: usize, z: f64) -> Observation {
        Observation {
            camera_point: Vector3::new(0.0, 0.0, z),
            world_point: Vector3::new(0.0, 0.0, z),
            pixel: (row, col),
        }
    }

    fn scenario() -> (Vec<Observation>, DepthImage) {
        let mut gt = Array2::from_elem((3, 3), DEPTH_SENTINEL);
        gt[[0, 0]] = 1.0;
        gt[[1, 1]] = 2.0;
        gt[[2, 2]] = 3.0;
        let observations = vec![obs(0, 0, 2.0), obs(1, 1, 4.0), obs(2, 2, 6.0)];
        (observations, gt)
    }

    #[test]
    fn scaled_prediction_matches_ground_truth() {
        let (observations, gt) = scenario();
        assert_eq!(scale_from_observations(&observations, &gt).unwrap(), 0.5);

        let errors = evaluate_observations(&observations, &gt, RANGE).unwrap();
        assert_eq!(
            errors,
            DepthErrors {
                abs_rel: 0.0,
                sq_rel: 0.0,
                rmse: 0.0,
                rmse_log: 0.0,
                a1: 1.0,
                a2: 1.0,
                a3: 1.0,
            }
        );
    }

    #[test]
    fn invalid_ground_truth_is_masked() {
        let (mut observations, gt) = scenario();
        // 真值为哨兵值的像素既不参与尺度也不参与误差
        observations.push(obs(0, 2, 50.0));
        let errors = evaluate_observations(&observations, &gt, RANGE).unwrap();
        assert_eq!(errors.abs_rel, 0.0);
        assert_eq!(errors.a1, 1.0);
    }

    #[test]
    fn no_valid_pixels_is_an_error() {
        let gt = Array2::from_elem((3, 3), DEPTH_SENTINEL);
        let observations = vec![obs(0, 0, 2.0)];
        assert!(matches!(
            evaluate_observations(&observations, &gt, RANGE),
            Err(Error::Degenerate(_))
        ));
        assert!(matches!(
            evaluate_observations(&[], &gt, RANGE),
            Err(Error::Degenerate(_))
        ));
    }

    #[test]
    fn zero_prediction_median_is_an_error() {
        let mut gt = Array2::from_elem((1, 2), 1.0);
        gt[[0, 1]] = 2.0;
        let observations = vec![obs(0, 0, 0.0), obs(0, 1, 0.0)];
        assert!(matches!(
            scale_from_observations(&observations, &gt),
            Err(Error::Degenerate(_))
        ));
    }

    #[test]
    fn threshold_accuracy_counts() {
        let gt = [1.0, 1.0, 1.0, 1.0];
        let pred = [1.1, 1.3, 1.7, 2.5];
        let errors = compute_errors(&gt, &pred).unwrap();
        assert_eq!(errors.a1, 0.25);
        assert_eq!(errors.a2, 0.5);
        assert_eq!(errors.a3, 0.75);
    }

    #[test]
    fn clipping_applies_after_scaling() {
        let mut gt = Array2::from_elem((1, 3), 1.0);
        gt[[0, 2]] = 1000.0;
        let pred = Array2::from_elem((1, 3), 1.0);
        // 尺度为 1，只裁剪预测值
        let errors = evaluate_depth_map(&pred, &gt, RANGE).unwrap();
        let expected = compute_errors(&[1.0, 1.0, 1000.0], &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(errors, expected);

        let pred = Array2::from_elem((1, 3), 5000.0);
        let gt = Array2::from_elem((1, 3), 500.0);
        // 尺度为 0.1，500 被裁剪到 100
        let errors = evaluate_depth_map(&pred, &gt, RANGE).unwrap();
        let expected = compute_errors(&[500.0; 3], &[100.0; 3]).unwrap();
        assert_eq!(errors, expected);
    }

    #[test]
    fn dense_shapes_must_match() {
        let pred = Array2::from_elem((2, 3), 1.0);
        let gt = Array2::from_elem((3, 2), 1.0);
        assert!(evaluate_depth_map(&pred, &gt, RANGE).is_err());
    }

    #[test]
    fn mean_of_records() {
        let a = DepthErrors {
            abs_rel: 0.1,
            rmse: 2.0,
            a1: 1.0,
            ..Default::default()
        };
        let b = DepthErrors {
            abs_rel: 0.3,
            rmse: 4.0,
            a1: 0.5,
            ..Default::default()
        };
        let mean = DepthErrors::mean(&[a, b]).unwrap();
        assert!((mean.abs_rel - 0.2).abs() < 1e-12);
        assert_eq!(mean.rmse, 3.0);
        assert_eq!(mean.a1, 0.75);
        assert!(DepthErrors::mean(&[]).is_err());
    }
}
