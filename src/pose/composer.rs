use super::Pose;
use crate::error::{Error, Result};

/// 绝对位姿历史 `[P0, P1, ..., Pt]`
///
/// 每个跟踪成功的帧追加一个相对于第 0 帧的位姿，追加后不再修改，
/// 会话 reset/shutdown 时整体清空。最后一个元素是当前帧。
#[derive(Debug, Clone, Default)]
pub struct PoseHistory {
    poses: Vec<Pose>,
}

impl PoseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pose: Pose) {
        self.poses.push(pose);
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn current(&self) -> Option<&Pose> {
        self.poses.last()
    }

    /// 当前帧之前第 `offset` 个记录的位姿
    pub fn before_current(&self, offset: usize) -> Result<&Pose> {
        let available = self.poses.len().saturating_sub(1);
        if offset > available {
            return Err(Error::PoseIndex { offset, available });
        }
        Ok(&self.poses[self.poses.len() - 1 - offset])
    }

    pub fn as_slice(&self) -> &[Pose] {
        &self.poses
    }

    pub fn clear(&mut self) {
        self.poses.clear();
    }
}

/// 第 `t-k` 帧到当前帧 `t` 的位姿
///
/// - `offset` 为 `None` 或 `0`：直接返回当前帧相对第 0 帧的位姿 `Pt`
/// - `offset = k > 0`：`Pt * inv(P(t-k))`，`k` 超出历史时返回 [Error::PoseIndex]
pub fn pose_to_target(
    current: &Pose,
    history: &PoseHistory,
    offset: Option<usize>,
) -> Result<Pose> {
    match offset {
        None | Some(0) => Ok(*current),
        Some(k) => {
            let previous = history.before_current(k)?;
            Ok(current.compose(&previous.inverse()?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::tests::sample_pose;
    use approx::assert_relative_eq;

    fn history(n: usize) -> PoseHistory {
        let mut h = PoseHistory::new();
        h.push(Pose::identity());
        for i in 1..n {
            let f = i as f64;
            h.push(sample_pose(0.1 * f, [0.2 * f, -0.05 * f, 1.1 * f]));
        }
        h
    }

    #[test]
    fn zero_offset_is_current_pose() {
        let h = history(4);
        let current = *h.current().unwrap();
        assert_eq!(pose_to_target(&current, &h, None).unwrap(), current);
        assert_eq!(pose_to_target(&current, &h, Some(0)).unwrap(), current);
    }

    #[test]
    fn offset_composes_with_inverse_of_earlier_pose() {
        let h = history(5);
        let current = *h.current().unwrap();
        for k in 1..5 {
            let expected = current * h.as_slice()[4 - k].inverse().unwrap();
            let got = pose_to_target(&current, &h, Some(k)).unwrap();
            assert_relative_eq!(got.0, expected.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn offset_to_first_frame_is_absolute_pose() {
        // P0 = I，所以到第 0 帧的相对位姿就是 Pt
        let h = history(3);
        let current = *h.current().unwrap();
        let got = pose_to_target(&current, &h, Some(2)).unwrap();
        assert_relative_eq!(got.0, current.0, epsilon = 1e-12);
    }

    #[test]
    fn offset_beyond_history_is_rejected() {
        let h = history(3);
        let current = *h.current().unwrap();
        let err = pose_to_target(&current, &h, Some(3)).unwrap_err();
        assert!(matches!(
            err,
            Error::PoseIndex {
                offset: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn empty_history_rejects_positive_offset() {
        let h = PoseHistory::new();
        let err = pose_to_target(&Pose::identity(), &h, Some(1)).unwrap_err();
        assert!(matches!(err, Error::PoseIndex { available: 0, .. }));
    }
}
