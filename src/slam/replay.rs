use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::{FrameInput, Sensor, SlamBackend, TrackingState};
use crate::error::{Error, Result};
use crate::global_cast::{vector3_from_array, MatrixRows};
use crate::pose::Pose;

/// 录制的一帧引擎输出
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub state: TrackingState,
    /// 当前相机到第 0 帧的 4x4 位姿，跟踪成功时必须存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<MatrixRows>,
    /// 当前相机坐标系下的点
    #[serde(default)]
    pub points: Vec<[f64; 3]>,
}

/// 录制文件
///
/// ```json
/// {
///   "sensor": "MONOCULAR",
///   "camera_matrix": [[718.8, 0, 607.1], [0, 718.8, 185.2], [0, 0, 1]],
///   "frames": [{"state": "OK", "pose": [[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]], "points": [[0.1, 0.2, 5.0]]}]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaySession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor: Option<Sensor>,
    pub camera_matrix: MatrixRows,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Clone)]
struct RecordedFrame {
    state: TrackingState,
    pose: Option<Pose>,
    points: Vec<Vector3<f64>>,
}

/// 逐帧回放录制的引擎输出，输入图像只用于推进帧序号
#[derive(Debug)]
pub struct ReplayBackend {
    camera_matrix: Matrix3<f64>,
    frames: Vec<RecordedFrame>,
    /// 下一帧的下标
    cursor: usize,
    /// 当前帧的下标
    current: Option<usize>,
    state: TrackingState,
}

impl ReplayBackend {
    pub fn from_file(path: impl AsRef<Path>, sensor: Sensor) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let session: ReplaySession = serde_json::from_reader(reader)?;
        log::info!(
            "replay session {:?}: {} frame(s)",
            path,
            session.frames.len()
        );
        Self::new(session, sensor)
    }

    pub fn new(session: ReplaySession, sensor: Sensor) -> Result<Self> {
        if let Some(recorded) = session.sensor {
            if recorded != sensor {
                return Err(Error::Config(format!(
                    "replay session was recorded with {}, pipeline is configured for {}",
                    recorded, sensor
                )));
            }
        }
        let camera_matrix = session.camera_matrix.to_camera_matrix()?;
        let frames = session
            .frames
            .into_iter()
            .enumerate()
            .map(|(i, frame)| {
                let pose = match (&frame.pose, frame.state.is_ok()) {
                    (Some(rows), _) => Some(Pose(rows.to_matrix4()?)),
                    (None, true) => {
                        return Err(Error::Config(format!(
                            "replay frame {} is OK but has no pose",
                            i
                        )))
                    }
                    (None, false) => None,
                };
                Ok(RecordedFrame {
                    state: frame.state,
                    pose,
                    points: frame.points.iter().map(vector3_from_array).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            camera_matrix,
            frames,
            cursor: 0,
            current: None,
            state: TrackingState::SystemNotReady,
        })
    }

    fn current_frame(&self) -> Option<&RecordedFrame> {
        if !self.state.is_ok() {
            return None;
        }
        self.current.map(|i| &self.frames[i])
    }
}

impl SlamBackend for ReplayBackend {
    fn process(&mut self, _input: &FrameInput, timestamp: f64) -> Result<TrackingState> {
        let Some(frame) = self.frames.get(self.cursor) else {
            return Err(Error::ReplayExhausted(self.frames.len()));
        };
        log::debug!("replay frame {} at t={:.6}", self.cursor, timestamp);
        self.state = frame.state;
        self.current = Some(self.cursor);
        self.cursor += 1;
        Ok(self.state)
    }

    fn tracking_state(&self) -> TrackingState {
        self.state
    }

    fn current_pose(&self) -> Option<Pose> {
        self.current_frame().and_then(|f| f.pose)
    }

    fn current_points(&self) -> Option<Vec<Vector3<f64>>> {
        self.current_frame().map(|f| f.points.clone())
    }

    fn camera_intrinsics(&self) -> Matrix3<f64> {
        self.camera_matrix
    }

    /// 丢弃当前跟踪状态，回放位置保持不变
    fn reset(&mut self) {
        self.state = TrackingState::NotInitialized;
        self.current = None;
    }

    fn shutdown(&mut self) {
        self.state = TrackingState::SystemNotReady;
        self.current = None;
        self.cursor = self.frames.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use nalgebra::Matrix4;

    fn session() -> ReplaySession {
        ReplaySession {
            sensor: Some(Sensor::Monocular),
            camera_matrix: MatrixRows(vec![
                vec![10.0, 0.0, 4.0],
                vec![0.0, 10.0, 3.0],
                vec![0.0, 0.0, 1.0],
            ]),
            frames: vec![
                ReplayFrame {
                    state: TrackingState::NotInitialized,
                    ..Default::default()
                },
                ReplayFrame {
                    state: TrackingState::Ok,
                    pose: Some(MatrixRows::from(&Matrix4::identity())),
                    points: vec![[0.0, 0.0, 2.0]],
                },
            ],
        }
    }

    #[test]
    fn replays_states_in_order() {
        let mut backend = ReplayBackend::new(session(), Sensor::Monocular).unwrap();
        let input = FrameInput::Mono(RgbImage::new(8, 6));
        assert_eq!(backend.tracking_state(), TrackingState::SystemNotReady);

        assert_eq!(backend.process(&input, 0.0).unwrap(), TrackingState::NotInitialized);
        assert!(backend.current_pose().is_none());
        assert!(backend.current_points().is_none());

        assert_eq!(backend.process(&input, 0.1).unwrap(), TrackingState::Ok);
        assert_eq!(backend.current_pose(), Some(Pose::identity()));
        assert_eq!(backend.current_points().unwrap(), vec![Vector3::new(0.0, 0.0, 2.0)]);

        assert!(matches!(
            backend.process(&input, 0.2),
            Err(Error::ReplayExhausted(2))
        ));
    }

    #[test]
    fn recorded_sensor_must_match() {
        assert!(matches!(
            ReplayBackend::new(session(), Sensor::Stereo),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn ok_frame_without_pose_is_rejected() {
        let mut s = session();
        s.frames[1].pose = None;
        assert!(matches!(
            ReplayBackend::new(s, Sensor::Monocular),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn reads_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, serde_json::to_string(&session()).unwrap()).unwrap();
        let backend = ReplayBackend::from_file(&path, Sensor::Monocular).unwrap();
        assert_eq!(backend.camera_intrinsics()[(0, 2)], 4.0);
        assert_eq!(backend.frames.len(), 2);
    }
}
