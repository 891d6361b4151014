//! 错误类型
//!
//! 库内部统一使用 [Error]，二进制入口和数据集加载使用 `anyhow`。

use crate::slam::Sensor;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 配置文件缺失或内容非法，在处理任何帧之前报告
    #[error("configuration error: {0}")]
    Config(String),

    /// 调用的处理函数与会话的传感器类型不一致
    #[error("sensor mismatch: session is configured for {expected}, got a {got} frame")]
    SensorMismatch { expected: Sensor, got: Sensor },

    /// 相对位姿的帧偏移超出已记录的历史
    #[error("pose offset {offset} out of range, only {available} earlier frame(s) recorded")]
    PoseIndex { offset: usize, available: usize },

    #[error("pose matrix is singular and cannot be inverted")]
    SingularPose,

    #[error("camera matrix must be 3x3 or 3x4, got {rows}x{cols}")]
    CameraMatrixShape { rows: usize, cols: usize },

    /// 评估输入退化：有效像素为空、窗口为空或尺度非有限
    #[error("degenerate evaluation input: {0}")]
    Degenerate(String),

    /// 后端违反了接口约定，例如跟踪成功却没有位姿
    #[error("backend error: {0}")]
    Backend(String),

    #[error("replay session exhausted after {0} frame(s)")]
    ReplayExhausted(usize),

    /// 不是 16 位单通道图像，或者最大值不超过 255 (8 位数据存成 16 位)
    #[error("depth map {path} is not a 16-bit depth map: {reason}")]
    DepthFormat { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
