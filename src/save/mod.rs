//! 结果保存
//!
//! 位姿文件、pose.txt 台账、状态日志、误差结果和带颜色的点云。
mod pose;
mod pts;
mod results;

pub use pose::{append_pose_and_times_txt, append_pose_txt, load_pose, load_pose_dir, save_pose};
pub use pts::FramePointsSave;
pub use results::{append_trajectory_error, save_depth_err_results, write_state_log};

use std::path::Path;

/// 目录不存在时创建
pub fn create_dir(directory: impl AsRef<Path>) -> std::io::Result<()> {
    std::fs::create_dir_all(directory)
}
