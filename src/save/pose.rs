use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::LEDGER_PRECISION;
use crate::error::Result;
use crate::global_cast::MatrixRows;
use crate::pose::Pose;

/// 保存 4x4 位姿到 `<dir>/<name>.json`，`name` 可以带小数点 (TUM 时间戳)
pub fn save_pose(dir: impl AsRef<Path>, name: &str, pose: &Pose) -> Result<()> {
    let path = dir.as_ref().join(format!("{}.json", name));
    let text = serde_json::to_string(&MatrixRows::from(&pose.0))?;
    std::fs::write(path, text)?;
    Ok(())
}

pub fn load_pose(path: impl AsRef<Path>) -> Result<Pose> {
    let text = std::fs::read_to_string(path)?;
    let rows: MatrixRows = serde_json::from_str(&text)?;
    Ok(Pose(rows.to_matrix4()?))
}

/// 目录下所有 `.json` 位姿，按文件名排序
pub fn load_pose_dir(dir: impl AsRef<Path>) -> Result<Vec<(String, Pose)>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|p| p.extension().is_some_and(|e| e == "json"));
    paths.sort();
    paths
        .into_iter()
        .map(|p| {
            let name = p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok((name, load_pose(&p)?))
        })
        .collect()
}

fn ledger_values(pose: &Pose) -> String {
    pose.upper_rows()
        .iter()
        .map(|v| format!("{:.*}", LEDGER_PRECISION, v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// 在 `<dir>/pose.txt` 追加一行 `name r00 r01 ... t2`
pub fn append_pose_txt(dir: impl AsRef<Path>, name: &str, pose: &Pose) -> Result<()> {
    let line = format!("{} {}", name, ledger_values(pose));
    append_line(&dir.as_ref().join("pose.txt"), &line)
}

/// KITTI odometry 格式：`pose.txt` 只有 12 个数，帧名写入 `times.txt`
pub fn append_pose_and_times_txt(dir: impl AsRef<Path>, name: &str, pose: &Pose) -> Result<()> {
    let dir = dir.as_ref();
    append_line(&dir.join("times.txt"), name)?;
    append_line(&dir.join("pose.txt"), &ledger_values(pose))
}
