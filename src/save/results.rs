use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::depth::DepthErrors;
use crate::error::Result;
use crate::slam::TrackingState;
use crate::trajectory::TrajectoryError;

const SEPARATOR: &str = "----------------------------------------------";

fn header() -> String {
    DepthErrors::HEADERS
        .iter()
        .map(|h| format!("{:>8} | ", h))
        .collect()
}

fn values(err: &DepthErrors) -> String {
    let row: String = err
        .as_array()
        .iter()
        .map(|v| format!("&{:8.3}  ", v))
        .collect();
    format!("{}\\\\", row)
}

/// 在结果文件中追加一帧的七项深度误差
pub fn save_depth_err_results(
    file_path: impl AsRef<Path>,
    filename: &str,
    err: &DepthErrors,
) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    writeln!(f, "{}", SEPARATOR)?;
    writeln!(f, "image id:{}", filename)?;
    writeln!(f, "  {}", header())?;
    writeln!(f, "{}", values(err))?;
    log::info!("image id:{} {}", filename, values(err));
    Ok(())
}

/// `log.txt`：每行 `<index>: <state>`
pub fn write_state_log(path: impl AsRef<Path>, states: &[TrackingState]) -> Result<()> {
    let mut f = std::io::BufWriter::new(std::fs::File::create(path)?);
    for (i, state) in states.iter().enumerate() {
        writeln!(f, "{}: {}", i, state)?;
    }
    f.flush()?;
    Ok(())
}

pub fn append_trajectory_error(file_path: impl AsRef<Path>, err: &TrajectoryError) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    writeln!(
        f,
        "Trajectory error: {:0.3}, std: {:0.3}",
        err.mean, err.std
    )?;
    Ok(())
}
