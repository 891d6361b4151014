//! 深度图
//!
//! 稀疏点云到稠密深度图的投影、与真值深度图的误差评估，以及 16 位 PNG 的读写。

mod evaluator;
mod projector;

pub use evaluator::{
    compute_errors, evaluate_depth_map, evaluate_observations, scale_from_observations,
    DepthErrors, DepthRange,
};
pub use projector::{ColoredPoint, DepthProjector, DepthWriteMode, Observation, Projection};

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma};
use ndarray::Array2;

use crate::config::{
    DEPTH_SENTINEL, KITTI_MAX_DEPTH, MIN_DEPTH, PNG_DEPTH_SCALE, TUM_DEPTH_FACTOR, TUM_MAX_DEPTH,
};
use crate::error::{Error, Result};

/// (height, width)，未观测像素为 [DEPTH_SENTINEL]
pub type DepthImage = Array2<f64>;

/// 真值深度图的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthEncoding {
    /// `value / 256` 米，0 为无效
    Kitti,
    /// `value / 5000` 米，0 为无效
    Tum,
}

impl DepthEncoding {
    pub fn range(&self) -> DepthRange {
        match self {
            DepthEncoding::Kitti => DepthRange::new(MIN_DEPTH, KITTI_MAX_DEPTH),
            DepthEncoding::Tum => DepthRange::new(MIN_DEPTH, TUM_MAX_DEPTH),
        }
    }

    fn decode(&self, raw: u16) -> f64 {
        if raw == 0 {
            return DEPTH_SENTINEL;
        }
        match self {
            DepthEncoding::Kitti => raw as f64 / PNG_DEPTH_SCALE,
            DepthEncoding::Tum => raw as f64 / TUM_DEPTH_FACTOR,
        }
    }
}

/// 读取 16 位单通道深度图
///
/// 像素类型必须是 16 位单通道，且最大值大于 255；全零的图同样被拒绝。
pub fn read_depth(path: impl AsRef<Path>, encoding: DepthEncoding) -> Result<DepthImage> {
    let path = path.as_ref();
    let format_error = |reason: &str| Error::DepthFormat {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };
    let buffer = match image::open(path)? {
        DynamicImage::ImageLuma16(buffer) => buffer,
        _ => return Err(format_error("not a 16-bit single channel image")),
    };
    if buffer.as_raw().iter().all(|&raw| raw <= 255) {
        return Err(format_error("maximum value does not exceed 255"));
    }
    let (width, height) = buffer.dimensions();
    let data = buffer.into_raw().into_iter().map(|raw| encoding.decode(raw)).collect();
    Array2::from_shape_vec((height as usize, width as usize), data).map_err(|e| {
        Error::Degenerate(format!("depth map {} has a bad shape: {}", path.display(), e))
    })
}

/// 保存为 16 位 PNG，`round(depth * 256)`；哨兵值和负深度写为 0 (无效)
pub fn save_depth(dest: impl AsRef<Path>, depth: &DepthImage) -> Result<()> {
    let (height, width) = depth.dim();
    let data: Vec<u16> = depth
        .iter()
        .map(|&d| {
            if d > 0.0 {
                (d * PNG_DEPTH_SCALE).round().min(u16::MAX as f64) as u16
            } else {
                0
            }
        })
        .collect();
    let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width as u32, height as u32, data)
        .ok_or_else(|| Error::Degenerate("depth buffer size mismatch".to_string()))?;
    buffer.save(dest.as_ref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_read_kitti_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000000.png");
        let mut depth = Array2::from_elem((4, 5), DEPTH_SENTINEL);
        depth[[1, 2]] = 12.5;
        depth[[3, 4]] = 0.75;
        save_depth(&path, &depth).unwrap();

        let loaded = read_depth(&path, DepthEncoding::Kitti).unwrap();
        assert_eq!(loaded.dim(), (4, 5));
        assert_eq!(loaded[[1, 2]], 12.5);
        assert_eq!(loaded[[3, 4]], 0.75);
        assert_eq!(loaded[[0, 0]], DEPTH_SENTINEL);
    }

    #[test]
    fn tum_depth_uses_its_own_factor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.png");
        let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(2, 1, vec![5000, 0]).unwrap();
        buffer.save(&path).unwrap();

        let loaded = read_depth(&path, DepthEncoding::Tum).unwrap();
        assert_eq!(loaded[[0, 0]], 1.0);
        assert_eq!(loaded[[0, 1]], DEPTH_SENTINEL);
    }

    #[test]
    fn eight_bit_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::new(3, 3).save(&path).unwrap();
        assert!(matches!(
            read_depth(&path, DepthEncoding::Kitti),
            Err(Error::DepthFormat { .. })
        ));
    }

    #[test]
    fn low_valued_sixteen_bit_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("low.png");
        let buffer =
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(2, 2, vec![0, 12, 255, 3]).unwrap();
        buffer.save(&path).unwrap();
        assert!(matches!(
            read_depth(&path, DepthEncoding::Kitti),
            Err(Error::DepthFormat { .. })
        ));

        // 全部无效的深度图
        save_depth(&path, &Array2::from_elem((2, 2), DEPTH_SENTINEL)).unwrap();
        assert!(read_depth(&path, DepthEncoding::Kitti).is_err());
    }
}
