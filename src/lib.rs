//! 视觉 SLAM 输出的后处理与评估
//!
//! 把外部 SLAM 引擎每帧的位姿和稀疏点云整理成稠密深度图和相对位姿，
//! 并与真值深度图、真值轨迹比较。
//!
//! nalgebra
//! https://docs.rs/nalgebra/latest/nalgebra/
//!
//! ndarray
//! https://docs.rs/ndarray/latest/ndarray/all.html
//!
pub mod camera;
pub mod config;
pub mod dataset;
pub mod depth;
pub mod error;
pub mod global_cast;
pub mod global_types;
pub mod pose;
pub mod save;
pub mod slam;
pub mod trajectory;
pub mod utility;

pub use error::{Error, Result};
