//! 全局类型转换
//!
//! 用于在 nalgebra 类型和持久化使用的行优先数组之间转换

use nalgebra::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 行优先的矩阵表示，JSON 中为嵌套数组
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixRows(pub Vec<Vec<f64>>);

impl MatrixRows {
    pub fn shape(&self) -> (usize, usize) {
        let rows = self.0.len();
        let cols = self.0.first().map_or(0, |r| r.len());
        (rows, cols)
    }

    fn is_rectangular(&self) -> bool {
        let (_, cols) = self.shape();
        self.0.iter().all(|r| r.len() == cols)
    }

    /// 相机内参，接受 3x3 或 3x4，第四列被忽略
    pub fn to_camera_matrix(&self) -> Result<Matrix3<f64>> {
        let (rows, cols) = self.shape();
        if rows != 3 || !(cols == 3 || cols == 4) || !self.is_rectangular() {
            return Err(Error::CameraMatrixShape { rows, cols });
        }
        Ok(Matrix3::from_fn(|i, j| self.0[i][j]))
    }

    pub fn to_matrix4(&self) -> Result<Matrix4<f64>> {
        let (rows, cols) = self.shape();
        if rows != 4 || cols != 4 || !self.is_rectangular() {
            return Err(Error::Degenerate(format!(
                "expected a 4x4 pose matrix, got {}x{}",
                rows, cols
            )));
        }
        Ok(Matrix4::from_fn(|i, j| self.0[i][j]))
    }
}

impl From<&Matrix4<f64>> for MatrixRows {
    fn from(matrix: &Matrix4<f64>) -> Self {
        MatrixRows(
            matrix
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        )
    }
}

#[inline]
pub fn vector3_from_array(p: &[f64; 3]) -> Vector3<f64> {
    Vector3::new(p[0], p[1], p[2])
}

#[test]
fn test_camera_matrix_3x4() {
    let rows = MatrixRows(vec![
        vec![718.856, 0.0, 607.19, 45.38],
        vec![0.0, 718.856, 185.21, -0.11],
        vec![0.0, 0.0, 1.0, 0.0],
    ]);
    let k = rows.to_camera_matrix().unwrap();
    assert_eq!(k[(0, 0)], 718.856);
    assert_eq!(k[(1, 2)], 185.21);
    assert_eq!(k[(2, 2)], 1.0);
}

#[test]
fn test_camera_matrix_bad_shape() {
    let rows = MatrixRows(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    assert!(matches!(
        rows.to_camera_matrix(),
        Err(Error::CameraMatrixShape { rows: 2, cols: 2 })
    ));
}

#[test]
fn test_matrix4_rows_layout() {
    let mut m = Matrix4::<f64>::identity();
    m[(0, 3)] = 2.5;
    let rows = MatrixRows::from(&m);
    assert_eq!(rows.0[0], vec![1.0, 0.0, 0.0, 2.5]);
    assert_eq!(rows.to_matrix4().unwrap(), m);
}
