use nalgebra::Vector3;

/// 一个 IMU 采样
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuSample {
    /// 秒
    pub timestamp: f64,
    pub acc: Vector3<f64>,
    pub gyro: Vector3<f64>,
}

impl ImuSample {
    pub fn new(timestamp: f64, acc: [f64; 3], gyro: [f64; 3]) -> Self {
        Self {
            timestamp,
            acc: Vector3::new(acc[0], acc[1], acc[2]),
            gyro: Vector3::new(gyro[0], gyro[1], gyro[2]),
        }
    }
}
