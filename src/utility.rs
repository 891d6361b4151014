pub struct Utility {}

impl Utility {
    /// 中位数，偶数个元素时取中间两个的平均。空输入或含 NaN 时返回 `None`
    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() || values.iter().any(|v| v.is_nan()) {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    #[inline]
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// 均值和总体标准差
    pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
        let mean = Self::mean(values)?;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        Some((mean, var.sqrt()))
    }
}

#[test]
fn test_median() {
    assert_eq!(Utility::median(&[3.0, 1.0, 2.0]), Some(2.0));
    assert_eq!(Utility::median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    assert_eq!(Utility::median(&[]), None);
    assert_eq!(Utility::median(&[1.0, f64::NAN]), None);
}

#[test]
fn test_mean_std() {
    let (mean, std) = Utility::mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    assert_eq!(mean, 5.0);
    assert_eq!(std, 2.0);
    assert!(Utility::mean_std(&[]).is_none());
}
