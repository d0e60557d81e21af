//! # Feature Standardization
//!
//! Per-column standard scaling (zero mean, unit variance) fitted on the
//! training batch and reapplied at scoring time. The scaler is persisted
//! alongside the forest it was fitted for — scoring with a mismatched
//! scaler would silently distort every decision value.

use serde::{Deserialize, Serialize};

/// Column-wise standard scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit a scaler on the training matrix (rows = samples).
    ///
    /// Constant columns get a unit std so transformation maps them to 0
    /// instead of dividing by zero.
    pub fn fit(data: &[Vec<f64>]) -> Self {
        let width = data.first().map(Vec::len).unwrap_or(0);
        let n = data.len() as f64;
        let mut means = vec![0.0; width];
        for row in data {
            for (i, v) in row.iter().enumerate() {
                means[i] += v;
            }
        }
        for m in &mut means {
            *m /= n.max(1.0);
        }

        let mut stds = vec![0.0; width];
        for row in data {
            for (i, v) in row.iter().enumerate() {
                stds[i] += (v - means[i]).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n.max(1.0)).sqrt();
            if *s < f64::EPSILON {
                *s = 1.0;
            }
        }

        Self { means, stds }
    }

    /// Standardize one row in place-free fashion.
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(i, v)| (v - self.means[i]) / self.stds[i])
            .collect()
    }

    /// Standardize a whole matrix.
    pub fn transform(&self, data: &[Vec<f64>]) -> Vec<Vec<f64>> {
        data.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Number of columns the scaler was fitted on.
    pub fn width(&self) -> usize {
        self.means.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitted_columns_standardize_to_zero_mean_unit_variance() {
        let data = vec![
            vec![1.0, 10.0],
            vec![2.0, 20.0],
            vec![3.0, 30.0],
            vec![4.0, 40.0],
        ];
        let scaler = StandardScaler::fit(&data);
        let scaled = scaler.transform(&data);

        for col in 0..2 {
            let mean: f64 = scaled.iter().map(|r| r[col]).sum::<f64>() / 4.0;
            let var: f64 = scaled.iter().map(|r| r[col].powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-9);
            assert!((var - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let data = vec![vec![5.0, 1.0], vec![5.0, 2.0], vec![5.0, 3.0]];
        let scaler = StandardScaler::fit(&data);
        for row in scaler.transform(&data) {
            assert_eq!(row[0], 0.0);
        }
    }

    #[test]
    fn round_trips_through_json() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        let json = serde_json::to_string(&scaler).unwrap();
        let back: StandardScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scaler);
    }
}
