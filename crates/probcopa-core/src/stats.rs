//! Order statistics and display rounding for response samples.

use statrs::statistics::{Data, Median, Statistics};

/// Point estimates for a single response sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointEstimates {
    pub median: Option<f64>,
    pub mean: Option<f64>,
    /// Population standard deviation (ddof = 0).
    pub std: Option<f64>,
}

/// Median of a sample. `None` for an empty sample.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let data = Data::new(values.to_vec());
    Some(data.median())
}

/// Arithmetic mean of a sample. `None` for an empty sample.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Population standard deviation. `None` for an empty sample.
pub fn population_std(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().population_std_dev())
}

/// Median, mean and standard deviation of a sample.
pub fn point_estimates(values: &[f64]) -> PointEstimates {
    PointEstimates {
        median: median(values),
        mean: mean(values),
        std: population_std(values),
    }
}

/// Round half away from zero to `decimals` digits.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round() / scale
}

/// [`round_to`] lifted over an optional value.
pub fn round_opt(x: Option<f64>, decimals: i32) -> Option<f64> {
    x.map(|v| round_to(v, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_has_no_estimates() {
        assert_eq!(point_estimates(&[]), PointEstimates::default());
    }

    #[test]
    fn odd_and_even_medians() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn constant_sample_has_zero_spread() {
        let est = point_estimates(&[2.0, 2.0, 2.0]);
        assert_eq!(est.median, Some(2.0));
        assert_eq!(est.mean, Some(2.0));
        assert_eq!(est.std, Some(0.0));
    }

    #[test]
    fn std_is_population() {
        // ddof = 0: sqrt(((1-2)^2 + 0 + (3-2)^2) / 3)
        let s = population_std(&[1.0, 2.0, 3.0]).unwrap();
        assert!((s - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_value_sample() {
        let est = point_estimates(&[7.5]);
        assert_eq!(est.median, Some(7.5));
        assert_eq!(est.std, Some(0.0));
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(0.666, 2), 0.67);
        assert_eq!(round_to(-2.25, 1), -2.3);
        assert_eq!(round_opt(None, 2), None);
    }
}
