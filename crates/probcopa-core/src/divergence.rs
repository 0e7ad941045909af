//! Earth-mover (1-Wasserstein) distance between two empirical samples.

use crate::entropy::MIN_SAMPLE;

/// 1-Wasserstein distance between the empirical distributions of `candidate`
/// and `reference`.
///
/// Computed as `∫ |F_c(x) − F_r(x)| dx` over the merged, sorted support. No
/// jitter is applied. Returns `None` if either side has fewer than
/// [`MIN_SAMPLE`] values.
pub fn wasserstein_distance(candidate: &[f64], reference: &[f64]) -> Option<f64> {
    if candidate.len() < MIN_SAMPLE || reference.len() < MIN_SAMPLE {
        return None;
    }

    let c = sorted(candidate);
    let r = sorted(reference);
    let mut support: Vec<f64> = c.iter().chain(&r).copied().collect();
    support.sort_by(|a, b| a.total_cmp(b));

    let nc = c.len() as f64;
    let nr = r.len() as f64;
    let mut distance = 0.0;
    for pair in support.windows(2) {
        let (x, next) = (pair[0], pair[1]);
        let width = next - x;
        if width == 0.0 {
            continue;
        }
        let fc = ecdf_count(&c, x) as f64 / nc;
        let fr = ecdf_count(&r, x) as f64 / nr;
        distance += (fc - fr).abs() * width;
    }
    Some(distance)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Number of values `<= x` in a sorted slice.
fn ecdf_count(sorted: &[f64], x: f64) -> usize {
    sorted.partition_point(|&v| v <= x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_samples_are_absent() {
        assert_eq!(wasserstein_distance(&[1.0], &[1.0, 2.0]), None);
        assert_eq!(wasserstein_distance(&[1.0, 2.0], &[]), None);
        assert_eq!(wasserstein_distance(&[], &[]), None);
    }

    #[test]
    fn identical_samples_have_zero_distance() {
        let a = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(wasserstein_distance(&a, &a), Some(0.0));
    }

    #[test]
    fn point_mass_against_spread() {
        let d = wasserstein_distance(&[2.0, 2.0, 2.0], &[2.0, 3.0, 4.0]).unwrap();
        assert!((d - 1.0).abs() < 1e-12, "d = {d}");
    }

    #[test]
    fn shift_equals_offset() {
        let a = [0.0, 1.0, 2.0, 3.0];
        let b: Vec<f64> = a.iter().map(|x| x + 5.0).collect();
        let d = wasserstein_distance(&a, &b).unwrap();
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn symmetric_and_order_free() {
        let a = [3.0, 1.0, 2.0];
        let b = [10.0, 0.0, 7.0, 4.0];
        let ab = wasserstein_distance(&a, &b).unwrap();
        let ba = wasserstein_distance(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-12);
        let a_sorted = [1.0, 2.0, 3.0];
        assert_eq!(wasserstein_distance(&a_sorted, &b), Some(ab));
    }

    #[test]
    fn unequal_sizes() {
        // F_a jumps 0 -> 1 at 0; F_b is 0.5 on [0, 1): area 0.5.
        let d = wasserstein_distance(&[0.0, 0.0], &[0.0, 1.0, 0.0, 1.0]).unwrap();
        assert!((d - 0.5).abs() < 1e-12);
    }
}
