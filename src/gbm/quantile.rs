//! Weighted stratified quantile service (spec.md §6), used by the
//! Laplace/Quantile/Huber leaf-fit paths (spec.md §4.5).

use std::collections::HashMap;

/// `stratified_quantile(values, weights, strata, q) -> map[stratum -> q-quantile]`,
/// computed independently per stratum with linear interpolation between the
/// two weighted order statistics straddling the target weight.
pub fn stratified_quantile(
    values: &[f64],
    weights: &[f64],
    strata: &[usize],
    q: f64,
) -> HashMap<usize, f64> {
    assert_eq!(values.len(), weights.len());
    assert_eq!(values.len(), strata.len());

    let mut by_stratum: HashMap<usize, Vec<(f64, f64)>> = HashMap::new();
    for i in 0..values.len() {
        by_stratum
            .entry(strata[i])
            .or_default()
            .push((values[i], weights[i]));
    }

    let mut result = HashMap::with_capacity(by_stratum.len());
    for (stratum, mut pairs) in by_stratum {
        result.insert(stratum, weighted_quantile(&mut pairs, q));
    }
    result
}

/// Weighted median, the `q = 0.5` special case used by the Laplace family
/// and the Huber two-step fit.
pub fn weighted_median(values: &[f64], weights: &[f64], strata: &[usize]) -> HashMap<usize, f64> {
    stratified_quantile(values, weights, strata, 0.5)
}

fn weighted_quantile(pairs: &mut [(f64, f64)], q: f64) -> f64 {
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    let total: f64 = pairs.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return pairs.first().map(|(v, _)| *v).unwrap_or(0.0);
    }
    let target = q * total;
    let mut cumulative = 0.0;
    for i in 0..pairs.len() {
        let (value, weight) = pairs[i];
        let next_cumulative = cumulative + weight;
        if next_cumulative >= target || i == pairs.len() - 1 {
            if i == 0 {
                return value;
            }
            let (prev_value, _) = pairs[i - 1];
            // Linear interpolation between the two order statistics
            // straddling `target`.
            let span = next_cumulative - cumulative;
            let frac = if span > 0.0 {
                (target - cumulative) / span
            } else {
                0.0
            };
            return prev_value + frac.clamp(0.0, 1.0) * (value - prev_value);
        }
        cumulative = next_cumulative;
    }
    pairs.last().map(|(v, _)| *v).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_uniformly_weighted_odd_count_is_the_middle_value() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let weights = vec![1.0; 5];
        let strata = vec![0; 5];
        let q = weighted_median(&values, &weights, &strata);
        assert!((q[&0] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn strata_are_computed_independently() {
        let values = vec![1.0, 2.0, 10.0, 20.0];
        let weights = vec![1.0, 1.0, 1.0, 1.0];
        let strata = vec![0, 0, 1, 1];
        let q = stratified_quantile(&values, &weights, &strata, 0.5);
        assert!(q[&0] >= 1.0 && q[&0] <= 2.0);
        assert!(q[&1] >= 10.0 && q[&1] <= 20.0);
    }

    #[test]
    fn heavier_weight_pulls_the_quantile_toward_it() {
        let values = vec![0.0, 10.0];
        let weights = vec![9.0, 1.0];
        let strata = vec![0, 0];
        let q = stratified_quantile(&values, &weights, &strata, 0.5);
        assert!(q[&0] < 5.0, "heavy low-weight mass should pull the median down, got {}", q[&0]);
    }

    #[test]
    fn empty_weight_falls_back_to_first_value() {
        let values = vec![7.0];
        let weights = vec![0.0];
        let strata = vec![0];
        let q = stratified_quantile(&values, &weights, &strata, 0.5);
        assert_eq!(q[&0], 7.0);
    }
}
