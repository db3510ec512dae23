//! Small descriptive-statistics helpers shared by the analytics modules.

use serde::{Deserialize, Serialize};

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1). `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile with linear interpolation between closest ranks.
/// `sorted` must be ascending; `q` in [0, 1].
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Five-number summary of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiveNumber {
    pub min:    f64,
    pub q1:     f64,
    pub median: f64,
    pub q3:     f64,
    pub max:    f64,
}

impl FiveNumber {
    pub fn of(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            min:    *sorted.first()?,
            q1:     quantile(&sorted, 0.25)?,
            median: quantile(&sorted, 0.50)?,
            q3:     quantile(&sorted, 0.75)?,
            max:    *sorted.last()?,
        })
    }
}

/// Group values by key, preserving first-appearance order of keys.
pub fn group_by<'a, T, K, V>(
    items: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&'a T) -> K,
    value: impl Fn(&'a T) -> V,
) -> Vec<(K, Vec<V>)>
where
    T: 'a,
    K: PartialEq,
{
    let mut groups: Vec<(K, Vec<V>)> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, values)) => values.push(value(item)),
            None => groups.push((k, vec![value(item)])),
        }
    }
    groups
}

/// Distinct values in first-appearance order.
pub fn distinct<'a, T: 'a, K: PartialEq>(
    items: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&'a T) -> K,
) -> Vec<K> {
    let mut out: Vec<K> = Vec::new();
    for item in items {
        let k = key(item);
        if !out.contains(&k) {
            out.push(k);
        }
    }
    out
}
