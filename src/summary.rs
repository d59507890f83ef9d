//! Normalization, mean acquisition orders, and the rank permutation.

use anyhow::{bail, Result};

use crate::ensemble::Accumulators;

/// Finalized run summary derived from the accumulated counts.
pub struct Summary {
    len: usize,
    /// `normalized[t*len + i]`: empirical probability that feature `i` is
    /// acquired at order position `t`.
    normalized: Vec<f64>,
    /// Expectation of the order position per feature, from the table.
    pub mean_order: Vec<f64>,
    /// Features sorted ascending by mean order; `rank[k]` is the feature at
    /// rank `k`. Ties keep original feature order (the sort is stable).
    pub rank: Vec<usize>,
}

impl Summary {
    pub fn features(&self) -> usize {
        self.len
    }

    pub fn probability(&self, step: usize, feature: usize) -> f64 {
        self.normalized[step * self.len + feature]
    }

    /// Mean order of the feature at rank `k`.
    pub fn ranked_mean(&self, k: usize) -> f64 {
        self.mean_order[self.rank[k]]
    }
}

pub fn summarize(acc: &Accumulators) -> Result<Summary> {
    let total = acc.total_trajectories();
    if total == 0 {
        bail!("no trajectories accumulated, nothing to summarize");
    }
    let len = acc.features();

    let mut normalized = vec![0.0; len * len];
    for t in 0..len {
        for i in 0..len {
            normalized[t * len + i] = acc.order_count(t, i) as f64 / total as f64;
        }
    }

    let mut mean_order = vec![0.0; len];
    for (i, mean) in mean_order.iter_mut().enumerate() {
        for t in 0..len {
            *mean += t as f64 * normalized[t * len + i];
        }
    }

    let mut rank: Vec<usize> = (0..len).collect();
    rank.sort_by(|&a, &b| mean_order[a].total_cmp(&mean_order[b]));

    Ok(Summary {
        len,
        normalized,
        mean_order,
        rank,
    })
}
