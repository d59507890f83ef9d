//! Ensemble aggregation across simulated trajectories and posterior samples.
//!
//! For each posterior sample the simulator runs `batches_per_sample` batches
//! of `traj_per_batch` trajectories. Order counts and time histograms grow
//! monotonically across the whole run; per-batch mean acquisition orders are
//! folded into a grand running sum, kept separate from the order table as a
//! consistency cross-check on the final summary.

use anyhow::Result;
use rand::rngs::StdRng;

use crate::config::Config;
use crate::model::ParamVector;
use crate::simulate::{Event, Simulator};

/// Diagnostic record of one batch's first trajectory: acquisition order,
/// per-step total exit rate, per-step elapsed time.
#[derive(Clone, Debug)]
pub struct RouteRecord {
    pub route: Vec<usize>,
    pub betas: Vec<f64>,
    pub times: Vec<f64>,
}

impl RouteRecord {
    fn from_events(events: &[Event]) -> Self {
        Self {
            route: events.iter().map(|e| e.feature).collect(),
            betas: events.iter().map(|e| e.exit_rate).collect(),
            times: events.iter().map(|e| e.elapsed).collect(),
        }
    }
}

/// Running totals for the whole run, created once and finalized once.
pub struct Accumulators {
    len: usize,
    hist_ceiling: usize,
    time_scale: f64,
    /// `order_counts[t*len + i]`: trajectories acquiring feature `i` at step `t`.
    order_counts: Vec<u64>,
    /// Grand sum of per-batch mean acquisition orders, per feature.
    mean_order_sum: Vec<f64>,
    /// `time_hist[i*ceiling + bucket]`: acquisitions of feature `i` in that
    /// time bucket; the final bucket saturates.
    time_hist: Vec<u64>,
    batches: u64,
    trajectories: u64,
}

impl Accumulators {
    pub fn new(len: usize, hist_ceiling: usize, time_scale: f64) -> Self {
        Self {
            len,
            hist_ceiling,
            time_scale,
            order_counts: vec![0; len * len],
            mean_order_sum: vec![0.0; len],
            time_hist: vec![0; len * hist_ceiling],
            batches: 0,
            trajectories: 0,
        }
    }

    pub fn features(&self) -> usize {
        self.len
    }

    pub fn hist_ceiling(&self) -> usize {
        self.hist_ceiling
    }

    /// Total trajectories recorded so far; the denominator for every
    /// probability in the final summary.
    pub fn total_trajectories(&self) -> u64 {
        self.trajectories
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn order_count(&self, step: usize, feature: usize) -> u64 {
        self.order_counts[step * self.len + feature]
    }

    pub fn hist_count(&self, feature: usize, bucket: usize) -> u64 {
        self.time_hist[feature * self.hist_ceiling + bucket]
    }

    /// Mean acquisition order per feature from the running batch sums
    /// (the denominator is the number of batches, since each batch
    /// contributes one mean).
    pub fn running_mean_order(&self) -> Vec<f64> {
        self.mean_order_sum
            .iter()
            .map(|s| if self.batches > 0 { s / self.batches as f64 } else { 0.0 })
            .collect()
    }

    fn record_event(&mut self, ev: &Event, batch_mean: &mut [f64]) {
        self.order_counts[ev.step * self.len + ev.feature] += 1;
        batch_mean[ev.feature] += ev.step as f64;
        let bucket = time_bucket(ev.elapsed, self.time_scale, self.hist_ceiling);
        self.time_hist[ev.feature * self.hist_ceiling + bucket] += 1;
    }
}

/// Clamp-then-floor bucket index for a continuous acquisition time. Times at
/// or beyond the ceiling, and non-finite values, land in the saturating
/// final bucket; the index never goes below zero.
pub fn time_bucket(elapsed: f64, time_scale: f64, ceiling: usize) -> usize {
    let scaled = elapsed * time_scale;
    if !scaled.is_finite() || scaled >= ceiling as f64 {
        ceiling - 1
    } else if scaled <= 0.0 {
        0
    } else {
        scaled as usize
    }
}

/// Simulate all batches for one posterior sample, folding every trajectory
/// into `acc`. Returns one diagnostic route per batch.
pub fn accumulate_sample(
    params: &ParamVector,
    cfg: &Config,
    sim: &mut Simulator,
    rng: &mut StdRng,
    acc: &mut Accumulators,
) -> Result<Vec<RouteRecord>> {
    let len = acc.features();
    let mut routes = Vec::with_capacity(cfg.batches_per_sample as usize);
    let mut events: Vec<Event> = Vec::with_capacity(len);
    let mut batch_mean = vec![0.0; len];

    for _ in 0..cfg.batches_per_sample {
        batch_mean.fill(0.0);
        for traj in 0..cfg.traj_per_batch {
            events.clear();
            sim.run(params, rng, &mut events)?;
            for ev in &events {
                acc.record_event(ev, &mut batch_mean);
            }
            if traj == 0 {
                routes.push(RouteRecord::from_events(&events));
            }
            acc.trajectories += 1;
        }
        for (sum, mean) in acc.mean_order_sum.iter_mut().zip(&batch_mean) {
            *sum += mean / cfg.traj_per_batch as f64;
        }
        acc.batches += 1;
    }

    Ok(routes)
}
