//! Continuous-time trajectory simulation on the feature hypercube.
//!
//! One trajectory is a Gillespie walk from the empty feature set to the full
//! set: exponential waiting times from the total exit rate, next feature by
//! roulette-wheel selection over normalized rates. Features are only ever
//! gained, one per event, so a trajectory has exactly `len` events and its
//! acquisition order is a permutation of `0..len`.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::Rng;

use crate::model::{fill_rates, ParamVector};

/// One acquisition event within a trajectory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Event {
    /// Feature acquired by this event.
    pub feature: usize,
    /// Order position: 0 for the first acquisition.
    pub step: usize,
    /// Continuous time since trajectory start.
    pub elapsed: f64,
    /// Total exit rate of the state the event fired from.
    pub exit_rate: f64,
}

/// Trajectory simulator with reusable per-step scratch buffers.
pub struct Simulator {
    len: usize,
    state: Vec<bool>,
    rates: Vec<f64>,
}

impl Simulator {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            state: vec![false; len],
            rates: vec![0.0; len],
        }
    }

    pub fn features(&self) -> usize {
        self.len
    }

    /// Simulate one trajectory to full acquisition, appending exactly
    /// `len` events to `out` in acquisition order.
    ///
    /// Fails if the parameter vector is for a different feature count, or if
    /// the total rate ever fails to be strictly positive (excluded by
    /// construction for finite parameters, but defended explicitly).
    pub fn run(
        &mut self,
        params: &ParamVector,
        rng: &mut StdRng,
        out: &mut Vec<Event>,
    ) -> Result<()> {
        if params.features() != self.len {
            bail!(
                "parameter vector is for {} features, simulator expects {}",
                params.features(),
                self.len
            );
        }

        self.state.fill(false);
        let mut elapsed = 0.0;

        for step in 0..self.len {
            fill_rates(&self.state, params, &mut self.rates);
            let total_rate: f64 = self.rates.iter().sum();
            if !(total_rate > 0.0) {
                bail!("total rate {} not strictly positive at step {}", total_rate, step);
            }

            elapsed += -draw_open01(rng).ln() / total_rate;

            let feature = self.select_feature(total_rate, draw_open01(rng));
            self.state[feature] = true;
            out.push(Event {
                feature,
                step,
                elapsed,
                exit_rate: total_rate,
            });
        }

        Ok(())
    }

    /// Roulette-wheel selection: smallest index whose cumulative normalized
    /// rate strictly exceeds `r`. If rounding lets the scan fall through, the
    /// highest-index feature with positive rate is taken, so an acquired
    /// (zero-rate) feature can never be selected twice.
    fn select_feature(&self, total_rate: f64, r: f64) -> usize {
        let mut cumulative = 0.0;
        let mut fallback = 0;
        for (i, &rate) in self.rates.iter().enumerate() {
            if rate > 0.0 {
                fallback = i;
            }
            cumulative += rate / total_rate;
            if cumulative > r {
                return i;
            }
        }
        fallback
    }
}

/// Uniform draw on the open interval (0, 1); zero is rejected so the
/// exponential waiting time -ln(u)/rate stays finite.
fn draw_open01(rng: &mut StdRng) -> f64 {
    loop {
        let u: f64 = rng.gen();
        if u > 0.0 {
            return u;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn uniform_params(len: usize) -> ParamVector {
        ParamVector::new(len, vec![0.0; len * (len + 1)]).unwrap()
    }

    #[test]
    fn test_trajectory_is_a_permutation() {
        let len = 6;
        let params = uniform_params(len);
        let mut sim = Simulator::new(len);
        let mut rng = StdRng::seed_from_u64(42);
        let mut events = Vec::new();

        for _ in 0..50 {
            events.clear();
            sim.run(&params, &mut rng, &mut events).unwrap();
            assert_eq!(events.len(), len);
            let mut seen = vec![false; len];
            for (t, ev) in events.iter().enumerate() {
                assert_eq!(ev.step, t);
                assert!(!seen[ev.feature], "feature {} acquired twice", ev.feature);
                seen[ev.feature] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn test_elapsed_time_strictly_increasing() {
        let len = 5;
        let params = uniform_params(len);
        let mut sim = Simulator::new(len);
        let mut rng = StdRng::seed_from_u64(7);
        let mut events = Vec::new();
        sim.run(&params, &mut rng, &mut events).unwrap();

        let mut prev = 0.0;
        for ev in &events {
            assert!(ev.elapsed > prev, "waiting time not strictly positive");
            prev = ev.elapsed;
        }
    }

    #[test]
    fn test_exit_rate_recorded_per_step() {
        // With all log-rates zero, the exit rate at step t is the number of
        // unacquired features: len - t.
        let len = 4;
        let params = uniform_params(len);
        let mut sim = Simulator::new(len);
        let mut rng = StdRng::seed_from_u64(3);
        let mut events = Vec::new();
        sim.run(&params, &mut rng, &mut events).unwrap();

        for (t, ev) in events.iter().enumerate() {
            assert!((ev.exit_rate - (len - t) as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_dominant_rate_goes_first() {
        // Feature 0 fires ~e^20 faster than feature 1.
        let params = ParamVector::new(2, vec![10.0, -10.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let mut sim = Simulator::new(2);
        let mut rng = StdRng::seed_from_u64(11);
        let mut events = Vec::new();
        for _ in 0..200 {
            events.clear();
            sim.run(&params, &mut rng, &mut events).unwrap();
            assert_eq!(events[0].feature, 0);
            assert_eq!(events[1].feature, 1);
        }
    }

    #[test]
    fn test_mismatched_params_rejected() {
        let params = uniform_params(3);
        let mut sim = Simulator::new(2);
        let mut rng = StdRng::seed_from_u64(0);
        let mut events = Vec::new();
        assert!(sim.run(&params, &mut rng, &mut events).is_err());
    }

    #[test]
    fn test_reproducible_with_same_seed() {
        let len = 5;
        let params = uniform_params(len);
        let mut sim = Simulator::new(len);

        let mut a = Vec::new();
        let mut rng = StdRng::seed_from_u64(99);
        sim.run(&params, &mut rng, &mut a).unwrap();

        let mut b = Vec::new();
        let mut rng = StdRng::seed_from_u64(99);
        sim.run(&params, &mut rng, &mut b).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_select_feature_fallback_skips_acquired() {
        let params = uniform_params(3);
        let mut sim = Simulator::new(3);
        sim.state = vec![false, false, true];
        fill_rates(&sim.state, &params, &mut sim.rates);
        let total: f64 = sim.rates.iter().sum();
        // r = 1.0 cannot come from a real draw, but rounding in the
        // cumulative sum can produce the same fall-through; the fallback must
        // be feature 1, not the zero-rate feature 2.
        let chosen = sim.select_feature(total, 1.0);
        assert_eq!(chosen, 1);
    }
}
