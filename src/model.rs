//! Hypercube transition model: one posterior sample's parameter vector and
//! the state-dependent acquisition rates it induces.
//!
//! A sample for `len` features carries `len` base log-rates followed by a
//! `len x len` interaction matrix in row-major order: entry `(j, i)` is the
//! additive log-rate modifier feature `j` contributes to feature `i` once
//! `j` has been acquired.

use anyhow::{bail, Result};

/// One posterior sample: `len*(len+1)` floats, immutable once constructed.
#[derive(Clone, Debug)]
pub struct ParamVector {
    len: usize,
    values: Vec<f64>,
}

impl ParamVector {
    /// Number of tokens a sample for `len` features must carry.
    pub fn expected_tokens(len: usize) -> usize {
        len * (len + 1)
    }

    pub fn new(len: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != Self::expected_tokens(len) {
            bail!(
                "parameter vector has {} values, expected {} for {} features",
                values.len(),
                Self::expected_tokens(len),
                len
            );
        }
        Ok(Self { len, values })
    }

    pub fn features(&self) -> usize {
        self.len
    }

    /// Base log-rate of feature `i`.
    pub fn base(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Log-rate modifier contributed to feature `i` by an acquired feature `j`.
    pub fn modifier(&self, j: usize, i: usize) -> f64 {
        self.values[self.len + j * self.len + i]
    }
}

/// Fill `rates` with the instantaneous acquisition rate of every feature
/// given the current acquired set. Acquired features get rate 0 so they can
/// never re-fire and never contribute to the total exit rate.
pub fn fill_rates(state: &[bool], params: &ParamVector, rates: &mut [f64]) {
    let len = params.features();
    debug_assert_eq!(state.len(), len);
    debug_assert_eq!(rates.len(), len);
    for i in 0..len {
        if state[i] {
            rates[i] = 0.0;
            continue;
        }
        let mut log_rate = params.base(i);
        for j in 0..len {
            if state[j] {
                log_rate += params.modifier(j, i);
            }
        }
        rates[i] = log_rate.exp();
    }
}
