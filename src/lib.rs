//! Posterior trajectory analysis for hypercube acquisition models.
//!
//! Consumes posterior samples of an L-feature hypercube transition model
//! (one parameter vector per sample, length L*(L+1)), simulates ensembles of
//! continuous-time acquisition trajectories per sample, and aggregates them
//! into order-probability tables, acquisition-time histograms, and a
//! mean-order feature ranking.

pub mod config;
pub mod ensemble;
pub mod logging;
pub mod model;
pub mod report;
pub mod samples;
pub mod simulate;
pub mod summary;
