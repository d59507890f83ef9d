//! Posterior trajectory analyzer CLI.
//!
//! Usage: `hyperpaths [--verbose] <posterior-file> [more files...]`
//!
//! The feature count is auto-detected from the first line of the first file;
//! all files are processed in sequence with one shared RNG, so a fixed SEED
//! reproduces the aggregated output exactly.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use hyperpaths::config::Config;
use hyperpaths::ensemble::{accumulate_sample, Accumulators};
use hyperpaths::logging::{log, obj, v_num, v_str, Level};
use hyperpaths::report::{self, VerboseWriters};
use hyperpaths::samples::{detect_features, SampleFile};
use hyperpaths::simulate::Simulator;
use hyperpaths::summary::summarize;

fn main() -> Result<()> {
    let mut verbose = false;
    let mut files: Vec<PathBuf> = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            _ => files.push(PathBuf::from(arg)),
        }
    }
    if files.is_empty() {
        eprintln!("Usage:\n hyperpaths [--verbose] [posterior sample file(s)]");
        std::process::exit(2);
    }

    let cfg = Config::from_env();
    let len = detect_features(&files[0], cfg.max_features)?;
    log(
        Level::Info,
        "run_start",
        obj(&[
            ("first_file", v_str(&files[0].display().to_string())),
            ("features", v_num(len as f64)),
            ("files", v_num(files.len() as f64)),
            ("config_hash", v_str(&cfg.config_hash())),
            ("seed", v_num(cfg.rng_seed() as f64)),
        ]),
    );

    let mut rng = StdRng::seed_from_u64(cfg.rng_seed());
    let mut sim = Simulator::new(len);
    let mut acc = Accumulators::new(len, cfg.hist_ceiling, cfg.time_scale);
    let mut writers = if verbose {
        Some(VerboseWriters::open(&files[0])?)
    } else {
        None
    };

    for path in &files {
        let mut stream = SampleFile::open(path, len)?;
        while let Some(params) = stream.next() {
            let routes = accumulate_sample(&params, &cfg, &mut sim, &mut rng, &mut acc)?;
            if let Some(w) = writers.as_mut() {
                for rec in &routes {
                    w.record(rec)?;
                }
            }
        }
        if let Some(token) = stream.bad_token() {
            log(
                Level::Warn,
                "bad_token",
                obj(&[
                    ("file", v_str(&path.display().to_string())),
                    ("token", v_str(token)),
                    ("records_kept", v_num(stream.records() as f64)),
                ]),
            );
        }
        if stream.dropped_short_record() {
            log(
                Level::Warn,
                "short_record_dropped",
                obj(&[("file", v_str(&path.display().to_string()))]),
            );
        }
        if stream.records() == 0 {
            bail!("no complete samples in {}", path.display());
        }
        let manifest = stream.manifest()?;
        log(
            Level::Info,
            "file_done",
            obj(&[
                ("file", v_str(&manifest.path)),
                ("records", v_num(manifest.records as f64)),
                ("sha256", v_str(&manifest.hash_sha256)),
            ]),
        );
    }
    if let Some(w) = writers.as_mut() {
        w.flush()?;
    }

    let summary = summarize(&acc)?;

    // Per-feature mean acquisition order from the batch running sums; the
    // table-derived means land in the .process annotations.
    for (i, mean) in acc.running_mean_order().iter().enumerate() {
        println!("{} {:.6}", i, mean);
    }

    let labels = report::feature_labels(len);
    let order_path = report::write_order_table(&files[0], &summary, &labels)?;
    let (hist_path, mean_buckets) = report::write_time_histograms(&files[0], &acc)?;

    // Per-feature mean scaled acquisition time (histogram bucket units).
    for (i, mean) in mean_buckets.iter().enumerate() {
        println!("{} {:.4}", i, mean);
    }

    log(
        Level::Info,
        "run_done",
        obj(&[
            ("trajectories", v_num(acc.total_trajectories() as f64)),
            ("order_table", v_str(&order_path.display().to_string())),
            ("time_histograms", v_str(&hist_path.display().to_string())),
        ]),
    );
    Ok(())
}
