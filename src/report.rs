//! Output artifacts: the order-probability table, the per-feature time
//! histograms, and the verbose per-batch route streams.
//!
//! File names extend the first input path, so `samples.txt` produces
//! `samples.txt.process` and `samples.txt.ctrec.process`, matching what
//! downstream gnuplot scripts already expect.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::ensemble::{Accumulators, RouteRecord};
use crate::summary::Summary;

/// Ordinal labels for features. Adapt here for study-specific naming.
pub fn feature_labels(len: usize) -> Vec<String> {
    (0..len).map(|i| format!("feature_{}", i)).collect()
}

fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", base.display(), suffix))
}

/// Write the acquisition-probability heatmap `<base>.process`: one row per
/// (order position, ranked feature), then gnuplot axis annotations for both
/// the ranked and the original feature orderings.
pub fn write_order_table(base: &Path, summary: &Summary, labels: &[String]) -> Result<PathBuf> {
    let path = suffixed(base, ".process");
    let file = File::create(&path)
        .with_context(|| format!("couldn't create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    let len = summary.features();

    for t in 0..len {
        for k in 0..len {
            let feature = summary.rank[k];
            writeln!(
                w,
                "{} {} {} {} {:.15}",
                t,
                k,
                feature,
                labels[feature],
                summary.probability(t, feature)
            )?;
        }
        writeln!(w)?;
    }

    write!(w, "# set xtics (")?;
    for (k, &feature) in summary.rank.iter().enumerate() {
        let sep = if k == len - 1 { ')' } else { ',' };
        write!(w, "\"{}\" {}{}", labels[feature], k, sep)?;
    }
    writeln!(w)?;

    write!(w, "# default-order set xtics (")?;
    for (i, label) in labels.iter().enumerate() {
        let sep = if i == len - 1 { ')' } else { ',' };
        write!(w, "\"{}\" {}{}", label, i, sep)?;
    }
    writeln!(w)?;

    write!(w, "# (")?;
    for &feature in &summary.rank {
        write!(w, "{}, ", feature)?;
    }
    writeln!(w, ")")?;

    write!(w, "# ")?;
    for (k, &feature) in summary.rank.iter().enumerate() {
        write!(w, "{} {:.4}, ", labels[feature], summary.ranked_mean(k))?;
    }
    writeln!(w, ")")?;

    w.flush()?;
    Ok(path)
}

/// Write the per-feature acquisition-time histograms
/// `<base>.ctrec.process` and return each feature's mean bucket index
/// (the scaled mean acquisition time).
pub fn write_time_histograms(base: &Path, acc: &Accumulators) -> Result<(PathBuf, Vec<f64>)> {
    let path = suffixed(base, ".ctrec.process");
    let file = File::create(&path)
        .with_context(|| format!("couldn't create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    let len = acc.features();
    let total = acc.total_trajectories() as f64;
    let mut mean_buckets = vec![0.0; len];

    for i in 0..len {
        let mut weighted = 0.0;
        for bucket in 0..acc.hist_ceiling() {
            let count = acc.hist_count(i, bucket);
            writeln!(w, "{} {} {:.6}", i, bucket, count as f64 / total)?;
            weighted += (bucket as u64 * count) as f64;
        }
        writeln!(w)?;
        mean_buckets[i] = weighted / total;
    }

    w.flush()?;
    Ok((path, mean_buckets))
}

/// Three parallel verbose streams, one line per recorded batch route.
pub struct VerboseWriters {
    routes: BufWriter<File>,
    betas: BufWriter<File>,
    times: BufWriter<File>,
}

impl VerboseWriters {
    pub fn open(base: &Path) -> Result<Self> {
        let open = |suffix: &str| -> Result<BufWriter<File>> {
            let path = suffixed(base, suffix);
            let file = File::create(&path)
                .with_context(|| format!("couldn't create {}", path.display()))?;
            Ok(BufWriter::new(file))
        };
        Ok(Self {
            routes: open("-routes.txt")?,
            betas: open("-betas.txt")?,
            times: open("-times.txt")?,
        })
    }

    pub fn record(&mut self, rec: &RouteRecord) -> Result<()> {
        for feature in &rec.route {
            write!(self.routes, "{} ", feature)?;
        }
        writeln!(self.routes)?;
        for beta in &rec.betas {
            write!(self.betas, "{:.15} ", beta)?;
        }
        writeln!(self.betas)?;
        for time in &rec.times {
            write!(self.times, "{:.3} ", time)?;
        }
        writeln!(self.times)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.routes.flush()?;
        self.betas.flush()?;
        self.times.flush()?;
        Ok(())
    }
}
