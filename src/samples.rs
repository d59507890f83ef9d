//! Posterior sample input: dimensionality detection, record streaming, and
//! dataset provenance.
//!
//! A posterior file is a whitespace-separated stream of floats; one record is
//! `len*(len+1)` consecutive tokens regardless of line breaks. The feature
//! count is recovered from the first line of the first file by solving
//! `tokens == n*(n+1)`. A trailing short record, or a non-numeric token, ends
//! that file's stream; the partial record is dropped, never half-read.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::model::ParamVector;

/// Provenance and quality record for one consumed posterior file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleManifest {
    pub path: String,
    pub hash_sha256: String,
    pub features: usize,
    pub records: u64,
    pub dropped_short_record: bool,
    pub bad_token: Option<String>,
    pub generated_at: String,
}

/// Detect the feature count from the token count of the file's first line.
pub fn detect_features(path: &Path, max_features: usize) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("couldn't open file {}", path.display()))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .with_context(|| format!("couldn't read {}", path.display()))?;

    let tokens = first_line.split_whitespace().count();
    if tokens == 0 {
        bail!("couldn't find appropriate samples in {}", path.display());
    }
    for n in 1..=max_features {
        if tokens == ParamVector::expected_tokens(n) {
            return Ok(n);
        }
    }
    bail!(
        "couldn't determine number of features from {} ({} tokens is not n*(n+1) for n <= {})",
        path.display(),
        tokens,
        max_features
    );
}

/// Streaming reader yielding one `ParamVector` per complete record.
pub struct SampleFile {
    path: String,
    features: usize,
    expected: usize,
    reader: BufReader<File>,
    pending: Vec<f64>,
    ready: VecDeque<ParamVector>,
    line: String,
    records: u64,
    dropped_short_record: bool,
    bad_token: Option<String>,
    done: bool,
}

impl SampleFile {
    pub fn open(path: &Path, features: usize) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("couldn't open file {}", path.display()))?;
        Ok(Self {
            path: path.display().to_string(),
            features,
            expected: ParamVector::expected_tokens(features),
            reader: BufReader::new(file),
            pending: Vec::new(),
            ready: VecDeque::new(),
            line: String::new(),
            records: 0,
            dropped_short_record: false,
            bad_token: None,
            done: false,
        })
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn dropped_short_record(&self) -> bool {
        self.dropped_short_record
    }

    pub fn bad_token(&self) -> Option<&str> {
        self.bad_token.as_deref()
    }

    /// Provenance record; meaningful once the stream is exhausted.
    pub fn manifest(&self) -> Result<SampleManifest> {
        Ok(SampleManifest {
            path: self.path.clone(),
            hash_sha256: file_sha256(Path::new(&self.path))?,
            features: self.features,
            records: self.records,
            dropped_short_record: self.dropped_short_record,
            bad_token: self.bad_token.clone(),
            generated_at: crate::logging::ts_now(),
        })
    }

    fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.dropped_short_record = true;
            self.pending.clear();
        }
        self.done = true;
    }
}

impl Iterator for SampleFile {
    type Item = ParamVector;

    fn next(&mut self) -> Option<ParamVector> {
        loop {
            if let Some(params) = self.ready.pop_front() {
                return Some(params);
            }
            if self.done {
                return None;
            }
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) | Err(_) => {
                    self.finish();
                    continue;
                }
                Ok(_) => {}
            }
            for token in self.line.split_whitespace() {
                match token.parse::<f64>() {
                    Ok(value) => self.pending.push(value),
                    Err(_) => {
                        // Treated as end-of-input for this file; whatever is
                        // buffered is an incomplete record and is dropped,
                        // but records completed earlier still flow out.
                        self.bad_token = Some(token.to_string());
                        self.finish();
                        break;
                    }
                }
                if self.pending.len() == self.expected {
                    let values = std::mem::take(&mut self.pending);
                    if let Ok(params) = ParamVector::new(self.features, values) {
                        self.records += 1;
                        self.ready.push_back(params);
                    }
                }
            }
        }
    }
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("couldn't open file {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn sample_line(len: usize, value: f64) -> String {
        let tokens: Vec<String> = (0..ParamVector::expected_tokens(len))
            .map(|_| format!("{:.3}", value))
            .collect();
        tokens.join(" ")
    }

    #[test]
    fn test_detect_features_from_token_count() {
        // 2*(2+1) = 6 tokens -> 2 features
        let f = write_temp(&format!("{}\n", sample_line(2, 0.5)));
        assert_eq!(detect_features(f.path(), 200).unwrap(), 2);

        // 3*(3+1) = 12 tokens -> 3 features
        let f = write_temp(&format!("{}\n", sample_line(3, 0.5)));
        assert_eq!(detect_features(f.path(), 200).unwrap(), 3);
    }

    #[test]
    fn test_detect_features_rejects_bad_shapes() {
        let f = write_temp("1.0 2.0 3.0 4.0 5.0\n");
        assert!(detect_features(f.path(), 200).is_err());

        let f = write_temp("");
        assert!(detect_features(f.path(), 200).is_err());
    }

    #[test]
    fn test_detect_features_respects_max() {
        let f = write_temp(&format!("{}\n", sample_line(3, 0.1)));
        assert!(detect_features(f.path(), 2).is_err());
    }

    #[test]
    fn test_stream_yields_all_records() {
        let body = format!("{}\n{}\n{}\n", sample_line(2, 0.1), sample_line(2, 0.2), sample_line(2, 0.3));
        let f = write_temp(&body);
        let mut stream = SampleFile::open(f.path(), 2).unwrap();
        let samples: Vec<_> = stream.by_ref().collect();
        assert_eq!(samples.len(), 3);
        assert_eq!(stream.records(), 3);
        assert!(!stream.dropped_short_record());
        assert!(stream.bad_token().is_none());
        assert!((samples[1].base(0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_record_may_span_lines() {
        // 6 tokens split across three lines still form one record.
        let f = write_temp("0.1 0.2\n0.3 0.4\n0.5 0.6\n");
        let mut stream = SampleFile::open(f.path(), 2).unwrap();
        let samples: Vec<_> = stream.by_ref().collect();
        assert_eq!(samples.len(), 1);
        assert!((samples[0].modifier(1, 1) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_two_records_on_one_line() {
        let body = format!("{} {}\n", sample_line(2, 0.1), sample_line(2, 0.2));
        let f = write_temp(&body);
        let mut stream = SampleFile::open(f.path(), 2).unwrap();
        let samples: Vec<_> = stream.by_ref().collect();
        assert_eq!(samples.len(), 2);
        assert!((samples[0].base(0) - 0.1).abs() < 1e-12);
        assert!((samples[1].base(0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_short_final_record_dropped() {
        let body = format!("{}\n0.1 0.2 0.3\n", sample_line(2, 0.5));
        let f = write_temp(&body);
        let mut stream = SampleFile::open(f.path(), 2).unwrap();
        let samples: Vec<_> = stream.by_ref().collect();
        assert_eq!(samples.len(), 1);
        assert!(stream.dropped_short_record());
    }

    #[test]
    fn test_bad_token_ends_file() {
        let body = format!("{}\n0.1 oops 0.3 0.4 0.5 0.6\n{}\n", sample_line(2, 0.5), sample_line(2, 0.7));
        let f = write_temp(&body);
        let mut stream = SampleFile::open(f.path(), 2).unwrap();
        let samples: Vec<_> = stream.by_ref().collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(stream.bad_token(), Some("oops"));
    }

    #[test]
    fn test_sha256_reproducible() {
        let f = write_temp("0.1 0.2 0.3\n");
        let h1 = file_sha256(f.path()).unwrap();
        let h2 = file_sha256(f.path()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_manifest_carries_quality_fields() {
        let body = format!("{}\n0.9\n", sample_line(2, 0.5));
        let f = write_temp(&body);
        let mut stream = SampleFile::open(f.path(), 2).unwrap();
        let _: Vec<_> = stream.by_ref().collect();
        let manifest = stream.manifest().unwrap();
        assert_eq!(manifest.records, 1);
        assert!(manifest.dropped_short_record);
        assert_eq!(manifest.features, 2);
        assert_eq!(manifest.hash_sha256.len(), 64);
    }
}
