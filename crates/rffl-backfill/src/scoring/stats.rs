// Mean and sample standard deviation over score buckets.

use serde::Serialize;

use crate::scoring::index::ScoreEntry;

/// Stdev substituted for an era bucket with fewer than two samples.
pub const ERA_STDEV_FALLBACK: f64 = 50.0;

/// Stdev substituted for a team bucket with fewer than two samples.
pub const TEAM_STDEV_FALLBACK: f64 = 75.0;

/// Mean and standard deviation for one statistic over a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    /// Sample (N - 1) standard deviation; `None` below two samples.
    pub stdev: Option<f64>,
}

impl SampleStats {
    pub fn stdev_or(&self, fallback: f64) -> f64 {
        self.stdev.unwrap_or(fallback)
    }
}

/// Returns `None` for an empty slice.
pub fn compute_sample_stats(values: &[f64]) -> Option<SampleStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let stdev = if values.len() > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(variance.sqrt())
    } else {
        None
    };
    Some(SampleStats {
        count: values.len(),
        mean,
        stdev,
    })
}

/// PF and PA statistics for the same bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreStats {
    pub pf: SampleStats,
    pub pa: SampleStats,
}

pub fn score_stats(entries: &[ScoreEntry]) -> Option<ScoreStats> {
    let pf: Vec<f64> = entries.iter().map(|e| e.pf).collect();
    let pa: Vec<f64> = entries.iter().map(|e| e.pa).collect();
    Some(ScoreStats {
        pf: compute_sample_stats(&pf)?,
        pa: compute_sample_stats(&pa)?,
    })
}
