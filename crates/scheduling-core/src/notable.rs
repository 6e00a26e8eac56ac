//! Notable-timestamp cleanup and the energy-peak join.

use reelsmith_timeline_model::NotableTimestamp;

/// Default minimum spacing between retained timestamps.
pub const MIN_SPACING_SECS: f64 = 60.0;

/// Reason attached to peaks that match no analysis timestamp.
pub const PEAK_REASON: &str = "audio energy peak";

/// Default half-width of the peak/analysis proximity window.
pub const PEAK_WINDOW_SECS: f64 = 10.0;

/// Sort ascending and drop any timestamp closer than `min_spacing_secs` to
/// the last retained one. The earliest of each cluster survives.
pub fn dedupe_timestamps(timestamps: &[f64], min_spacing_secs: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = timestamps.iter().copied().filter(|t| t.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut kept: Vec<f64> = Vec::with_capacity(sorted.len());
    for t in sorted {
        match kept.last() {
            Some(&last) if t - last < min_spacing_secs => {}
            _ => kept.push(t),
        }
    }
    kept
}

/// `n - window <= p <= n + window`.
pub fn within_window(peak_secs: f64, notable_secs: f64, window_secs: f64) -> bool {
    notable_secs - window_secs <= peak_secs && peak_secs <= notable_secs + window_secs
}

/// An energy peak and the analysis timestamp it landed near, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakMatch {
    pub peak_secs: f64,
    pub matched: Option<NotableTimestamp>,
}

/// Pair each peak with the first analysis timestamp inside its window.
pub fn join_peaks(peaks: &[f64], notable: &[NotableTimestamp], window_secs: f64) -> Vec<PeakMatch> {
    peaks
        .iter()
        .map(|&peak_secs| PeakMatch {
            peak_secs,
            matched: notable
                .iter()
                .find(|n| within_window(peak_secs, n.seconds, window_secs))
                .cloned(),
        })
        .collect()
}

/// Analysis timestamps plus every peak not already covered by one.
pub fn merge_notable(
    notable: &[NotableTimestamp],
    peaks: &[f64],
    window_secs: f64,
) -> Vec<NotableTimestamp> {
    let mut merged: Vec<NotableTimestamp> = notable.to_vec();
    for m in join_peaks(peaks, notable, window_secs) {
        if m.matched.is_none() {
            merged.push(NotableTimestamp::new(m.peak_secs, PEAK_REASON));
        }
    }
    merged.sort_by(|a, b| a.seconds.total_cmp(&b.seconds));
    tracing::debug!(
        analysis = notable.len(),
        peaks = peaks.len(),
        merged = merged.len(),
        "merged notable timestamps"
    );
    merged
}
