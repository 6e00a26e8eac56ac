//! Audio-energy peak detection.
//!
//! Mono samples are reduced to a centred RMS envelope, min-max normalised,
//! and searched for local maxima that stand out by a minimum prominence
//! and span a minimum width. The loudest few are returned.

use std::path::Path;
use std::process::Command;

use reelsmith_common::{ReelError, ReelResult};
use serde::{Deserialize, Serialize};

/// Peak detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakConfig {
    pub sample_rate: u32,
    pub frame_len: usize,
    pub hop_len: usize,

    /// Minimum prominence on the normalised envelope.
    pub min_prominence: f64,

    /// Minimum width in envelope frames, measured at half prominence.
    pub min_width: usize,

    pub top_n: usize,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            frame_len: 2048,
            hop_len: 512,
            min_prominence: 0.2,
            min_width: 3,
            top_n: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyPeak {
    pub seconds: f64,
    /// Normalised envelope value at the peak.
    pub amplitude: f64,
}

/// RMS per frame; frame `i` is centred on sample `i * hop_len`.
pub fn rms_envelope(samples: &[f32], frame_len: usize, hop_len: usize) -> Vec<f64> {
    if samples.is_empty() || frame_len == 0 || hop_len == 0 {
        return vec![];
    }
    let half = frame_len / 2;
    let frames = 1 + samples.len() / hop_len;
    (0..frames)
        .map(|i| {
            let centre = i * hop_len;
            let lo = centre.saturating_sub(half);
            let hi = (centre + half).min(samples.len());
            let energy: f64 = samples[lo.min(hi)..hi]
                .iter()
                .map(|&s| f64::from(s) * f64::from(s))
                .sum();
            (energy / frame_len as f64).sqrt()
        })
        .collect()
}

/// Min-max normalise into [0, 1]. A flat envelope becomes all zeros.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

fn prominence(values: &[f64], peak: usize) -> f64 {
    let height = values[peak];

    let mut left_min = height;
    for &v in values[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &values[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

fn width_at_half_prominence(values: &[f64], peak: usize, prominence: f64) -> usize {
    let level = values[peak] - prominence / 2.0;
    let left = values[..peak]
        .iter()
        .rev()
        .take_while(|&&v| v >= level)
        .count();
    let right = values[peak + 1..]
        .iter()
        .take_while(|&&v| v >= level)
        .count();
    left + 1 + right
}

/// Indices of local maxima passing the prominence and width thresholds.
/// A plateau is reported at its first index.
pub fn find_peaks(values: &[f64], min_prominence: f64, min_width: usize) -> Vec<usize> {
    let mut peaks = vec![];
    if values.len() < 3 {
        return peaks;
    }
    let mut i = 1;
    while i < values.len() - 1 {
        if values[i] > values[i - 1] {
            // Walk across a plateau.
            let mut j = i;
            while j + 1 < values.len() && values[j + 1] == values[i] {
                j += 1;
            }
            if j + 1 < values.len() && values[j + 1] < values[i] {
                let p = prominence(values, i);
                if p >= min_prominence && width_at_half_prominence(values, i, p) >= min_width {
                    peaks.push(i);
                }
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    peaks
}

/// The loudest peaks of a mono signal, loudest first.
pub fn detect_peaks(samples: &[f32], config: &PeakConfig) -> Vec<EnergyPeak> {
    let envelope = normalize(&rms_envelope(samples, config.frame_len, config.hop_len));
    let mut peaks: Vec<EnergyPeak> = find_peaks(&envelope, config.min_prominence, config.min_width)
        .into_iter()
        .map(|i| EnergyPeak {
            seconds: (i * config.hop_len) as f64 / f64::from(config.sample_rate),
            amplitude: envelope[i],
        })
        .collect();
    peaks.sort_by(|a, b| b.amplitude.total_cmp(&a.amplitude));
    peaks.truncate(config.top_n);
    peaks
}

/// Decode a media file's audio as mono f32 samples.
pub fn decode_mono(ffmpeg_bin: &str, path: &Path, sample_rate: u32) -> ReelResult<Vec<f32>> {
    if !path.is_file() {
        return Err(ReelError::missing_asset(path));
    }

    let out = Command::new(ffmpeg_bin)
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "1",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::render(format!("failed to run {ffmpeg_bin} for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(ReelError::render(format!(
            "audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    Ok(out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Decode a media file and detect its energy peaks.
pub fn detect_file_peaks(
    ffmpeg_bin: &str,
    path: &Path,
    config: &PeakConfig,
) -> ReelResult<Vec<EnergyPeak>> {
    let samples = decode_mono(ffmpeg_bin, path, config.sample_rate)?;
    let peaks = detect_peaks(&samples, config);
    tracing::info!(
        path = %path.display(),
        samples = samples.len(),
        peaks = peaks.len(),
        "Detected energy peaks"
    );
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_of_constant_signal() {
        let env = rms_envelope(&[0.5; 4096], 2048, 512);
        assert_eq!(env.len(), 9);
        // Full frames away from the edges.
        assert!((env[4] - 0.5).abs() < 1e-6);
        // The first frame is half padding.
        assert!(env[0] < env[4]);
    }

    #[test]
    fn test_normalize_flat_is_zero() {
        assert_eq!(normalize(&[2.0, 2.0]), vec![0.0, 0.0]);
        assert_eq!(normalize(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_find_peaks_thresholds() {
        let values = [0.0, 0.2, 1.0, 1.0, 0.9, 0.1, 0.0, 0.15, 0.0, 0.6, 0.7, 0.6, 0.0];
        let peaks = find_peaks(&values, 0.2, 3);
        // 0.15 lacks prominence; the plateau reports its first index.
        assert_eq!(peaks, vec![2, 10]);
    }

    #[test]
    fn test_find_peaks_rejects_narrow_spikes() {
        let values = [0.0, 0.0, 1.0, 0.0, 0.0];
        assert!(find_peaks(&values, 0.2, 3).is_empty());
        assert_eq!(find_peaks(&values, 0.2, 1), vec![2]);
    }

    #[test]
    fn test_detect_peaks_orders_by_loudness() {
        let config = PeakConfig::default();
        let mut signal = vec![0.0f32; 90_000];
        let bursts = [(10_000, 0.3f32), (40_000, 1.0), (70_000, 0.6)];
        for &(start, level) in &bursts {
            for s in &mut signal[start..start + 8192] {
                *s = level;
            }
        }
        let peaks = detect_peaks(&signal, &config);
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].amplitude, 1.0);
        let sr = f64::from(config.sample_rate);
        assert!(peaks[0].seconds >= 40_000.0 / sr && peaks[0].seconds <= 48_192.0 / sr);
        assert!(peaks[1].seconds >= 70_000.0 / sr && peaks[1].seconds <= 78_192.0 / sr);
    }

    #[test]
    fn test_top_n_limits_output() {
        let config = PeakConfig {
            top_n: 1,
            ..PeakConfig::default()
        };
        let mut signal = vec![0.0f32; 60_000];
        for s in &mut signal[10_000..18_000] {
            *s = 1.0;
        }
        for s in &mut signal[40_000..48_000] {
            *s = 0.5;
        }
        assert_eq!(detect_peaks(&signal, &config).len(), 1);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode_mono("ffmpeg", Path::new("/nonexistent.wav"), 22_050).unwrap_err();
        assert!(err.is_fatal_input());
    }
}
