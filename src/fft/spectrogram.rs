use crate::config::SpectrogramConfig;
use crate::error::{Error, Result};
use crate::fft::complex::Complex;
use std::f32::consts::PI;

/// Log-magnitude time-frequency matrix. `frames[t][f]` is the log-magnitude
/// at time bin `t`, frequency bin `f ∈ [0, window_size/2]`.
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    pub fn num_freq_bins(&self) -> usize {
        self.frames.first().map_or(0, |row| row.len())
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }
}

/// Produces the log-magnitude spectrogram from PCM samples following the
/// matlab-compatible `specgram` convention pinned in DESIGN.md: Hann window,
/// one-sided power-spectral-density scaling, `10*log10`, with
/// `log10(0) := 0` via an exact equality check.
pub fn generate(samples: &[f32], cfg: &SpectrogramConfig) -> Result<Spectrogram> {
    cfg.validate()?;

    let window_size = cfg.window_size;
    let hop = cfg.hop_size();
    if hop == 0 {
        return Err(Error::Config("computed hop_size is zero".into()));
    }

    if samples.len() < window_size {
        return Ok(Spectrogram { frames: Vec::new() });
    }

    let window = hann_window(window_size);
    let window_power: f32 = window.iter().map(|w| w * w).sum();
    let psd_scale = 1.0 / (cfg.sample_rate as f32 * window_power);

    let half_n = window_size / 2 + 1;
    let mut frames = Vec::new();

    let mut position = 0;
    while position + window_size <= samples.len() {
        let chunk = &samples[position..position + window_size];

        let mut buf: Vec<Complex> = chunk
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        cooley_tukey_fft(&mut buf);

        let mut row = Vec::with_capacity(half_n);
        for (k, bin) in buf[..half_n].iter().enumerate() {
            let mut power = bin.norm_sqr() * psd_scale;
            // One-sided PSD: double all bins except DC and Nyquist.
            if k != 0 && k != half_n - 1 {
                power *= 2.0;
            }
            row.push(log10_magnitude(power));
        }
        frames.push(row);

        position += hop;
    }

    Ok(Spectrogram { frames })
}

fn log10_magnitude(power: f32) -> f32 {
    if power == 0.0 {
        0.0
    } else {
        10.0 * power.log10()
    }
}

fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (n - 1) as f32).cos()))
        .collect()
}

/// Radix-2 Cooley-Tukey FFT, in place. `buf.len()` must be a power of two.
fn cooley_tukey_fft(buf: &mut [Complex]) {
    let n = buf.len();
    if n <= 1 {
        return;
    }

    let mut even: Vec<Complex> = Vec::with_capacity(n / 2);
    let mut odd: Vec<Complex> = Vec::with_capacity(n / 2);
    for (i, &sample) in buf.iter().enumerate() {
        if i % 2 == 0 {
            even.push(sample);
        } else {
            odd.push(sample);
        }
    }

    cooley_tukey_fft(&mut even);
    cooley_tukey_fft(&mut odd);

    // P(ω) = Pe(ω²) + ω·Po(ω²), P(-ω) = Pe(ω²) - ω·Po(ω²), ω = e^(-i2πj/n)
    for j in 0..n / 2 {
        let theta = (2.0 * PI * j as f32) / n as f32;
        let omega = Complex::from_polar(1.0, -theta);
        buf[j] = even[j] + (omega * odd[j]);
        buf[j + n / 2] = even[j] - (omega * odd[j]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(window_size: usize) -> SpectrogramConfig {
        SpectrogramConfig {
            sample_rate: 11025,
            window_size,
            overlap_ratio: 0.5,
        }
    }

    #[test]
    fn empty_input_yields_no_frames() {
        let spec = generate(&[], &cfg(1024)).unwrap();
        assert_eq!(spec.num_frames(), 0);
    }

    #[test]
    fn frame_count_and_bin_count_match_expectations() {
        let samples = vec![0.0f32; 4096];
        let spec = generate(&samples, &cfg(1024)).unwrap();
        assert_eq!(spec.num_freq_bins(), 1024 / 2 + 1);
        // hop = 512, frames = floor((4096-1024)/512)+1 = 7
        assert_eq!(spec.num_frames(), 7);
    }

    #[test]
    fn silence_has_zero_log_magnitude_everywhere() {
        let samples = vec![0.0f32; 2048];
        let spec = generate(&samples, &cfg(1024)).unwrap();
        for row in &spec.frames {
            for &v in row {
                assert_eq!(v, 0.0);
            }
        }
    }

    #[test]
    fn pure_tone_produces_a_strong_bin_at_its_frequency() {
        let sample_rate = 11025u32;
        let window_size = 1024usize;
        let freq_hz = 1000.0f32;
        let n = window_size * 4;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect();

        let spec = generate(
            &samples,
            &SpectrogramConfig {
                sample_rate,
                window_size,
                overlap_ratio: 0.5,
            },
        )
        .unwrap();

        let expected_bin = (freq_hz * window_size as f32 / sample_rate as f32).round() as usize;
        let row = &spec.frames[spec.frames.len() / 2];
        let max_bin = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!(
            (max_bin as isize - expected_bin as isize).abs() <= 1,
            "expected peak near bin {expected_bin}, got {max_bin}"
        );
    }
}
