//! 2-D peak detection over a spectrogram matrix (component C2).
//!
//! Ported from the `get_2D_peaks` morphological recipe used by the
//! reference implementation: dilate a structuring element into a
//! neighborhood footprint, find the cells that equal their neighborhood
//! maximum, XOR against an eroded zero-background mask, then apply the
//! strict amplitude floor.

use crate::config::{Connectivity, PeakConfig};
use crate::fft::spectrogram::Spectrogram;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub freq_bin: usize,
    pub time_bin: usize,
    pub magnitude: f32,
}

/// Reflects an out-of-range index back into `[0, n)`, matching
/// `scipy.ndimage`'s default `reflect` boundary mode (`d c b a | a b c d | d
/// c b a` — the edge sample is mirrored onto itself).
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let mut m = i % period;
    if m < 0 {
        m += period;
    }
    if m >= n {
        m = period - 1 - m;
    }
    m as usize
}

/// True if `(df, dt)` lies within the structuring element dilated `size`
/// times — a diamond (Manhattan ball) for 4-connectivity, a square
/// (Chebyshev ball) for 8-connectivity. Iterating the base 3x3 element
/// `size` times is a Minkowski sum equivalent to this closed form.
fn in_footprint(df: isize, dt: isize, connectivity: Connectivity, size: usize) -> bool {
    let size = size as isize;
    match connectivity {
        Connectivity::FourWay => df.abs() + dt.abs() <= size,
        Connectivity::EightWay => df.abs().max(dt.abs()) <= size,
    }
}

pub fn detect(spec: &Spectrogram, cfg: &PeakConfig) -> crate::error::Result<Vec<Peak>> {
    cfg.validate()?;

    let num_frames = spec.num_frames();
    let num_bins = spec.num_freq_bins();
    if num_frames == 0 || num_bins == 0 {
        return Ok(Vec::new());
    }

    let at = |f: usize, t: usize| spec.frames[t][f];

    let mut peaks = Vec::new();
    for t in 0..num_frames {
        for f in 0..num_bins {
            let value = at(f, t);

            // local_max[f,t] = maximum_filter(A, footprint)[f,t] == A[f,t]
            let mut local_max = true;
            for df in -(cfg.neighborhood_size as isize)..=(cfg.neighborhood_size as isize) {
                for dt in -(cfg.neighborhood_size as isize)..=(cfg.neighborhood_size as isize) {
                    if !in_footprint(df, dt, cfg.connectivity, cfg.neighborhood_size) {
                        continue;
                    }
                    let nf = reflect_index(f as isize + df, num_bins);
                    let nt = reflect_index(t as isize + dt, num_frames);
                    let neighbor = at(nf, nt);
                    if neighbor > value {
                        local_max = false;
                    }
                }
            }

            // eroded_background[f,t]: true iff every neighbor (border value
            // true) is itself zero. Out-of-range neighbors count as
            // background (border_value = true), independent of the
            // reflect-mode maximum filter above.
            let mut eroded_background = true;
            for df in -(cfg.neighborhood_size as isize)..=(cfg.neighborhood_size as isize) {
                for dt in -(cfg.neighborhood_size as isize)..=(cfg.neighborhood_size as isize) {
                    if !in_footprint(df, dt, cfg.connectivity, cfg.neighborhood_size) {
                        continue;
                    }
                    let nf = f as isize + df;
                    let nt = t as isize + dt;
                    let neighbor_is_background = if nf < 0
                        || nf >= num_bins as isize
                        || nt < 0
                        || nt >= num_frames as isize
                    {
                        true
                    } else {
                        at(nf as usize, nt as usize) == 0.0
                    };
                    if !neighbor_is_background {
                        eroded_background = false;
                    }
                }
            }

            let is_peak = local_max != eroded_background; // XOR
            if is_peak && value > cfg.amp_min {
                peaks.push(Peak {
                    freq_bin: f,
                    time_bin: t,
                    magnitude: value,
                });
            }
        }
    }

    Ok(peaks)
}
