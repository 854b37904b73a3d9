//! Combinatorial peak pairing and 64-bit hash packing (component C3).

use crate::config::HashConfig;
use crate::error::{Error, Result};
use crate::peaks::Peak;

/// One packed hash together with the anchor's time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedPeak {
    pub hash: u64,
    pub anchor_time: u32,
}

/// `hash := (f_i << 44) | (f_j << 24) | dt`, MSB-first `[f_i:20][f_j:20][dt:24]`.
pub fn pack(anchor_freq: u32, target_freq: u32, time_delta: u32) -> u64 {
    ((anchor_freq as u64) << 44) | ((target_freq as u64) << 24) | (time_delta as u64)
}

pub fn unpack(hash: u64) -> (u32, u32, u32) {
    let anchor_freq = (hash >> 44) as u32;
    let target_freq = ((hash >> 24) & 0xFFFFF) as u32;
    let time_delta = (hash & 0xFF_FFFF) as u32;
    (anchor_freq, target_freq, time_delta)
}

/// Pairs peaks within the fan window and packs each accepted pair into a
/// hash. Anchor `i` pairs with targets `j ∈ [i+1, i+fan_value)` whose time
/// delta falls in `[min_time_delta, max_time_delta]` inclusive.
pub fn generate_hashes(peaks: &[Peak], cfg: &HashConfig) -> Result<Vec<HashedPeak>> {
    cfg.validate()?;

    let mut ordered: Vec<&Peak> = peaks.iter().collect();
    if cfg.peak_sort {
        // Stable sort by time, preserving original order on ties.
        ordered.sort_by_key(|p| p.time_bin);
    }

    for p in &ordered {
        if p.freq_bin as u32 > crate::config::MAX_FREQ_BIN {
            return Err(Error::Config(format!(
                "peak frequency bin {} exceeds the 20-bit packed field",
                p.freq_bin
            )));
        }
    }

    let mut out = Vec::new();
    let n = ordered.len();
    for i in 0..n {
        let anchor = ordered[i];
        let end = (i + cfg.fan_value).min(n);
        for target in &ordered[i + 1..end] {
            if target.time_bin < anchor.time_bin {
                continue;
            }
            let delta = (target.time_bin - anchor.time_bin) as u32;
            if delta < cfg.min_time_delta || delta > cfg.max_time_delta {
                continue;
            }
            let hash = pack(anchor.freq_bin as u32, target.freq_bin as u32, delta);
            out.push(HashedPeak {
                hash,
                anchor_time: anchor.time_bin as u32,
            });
        }
    }

    Ok(out)
}
