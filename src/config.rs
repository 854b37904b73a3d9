//! Enumerated configuration options (spec.md §6) and their validation.
//!
//! Loading these from a file or environment is an external collaborator's
//! job (out of scope); this module only defines the shapes and the range
//! checks a caller must pass before the generator or match engine will
//! accept them.

use crate::error::{Error, Result};
use std::time::Duration;

/// Width in bits of each packed frequency field (`f_i`, `f_j`) in the 64-bit
/// hash layout: `[f_i:20][f_j:20][dt:24]`.
pub const FREQ_BITS: u32 = 20;
/// Width in bits of the packed time-delta field.
pub const DELTA_BITS: u32 = 24;
pub const MAX_FREQ_BIN: u32 = (1 << FREQ_BITS) - 1;
pub const MAX_TIME_DELTA: u32 = (1 << DELTA_BITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// 4-connected diamond structuring element.
    FourWay,
    /// 8-connected full square structuring element.
    EightWay,
}

#[derive(Debug, Clone, Copy)]
pub struct SpectrogramConfig {
    pub sample_rate: u32,
    pub window_size: usize,
    pub overlap_ratio: f32,
}

impl SpectrogramConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || !self.window_size.is_power_of_two() {
            return Err(Error::Config(format!(
                "window_size must be a power of two, got {}",
                self.window_size
            )));
        }
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(Error::Config(format!(
                "overlap_ratio must be in [0,1), got {}",
                self.overlap_ratio
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be nonzero".into()));
        }
        // The spectrogram emits one-sided rows [0, window_size/2]; that row
        // count must fit in the hash's 20-bit frequency field (§4.3).
        let max_row = (self.window_size / 2) as u32;
        if max_row > MAX_FREQ_BIN {
            return Err(Error::Config(format!(
                "window_size {} yields {} frequency bins, exceeding the 20-bit packed field (max {})",
                self.window_size, max_row + 1, MAX_FREQ_BIN + 1
            )));
        }
        Ok(())
    }

    pub fn hop_size(&self) -> usize {
        ((self.window_size as f32) * (1.0 - self.overlap_ratio)).round() as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PeakConfig {
    pub amp_min: f32,
    pub connectivity: Connectivity,
    pub neighborhood_size: usize,
}

impl PeakConfig {
    pub fn validate(&self) -> Result<()> {
        if self.neighborhood_size == 0 {
            return Err(Error::Config("neighborhood_size must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HashConfig {
    pub fan_value: usize,
    pub min_time_delta: u32,
    pub max_time_delta: u32,
    /// Whether peaks are stably sorted by time before pairing. Required —
    /// spec.md §9 leaves no implicit default.
    pub peak_sort: bool,
}

impl HashConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fan_value < 2 {
            return Err(Error::Config(format!(
                "fan_value must be >= 2, got {}",
                self.fan_value
            )));
        }
        if self.min_time_delta > self.max_time_delta {
            return Err(Error::Config(format!(
                "min_time_delta ({}) must be <= max_time_delta ({})",
                self.min_time_delta, self.max_time_delta
            )));
        }
        if self.max_time_delta > MAX_TIME_DELTA {
            return Err(Error::Config(format!(
                "max_time_delta {} exceeds the 24-bit packed field (max {})",
                self.max_time_delta, MAX_TIME_DELTA
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub pool_size: usize,
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            pool_size: 5,
            batch_size: 1000,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(Error::Config("database_url must be set".into()));
        }
        if self.pool_size == 0 {
            return Err(Error::Config("pool_size must be >= 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub db_index: i64,
    pub key_prefix: String,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            user: None,
            password: None,
            db_index: 0,
            key_prefix: "fp".to_string(),
            connect_timeout: Duration::from_secs(2),
            operation_timeout: Duration::from_secs(2),
            ttl: Duration::from_secs(86_400),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.is_empty() {
            return Err(Error::Config("key_prefix must not be empty".into()));
        }
        Ok(())
    }

    pub fn redis_url(&self) -> String {
        let auth = match (&self.user, &self.password) {
            (Some(u), Some(p)) => format!("{u}:{p}@"),
            (None, Some(p)) => format!(":{p}@"),
            _ => String::new(),
        };
        format!(
            "redis://{auth}{host}:{port}/{db}",
            auth = auth,
            host = self.host,
            port = self.port,
            db = self.db_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_window() {
        let cfg = SpectrogramConfig {
            sample_rate: 11025,
            window_size: 1000,
            overlap_ratio: 0.5,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_window_that_overflows_freq_bits() {
        let cfg = SpectrogramConfig {
            sample_rate: 11025,
            window_size: 1 << 22,
            overlap_ratio: 0.5,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_fan_value_below_two() {
        let cfg = HashConfig {
            fan_value: 1,
            min_time_delta: 0,
            max_time_delta: 200,
            peak_sort: true,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_time_delta_overflowing_24_bits() {
        let cfg = HashConfig {
            fan_value: 5,
            min_time_delta: 0,
            max_time_delta: 1 << 24,
            peak_sort: true,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_reasonable_defaults() {
        let cfg = SpectrogramConfig {
            sample_rate: 11025,
            window_size: 2048,
            overlap_ratio: 0.5,
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.hop_size(), 1024);
    }
}
