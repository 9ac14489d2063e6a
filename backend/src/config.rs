use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shared::constants::STALE_LOCK_SWEEP;
use tracing::warn;

use crate::games::spin_coordinator::SpinTimings;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub timings: SpinTimings,
    pub lock_sweep: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("data"),
            static_dir: PathBuf::from("static"),
            timings: SpinTimings::default(),
            lock_sweep: STALE_LOCK_SWEEP,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Reads the environment; unset or unparsable keys keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| Duration::from_secs(parse_or(&lookup, key, default.as_secs()));

        let config = Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| defaults.data_dir.clone()),
            static_dir: lookup("STATIC_DIR").map(PathBuf::from).unwrap_or_else(|| defaults.static_dir.clone()),
            timings: SpinTimings {
                animation: secs("SPIN_ANIMATION_SECS", defaults.timings.animation),
                stale_after: secs("STALE_LOCK_SECS", defaults.timings.stale_after),
            },
            lock_sweep: secs("LOCK_SWEEP_SECS", defaults.lock_sweep),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        };
        config.checked(defaults)
    }

    /// Replaces timings that would disable or defeat stale-lock recovery.
    fn checked(mut self, defaults: Self) -> Self {
        if self.lock_sweep.is_zero() {
            warn!("Ignoring LOCK_SWEEP_SECS=0, using {}s", defaults.lock_sweep.as_secs());
            self.lock_sweep = defaults.lock_sweep;
        }
        if self.timings.stale_after <= self.timings.animation {
            warn!(
                "STALE_LOCK_SECS ({}s) must exceed SPIN_ANIMATION_SECS ({}s), using {}s/{}s",
                self.timings.stale_after.as_secs(),
                self.timings.animation.as_secs(),
                defaults.timings.animation.as_secs(),
                defaults.timings.stale_after.as_secs()
            );
            self.timings = defaults.timings;
        }
        self
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.timings.animation, Duration::from_secs(8));
        assert_eq!(config.timings.stale_after, Duration::from_secs(12));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("DATA_DIR", "/var/lib/wheel"),
            ("SPIN_ANIMATION_SECS", "5"),
            ("STALE_LOCK_SECS", "soon"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/wheel"));
        assert_eq!(config.timings.animation, Duration::from_secs(5));
        assert_eq!(config.timings.stale_after, Duration::from_secs(12));
    }

    #[test]
    fn test_zero_sweep_period_falls_back() {
        let config = config_from(&[("LOCK_SWEEP_SECS", "0")]);
        assert_eq!(config.lock_sweep, Duration::from_secs(2));
    }

    #[test]
    fn test_stale_threshold_must_exceed_animation() {
        let config = config_from(&[("SPIN_ANIMATION_SECS", "12"), ("STALE_LOCK_SECS", "12")]);
        assert_eq!(config.timings, SpinTimings::default());

        let config = config_from(&[("SPIN_ANIMATION_SECS", "20")]);
        assert_eq!(config.timings, SpinTimings::default());

        let config = config_from(&[("SPIN_ANIMATION_SECS", "4"), ("STALE_LOCK_SECS", "6")]);
        assert_eq!(config.timings.animation, Duration::from_secs(4));
        assert_eq!(config.timings.stale_after, Duration::from_secs(6));
    }
}
