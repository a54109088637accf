//! Providers backed by the standard library.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{ConsoleLevel, ConsoleProvider, RandomProvider};

/// xorshift64 generator for `Math.random()`.
pub struct StdRandomProvider {
    state: u64,
}

const FALLBACK_SEED: u64 = 0x2545_f491_4f6c_dd1d;

impl StdRandomProvider {
    /// Seeded from the wall clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(FALLBACK_SEED);
        Self::with_seed(seed)
    }

    /// Fixed seed, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        Self { state }
    }
}

impl Default for StdRandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomProvider for StdRandomProvider {
    fn random(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        // 53 high bits fill the mantissa
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Writes `log`/`info`/`debug` to stdout and `warn`/`error` to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsoleProvider;

impl StdConsoleProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ConsoleProvider for StdConsoleProvider {
    fn write(&self, level: ConsoleLevel, message: &str) {
        // Broken pipes are not the program's problem
        let _ = match level {
            ConsoleLevel::Log | ConsoleLevel::Info | ConsoleLevel::Debug => {
                writeln!(std::io::stdout().lock(), "{message}")
            }
            ConsoleLevel::Warn | ConsoleLevel::Error => {
                writeln!(std::io::stderr().lock(), "{message}")
            }
        };
    }

    fn clear(&self) {
        let _ = writeln!(std::io::stdout().lock(), "\x1b[2J\x1b[H");
    }
}
