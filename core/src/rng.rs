//! Deterministic random number generation.
//!
//! RULE: Nothing in the market model may call any platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the single master seed stored on the MarketConfig.
//!
//! Each concern gets its own RNG stream, seeded deterministically
//! from (master_seed XOR stream_index). This means:
//!   - A new price rule that draws noise never shifts the complaint
//!     or market-share draws.
//!   - Each stream is fully reproducible in isolation.

use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Poisson};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single concern.
pub struct StreamRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream RNG from the master seed and a stable
    /// stream index. The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a float uniformly in [low, high).
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Sample N(mean, std_dev). A zero, negative or NaN spread yields the mean.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if !(std_dev > 0.0) {
            return mean;
        }
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => mean,
        }
    }

    /// Sample Poisson(lambda). Non-positive lambda yields 0.
    pub fn poisson(&mut self, lambda: f64) -> u32 {
        match Poisson::new(lambda) {
            Ok(dist) => {
                let draw: f64 = dist.sample(&mut self.inner);
                draw as u32
            }
            Err(_) => 0,
        }
    }
}

/// All stream RNGs for a single market generation, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_stream(&self, slot: StreamSlot) -> StreamRng {
        StreamRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Price = 0,
    Complaints = 1,
    MarketShare = 2,
    Detector = 3,
    // Add new streams here, append only.
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Complaints => "complaints",
            Self::MarketShare => "market_share",
            Self::Detector => "detector",
        }
    }
}
