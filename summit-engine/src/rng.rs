//! Randomness ports and deterministic stream bundles.
//!
//! All probabilistic behavior flows through [`RandomSource`] so tests can
//! replay exact draw sequences. Production callers use [`RngStreams`],
//! which derives an independent seeded stream per domain.

use hmac::{Hmac, Mac};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Uniform draws in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Counting wrapper around an RNG stream providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> RandomSource for CountingRng<R> {
    fn next_unit(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen_range(0.0..1.0)
    }
}

/// Deterministic bundle of RNG streams segregated by engine domain.
///
/// Only critical hits consume randomness today, but keeping the bundle
/// shape means a new consumer gets its own stream instead of perturbing
/// existing replay sequences.
#[derive(Debug, Clone)]
pub struct RngStreams {
    critical: RefCell<CountingRng<SmallRng>>,
}

impl RngStreams {
    /// Construct the bundle from a user-scoped seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            critical: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"critical"))),
        }
    }

    /// Access the critical-hit RNG stream.
    #[must_use]
    pub fn critical(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.critical.borrow_mut()
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
