//! Seeded random streams for models and replica batches.
//!
//! Every atomic model owns a `SmallRng` derived from the run seed and its
//! `ModelId`:
//!
//!   seed = run_seed XOR (model_id * GOLDEN)
//!
//! Streams are never shared, so the order in which the coordinator visits
//! simultaneous models cannot change what any of them draws.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::ModelId;

/// Fractional part of the golden ratio, 64 bits.
const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

// ── ModelRng ──────────────────────────────────────────────────────────────────

/// Random stream of one atomic model, handed over in `DynamicsInit`.
#[derive(Clone, Debug)]
pub struct ModelRng(SmallRng);

impl ModelRng {
    pub fn new(run_seed: u64, model: ModelId) -> Self {
        let mixed = run_seed ^ u64::from(model.0).wrapping_mul(GOLDEN);
        ModelRng(SmallRng::seed_from_u64(mixed))
    }

    /// Direct access for `rand` distributions.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Master stream from which replica seeds are drawn.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(master: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(master))
    }

    pub fn next_seed(&mut self) -> u64 {
        self.0.r#gen()
    }

    /// `n` seeds drawn from `master`.  Same master, same seeds.
    pub fn replica_seeds(master: u64, n: usize) -> Vec<u64> {
        let mut rng = SimRng::new(master);
        (0..n).map(|_| rng.next_seed()).collect()
    }
}
