use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Seeded generator for reproducible runs, entropy otherwise
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

// Uniform draw rounded to one decimal
pub fn one_decimal(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    round_one_decimal(rng.gen_range(low..=high))
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
