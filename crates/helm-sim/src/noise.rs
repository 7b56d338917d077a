use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use helm_core::pulse::PulseWidth;

/// Seeded signal impairments: uniform jitter and random dropouts.
#[derive(Debug)]
pub struct Noise {
    rng: StdRng,
    jitter_us: u32,
    dropout: f64,
}

impl Noise {
    pub fn new(seed: u64, jitter_us: u32, dropout_pct: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            jitter_us,
            dropout: (dropout_pct / 100.0).clamp(0.0, 1.0),
        }
    }

    /// A scripted width of 0 means no signal and stays 0.
    pub fn perturb(&mut self, width: PulseWidth) -> PulseWidth {
        if width.is_none() {
            return width;
        }
        if self.dropout > 0.0 && self.rng.gen_bool(self.dropout) {
            return PulseWidth::NONE;
        }
        if self.jitter_us == 0 {
            return width;
        }
        let j = self.jitter_us as i64;
        let us = (width.as_us() as i64 + self.rng.gen_range(-j..=j)).max(1);
        PulseWidth::from_us(us as u32)
    }
}
