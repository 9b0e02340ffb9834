//! Random parameter ranges.
//!
//! Emission fields left at their sentinel values draw from these bounds.
//! The bounds travel inside [`SimConfig`](crate::config::SimConfig) and
//! every draw goes through the caller's RNG, so a seeded run replays
//! identically.

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Bounds for every randomised emission parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomRanges {
    pub min_speed: f32,
    pub max_speed: f32,
    pub min_duration_ms: u32,
    pub max_duration_ms: u32,
    pub min_length: u16,
    pub max_length: u16,
    pub min_saturation: u8,
    pub max_saturation: u8,
    pub min_value: u8,
    pub max_value: u8,
    /// Auto-emitter reschedule window, milliseconds.
    pub min_next_emit_ms: u16,
    pub max_next_emit_ms: u16,
}

impl Default for RandomRanges {
    fn default() -> Self {
        Self {
            min_speed: 0.5,
            max_speed: 10.0,
            min_duration_ms: 120 * 16,
            max_duration_ms: 1440 * 16,
            min_length: 1,
            max_length: 100,
            min_saturation: (255.0 * 0.7) as u8,
            max_saturation: 255,
            min_value: (255.0 * 0.7) as u8,
            max_value: 255,
            min_next_emit_ms: 2000,
            max_next_emit_ms: 20000,
        }
    }
}

impl RandomRanges {
    pub fn random_speed(&self, rng: &mut SmallRng) -> f32 {
        if self.max_speed <= self.min_speed {
            return self.min_speed;
        }
        rng.gen_range(self.min_speed..self.max_speed)
    }

    pub fn random_duration(&self, rng: &mut SmallRng) -> u32 {
        if self.max_duration_ms <= self.min_duration_ms {
            return self.min_duration_ms;
        }
        rng.gen_range(self.min_duration_ms..self.max_duration_ms)
    }

    pub fn random_length(&self, rng: &mut SmallRng) -> u16 {
        if self.max_length <= self.min_length {
            return self.min_length;
        }
        rng.gen_range(self.min_length..self.max_length)
    }

    pub fn random_hue(&self, rng: &mut SmallRng) -> u8 {
        rng.gen_range(0..=255)
    }

    pub fn random_saturation(&self, rng: &mut SmallRng) -> u8 {
        if self.max_saturation <= self.min_saturation {
            return self.min_saturation;
        }
        rng.gen_range(self.min_saturation..self.max_saturation)
    }

    pub fn random_value(&self, rng: &mut SmallRng) -> u8 {
        if self.max_value <= self.min_value {
            return self.min_value;
        }
        rng.gen_range(self.min_value..self.max_value)
    }

    pub fn random_next_emit(&self, rng: &mut SmallRng) -> u16 {
        if self.max_next_emit_ms <= self.min_next_emit_ms {
            return self.min_next_emit_ms;
        }
        rng.gen_range(self.min_next_emit_ms..self.max_next_emit_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn draws_stay_within_bounds() {
        let ranges = RandomRanges::default();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..200 {
            let s = ranges.random_speed(&mut rng);
            assert!(s >= ranges.min_speed && s < ranges.max_speed);
            let d = ranges.random_duration(&mut rng);
            assert!(d >= ranges.min_duration_ms && d < ranges.max_duration_ms);
            let l = ranges.random_length(&mut rng);
            assert!(l >= ranges.min_length && l < ranges.max_length);
            let n = ranges.random_next_emit(&mut rng);
            assert!(n >= ranges.min_next_emit_ms && n < ranges.max_next_emit_ms);
        }
    }

    #[test]
    fn degenerate_range_returns_minimum() {
        let mut ranges = RandomRanges::default();
        ranges.max_speed = ranges.min_speed;
        let mut rng = SmallRng::seed_from_u64(2);
        assert_eq!(ranges.random_speed(&mut rng), ranges.min_speed);
    }

    #[test]
    fn seeded_rng_replays() {
        let ranges = RandomRanges::default();
        let mut a = SmallRng::seed_from_u64(9);
        let mut b = SmallRng::seed_from_u64(9);
        for _ in 0..50 {
            assert_eq!(ranges.random_length(&mut a), ranges.random_length(&mut b));
        }
    }
}
