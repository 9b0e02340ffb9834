//! Easing function catalogue.
//!
//! Eleven families (linear, sine, circular, quadratic, cubic, quartic,
//! quintic, exponential, back, bounce, elastic), each with in/out/in-out
//! variants, addressed by the wire index the emission protocol uses:
//! 0 = none, then `(index - 1) / 3` selects the family and
//! `(index - 1) % 3` the variant.

use core::f32::consts::PI;

/// An easing curve. `Ease::None` is a straight pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ease {
    family: Family,
    variant: Variant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Family {
    #[default]
    Linear,
    Sine,
    Circular,
    Quadratic,
    Cubic,
    Quartic,
    Quintic,
    Exponential,
    Back,
    Bounce,
    Elastic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Variant {
    #[default]
    In,
    Out,
    InOut,
}

pub const EASE_NONE: u8 = 0;
pub const EASE_COUNT: u8 = 34;

impl Ease {
    pub const NONE: Ease = Ease {
        family: Family::Linear,
        variant: Variant::In,
    };

    /// Decode a wire index. 0 and out-of-range indices are linear.
    pub fn from_index(index: u8) -> Self {
        if index == EASE_NONE || index >= EASE_COUNT {
            return Self::NONE;
        }
        let family = match (index - 1) / 3 {
            0 => Family::Linear,
            1 => Family::Sine,
            2 => Family::Circular,
            3 => Family::Quadratic,
            4 => Family::Cubic,
            5 => Family::Quartic,
            6 => Family::Quintic,
            7 => Family::Exponential,
            8 => Family::Back,
            9 => Family::Bounce,
            _ => Family::Elastic,
        };
        let variant = match (index - 1) % 3 {
            0 => Variant::In,
            1 => Variant::Out,
            _ => Variant::InOut,
        };
        Self { family, variant }
    }

    /// Apply the curve to `t` in [0,1].
    pub fn apply(self, t: f32) -> f32 {
        match self.variant {
            Variant::In => self.ease_in(t),
            Variant::Out => 1.0 - self.ease_in(1.0 - t),
            Variant::InOut => {
                if t < 0.5 {
                    self.ease_in(t * 2.0) / 2.0
                } else {
                    1.0 - self.ease_in((1.0 - t) * 2.0) / 2.0
                }
            }
        }
    }

    /// Remap `value` from `[in_min, in_max]` to `[out_min, out_max]`
    /// through the curve.
    pub fn map(self, value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
        let span = in_max - in_min;
        let t = if span == 0.0 { 0.0 } else { (value - in_min) / span };
        out_min + (out_max - out_min) * self.apply(t)
    }

    fn ease_in(self, t: f32) -> f32 {
        match self.family {
            Family::Linear => t,
            Family::Sine => 1.0 - ((t * PI) / 2.0).cos(),
            Family::Circular => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Family::Quadratic => t * t,
            Family::Cubic => t * t * t,
            Family::Quartic => t * t * t * t,
            Family::Quintic => t * t * t * t * t,
            Family::Exponential => {
                if t <= 0.0 {
                    0.0
                } else {
                    2.0_f32.powf(10.0 * (t - 1.0))
                }
            }
            Family::Back => {
                const S: f32 = 1.70158;
                t * t * ((S + 1.0) * t - S)
            }
            Family::Bounce => 1.0 - bounce_out(1.0 - t),
            Family::Elastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    let p = 0.3;
                    let s = p / 4.0;
                    -(2.0_f32.powf(10.0 * (t - 1.0)) * (((t - 1.0) - s) * (2.0 * PI) / p).sin())
                }
            }
        }
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let e = Ease::from_index(EASE_NONE);
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((e.apply(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn every_index_hits_both_endpoints() {
        for idx in 0..EASE_COUNT {
            let e = Ease::from_index(idx);
            assert!(e.apply(0.0).abs() < 1e-3, "index {idx} at 0");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-3, "index {idx} at 1");
        }
    }

    #[test]
    fn map_scales_ranges() {
        let e = Ease::from_index(EASE_NONE);
        assert!((e.map(5.0, 0.0, 10.0, 0.0, 100.0) - 50.0).abs() < 1e-4);
        assert!((e.map(0.0, 0.0, 10.0, 20.0, 40.0) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn quadratic_in_lags_linear() {
        let e = Ease::from_index(10);
        assert!(e.apply(0.5) < 0.5);
    }

    #[test]
    fn quadratic_out_leads_linear() {
        let e = Ease::from_index(11);
        assert!(e.apply(0.5) > 0.5);
    }

    #[test]
    fn index_decode_family_boundaries() {
        assert_eq!(Ease::from_index(1), Ease::from_index(0));
        assert_ne!(Ease::from_index(4).apply(0.25), Ease::from_index(1).apply(0.25));
    }
}
