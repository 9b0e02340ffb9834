//! Emission request parameters.
//!
//! A plain serializable value struct; every field is optional in the
//! sense that its default or sentinel value triggers documented
//! fallback behaviour (random draw, model default, infinite duration).
//! The OSC/HTTP collaborators build these and hand them to
//! [`State::emit`](crate::state::State::emit).

use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::behaviour::B_RENDER_SEGMENT;
use crate::config::{
    DEFAULT_SPEED, FULL_BRIGHTNESS, ListHead, ListOrder, RANDOM_COLOR, RANDOM_DURATION,
    RANDOM_MODEL, SimConfig,
};
use crate::palette::Palette;
use crate::rnd::RandomRanges;

/// Parameters for one emission request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitParams {
    /// Model index, or -1 to pick uniformly at random.
    pub model: i8,
    /// Particles per frame of travel; -1 draws from the random range,
    /// 0 freezes particles in place.
    pub speed: f32,
    /// Position easing index (see [`crate::ease`]).
    pub ease: u8,
    /// Brightness advance per frame; 0 disables fading.
    pub fade_speed: u8,
    /// Brightness floor below which a particle renders dark.
    pub fade_thresh: u8,
    /// Fade easing index.
    pub fade_ease: u8,
    /// Requested chain length in particles; unset draws randomly.
    pub length: Option<u16>,
    /// Explicit trail reservation, used when `speed == 0`.
    pub trail: u16,
    pub order: ListOrder,
    pub head: ListHead,
    /// Linked chains route identically through intersections.
    pub linked: bool,
    /// Explicit emit-root index, or -1 for random.
    pub from: i8,
    /// Lifetime in milliseconds; 0 draws randomly,
    /// [`INFINITE_DURATION`](crate::config::INFINITE_DURATION) never expires.
    pub duration: u32,
    pub palette: Palette,
    /// Nonzero ids enable note-on reuse semantics.
    pub note_id: u16,
    pub min_bri: u8,
    pub max_bri: u8,
    pub behaviour_flags: u16,
    /// Emit-root group mask; 0 falls back to the model's mask.
    pub emit_groups: u8,
    /// Starting position offset applied to every particle.
    pub emit_offset: u8,
    pub color_change_groups: u8,
}

impl Default for EmitParams {
    fn default() -> Self {
        Self {
            model: RANDOM_MODEL,
            speed: DEFAULT_SPEED,
            ease: 0,
            fade_speed: 0,
            fade_thresh: 0,
            fade_ease: 0,
            length: None,
            trail: 0,
            order: ListOrder::Sequential,
            head: ListHead::Front,
            linked: true,
            from: -1,
            duration: RANDOM_DURATION,
            palette: Palette::new(),
            note_id: 0,
            min_bri: 0,
            max_bri: FULL_BRIGHTNESS,
            behaviour_flags: 0,
            emit_groups: 0,
            emit_offset: 0,
            color_change_groups: 0,
        }
    }
}

impl EmitParams {
    /// Request targeting a specific model with everything else defaulted.
    pub fn for_model(model: i8) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Request targeting a model at a fixed speed.
    pub fn with_speed(model: i8, speed: f32) -> Self {
        Self {
            model,
            speed,
            ..Self::default()
        }
    }

    /// Request with a single-color palette.
    pub fn with_color(model: i8, speed: f32, color: i64) -> Self {
        Self {
            model,
            speed,
            palette: Palette::from_colors(&[color]),
            ..Self::default()
        }
    }

    pub fn set_length(&mut self, length: u16) {
        self.length = Some(length);
    }

    pub fn set_colors(&mut self, colors: &[i64]) {
        self.palette.set_colors(colors);
    }

    pub fn set_color_positions(&mut self, positions: &[f32]) {
        self.palette.set_positions(positions);
        self.palette.sort_by_position();
    }

    // ── Derived getters ───────────────────────────────────────

    /// Concrete speed, drawing from the random range on the sentinel.
    pub fn resolved_speed(&self, rng: &mut SmallRng, ranges: &RandomRanges) -> f32 {
        if self.speed >= 0.0 {
            self.speed
        } else {
            ranges.random_speed(rng)
        }
    }

    /// Concrete length, drawing from the random range when unset.
    pub fn resolved_length(&self, rng: &mut SmallRng, ranges: &RandomRanges) -> u16 {
        match self.length {
            Some(len) => len,
            None => ranges.random_length(rng),
        }
    }

    /// Trail particles reserved behind a moving sequential chain.
    pub fn speed_trail(&self, speed: f32, length: u16, ranges: &RandomRanges) -> u16 {
        if self.order == ListOrder::Sequential
            && self.linked
            && self.behaviour_flags & B_RENDER_SEGMENT == 0
        {
            let trail = (speed * f32::from(length / 2).max(1.0)) as u16;
            trail.min(ranges.max_length - 1)
        } else {
            0
        }
    }

    /// Concrete duration, drawing from the random range on the sentinel.
    pub fn resolved_duration(&self, rng: &mut SmallRng, ranges: &RandomRanges) -> u32 {
        if self.duration > 0 {
            self.duration
        } else {
            ranges.random_duration(rng)
        }
    }

    pub fn resolved_max_bri(&self) -> u8 {
        if self.max_bri > 0 {
            self.max_bri
        } else {
            FULL_BRIGHTNESS
        }
    }

    /// Explicit emit-root index, or `None` for random.
    pub fn emit_index(&self) -> Option<u8> {
        if self.from >= 0 { Some(self.from as u8) } else { None }
    }

    /// Requested group mask, falling back to `default` when unset.
    pub fn emit_groups_or(&self, default: u8) -> u8 {
        if self.emit_groups > 0 {
            self.emit_groups
        } else {
            default
        }
    }

    /// First palette color, resolving the random sentinel.
    pub fn first_color(
        &self,
        rng: &mut SmallRng,
        ranges: &RandomRanges,
    ) -> crate::color::ColorRgb {
        if self.palette.is_empty() {
            return crate::color::ColorRgb::random(rng, ranges);
        }
        let packed = self.palette.color_at(0);
        if packed == RANDOM_COLOR || packed < 0 {
            crate::color::ColorRgb::random(rng, ranges)
        } else {
            crate::color::ColorRgb::from_packed(packed as u32)
        }
    }

    /// Duration expressed as a frame count at the configured rate.
    pub fn set_duration_frames(&mut self, frames: u32, config: &SimConfig) {
        self.duration = frames.saturating_mul(u32::from(config.frame_ms()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INFINITE_DURATION;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(5)
    }

    #[test]
    fn defaults_match_wire_contract() {
        let p = EmitParams::default();
        assert_eq!(p.model, RANDOM_MODEL);
        assert_eq!(p.speed, DEFAULT_SPEED);
        assert_eq!(p.length, None);
        assert!(p.linked);
        assert_eq!(p.duration, RANDOM_DURATION);
        assert_eq!(p.max_bri, FULL_BRIGHTNESS);
        assert_eq!(p.from, -1);
    }

    #[test]
    fn explicit_speed_is_preserved() {
        let p = EmitParams::with_speed(0, 2.5);
        assert_eq!(p.resolved_speed(&mut rng(), &RandomRanges::default()), 2.5);
    }

    #[test]
    fn sentinel_speed_draws_from_range() {
        let mut p = EmitParams::default();
        p.speed = -1.0;
        let ranges = RandomRanges::default();
        let s = p.resolved_speed(&mut rng(), &ranges);
        assert!(s >= ranges.min_speed && s < ranges.max_speed);
    }

    #[test]
    fn infinite_duration_passes_through() {
        let mut p = EmitParams::default();
        p.duration = INFINITE_DURATION;
        assert_eq!(
            p.resolved_duration(&mut rng(), &RandomRanges::default()),
            INFINITE_DURATION
        );
    }

    #[test]
    fn speed_trail_only_for_linked_sequential() {
        let ranges = RandomRanges::default();
        let mut p = EmitParams::default();
        assert!(p.speed_trail(2.0, 20, &ranges) > 0);

        p.linked = false;
        assert_eq!(p.speed_trail(2.0, 20, &ranges), 0);

        p.linked = true;
        p.order = ListOrder::Random;
        assert_eq!(p.speed_trail(2.0, 20, &ranges), 0);

        p.order = ListOrder::Sequential;
        p.behaviour_flags = B_RENDER_SEGMENT;
        assert_eq!(p.speed_trail(2.0, 20, &ranges), 0);
    }

    #[test]
    fn speed_trail_is_capped() {
        let ranges = RandomRanges::default();
        let p = EmitParams::default();
        assert_eq!(
            p.speed_trail(100.0, 500, &ranges),
            ranges.max_length - 1
        );
    }

    #[test]
    fn duration_frames_uses_config_rate() {
        let mut p = EmitParams::default();
        p.set_duration_frames(125, &SimConfig::default());
        assert_eq!(p.duration, 125 * 16);
    }

    #[test]
    fn first_color_resolves_random_sentinel() {
        let ranges = RandomRanges::default();
        let explicit = EmitParams::with_color(0, 1.0, 0x123456);
        assert_eq!(
            explicit.first_color(&mut rng(), &ranges),
            crate::color::ColorRgb::from_packed(0x123456)
        );
        let random = EmitParams::with_color(0, 1.0, RANDOM_COLOR);
        let c = random.first_color(&mut rng(), &ranges);
        assert!(c.brightness() > 0.0);
    }

    #[test]
    fn serde_roundtrip_with_palette() {
        let mut p = EmitParams::with_color(2, 1.5, 0xFF8800);
        p.set_length(12);
        let json = serde_json::to_string(&p).unwrap();
        let p2: EmitParams = serde_json::from_str(&json).unwrap();
        assert_eq!(p2.model, 2);
        assert_eq!(p2.length, Some(12));
        assert_eq!(p2.palette.color_at(0), 0xFF8800);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: EmitParams = serde_json::from_str(r#"{"model": 1}"#).unwrap();
        assert_eq!(p.model, 1);
        assert_eq!(p.max_bri, FULL_BRIGHTNESS);
        assert!(p.linked);
    }
}
