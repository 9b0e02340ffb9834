//! Ordered color-stop palette with interpolation, wrap and segmentation.
//!
//! Colors are stored as packed `0xRRGGBB` values; a negative entry means
//! "random color", resolved at the moment the palette is rasterised.
//! Positions live in [0,1] and stay sorted via [`Palette::sort_by_position`];
//! whenever the position list diverges from the color list, evenly spaced
//! defaults are regenerated.

use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::color::{BLACK, ColorRgb};
use crate::config::RANDOM_COLOR;
use crate::rnd::RandomRanges;

pub const WRAP_NOWRAP: i8 = -1;
pub const WRAP_CLAMP_TO_EDGE: i8 = 0;
pub const WRAP_REPEAT: i8 = 1;
pub const WRAP_REPEAT_MIRROR: i8 = 2;

pub const INTER_NONE: i8 = -1;
pub const INTER_RGB: i8 = 0;
pub const INTER_HSB: i8 = 1;
pub const INTER_PERCEPTUAL: i8 = 2;

/// Wrap an out-of-range color index according to the wrap mode.
pub fn wrap_index(i: usize, num_colors: usize, wrap_mode: i8) -> usize {
    match wrap_mode {
        WRAP_REPEAT_MIRROR => {
            // Full cycle: up and back, excluding the repeated ends.
            let period = 2 * num_colors - 2;
            if period == 0 {
                return 0;
            }
            let m = i % period;
            if m < num_colors { m } else { period - m }
        }
        WRAP_REPEAT => i % num_colors,
        WRAP_CLAMP_TO_EDGE => num_colors - 1,
        _ => i,
    }
}

/// Harmonic color-scheme generators, selected by wire index 0–7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorRule {
    Analogous = 0,
    Complementary = 1,
    SplitComplementary = 2,
    Triad = 3,
    Tetrad = 4,
    Compound = 5,
    FlippedCompound = 6,
    Monochrome = 7,
}

impl ColorRule {
    pub fn from_index(idx: i8) -> Option<Self> {
        match idx {
            0 => Some(Self::Analogous),
            1 => Some(Self::Complementary),
            2 => Some(Self::SplitComplementary),
            3 => Some(Self::Triad),
            4 => Some(Self::Tetrad),
            5 => Some(Self::Compound),
            6 => Some(Self::FlippedCompound),
            7 => Some(Self::Monochrome),
            _ => None,
        }
    }

    /// Expand one primary color into its harmonic set.
    fn generate(self, primary: ColorRgb, out: &mut Vec<ColorRgb>) {
        fn rotated(c: ColorRgb, hue_offset: f32) -> ColorRgb {
            let mut hue = c.hue() + hue_offset;
            while hue < 0.0 {
                hue += 255.0;
            }
            while hue >= 255.0 {
                hue -= 255.0;
            }
            ColorRgb::from_hsb(hue, c.saturation(), c.brightness())
        }

        match self {
            Self::Analogous => {
                for off in [0.0, 21.0, -21.0, 42.0, -42.0] {
                    out.push(rotated(primary, off));
                }
            }
            Self::Complementary => {
                out.push(primary);
                out.push(rotated(primary, 127.5));
            }
            Self::SplitComplementary => {
                for off in [0.0, 106.0, 149.0] {
                    out.push(rotated(primary, off));
                }
            }
            Self::Triad => {
                for off in [0.0, 85.0, 170.0] {
                    out.push(rotated(primary, off));
                }
            }
            Self::Tetrad => {
                for off in [0.0, 64.0, 127.5, 191.0] {
                    out.push(rotated(primary, off));
                }
            }
            Self::Compound => {
                for off in [0.0, 21.0, 127.5, 149.0] {
                    out.push(rotated(primary, off));
                }
            }
            Self::FlippedCompound => {
                for off in [0.0, -21.0, 127.5, 106.0] {
                    out.push(rotated(primary, off));
                }
            }
            Self::Monochrome => {
                out.push(primary);
                for scale in [0.66, 0.33] {
                    out.push(ColorRgb::from_hsb(
                        primary.hue(),
                        primary.saturation(),
                        primary.brightness() * scale,
                    ));
                }
            }
        }
    }
}

/// An ordered list of (color, position) stops plus lookup semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<i64>,
    positions: Vec<f32>,
    /// Harmonic rule index, -1 = off.
    color_rule: i8,
    /// -1 none / 0 RGB / 1 HSB / 2 perceptual.
    inter_mode: i8,
    /// -1 none / 0 clamp / 1 repeat / 2 repeat-mirror.
    wrap_mode: i8,
    /// 0 = off; >0 subdivides the index space into repeating bands.
    segmentation: f32,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette {
    pub fn new() -> Self {
        Self {
            colors: Vec::new(),
            positions: Vec::new(),
            color_rule: -1,
            inter_mode: INTER_HSB,
            wrap_mode: WRAP_NOWRAP,
            segmentation: 0.0,
        }
    }

    pub fn from_colors(colors: &[i64]) -> Self {
        let mut p = Self::new();
        p.colors = colors.to_vec();
        p.generate_default_positions();
        p
    }

    pub fn from_stops(colors: &[i64], positions: &[f32]) -> Self {
        let mut p = Self::new();
        p.colors = colors.to_vec();
        if positions.len() == colors.len() {
            p.positions = positions.to_vec();
        } else {
            p.generate_default_positions();
        }
        p.sort_by_position();
        p
    }

    // ── Stop editing ──────────────────────────────────────────

    pub fn add_color(&mut self, color: i64, position: Option<f32>) {
        self.colors.push(color);
        match position {
            Some(pos) => self.positions.push(pos.clamp(0.0, 1.0)),
            None => {
                // First color anchors at 0, later ones at the end.
                if self.colors.len() == 1 {
                    self.positions.push(0.0);
                } else {
                    self.positions.push(1.0);
                }
            }
        }
    }

    pub fn remove_color_at(&mut self, index: usize) {
        if index < self.colors.len() {
            self.colors.remove(index);
            self.positions.remove(index);
        }
    }

    pub fn remove_color(&mut self, color: i64) {
        if let Some(i) = self.colors.iter().position(|&c| c == color) {
            self.remove_color_at(i);
        }
    }

    pub fn set_color(&mut self, index: usize, color: i64) {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color;
        }
    }

    pub fn set_position(&mut self, index: usize, position: f32) {
        if let Some(slot) = self.positions.get_mut(index) {
            *slot = position.clamp(0.0, 1.0);
        }
    }

    /// Re-sort stops so positions are monotonically non-decreasing.
    pub fn sort_by_position(&mut self) {
        if self.colors.len() != self.positions.len() || self.colors.is_empty() {
            return;
        }
        let mut pairs: Vec<(f32, i64)> = self
            .positions
            .iter()
            .copied()
            .zip(self.colors.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(core::cmp::Ordering::Equal));
        self.positions.clear();
        self.colors.clear();
        for (pos, color) in pairs {
            self.positions.push(pos);
            self.colors.push(color);
        }
    }

    pub fn clear(&mut self) {
        self.colors.clear();
        self.positions.clear();
    }

    pub fn set_colors(&mut self, colors: &[i64]) {
        self.colors = colors.to_vec();
        if self.positions.len() != self.colors.len() {
            self.generate_default_positions();
        }
    }

    pub fn set_rgb_colors(&mut self, colors: &[ColorRgb]) {
        self.colors = colors.iter().map(|c| i64::from(c.packed())).collect();
        if self.positions.len() != self.colors.len() {
            self.generate_default_positions();
        }
    }

    pub fn set_positions(&mut self, positions: &[f32]) {
        if positions.len() == self.colors.len() {
            self.positions = positions.iter().map(|p| p.clamp(0.0, 1.0)).collect();
        } else if !self.colors.is_empty() {
            self.generate_default_positions();
        }
    }

    pub fn colors(&self) -> &[i64] {
        &self.colors
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color_at(&self, index: usize) -> i64 {
        self.colors.get(index).copied().unwrap_or(0)
    }

    // ── Mode accessors ────────────────────────────────────────

    pub fn color_rule(&self) -> i8 {
        self.color_rule
    }

    pub fn set_color_rule(&mut self, rule: i8) {
        self.color_rule = rule;
    }

    pub fn inter_mode(&self) -> i8 {
        self.inter_mode
    }

    pub fn set_inter_mode(&mut self, mode: i8) {
        self.inter_mode = mode;
    }

    pub fn wrap_mode(&self) -> i8 {
        self.wrap_mode
    }

    pub fn set_wrap_mode(&mut self, mode: i8) {
        self.wrap_mode = mode;
    }

    pub fn segmentation(&self) -> f32 {
        self.segmentation
    }

    pub fn set_segmentation(&mut self, seg: f32) {
        self.segmentation = seg.max(0.0);
    }

    // ── Rasterisation ─────────────────────────────────────────

    /// Resolve the stop list to concrete colors, expanding the harmonic
    /// rule and randomising negative entries.
    pub fn rgb_colors(&self, rng: &mut SmallRng, ranges: &RandomRanges) -> Vec<ColorRgb> {
        let mut out = Vec::with_capacity(self.colors.len());
        match ColorRule::from_index(self.color_rule) {
            Some(rule) => {
                for &color in &self.colors {
                    rule.generate(to_rgb(color, rng, ranges), &mut out);
                }
            }
            None => {
                for &color in &self.colors {
                    out.push(to_rgb(color, rng, ranges));
                }
            }
        }
        out
    }

    /// Interpolate the stops into `max_colors` entries. With
    /// interpolation off, or fewer than two stops, the resolved stops
    /// are returned as-is.
    pub fn interpolate(
        &self,
        max_colors: u16,
        rng: &mut SmallRng,
        ranges: &RandomRanges,
    ) -> Vec<ColorRgb> {
        let stops = self.rgb_colors(rng, ranges);
        if self.inter_mode < 0 || stops.len() < 2 || max_colors == 0 {
            return stops;
        }

        let positions: Vec<f32> = if self.positions.len() == stops.len() {
            self.positions.clone()
        } else {
            even_positions(stops.len())
        };

        let mut out = Vec::with_capacity(max_colors as usize);
        for i in 0..max_colors {
            let t = if max_colors > 1 {
                f32::from(i) / f32::from(max_colors - 1)
            } else {
                0.0
            };
            out.push(sample_stops(&stops, &positions, t, self.inter_mode));
        }
        out
    }

    /// Look up a color for index `i` of `total`, honouring segmentation
    /// and the wrap mode. Out-of-range lookups without wrapping resolve
    /// to black.
    pub fn wrap_colors(
        i: usize,
        total: usize,
        colors: &[ColorRgb],
        wrap_mode: i8,
        segmentation: f32,
    ) -> ColorRgb {
        if colors.is_empty() {
            return BLACK;
        }
        let num_colors = colors.len();
        if num_colors == 1 {
            return colors[0];
        }

        let mut color_index = i;

        if segmentation > 0.0 && total > 0 {
            let segment_size = (total as f32 / segmentation).max(1.0);
            let scaled = color_index as f32 / segment_size;
            let segment_num = scaled.trunc();
            let segment_frac = scaled.fract();

            if wrap_mode == WRAP_CLAMP_TO_EDGE && segmentation >= 2.0 && segment_num >= 1.0 {
                // First segment's last color clamps every later band.
                color_index = num_colors - 1;
            } else if wrap_mode > WRAP_NOWRAP || segment_num < 1.0 {
                color_index = (segment_frac * num_colors as f32) as usize;
                if wrap_mode == WRAP_REPEAT_MIRROR && (segment_num as i64) % 2 == 1 {
                    color_index = num_colors - 1 - color_index;
                } else if wrap_mode == WRAP_REPEAT && color_index >= num_colors {
                    color_index = wrap_index(color_index, num_colors, wrap_mode);
                }
            } else {
                return BLACK;
            }
        } else if color_index >= num_colors {
            color_index = wrap_index(color_index, num_colors, wrap_mode);
        }

        colors.get(color_index).copied().unwrap_or(BLACK)
    }

    fn generate_default_positions(&mut self) {
        self.positions.clear();
        if self.colors.len() == 1 {
            self.positions.push(0.0);
        } else if self.colors.len() > 1 {
            self.positions = even_positions(self.colors.len());
        }
    }
}

fn even_positions(count: usize) -> Vec<f32> {
    (0..count)
        .map(|i| i as f32 / (count - 1) as f32)
        .collect()
}

fn to_rgb(packed: i64, rng: &mut SmallRng, ranges: &RandomRanges) -> ColorRgb {
    if packed == RANDOM_COLOR || packed < 0 {
        ColorRgb::random(rng, ranges)
    } else {
        ColorRgb::from_packed(packed as u32)
    }
}

fn sample_stops(stops: &[ColorRgb], positions: &[f32], t: f32, inter_mode: i8) -> ColorRgb {
    if t <= positions[0] {
        return stops[0];
    }
    let last = stops.len() - 1;
    if t >= positions[last] {
        return stops[last];
    }
    let mut k = 0;
    while k < last - 1 && positions[k + 1] < t {
        k += 1;
    }
    let span = positions[k + 1] - positions[k];
    let local = if span <= 0.0 { 0.0 } else { (t - positions[k]) / span };
    blend_stop(stops[k], stops[k + 1], local, inter_mode)
}

fn blend_stop(a: ColorRgb, b: ColorRgb, t: f32, inter_mode: i8) -> ColorRgb {
    match inter_mode {
        INTER_HSB => {
            // Shortest-path hue interpolation.
            let ha = a.hue();
            let hb = b.hue();
            let mut dh = hb - ha;
            if dh > 127.5 {
                dh -= 255.0;
            } else if dh < -127.5 {
                dh += 255.0;
            }
            let mut hue = ha + dh * t;
            if hue < 0.0 {
                hue += 255.0;
            } else if hue >= 255.0 {
                hue -= 255.0;
            }
            let s = a.saturation() + (b.saturation() - a.saturation()) * t;
            let v = a.brightness() + (b.brightness() - a.brightness()) * t;
            ColorRgb::from_hsb(hue, s, v)
        }
        INTER_PERCEPTUAL => {
            // Gamma-linearised RGB, smoother than raw channel lerp.
            fn lin(c: u8) -> f32 {
                (f32::from(c) / 255.0).powf(2.2)
            }
            fn enc(c: f32) -> u8 {
                (c.max(0.0).powf(1.0 / 2.2) * 255.0).min(255.0) as u8
            }
            ColorRgb::new(
                enc(lin(a.r) + (lin(b.r) - lin(a.r)) * t),
                enc(lin(a.g) + (lin(b.g) - lin(a.g)) * t),
                enc(lin(a.b) + (lin(b.b) - lin(a.b)) * t),
            )
        }
        _ => a.lerp(b, t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(1)
    }

    #[test]
    fn default_positions_are_even() {
        let p = Palette::from_colors(&[0xFF0000, 0x00FF00, 0x0000FF]);
        assert_eq!(p.positions(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn mismatched_positions_regenerate() {
        let p = Palette::from_stops(&[0xFF0000, 0x00FF00], &[0.3]);
        assert_eq!(p.positions(), &[0.0, 1.0]);
    }

    #[test]
    fn sort_by_position_orders_stops() {
        let mut p = Palette::from_stops(&[0x111111, 0x222222, 0x333333], &[0.9, 0.1, 0.5]);
        p.sort_by_position();
        assert_eq!(p.colors(), &[0x222222, 0x333333, 0x111111]);
        assert_eq!(p.positions(), &[0.1, 0.5, 0.9]);
    }

    #[test]
    fn wrap_repeat_two_color_palette() {
        let colors = [ColorRgb::new(10, 0, 0), ColorRgb::new(0, 10, 0)];
        let c = Palette::wrap_colors(2, 0, &colors, WRAP_REPEAT, 0.0);
        assert_eq!(c, colors[0]);
    }

    #[test]
    fn wrap_mirror_bounces() {
        let colors = [
            ColorRgb::new(1, 0, 0),
            ColorRgb::new(2, 0, 0),
            ColorRgb::new(3, 0, 0),
        ];
        // Period is 4: 0 1 2 1 | 0 1 2 1 ...
        assert_eq!(Palette::wrap_colors(3, 0, &colors, WRAP_REPEAT_MIRROR, 0.0), colors[1]);
        assert_eq!(Palette::wrap_colors(4, 0, &colors, WRAP_REPEAT_MIRROR, 0.0), colors[0]);
    }

    #[test]
    fn nowrap_out_of_range_is_black() {
        let colors = [ColorRgb::new(9, 9, 9), ColorRgb::new(8, 8, 8)];
        assert_eq!(Palette::wrap_colors(5, 0, &colors, WRAP_NOWRAP, 0.0), BLACK);
    }

    #[test]
    fn clamp_out_of_range_uses_last() {
        let colors = [ColorRgb::new(9, 9, 9), ColorRgb::new(8, 8, 8)];
        assert_eq!(
            Palette::wrap_colors(5, 0, &colors, WRAP_CLAMP_TO_EDGE, 0.0),
            colors[1]
        );
    }

    #[test]
    fn segmentation_repeats_bands() {
        let colors = [ColorRgb::new(1, 0, 0), ColorRgb::new(2, 0, 0)];
        // Two bands over 10 pixels: indices 0..5 map like 5..10.
        let a = Palette::wrap_colors(1, 10, &colors, WRAP_REPEAT, 2.0);
        let b = Palette::wrap_colors(6, 10, &colors, WRAP_REPEAT, 2.0);
        assert_eq!(a, b);
    }

    #[test]
    fn segmentation_without_wrap_blacks_later_bands() {
        let colors = [ColorRgb::new(1, 0, 0), ColorRgb::new(2, 0, 0)];
        assert_eq!(Palette::wrap_colors(7, 10, &colors, WRAP_NOWRAP, 2.0), BLACK);
    }

    #[test]
    fn interpolate_endpoints_match_stops() {
        let p = Palette::from_colors(&[0xFF0000, 0x0000FF]);
        let ramp = p.interpolate(10, &mut rng(), &RandomRanges::default());
        assert_eq!(ramp.len(), 10);
        assert_eq!(ramp[0], ColorRgb::from_packed(0xFF0000));
        assert_eq!(ramp[9], ColorRgb::from_packed(0x0000FF));
    }

    #[test]
    fn interpolate_off_returns_stops() {
        let mut p = Palette::from_colors(&[0xFF0000, 0x0000FF]);
        p.set_inter_mode(INTER_NONE);
        let ramp = p.interpolate(10, &mut rng(), &RandomRanges::default());
        assert_eq!(ramp.len(), 2);
    }

    #[test]
    fn rgb_interpolation_midpoint() {
        let mut p = Palette::from_colors(&[0x000000, 0xFF0000]);
        p.set_inter_mode(INTER_RGB);
        let ramp = p.interpolate(3, &mut rng(), &RandomRanges::default());
        assert!(ramp[1].r > 100 && ramp[1].r < 155);
    }

    #[test]
    fn color_rule_expands_primary() {
        let mut p = Palette::from_colors(&[0xFF0000]);
        p.set_color_rule(ColorRule::Triad as i8);
        let colors = p.rgb_colors(&mut rng(), &RandomRanges::default());
        assert_eq!(colors.len(), 3);
        assert_eq!(colors[0], ColorRgb::from_packed(0xFF0000));
    }

    #[test]
    fn random_entries_resolve_to_bright_colors() {
        let p = Palette::from_colors(&[RANDOM_COLOR]);
        let colors = p.rgb_colors(&mut rng(), &RandomRanges::default());
        assert_eq!(colors.len(), 1);
        assert!(colors[0].brightness() >= 255.0 * 0.7 - 1.0);
    }

    #[test]
    fn serde_roundtrip() {
        let mut p = Palette::from_colors(&[0xFF0000, 0x00FF00]);
        p.set_wrap_mode(WRAP_REPEAT);
        p.set_segmentation(3.0);
        let json = serde_json::to_string(&p).unwrap();
        let p2: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(p.colors(), p2.colors());
        assert_eq!(p2.wrap_mode(), WRAP_REPEAT);
        assert!((p2.segmentation() - 3.0).abs() < 1e-6);
    }
}
