//! Heptagon star installations.
//!
//! A seven-pointed star drawn from overlapping strips: an outer ring of
//! bridged star segments, a middle layer of seven 4-port intersections
//! and an inner heptagon ring. Two physical builds share the geometry:
//! the 919-pixel prototype and the 3024-pixel installation (which maps
//! logical pixels through gap tables to its shorter physical strips).

use rand::rngs::SmallRng;

use crate::behaviour::{B_FORCE_BOUNCE, B_POS_CHANGE_FADE};
use crate::config::{Group, INFINITE_DURATION, ListOrder, SimConfig};
use crate::emit::EmitParams;
use crate::graph::{ConnId, Model, NodeRef, Topology};
use crate::rnd::RandomRanges;
use crate::shapes::{MirrorPixels, Shape, default_command_params};

pub const HEPTAGON919_PIXEL_COUNT: u16 = 919;
pub const HEPTAGON3024_PIXEL_COUNT: u16 = 3024;

pub const M_DEFAULT: u8 = 0;
pub const M_STAR: u8 = 1;
pub const M_OUTER_SUN: u8 = 2;
pub const M_INNER_TRIS: u8 = 3;
pub const M_SMALL_STAR: u8 = 4;
pub const M_INNER_SUN: u8 = 5;
pub const M_SPLATTER: u8 = 6;
const M_LAST: u8 = M_SPLATTER;

/// Per-build wiring tables: pixel coordinates for the outer bridge
/// pairs and the (top, bottom) pixels of the middle and inner layers.
struct StarLayout {
    pixel_count: u16,
    outer_bridges: [(u16, u16); 7],
    middle: [(u16, i16); 7],
    inner: [(u16, i16); 7],
    gaps: &'static [(u16, u16)],
}

static LAYOUT_919: StarLayout = StarLayout {
    pixel_count: HEPTAGON919_PIXEL_COUNT,
    outer_bridges: [
        (918, 1),   // bottom
        (653, 654), // bottom left
        (389, 390), // left
        (125, 126), // top left
        (789, 791), // top right
        (522, 525), // right
        (260, 263), // bottom right
    ],
    middle: [
        (612, 42),
        (696, 347),
        (434, 81),
        (742, 172),
        (836, 478),
        (568, 218),
        (876, 304),
    ],
    inner: [
        (597, 320),
        (55, 334),
        (708, 69),
        (722, 448),
        (462, 191),
        (848, 206),
        (863, 582),
    ],
    gaps: &[],
};

static LAYOUT_3024: StarLayout = StarLayout {
    pixel_count: HEPTAGON3024_PIXEL_COUNT,
    outer_bridges: [
        (3023, 0),
        (2159, 2160),
        (1295, 1296),
        (431, 432),
        (2591, 2592),
        (1727, 1728),
        (863, 864),
    ],
    middle: [
        (2014, 138),
        (2292, 1142),
        (1428, 267),
        (2443, 566),
        (2752, 1573),
        (1869, 717),
        (2883, 1001),
    ],
    inner: [
        (1964, 1053),
        (181, 1099),
        (2330, 227),
        (2376, 1474),
        (1520, 628),
        (2790, 678),
        (2841, 1915),
    ],
    gaps: &[
        (0, 143),
        (287, 431),
        (864, 935),
        (1223, 1295),
        (2016, 2735),
        (2880, 3023),
    ],
};

/// A heptagon star build.
pub struct HeptagonStar {
    object: Topology,
}

impl HeptagonStar {
    /// The 919-pixel prototype.
    pub fn heptagon919() -> Self {
        Self {
            object: wire_star(&LAYOUT_919),
        }
    }

    /// The full 3024-pixel installation.
    pub fn heptagon3024() -> Self {
        Self {
            object: wire_star(&LAYOUT_3024),
        }
    }

    /// Index of the star segment a pixel lies on, derived from the
    /// outer bridge ring.
    pub fn star_segment_index(&self, pixel: u16) -> u8 {
        let conns = self.object.connections_in_group(0);
        let mut strip = 0;
        for i in 0..conns.len() {
            let from = self
                .object
                .intersection(self.object.connection(conns[i]).to)
                .top_pixel;
            let to = self
                .object
                .intersection(self.object.connection(conns[(i + 3) % 7]).from)
                .top_pixel;
            if pixel >= from && pixel <= to {
                strip = i as u8;
            }
        }
        strip
    }

    pub fn progress_on_star_segment(&self, path: u8, pixel: u16) -> f32 {
        let (from, to) = self.segment_span(path);
        f32::from(pixel.saturating_sub(from)) / f32::from(to - from)
    }

    pub fn pixel_on_star_segment(&self, path: u8, progress: f32) -> u16 {
        let (from, to) = self.segment_span(path);
        from + (f32::from(to - from) * progress).round() as u16
    }

    fn segment_span(&self, path: u8) -> (u16, u16) {
        let conns = self.object.connections_in_group(0);
        let path = usize::from(path) % 7;
        let from = self
            .object
            .intersection(self.object.connection(conns[path]).to)
            .top_pixel;
        let to = self
            .object
            .intersection(self.object.connection(conns[(path + 3) % 7]).from)
            .top_pixel;
        (from, to)
    }
}

impl Shape for HeptagonStar {
    fn object(&self) -> &Topology {
        &self.object
    }

    fn mirror_supported(&self) -> bool {
        true
    }

    fn mirrored_pixels(
        &self,
        pixel: u16,
        flip_emitter: Option<NodeRef>,
        rotate: bool,
    ) -> MirrorPixels {
        let mut out = MirrorPixels::new();
        let path = i32::from(self.star_segment_index(pixel));
        let progress = self.progress_on_star_segment(path as u8, pixel);

        if let Some(NodeRef::Intersection(id)) = flip_emitter {
            // Reflect about the emitter's star point using the 7-fold
            // symmetry; only outer-ring emitters (two per bridge) flip.
            let emitter_index = i32::from(id) / 2;
            if emitter_index < 7 {
                let mirror = (emitter_index + (emitter_index - path) + 11).rem_euclid(7);
                let _ = out.push(self.pixel_on_star_segment(mirror as u8, 1.0 - progress));
            }
        }
        if rotate {
            let mirror = (path + 4) % 7;
            let _ = out.push(self.pixel_on_star_segment(mirror as u8, progress));
        }
        out
    }

    fn model_params(&self, model: i32, rng: &mut SmallRng, ranges: &RandomRanges) -> EmitParams {
        if model <= i32::from(M_LAST) {
            EmitParams::with_speed(model as i8, ranges.random_speed(rng))
        } else {
            // Keys beyond the model set: star with per-point color change.
            let mut params = EmitParams::for_model(M_STAR as i8);
            params.color_change_groups |= Group::Group1.mask();
            params
        }
    }

    fn command_params(
        &self,
        command: char,
        rng: &mut SmallRng,
        ranges: &RandomRanges,
        config: &SimConfig,
    ) -> Option<EmitParams> {
        match command {
            '+' => {
                let mut params =
                    EmitParams::with_speed(M_SPLATTER as i8, ranges.random_speed(rng));
                params.linked = false;
                let frames = (ranges.max_speed / params.speed).max(0.0) as u32 + 1;
                params.duration = frames.max(1) * u32::from(config.frame_ms());
                Some(params)
            }
            '*' => {
                // Works reliably with the star model, other models
                // might or might not.
                let mut params = EmitParams::for_model(M_STAR as i8);
                params.speed = 0.0;
                params.fade_speed = 1;
                params.fade_thresh = 127;
                params.order = ListOrder::Random;
                params.behaviour_flags |= B_POS_CHANGE_FADE;
                Some(params)
            }
            '-' => {
                let mut params = EmitParams::for_model(M_STAR as i8);
                params.behaviour_flags |= B_FORCE_BOUNCE;
                Some(params)
            }
            'd' => {
                let mut params = EmitParams::with_speed(M_STAR as i8, 0.5);
                params.set_length(3);
                params.from = 1;
                params.duration = INFINITE_DURATION;
                Some(params)
            }
            _ => default_command_params(self, command, rng, ranges, config),
        }
    }
}

/// Build one star topology from its layout tables.
fn wire_star(layout: &StarLayout) -> Topology {
    let mut object = Topology::new(layout.pixel_count);
    let g1 = Group::Group1.mask();
    let g2 = Group::Group2.mask();
    let g3 = Group::Group3.mask();
    let g4 = Group::Group4.mask();

    object.add_model(Model::new(M_DEFAULT, 10, g1));
    object.add_model(Model::new(M_STAR, 0, g1));
    object.add_model(Model::with_max_length(M_OUTER_SUN, 10, g1, 602));
    object.add_model(Model::new(M_INNER_TRIS, 0, g2));
    object.add_model(Model::new(M_SMALL_STAR, 0, g2));
    object.add_model(Model::new(M_INNER_SUN, 0, g2));
    object.add_model(Model::new(M_SPLATTER, 10, g2 | g3));

    // Outer ring: seven bridged star points.
    for &(from, to) in &layout.outer_bridges {
        object.add_bridge(from, to, g1, 2);
    }

    // Middle layer.
    let mut middle = [0u8; 7];
    for (i, &(top, bottom)) in layout.middle.iter().enumerate() {
        middle[i] = object.add_intersection(4, top, bottom, g2);
    }
    for i in 0..7 {
        let outer1 = object.intersection_in_groups((i * 2 + 1) as u8, g1).unwrap();
        let outer2 = object
            .intersection_in_groups((((i + 1) * 2) % 14) as u8, g1)
            .unwrap();
        object.add_connection(outer1, middle[i], g2, None);
        object.add_connection(outer2, middle[i], g2, None);
    }

    // Inner layer.
    let mut inner = [0u8; 7];
    for (i, &(top, bottom)) in layout.inner.iter().enumerate() {
        inner[i] = object.add_intersection(4, top, bottom, g3);
    }

    let ports = |object: &Topology, id: ConnId| {
        let c = object.connection(id);
        (c.from_port, c.to_port)
    };

    // Spokes from the middle layer down to the inner ring, with the
    // star model steered by conditional weights so chains keep tracing
    // the star outline.
    for i in 0..7 {
        let m1 = middle[i];
        let m2 = middle[(i + 6) % 7];
        let c1 = object.add_connection(m1, inner[i], g3, None);
        let c2 = object.add_connection(m2, inner[i], g3, None);
        let p1 = ports(&object, c1);
        let p2 = ports(&object, c2);
        let m1_port1 = object.intersection(m1).ports[1];
        let m2_port0 = object.intersection(m2).ports[0];

        let star = object.model_mut(usize::from(M_STAR)).unwrap();
        star.put_pair(p1.0, m1_port1, 10);
        star.put_pair(p2.0, m2_port0, 10);

        let outer_sun = object.model_mut(usize::from(M_OUTER_SUN)).unwrap();
        outer_sun.put_ports(p1.0, p1.1, 0, 0);
        outer_sun.put_ports(p2.0, p2.1, 0, 0);

        let inner_tris = object.model_mut(usize::from(M_INNER_TRIS)).unwrap();
        inner_tris.put_ports(p1.0, p1.1, 10, 10);
        inner_tris.put_ports(p2.0, p2.1, 10, 10);

        let small_star = object.model_mut(usize::from(M_SMALL_STAR)).unwrap();
        small_star.put_port(p1.0, 10);
        small_star.put_port(p2.0, 10);

        let inner_sun = object.model_mut(usize::from(M_INNER_SUN)).unwrap();
        inner_sun.put_port(p1.0, 10);
        inner_sun.put_port(p2.0, 10);
        inner_sun.put_port(p1.1, 10);
        inner_sun.put_port(p2.1, 10);
    }

    // Inner heptagon ring.
    for i in 0..7 {
        let i1 = inner[i];
        let i2 = inner[(i + 1) % 7];
        let conn = object.add_connection(i1, i2, g4, None);
        let p = ports(&object, conn);
        let i1_port1 = object.intersection(i1).ports[1];
        let i2_port0 = object.intersection(i2).ports[0];

        let star = object.model_mut(usize::from(M_STAR)).unwrap();
        star.put_pair(p.0, i1_port1, 10);
        star.put_pair(p.1, i2_port0, 10);

        let small_star = object.model_mut(usize::from(M_SMALL_STAR)).unwrap();
        small_star.put_pair(p.0, i1_port1, 10);
        small_star.put_pair(p.1, i2_port0, 10);

        let outer_sun = object.model_mut(usize::from(M_OUTER_SUN)).unwrap();
        outer_sun.put_ports(p.0, p.1, 0, 0);

        let inner_tris = object.model_mut(usize::from(M_INNER_TRIS)).unwrap();
        inner_tris.put_ports(p.0, p.1, 10, 10);
    }

    for &(from, to) in layout.gaps {
        object.add_gap(from, to);
    }

    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::testutil::assert_wiring;
    use rand::SeedableRng;

    #[test]
    fn heptagon919_wiring_is_complete() {
        let star = HeptagonStar::heptagon919();
        let object = star.object();
        assert_wiring(object);
        // 14 outer bridge ends + 7 middle + 7 inner.
        assert_eq!(object.intersections().len(), 28);
        // 7 bridges + 14 spokes down + 14 spokes in + 7 ring edges.
        assert_eq!(object.connections().len(), 42);
        assert_eq!(object.model_count(), 7);
        // Middle and inner layers are fully four-ported.
        for id in 14..28 {
            assert_eq!(object.intersection(id).ports.len(), 4);
        }
    }

    #[test]
    fn outer_bridges_are_zero_length() {
        let star = HeptagonStar::heptagon919();
        for i in 0..7 {
            assert_eq!(star.object().connection(i).num_leds, 0, "bridge {i}");
        }
    }

    #[test]
    fn heptagon3024_has_gap_translation() {
        let star = HeptagonStar::heptagon3024();
        let object = star.object();
        assert!(object.real_pixel_count < object.pixel_count);
        assert!(object.is_pixel_in_gap(100));
        assert_eq!(object.translate_to_real_pixel(100), -1);
        // First pixel after the first gap lands at physical 0.
        assert_eq!(object.translate_to_real_pixel(144), 0);
        assert_eq!(object.translate_to_logical_pixel(0), 144);
    }

    #[test]
    fn star_segments_cover_points() {
        let star = HeptagonStar::heptagon919();
        for path in 0..7u8 {
            let pixel = star.pixel_on_star_segment(path, 0.5);
            let progress = star.progress_on_star_segment(path, pixel);
            assert!((progress - 0.5).abs() < 0.05, "path {path}");
        }
    }

    #[test]
    fn rotate_mirror_jumps_four_points() {
        let star = HeptagonStar::heptagon919();
        let path = star.star_segment_index(700);
        let mirrored = star.mirrored_pixels(700, None, true);
        assert_eq!(mirrored.len(), 1);
        assert_eq!(
            star.star_segment_index(mirrored[0]),
            (path + 4) % 7
        );
    }

    #[test]
    fn flip_mirror_requires_outer_emitter() {
        let star = HeptagonStar::heptagon919();
        // Outer-ring intersections flip.
        let m = star.mirrored_pixels(700, Some(NodeRef::Intersection(2)), false);
        assert_eq!(m.len(), 1);
        // Middle-layer intersections (id >= 14) do not.
        let m = star.mirrored_pixels(700, Some(NodeRef::Intersection(20)), false);
        assert!(m.is_empty());
    }

    #[test]
    fn last_model_index_is_preserved() {
        let star = HeptagonStar::heptagon919();
        let mut rng = SmallRng::seed_from_u64(1);
        let ranges = RandomRanges::default();
        let params = star.model_params(M_SPLATTER as i32, &mut rng, &ranges);
        assert_eq!(params.model, M_SPLATTER as i8);
    }

    #[test]
    fn star_command_presets() {
        let star = HeptagonStar::heptagon919();
        let mut rng = SmallRng::seed_from_u64(1);
        let ranges = RandomRanges::default();
        let config = SimConfig::default();

        let p = star.command_params('*', &mut rng, &ranges, &config).unwrap();
        assert_eq!(p.speed, 0.0);
        assert_eq!(p.order, ListOrder::Random);
        assert!(p.behaviour_flags & B_POS_CHANGE_FADE != 0);

        let p = star.command_params('-', &mut rng, &ranges, &config).unwrap();
        assert!(p.behaviour_flags & B_FORCE_BOUNCE != 0);

        let p = star.command_params('d', &mut rng, &ranges, &config).unwrap();
        assert_eq!(p.duration, INFINITE_DURATION);
        assert_eq!(p.length, Some(3));

        let p = star.command_params('+', &mut rng, &ranges, &config).unwrap();
        assert!(!p.linked);
        assert!(p.duration > 0);

        assert!(star.command_params('z', &mut rng, &ranges, &config).is_none());
    }
}
