//! A triangle of three strips, each divided into five sub-segments.

use rand::rngs::SmallRng;

use crate::config::Group;
use crate::emit::EmitParams;
use crate::graph::{ConnId, Model, NodeRef, Topology};
use crate::rnd::RandomRanges;
use crate::shapes::{MirrorPixels, Shape};

pub const TRIANGLE_PIXEL_COUNT: u16 = 900;

pub const T_DEFAULT: u8 = 0;
pub const T_CLOCKWISE: u8 = 1;
pub const T_COUNTER_CLOCKWISE: u8 = 2;
const T_MODEL_COUNT: i32 = 3;

/// Three sides, each split into five equal sub-segments by mid
/// intersections. The vertices carry the two adjacent sides' pixels.
pub struct Triangle {
    object: Topology,
    segment_size: u16,
    seg_starts: [u16; 3],
    seg_ends: [u16; 3],
}

impl Triangle {
    pub fn new(pixel_count: u16) -> Self {
        let segment_size = pixel_count / 3;
        let sub = segment_size / 5;
        let seg_starts = [0, segment_size, 2 * segment_size];
        let seg_ends = [segment_size - 1, 2 * segment_size - 1, pixel_count - 1];

        let mut object = Topology::new(pixel_count);
        let g1 = Group::Group1.mask();

        object.add_model(Model::new(T_DEFAULT, 10, g1));
        object.add_model(Model::new(T_CLOCKWISE, 10, g1));
        object.add_model(Model::new(T_COUNTER_CLOCKWISE, 10, g1));

        // Vertices carry both adjacent sides' end pixels.
        let vertex1 = object.add_intersection(2, seg_starts[0], seg_ends[2] as i16, g1);
        let vertex2 = object.add_intersection(2, seg_ends[0], seg_starts[1] as i16, g1);
        let vertex3 = object.add_intersection(2, seg_ends[1], seg_starts[2] as i16, g1);

        let mut mids = [[0u8; 4]; 3];
        for side in 0..3 {
            for m in 0..4 {
                mids[side][m] = object.add_intersection(
                    2,
                    seg_starts[side] + (m as u16 + 1) * sub,
                    0,
                    g1,
                );
            }
        }

        let bridge1 = object.add_bridge(seg_ends[0], seg_starts[1], g1, 2);
        let bridge2 = object.add_bridge(seg_ends[1], seg_starts[2], g1, 2);
        let bridge3 = object.add_bridge(seg_ends[2], seg_starts[0], g1, 2);
        let bridges = [bridge1, bridge2, bridge3];

        let corners = [vertex1, vertex2, vertex3];
        let mut side_conns: Vec<ConnId> = Vec::with_capacity(15);
        for side in 0..3 {
            let start = corners[side];
            let end = corners[(side + 1) % 3];
            side_conns.push(object.add_connection(start, mids[side][0], g1, Some(sub)));
            for m in 0..3 {
                side_conns.push(object.add_connection(
                    mids[side][m],
                    mids[side][m + 1],
                    g1,
                    Some(sub),
                ));
            }
            side_conns.push(object.add_connection(mids[side][3], end, g1, Some(sub)));
        }

        let ports = |object: &Topology, id: ConnId| {
            let c = object.connection(id);
            (c.from_port, c.to_port)
        };

        for &conn in &side_conns {
            let p = ports(&object, conn);
            object
                .model_mut(usize::from(T_DEFAULT))
                .unwrap()
                .put_ports(p.0, p.1, 10, 10);
            object
                .model_mut(usize::from(T_CLOCKWISE))
                .unwrap()
                .put_ports(p.0, p.1, 10, 10);
            object
                .model_mut(usize::from(T_COUNTER_CLOCKWISE))
                .unwrap()
                .put_ports(p.0, p.1, 0, 0);
        }
        for &bridge in &bridges {
            let p = ports(&object, bridge);
            object
                .model_mut(usize::from(T_DEFAULT))
                .unwrap()
                .put_ports(p.0, p.1, 0, 0);
            object
                .model_mut(usize::from(T_CLOCKWISE))
                .unwrap()
                .put_ports(p.0, p.1, 10, 10);
            object
                .model_mut(usize::from(T_COUNTER_CLOCKWISE))
                .unwrap()
                .put_ports(p.0, p.1, 10, 10);
        }

        Self {
            object,
            segment_size,
            seg_starts,
            seg_ends,
        }
    }

    /// Which side (1-based) a pixel lies on.
    pub fn segment_for_pixel(&self, pixel: u16) -> u8 {
        if pixel <= self.seg_ends[0] {
            1
        } else if pixel <= self.seg_ends[1] {
            2
        } else {
            3
        }
    }

    pub fn progress_on_segment(&self, pixel: u16, segment: u8) -> f32 {
        let idx = usize::from(segment.clamp(1, 3) - 1);
        f32::from(pixel.saturating_sub(self.seg_starts[idx]))
            / f32::from(self.seg_ends[idx] - self.seg_starts[idx])
    }

    pub fn pixel_on_segment(&self, progress: f32, segment: u8) -> u16 {
        let idx = usize::from(segment.clamp(1, 3) - 1);
        self.seg_starts[idx]
            + (progress * f32::from(self.seg_ends[idx] - self.seg_starts[idx])).round() as u16
    }

    pub fn segment_size(&self) -> u16 {
        self.segment_size
    }
}

impl Default for Triangle {
    fn default() -> Self {
        Self::new(TRIANGLE_PIXEL_COUNT)
    }
}

impl Shape for Triangle {
    fn object(&self) -> &Topology {
        &self.object
    }

    fn mirror_supported(&self) -> bool {
        true
    }

    fn mirrored_pixels(
        &self,
        pixel: u16,
        _flip_emitter: Option<NodeRef>,
        rotate: bool,
    ) -> MirrorPixels {
        let mut out = MirrorPixels::new();
        if rotate {
            // Rotate to the next side, reflected.
            let segment = self.segment_for_pixel(pixel);
            let progress = self.progress_on_segment(pixel, segment);
            let mirrored = match segment {
                1 => 2,
                2 => 3,
                _ => 1,
            };
            let _ = out.push(self.pixel_on_segment(1.0 - progress, mirrored));
        }
        out
    }

    fn model_params(&self, model: i32, rng: &mut SmallRng, ranges: &RandomRanges) -> EmitParams {
        let model = (model.rem_euclid(T_MODEL_COUNT)) as i8;
        EmitParams::with_speed(model, ranges.random_speed(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::testutil::assert_wiring;
    use rand::SeedableRng;

    #[test]
    fn wiring_is_complete() {
        let tri = Triangle::default();
        assert_wiring(tri.object());
        // 3 vertices + 12 midpoints + 6 bridge endpoints.
        assert_eq!(tri.object().intersections().len(), 21);
        // 3 bridges + 15 side sub-segments.
        assert_eq!(tri.object().connections().len(), 18);
    }

    #[test]
    fn side_connections_have_equal_length() {
        let tri = Triangle::default();
        for conn in tri.object().connections().iter().skip(3) {
            assert_eq!(conn.num_leds, 60);
        }
    }

    #[test]
    fn segment_classification() {
        let tri = Triangle::default();
        assert_eq!(tri.segment_for_pixel(0), 1);
        assert_eq!(tri.segment_for_pixel(299), 1);
        assert_eq!(tri.segment_for_pixel(300), 2);
        assert_eq!(tri.segment_for_pixel(899), 3);
    }

    #[test]
    fn mirror_rotates_to_next_side() {
        let tri = Triangle::default();
        let m = tri.mirrored_pixels(0, None, true);
        // Start of side 1 maps to the end of side 2.
        assert_eq!(m.as_slice(), &[599]);
    }

    #[test]
    fn last_model_index_is_preserved() {
        let tri = Triangle::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let ranges = RandomRanges::default();
        let params = tri.model_params(T_COUNTER_CLOCKWISE as i32, &mut rng, &ranges);
        assert_eq!(params.model, T_COUNTER_CLOCKWISE as i8);
    }
}
