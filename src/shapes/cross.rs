//! Two crossing strips sharing a centre intersection.

use rand::rngs::SmallRng;

use crate::config::Group;
use crate::emit::EmitParams;
use crate::graph::{Model, NodeRef, Topology};
use crate::rnd::RandomRanges;
use crate::shapes::{MirrorPixels, Shape};

pub const CROSS_PIXEL_COUNT: u16 = 288;

pub const C_DEFAULT: u8 = 0;
pub const C_HORIZONTAL: u8 = 1;
pub const C_VERTICAL: u8 = 2;
pub const C_DIAGONAL: u8 = 3;
const C_MODEL_COUNT: i32 = 4;

/// Two strips of equal length crossing at their midpoints. The centre
/// is a four-port intersection carrying one pixel of each strip.
pub struct Cross {
    object: Topology,
    h_start: u16,
    h_end: u16,
    v_start: u16,
    v_end: u16,
}

impl Cross {
    pub fn new(pixel_count: u16) -> Self {
        let h_start = 0;
        let h_end = pixel_count / 2 - 1;
        let v_start = pixel_count / 2;
        let v_end = pixel_count - 1;
        let h_cross = pixel_count / 4;
        let v_cross = pixel_count / 4 * 3;

        let mut object = Topology::new(pixel_count);
        let g1 = Group::Group1.mask();

        object.add_model(Model::new(C_DEFAULT, 10, g1));
        object.add_model(Model::new(C_HORIZONTAL, 0, g1));
        object.add_model(Model::new(C_VERTICAL, 0, g1));
        object.add_model(Model::new(C_DIAGONAL, 10, g1));

        // Long-way runs joining each strip's ends (intersections 0..3).
        let h_bridge = object.add_bridge(h_end, h_start, g1, 3);
        let v_bridge = object.add_bridge(v_end, v_start, g1, 3);
        // Zero-length diagonal joints between the strip ends.
        let d1_bridge = object.add_connection(2, 0, g1, Some(0));
        let d2_bridge = object.add_connection(1, 3, g1, Some(0));

        // The crossing point (intersection 4).
        let center = object.add_intersection(4, h_cross, v_cross as i16, g1);

        let quarter = pixel_count / 4 - 3;
        let h_conn1 = object.add_connection(1, center, g1, Some(quarter));
        let h_conn2 = object.add_connection(center, 0, g1, Some(quarter));
        let v_conn1 = object.add_connection(3, center, g1, Some(quarter));
        let v_conn2 = object.add_connection(center, 2, g1, Some(quarter));

        let ports = |object: &Topology, id| {
            let c = object.connection(id);
            (c.from_port, c.to_port)
        };
        let d1 = ports(&object, d1_bridge);
        let d2 = ports(&object, d2_bridge);
        let hb = ports(&object, h_bridge);
        let vb = ports(&object, v_bridge);
        let h1 = ports(&object, h_conn1);
        let h2 = ports(&object, h_conn2);
        let v1 = ports(&object, v_conn1);
        let v2 = ports(&object, v_conn2);

        let default = object.model_mut(usize::from(C_DEFAULT)).unwrap();
        default.put_ports(d1.0, d1.1, 0, 0);
        default.put_ports(d2.0, d2.1, 0, 0);

        let horizontal = object.model_mut(usize::from(C_HORIZONTAL)).unwrap();
        horizontal.put_ports(hb.0, hb.1, 10, 10);
        horizontal.put_ports(h1.0, h1.1, 10, 10);
        horizontal.put_ports(h2.0, h2.1, 10, 10);

        let vertical = object.model_mut(usize::from(C_VERTICAL)).unwrap();
        vertical.put_ports(vb.0, vb.1, 10, 10);
        vertical.put_ports(v1.0, v1.1, 10, 10);
        vertical.put_ports(v2.0, v2.1, 10, 10);

        let diagonal = object.model_mut(usize::from(C_DIAGONAL)).unwrap();
        diagonal.put_ports(hb.0, hb.1, 0, 0);
        diagonal.put_ports(vb.0, vb.1, 0, 0);

        Self {
            object,
            h_start,
            h_end,
            v_start,
            v_end,
        }
    }

    fn is_vertical(&self, pixel: u16) -> bool {
        pixel >= self.v_start && pixel <= self.v_end
    }

    pub fn progress_on_line(&self, pixel: u16, vertical: bool) -> f32 {
        if vertical {
            f32::from(pixel - self.v_start) / f32::from(self.v_end - self.v_start)
        } else {
            f32::from(pixel) / f32::from(self.h_end - self.h_start)
        }
    }

    pub fn pixel_on_line(&self, progress: f32, vertical: bool) -> u16 {
        if vertical {
            self.v_start + (progress * f32::from(self.v_end - self.v_start)).round() as u16
        } else {
            (progress * f32::from(self.h_end)).round() as u16
        }
    }
}

impl Default for Cross {
    fn default() -> Self {
        Self::new(CROSS_PIXEL_COUNT)
    }
}

impl Shape for Cross {
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
            // Reflect along whichever strip the pixel lies on.
            let vertical = self.is_vertical(pixel);
            let progress = self.progress_on_line(pixel, vertical);
            let _ = out.push(self.pixel_on_line(1.0 - progress, vertical));
        }
        out
    }

    fn model_params(&self, model: i32, rng: &mut SmallRng, ranges: &RandomRanges) -> EmitParams {
        let model = (model.rem_euclid(C_MODEL_COUNT)) as i8;
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
        let cross = Cross::default();
        assert_wiring(cross.object());
        assert_eq!(cross.object().intersections().len(), 5);
        assert_eq!(cross.object().connections().len(), 8);
    }

    #[test]
    fn diagonal_joints_are_bridges() {
        let cross = Cross::default();
        assert_eq!(cross.object().connection(2).num_leds, 0);
        assert_eq!(cross.object().connection(3).num_leds, 0);
    }

    #[test]
    fn center_has_four_ports() {
        let cross = Cross::default();
        assert_eq!(cross.object().intersection(4).ports.len(), 4);
    }

    #[test]
    fn mirror_reflects_on_own_axis() {
        let cross = Cross::default();
        // Horizontal pixel reflects within the horizontal strip.
        let m = cross.mirrored_pixels(0, None, true);
        assert_eq!(m.as_slice(), &[143]);
        // Vertical pixel reflects within the vertical strip.
        let m = cross.mirrored_pixels(144, None, true);
        assert_eq!(m.as_slice(), &[287]);
    }

    #[test]
    fn last_model_index_is_preserved() {
        let cross = Cross::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let ranges = RandomRanges::default();
        let params = cross.model_params(C_DIAGONAL as i32, &mut rng, &ranges);
        assert_eq!(params.model, C_DIAGONAL as i8);
    }
}
