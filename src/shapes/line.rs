//! A single LED strip with a wrap-around bridge.

use rand::rngs::SmallRng;

use crate::config::Group;
use crate::emit::EmitParams;
use crate::graph::{Model, NodeRef, Topology};
use crate::rnd::RandomRanges;
use crate::shapes::{MirrorPixels, Shape};

pub const LINE_PIXEL_COUNT: u16 = 300;

pub const L_DEFAULT: u8 = 0;
pub const L_BOUNCE: u8 = 1;
const L_MODEL_COUNT: i32 = 2;

/// A straight strip: two intersections joined by the physical run and a
/// zero-length bridge closing the loop.
pub struct Line {
    object: Topology,
}

impl Line {
    pub fn new(pixel_count: u16) -> Self {
        let mut object = Topology::new(pixel_count);
        let g1 = Group::Group1.mask();

        object.add_model(Model::new(L_DEFAULT, 10, g1));
        object.add_model(Model::new(L_BOUNCE, 10, g1));

        // Bridge from the last pixel back to the first.
        let bridge = object.add_bridge(pixel_count - 1, 0, g1, 2);
        // Physical connection covering the full line.
        let line_conn = object.add_connection(1, 0, g1, Some(pixel_count - 3));

        let bridge_ports = {
            let c = object.connection(bridge);
            (c.from_port, c.to_port)
        };
        let line_ports = {
            let c = object.connection(line_conn);
            (c.from_port, c.to_port)
        };
        let bounce = object.model_mut(usize::from(L_BOUNCE)).unwrap();
        bounce.put_ports(bridge_ports.0, bridge_ports.1, 0, 0);
        bounce.put_ports(line_ports.0, line_ports.1, 10, 10);

        Self { object }
    }

    pub fn progress_on_line(&self, pixel: u16) -> f32 {
        f32::from(pixel) / f32::from(self.object.pixel_count - 1)
    }

    pub fn pixel_on_line(&self, progress: f32) -> u16 {
        (progress * f32::from(self.object.pixel_count - 1)).round() as u16
    }
}

impl Default for Line {
    fn default() -> Self {
        Self::new(LINE_PIXEL_COUNT)
    }
}

impl Shape for Line {
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
            // Reflect across the middle of the line.
            let progress = self.progress_on_line(pixel);
            let _ = out.push(self.pixel_on_line(1.0 - progress));
        }
        out
    }

    fn model_params(&self, model: i32, rng: &mut SmallRng, ranges: &RandomRanges) -> EmitParams {
        let model = (model.rem_euclid(L_MODEL_COUNT)) as i8;
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
        let line = Line::default();
        assert_wiring(line.object());
        assert_eq!(line.object().intersections().len(), 2);
        assert_eq!(line.object().connections().len(), 2);
        assert_eq!(line.object().model_count(), 2);
    }

    #[test]
    fn bridge_is_zero_length() {
        let line = Line::default();
        assert_eq!(line.object().connection(0).num_leds, 0);
        assert_eq!(
            line.object().connection(1).num_leds,
            LINE_PIXEL_COUNT - 3
        );
    }

    #[test]
    fn mirror_reflects_across_midpoint() {
        let line = Line::default();
        let mirrored = line.mirrored_pixels(0, None, true);
        assert_eq!(mirrored.as_slice(), &[LINE_PIXEL_COUNT - 1]);
        let center = line.mirrored_pixels(150, None, true);
        assert_eq!(center.as_slice(), &[149]);
    }

    #[test]
    fn mirror_without_rotate_is_empty() {
        let line = Line::default();
        assert!(line.mirrored_pixels(10, None, false).is_empty());
    }

    #[test]
    fn last_model_index_is_preserved() {
        let line = Line::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let ranges = RandomRanges::default();
        let params = line.model_params(L_BOUNCE as i32, &mut rng, &ranges);
        assert_eq!(params.model, L_BOUNCE as i8);
    }
}
