//! Physical installation shapes.
//!
//! Each shape is a fixed, hand-authored construction of intersections,
//! connections and routing models, executed once at startup — shapes
//! are compiled-in topologies, not user data, so wiring mistakes are
//! programmer errors caught by the shape tests.
//!
//! Shapes also supply the geometry the core cannot derive from the
//! graph: mirror-pixel mapping and the per-model / per-command emission
//! presets.

pub mod cross;
pub mod heptagon;
pub mod line;
pub mod triangle;

pub use cross::Cross;
pub use heptagon::HeptagonStar;
pub use line::Line;
pub use triangle::Triangle;

use heapless::Vec as HVec;
use rand::rngs::SmallRng;

use crate::behaviour::{B_BRI_CONST_NOISE, B_RENDER_SEGMENT};
use crate::config::SimConfig;
use crate::emit::EmitParams;
use crate::graph::{NodeRef, Topology};
use crate::rnd::RandomRanges;

/// Mirror expansion of one pixel: at most one flip and one rotate image.
pub type MirrorPixels = HVec<u16, 2>;

/// A concrete installation topology plus its shape-specific geometry.
pub trait Shape {
    fn object(&self) -> &Topology;

    fn mirror_supported(&self) -> bool {
        false
    }

    /// Additional pixels receiving the same color as `pixel` under the
    /// mirror behaviours. `flip_emitter` carries the emit root when the
    /// flip behaviour is active.
    fn mirrored_pixels(
        &self,
        pixel: u16,
        flip_emitter: Option<NodeRef>,
        rotate: bool,
    ) -> MirrorPixels;

    /// Emission preset for a model index. Indices reduce modulo the
    /// model count, so every variant — the last included — stays
    /// reachable.
    fn model_params(&self, model: i32, rng: &mut SmallRng, ranges: &RandomRanges) -> EmitParams;

    /// Emission preset for a single-letter command, or `None` when the
    /// letter is not an emission.
    fn command_params(
        &self,
        command: char,
        rng: &mut SmallRng,
        ranges: &RandomRanges,
        config: &SimConfig,
    ) -> Option<EmitParams> {
        default_command_params(self, command, rng, ranges, config)
    }
}

/// The command presets every shape shares.
pub(crate) fn default_command_params<S: Shape + ?Sized>(
    shape: &S,
    command: char,
    rng: &mut SmallRng,
    ranges: &RandomRanges,
    _config: &SimConfig,
) -> Option<EmitParams> {
    match command {
        '1'..='7' => {
            let model = command as i32 - '1' as i32;
            Some(shape.model_params(model, rng, ranges))
        }
        '/' => {
            let mut params = EmitParams::default();
            params.behaviour_flags |= B_RENDER_SEGMENT;
            params.set_length(1);
            Some(params)
        }
        '?' => {
            let mut params = EmitParams::default();
            params.behaviour_flags |= B_BRI_CONST_NOISE;
            Some(params)
        }
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Wiring sanity shared by every shape test: the arena owns exactly
    /// two ports per connection and no intersection is over-ported.
    pub fn assert_wiring(object: &Topology) {
        assert_eq!(object.ports().len(), object.connections().len() * 2);
        for inter in object.intersections() {
            assert!(
                inter.ports.len() <= usize::from(inter.num_ports),
                "intersection {} is over-wired",
                inter.id
            );
        }
        for conn in object.connections() {
            assert_eq!(object.port(conn.from_port).connection, conn.id);
            assert_eq!(object.port(conn.to_port).connection, conn.id);
            assert!(!object.port(conn.from_port).direction);
            assert!(object.port(conn.to_port).direction);
        }
    }
}
