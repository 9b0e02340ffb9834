//! Graph edges spanning pixel runs between two intersections.
//!
//! A connection owns its two ports. `num_leds == 0` marks a pure
//! logical bridge: lights pass straight through to the far node and
//! never rest on it.

use crate::graph::{ConnId, InterId, NodeRef, PortId, Topology, UpdateCtx};
use crate::light::Light;

/// An edge between two intersections.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnId,
    pub from: InterId,
    pub to: InterId,
    pub from_port: PortId,
    pub to_port: PortId,
    /// Visible pixels along the edge; 0 for a bridge.
    pub num_leds: u16,
    /// `true` when pixel indices ascend from `from` toward `to`.
    pub pixel_dir: bool,
    pub from_pixel: u16,
    pub to_pixel: u16,
    pub group: u8,
}

impl Connection {
    /// Pixel index `i` steps into the edge's span, direction-aware.
    pub fn pixel_at(&self, i: i32) -> u16 {
        let step = if self.pixel_dir { 1 } else { -1 };
        (i32::from(self.from_pixel) + i * step).max(0) as u16
    }

    /// Pixel of the `from`-side intersection.
    pub fn from_intersection_pixel(&self, object: &Topology) -> u16 {
        object.intersection(self.from).top_pixel
    }

    /// Pixel of the `to`-side intersection.
    pub fn to_intersection_pixel(&self, object: &Topology) -> u16 {
        object.intersection(self.to).top_pixel
    }

    /// Place a newly emitted light on this edge, heading from the
    /// `from` end toward `to`.
    pub fn emit(&self, object: &Topology, light: &mut Light, ctx: &mut UpdateCtx<'_>) {
        light.set_out_port(Some(self.from_port), Some(self.from));
        self.add(object, light, ctx);
    }

    /// Accept a light arriving through one of this edge's ports.
    /// Bridges forward immediately; anything else takes ownership and
    /// updates in place.
    pub fn add(&self, object: &Topology, light: &mut Light, ctx: &mut UpdateCtx<'_>) {
        if self.num_leds > 0 {
            light.owner = Some(NodeRef::Connection(self.id));
            self.update(object, light, ctx);
        } else {
            self.outgoing(object, light, ctx);
        }
    }

    /// Per-frame update while this edge owns the light.
    pub fn update(&self, object: &Topology, light: &mut Light, ctx: &mut UpdateCtx<'_>) {
        light.reset_pixels();
        if self.should_expire(light, ctx) {
            light.expired = true;
            light.owner = None;
            return;
        }
        if self.render(object, light, ctx) {
            return;
        }
        self.outgoing(object, light, ctx);
    }

    fn should_expire(&self, light: &Light, ctx: &UpdateCtx<'_>) -> bool {
        let behaviour = ctx.view.behaviour;
        light.should_expire(ctx.view, ctx.now_ms)
            && (light.speed(ctx.view) == 0.0
                || behaviour.is_some_and(|b| b.expire_immediately()))
    }

    /// Render the light's pixel along the span. Returns `false` once the
    /// light has travelled past the far end.
    fn render(&self, object: &Topology, light: &mut Light, ctx: &UpdateCtx<'_>) -> bool {
        // Round away float noise before the boundary comparison.
        let pos = (light.position * 1000.0).round() / 1000.0;
        let span = f32::from(self.num_leds);
        if pos < span {
            let eased = ctx.view.ease.map(light.position, 0.0, span, 0.0, span);
            let entered_at_to = light
                .out_port
                .map(|p| object.port(p).direction)
                .unwrap_or(false);
            let led = if entered_at_to {
                (span - eased - 1.0).ceil()
            } else {
                eased.floor()
            };
            let led = (led as i32).clamp(0, i32::from(self.num_leds.saturating_sub(1)));
            light.pixel = i32::from(self.pixel_at(led));
            return true;
        }
        false
    }

    /// Push the light off the far end onto the next intersection,
    /// carrying the leftover position.
    fn outgoing(&self, object: &Topology, light: &mut Light, ctx: &mut UpdateCtx<'_>) {
        light.position -= f32::from(self.num_leds);
        let entered_at_to = light
            .out_port
            .map(|p| object.port(p).direction)
            .unwrap_or(false);
        if entered_at_to {
            light.in_port = Some(self.from_port);
        } else {
            light.in_port = Some(self.to_port);
        }
        light.set_out_port(None, None);
        let target = if entered_at_to { self.from } else { self.to };
        object.add_to_intersection(target, light, ctx);
    }
}
