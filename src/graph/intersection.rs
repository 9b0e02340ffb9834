//! Graph nodes where routing decisions happen.
//!
//! An intersection holds back-references to the ports its connections
//! attached (the connections own them). While a light crosses the node
//! it rests on `top_pixel`; once its position passes 1.0 the node picks
//! an outgoing port — repeating a linked predecessor's choice when one
//! is remembered, otherwise drawing from the model's weight table.

use heapless::Vec as HVec;
use rand::Rng;

use crate::behaviour::Behaviour;
use crate::graph::model::Model;
use crate::graph::{InterId, NodeRef, PortId, Topology, UpdateCtx};
use crate::light::Light;

/// A graph node with 2 to 4 attached ports.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: InterId,
    pub num_ports: u8,
    pub top_pixel: u16,
    /// Second-layer pixel for dual-layer shapes, -1 when absent.
    pub bottom_pixel: i16,
    pub group: u8,
    pub ports: HVec<PortId, 4>,
}

impl Intersection {
    pub(crate) fn new(id: InterId, num_ports: u8, top_pixel: u16, bottom_pixel: i16, group: u8) -> Self {
        Self {
            id,
            num_ports,
            top_pixel,
            bottom_pixel,
            group,
            ports: HVec::new(),
        }
    }

    /// Attach a port as its connection is wired. Each of the `num_ports`
    /// slots is filled exactly once; overflow is a wiring error.
    pub(crate) fn attach_port(&mut self, port: PortId) {
        debug_assert!(
            self.ports.len() < usize::from(self.num_ports),
            "intersection {} already has {} ports",
            self.id,
            self.ports.len()
        );
        if self.ports.push(port).is_err() {
            log::warn!("intersection {} port overflow", self.id);
        }
    }

    /// Place a newly emitted light at this node. Two-port nodes aim the
    /// light so it leaves through the physical side: the zero-length
    /// bridge becomes the in-port (or the LED side when bounce is
    /// forced), so the first hop goes the other way.
    pub fn emit(&self, object: &Topology, light: &mut Light, behaviour: Option<&Behaviour>) {
        if self.num_ports == 2 {
            let force = behaviour.is_some_and(Behaviour::force_bounce);
            for &port_id in &self.ports {
                let conn = object.connection(object.port(port_id).connection);
                let matches = if force {
                    conn.num_leds > 0
                } else {
                    conn.num_leds == 0
                };
                if matches {
                    light.in_port = Some(port_id);
                    break;
                }
            }
        }
        light.owner = Some(NodeRef::Intersection(self.id));
    }

    /// Per-frame update while this node owns the light.
    pub fn update(&self, object: &Topology, light: &mut Light, ctx: &mut UpdateCtx<'_>) {
        if light.expired {
            return;
        }
        light.reset_pixels();

        if light.should_expire(ctx.view, ctx.now_ms) {
            if light.speed(ctx.view) == 0.0 || light.position >= 1.0 {
                light.expired = true;
                light.owner = None;
            }
            return;
        }

        if light.position >= 0.0 && light.position < 1.0 {
            // Resting on the node while crossing it.
            light.pixel = i32::from(self.top_pixel);
            return;
        }

        // Crossing finished: pick where to go next.
        let mut send_list = false;
        let mut port = self.prev_out_port(ctx);
        if port.is_none() {
            port = self.choose_port(ctx.model, light, ctx);
            send_list = port.is_some_and(|p| object.port(p).is_external());
        }

        light.set_out_port(port, Some(self.id));
        light.in_port = None;
        light.position -= 1.0;
        light.owner = None;

        if let Some(port_id) = port {
            object.send_out(port_id, light, ctx, send_list);
        }
    }

    /// The out-port a linked predecessor took here, if remembered.
    fn prev_out_port(&self, ctx: &UpdateCtx<'_>) -> Option<PortId> {
        ctx.prev.as_ref().and_then(|prev| prev.out_port_for(self.id))
    }

    fn sum_weights(&self, model: Option<&Model>, incoming: Option<PortId>) -> u16 {
        let Some(model) = model else { return 0 };
        self.ports
            .iter()
            .map(|&port| u16::from(model.get(port, incoming)))
            .sum()
    }

    /// Uniform fallback when no weights apply. Excludes the incoming
    /// port unless bounce is forced, in which case it *is* the pick.
    fn random_port(
        &self,
        incoming: Option<PortId>,
        behaviour: Option<&Behaviour>,
        ctx: &mut UpdateCtx<'_>,
    ) -> Option<PortId> {
        if self.ports.is_empty() {
            return None;
        }
        let force = behaviour.is_some_and(|b| !b.allow_bounce() && b.force_bounce());
        if force {
            return incoming.or_else(|| {
                Some(self.ports[ctx.rng.gen_range(0..self.ports.len())])
            });
        }
        loop {
            let port = self.ports[ctx.rng.gen_range(0..self.ports.len())];
            if Some(port) != incoming || self.ports.len() == 1 {
                return Some(port);
            }
        }
    }

    /// Weighted-random port choice with fixed-order cumulative buckets.
    /// Deterministic given a fixed RNG stream.
    fn choose_port(
        &self,
        model: Option<&Model>,
        light: &Light,
        ctx: &mut UpdateCtx<'_>,
    ) -> Option<PortId> {
        let incoming = light.in_port;
        let sum = self.sum_weights(model, incoming);
        if sum == 0 {
            let behaviour = ctx.view.behaviour;
            return self.random_port(incoming, behaviour.as_ref(), ctx);
        }
        let model = model.expect("nonzero weight sum requires a model");
        let mut draw = ctx.rng.gen_range(0..sum);
        for &port in &self.ports {
            let w = u16::from(model.get(port, incoming));
            if Some(port) == incoming || w == 0 {
                continue;
            }
            if draw < w {
                return Some(port);
            }
            draw -= w;
        }
        None
    }
}
