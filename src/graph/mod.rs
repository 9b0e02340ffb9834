//! Topology graph: intersections, connections, ports and models.
//!
//! ```text
//!          ┌──────────── Topology (arena) ────────────┐
//!          │ intersections[]  connections[]  ports[]  │
//!          │ models[]         group lists    gaps[]   │
//!          └──────────────────────────────────────────┘
//!             ▲ id            ▲ id           ▲ id
//! ```
//!
//! Every element is owned by the arena and addressed by a small integer
//! handle; node ownership of a light is a [`NodeRef`] sum type. The port
//! arena doubles as the reverse-lookup registry remote messages use, and
//! empties with the topology — nothing global survives it.

pub mod connection;
pub mod intersection;
pub mod model;
pub mod port;

pub use connection::Connection;
pub use intersection::Intersection;
pub use model::{Model, Weight};
pub use port::{Port, PortId, PortKind};

use rand::Rng;
use rand::rngs::SmallRng;

use crate::config::MAX_GROUPS;
use crate::light::{Light, ListView, PrevLight};
use crate::rnd::RandomRanges;
use crate::transport::{DeviceId, LightMessage, LightTransport};

pub type InterId = u8;
pub type ConnId = u8;

/// Handle to the graph node currently owning a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Intersection(InterId),
    Connection(ConnId),
}

/// A run of logical pixels with no physical LED behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelGap {
    pub from_pixel: u16,
    pub to_pixel: u16,
}

/// Everything a routing step needs besides the topology itself.
pub struct UpdateCtx<'a> {
    pub view: &'a ListView,
    pub model: Option<&'a Model>,
    /// Model travel limit resolved against the installation size.
    pub max_length: u16,
    /// Snapshot of the chain predecessor, when the light has one.
    pub prev: Option<PrevLight>,
    pub now_ms: u32,
    pub rng: &'a mut SmallRng,
    pub ranges: &'a RandomRanges,
    pub transport: &'a mut dyn LightTransport,
}

/// The topology graph of one installation.
pub struct Topology {
    pub pixel_count: u16,
    pub real_pixel_count: u16,
    intersections: Vec<Intersection>,
    connections: Vec<Connection>,
    ports: Vec<Port>,
    models: Vec<Option<Model>>,
    inter_groups: [Vec<InterId>; MAX_GROUPS],
    conn_groups: [Vec<ConnId>; MAX_GROUPS],
    gaps: Vec<PixelGap>,
}

impl Topology {
    pub fn new(pixel_count: u16) -> Self {
        Self {
            pixel_count,
            real_pixel_count: pixel_count,
            intersections: Vec::new(),
            connections: Vec::new(),
            ports: Vec::new(),
            models: Vec::new(),
            inter_groups: Default::default(),
            conn_groups: Default::default(),
            gaps: Vec::new(),
        }
    }

    // ── Construction ──────────────────────────────────────────

    pub fn add_model(&mut self, model: Model) -> u8 {
        let id = model.id;
        while self.models.len() <= usize::from(id) {
            self.models.push(None);
        }
        self.models[usize::from(id)] = Some(model);
        id
    }

    pub fn add_intersection(
        &mut self,
        num_ports: u8,
        top_pixel: u16,
        bottom_pixel: i16,
        group: u8,
    ) -> InterId {
        let id = self.intersections.len() as InterId;
        self.intersections
            .push(Intersection::new(id, num_ports, top_pixel, bottom_pixel, group));
        for bit in 0..MAX_GROUPS {
            if group & (1 << bit) != 0 {
                self.inter_groups[bit].push(id);
                break;
            }
        }
        id
    }

    /// Wire an edge between two intersections, creating both ports.
    /// Without `force_num_leds` the visible length is derived from the
    /// nearest pixel span, considering the dual-layer pixels of either
    /// end.
    pub fn add_connection(
        &mut self,
        from: InterId,
        to: InterId,
        group: u8,
        force_num_leds: Option<u16>,
    ) -> ConnId {
        let conn_id = self.connections.len() as ConnId;

        let from_port = self.create_port(conn_id, from, false, group);
        let to_port = self.create_port(conn_id, to, true, group);

        let from_top = i32::from(self.intersections[usize::from(from)].top_pixel);
        let to_top = i32::from(self.intersections[usize::from(to)].top_pixel);
        let from_bottom = i32::from(self.intersections[usize::from(from)].bottom_pixel);
        let to_bottom = i32::from(self.intersections[usize::from(to)].bottom_pixel);

        let mut pixel_dir = to_top > from_top;
        let mut from_pixel = from_top + if pixel_dir { 1 } else { -1 };
        let mut to_pixel = to_top - if pixel_dir { 1 } else { -1 };

        let num_leds = match force_num_leds {
            Some(n) => n,
            None => {
                let diff = (from_pixel - to_pixel).abs();
                let mut leds =
                    if diff > 4 && diff < i32::from(self.pixel_count) - 4 { diff + 1 } else { 0 };
                if from_bottom > -1 && (from_bottom - to_top).abs() < leds {
                    pixel_dir = to_top > from_bottom;
                    from_pixel = from_bottom + if pixel_dir { 1 } else { -1 };
                    to_pixel = to_top - if pixel_dir { 1 } else { -1 };
                    leds = (from_pixel - to_pixel).abs() + 1;
                }
                if to_bottom > -1 && (from_top - to_bottom).abs() < leds {
                    pixel_dir = to_bottom > from_top;
                    from_pixel = from_top + if pixel_dir { 1 } else { -1 };
                    to_pixel = to_bottom - if pixel_dir { 1 } else { -1 };
                    leds = (from_pixel - to_pixel).abs() + 1;
                }
                if from_bottom > -1 && to_bottom > -1 && (from_bottom - to_bottom).abs() < leds {
                    pixel_dir = to_bottom > from_bottom;
                    from_pixel = from_bottom + if pixel_dir { 1 } else { -1 };
                    to_pixel = to_bottom - if pixel_dir { 1 } else { -1 };
                    leds = (from_pixel - to_pixel).abs() + 1;
                }
                leds.max(0) as u16
            }
        };

        self.connections.push(Connection {
            id: conn_id,
            from,
            to,
            from_port,
            to_port,
            num_leds,
            pixel_dir,
            from_pixel: from_pixel.max(0) as u16,
            to_pixel: to_pixel.max(0) as u16,
            group,
        });
        for bit in 0..MAX_GROUPS {
            if group & (1 << bit) != 0 {
                self.conn_groups[bit].push(conn_id);
                break;
            }
        }
        conn_id
    }

    /// Zero-length logical joint between two pixel positions.
    pub fn add_bridge(&mut self, from_pixel: u16, to_pixel: u16, group: u8, num_ports: u8) -> ConnId {
        let from = self.add_intersection(num_ports, from_pixel, -1, group);
        let to = self.add_intersection(num_ports, to_pixel, -1, group);
        self.add_connection(from, to, group, None)
    }

    /// Attach an external port marshalling lights to `device`'s port
    /// `target_id`. The port belongs to `connection` like any other.
    pub fn add_external_port(
        &mut self,
        connection: ConnId,
        intersection: InterId,
        direction: bool,
        group: u8,
        device: DeviceId,
        target_id: PortId,
    ) -> PortId {
        let id = self.ports.len() as PortId;
        self.ports.push(Port {
            id,
            connection,
            intersection,
            direction,
            group,
            kind: PortKind::External { device, target_id },
        });
        self.intersections[usize::from(intersection)].attach_port(id);
        id
    }

    fn create_port(&mut self, connection: ConnId, intersection: InterId, direction: bool, group: u8) -> PortId {
        let id = self.ports.len() as PortId;
        self.ports.push(Port {
            id,
            connection,
            intersection,
            direction,
            group,
            kind: PortKind::Internal,
        });
        self.intersections[usize::from(intersection)].attach_port(id);
        id
    }

    /// Mark a logical pixel run as having no physical LEDs.
    pub fn add_gap(&mut self, from_pixel: u16, to_pixel: u16) {
        self.gaps.push(PixelGap {
            from_pixel,
            to_pixel,
        });
        let gap_pixels: u16 = self
            .gaps
            .iter()
            .map(|g| g.to_pixel - g.from_pixel + 1)
            .sum();
        self.real_pixel_count = self.pixel_count - gap_pixels;
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn intersection(&self, id: InterId) -> &Intersection {
        &self.intersections[usize::from(id)]
    }

    pub fn connection(&self, id: ConnId) -> &Connection {
        &self.connections[usize::from(id)]
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[usize::from(id)]
    }

    /// Reverse lookup used by the remote receive path.
    pub fn find_port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(usize::from(id))
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn model(&self, index: usize) -> Option<&Model> {
        self.models.get(index).and_then(Option::as_ref)
    }

    pub fn model_mut(&mut self, index: usize) -> Option<&mut Model> {
        self.models.get_mut(index).and_then(Option::as_mut)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn random_model(&self, rng: &mut SmallRng) -> u8 {
        if self.models.is_empty() {
            0
        } else {
            rng.gen_range(0..self.models.len()) as u8
        }
    }

    /// Connections of group `bit` in wiring order.
    pub fn connections_in_group(&self, bit: usize) -> &[ConnId] {
        &self.conn_groups[bit]
    }

    pub fn count_intersections(&self, groups: u8) -> u8 {
        let mut count = 0;
        for bit in 0..MAX_GROUPS {
            if groups == 0 || groups & (1 << bit) != 0 {
                count += self.inter_groups[bit].len() as u8;
            }
        }
        count
    }

    pub fn count_connections(&self, groups: u8) -> u8 {
        let mut count = 0;
        for bit in 0..MAX_GROUPS {
            if groups == 0 || groups & (1 << bit) != 0 {
                count += self.conn_groups[bit].len() as u8;
            }
        }
        count
    }

    /// The `i`-th intersection among the groups in `groups`, walking
    /// group layers in mask order.
    pub fn intersection_in_groups(&self, mut i: u8, groups: u8) -> Option<InterId> {
        for bit in 0..MAX_GROUPS {
            if groups == 0 || groups & (1 << bit) != 0 {
                let list = &self.inter_groups[bit];
                if usize::from(i) < list.len() {
                    return Some(list[usize::from(i)]);
                }
                i -= list.len() as u8;
            }
        }
        None
    }

    pub fn connection_in_groups(&self, mut i: u8, groups: u8) -> Option<ConnId> {
        for bit in 0..MAX_GROUPS {
            if groups == 0 || groups & (1 << bit) != 0 {
                let list = &self.conn_groups[bit];
                if usize::from(i) < list.len() {
                    return Some(list[usize::from(i)]);
                }
                i -= list.len() as u8;
            }
        }
        None
    }

    // ── Gap translation ───────────────────────────────────────

    pub fn is_pixel_in_gap(&self, logical: u16) -> bool {
        self.gaps
            .iter()
            .any(|g| logical >= g.from_pixel && logical <= g.to_pixel)
    }

    /// Map a logical pixel to its physical strip index, or -1 when the
    /// pixel sits inside a gap.
    pub fn translate_to_real_pixel(&self, logical: u16) -> i32 {
        if self.gaps.is_empty() {
            return i32::from(logical);
        }
        let mut real = i32::from(logical);
        for gap in &self.gaps {
            if logical > gap.to_pixel {
                real -= i32::from(gap.to_pixel - gap.from_pixel + 1);
            } else if logical >= gap.from_pixel {
                return -1;
            }
        }
        real
    }

    pub fn translate_to_logical_pixel(&self, real: u16) -> u16 {
        let mut logical = real;
        for gap in &self.gaps {
            if logical >= gap.from_pixel {
                logical += gap.to_pixel - gap.from_pixel + 1;
            }
        }
        logical
    }

    // ── Light routing ─────────────────────────────────────────

    /// Place a newly emitted light at a node.
    pub fn emit_at(
        &self,
        node: NodeRef,
        light: &mut Light,
        ctx: &mut UpdateCtx<'_>,
    ) {
        match node {
            NodeRef::Intersection(id) => {
                let behaviour = ctx.view.behaviour;
                self.intersection(id).emit(self, light, behaviour.as_ref());
            }
            NodeRef::Connection(id) => self.connection(id).emit(self, light, ctx),
        }
    }

    /// One frame of routing for a light owned by a node.
    pub fn update_light(&self, light: &mut Light, ctx: &mut UpdateCtx<'_>) {
        match light.owner {
            Some(NodeRef::Intersection(id)) => self.intersection(id).update(self, light, ctx),
            Some(NodeRef::Connection(id)) => self.connection(id).update(self, light, ctx),
            None => {}
        }
        light.brightness = light.compute_brightness(ctx.view);
    }

    /// Hand a light back onto an intersection (synchronous; bridges may
    /// cascade further immediately).
    pub(crate) fn add_to_intersection(
        &self,
        id: InterId,
        light: &mut Light,
        ctx: &mut UpdateCtx<'_>,
    ) {
        light.owner = Some(NodeRef::Intersection(id));
        self.intersection(id).update(self, light, ctx);
    }

    /// Send a light out through a port.
    pub(crate) fn send_out(
        &self,
        port_id: PortId,
        light: &mut Light,
        ctx: &mut UpdateCtx<'_>,
        send_list: bool,
    ) {
        let port = self.port(port_id);
        match port.kind {
            PortKind::Internal => {
                self.handle_color_change(port.group, light, ctx);
                self.connection(port.connection).add(self, light, ctx);
            }
            PortKind::External { device, target_id } => {
                light.expired = true;
                let msg = LightMessage::from_light(
                    light,
                    target_id,
                    ctx.view.id,
                    light.speed(ctx.view),
                    ctx.now_ms,
                );
                if !ctx.transport.send_light(&device, target_id, &msg, send_list) {
                    log::debug!("external send to port {target_id} dropped");
                }
            }
        }
    }

    /// Apply the color-change behaviour when crossing into a matching
    /// group: linked followers copy their predecessor's color, chain
    /// heads roll a fresh one.
    fn handle_color_change(&self, group: u8, light: &mut Light, ctx: &mut UpdateCtx<'_>) {
        let Some(behaviour) = ctx.view.behaviour else {
            return;
        };
        if behaviour.color_change_groups & group == 0 {
            return;
        }
        light.color = match &ctx.prev {
            Some(prev) => prev.color,
            None => crate::color::ColorRgb::new(
                ctx.rng.gen_range(0..=255),
                ctx.rng.gen_range(0..=255),
                ctx.rng.gen_range(0..=255),
            ),
        };
    }
}
