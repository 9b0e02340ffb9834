//! Managed particle collections sharing emission parameters.
//!
//! A list owns a bounded slot array of particles plus the parameters
//! they share (palette, speed, fade envelope, blend mode, behaviour).
//! `lead` and `trail` slots ramp brightness linearly so chains appear
//! and disappear smoothly.
//!
//! The background kind holds zero particles: it evaluates a direct
//! position→palette color function per pixel instead, which is the
//! memory-cheap way to fill the whole installation.

use rand::Rng;
use rand::rngs::SmallRng;

use crate::behaviour::Behaviour;
use crate::color::{BLACK, ColorRgb};
use crate::config::{BlendMode, INFINITE_DURATION, ListHead, ListOrder, SimConfig};
use crate::ease::Ease;
use crate::graph::{NodeRef, Topology, UpdateCtx};
use crate::light::{Light, ListView};
use crate::noise::Noise2;
use crate::palette::Palette;
use crate::rnd::RandomRanges;
use crate::transport::{LightMessage, LightTransport};

/// Per-frame dependencies threaded through list updates.
pub struct FrameCtx<'a> {
    pub now_ms: u32,
    pub rng: &'a mut SmallRng,
    pub noise: &'a Noise2,
    pub transport: &'a mut dyn LightTransport,
    pub config: &'a SimConfig,
}

/// Normal particle list or particle-less background fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListKind {
    Normal,
    Background {
        offset: f32,
        position: f32,
        internal_time: f32,
    },
}

/// A managed group of lights sharing emission parameters.
pub struct LightList {
    pub id: u16,
    pub note_id: u16,
    pub speed: f32,
    pub ease: Ease,
    pub ease_index: u8,
    pub fade_speed: u8,
    pub fade_thresh: u8,
    pub min_bri: u8,
    pub max_bri: u8,
    pub fade_ease: Ease,
    pub fade_ease_index: u8,
    /// Absolute expiry deadline for the whole list.
    pub life_ms: u32,
    pub order: ListOrder,
    pub head: ListHead,
    pub linked: bool,
    pub model: Option<u8>,
    pub behaviour: Option<Behaviour>,
    /// Requested chain length before trail splitting.
    pub length: u16,
    pub lead: u16,
    pub trail: u16,
    pub lights: Vec<Option<Light>>,
    pub emitter: Option<NodeRef>,
    pub num_emitted: u16,
    pub num_splits: u8,
    /// Rasterised per-light color ramp.
    pub colors: Vec<ColorRgb>,
    pub palette: Palette,
    pub visible: bool,
    pub editable: bool,
    pub blend_mode: BlendMode,
    /// Requested duration in milliseconds (before deadline conversion).
    pub duration: u32,
    pub kind: ListKind,
}

impl LightList {
    pub fn new(id: u16) -> Self {
        Self {
            id,
            note_id: 0,
            speed: crate::config::DEFAULT_SPEED,
            ease: Ease::NONE,
            ease_index: 0,
            fade_speed: 0,
            fade_thresh: 0,
            min_bri: 0,
            max_bri: 255,
            fade_ease: Ease::NONE,
            fade_ease_index: 0,
            life_ms: 0,
            order: ListOrder::Sequential,
            head: ListHead::Front,
            linked: true,
            model: None,
            behaviour: None,
            length: 0,
            lead: 0,
            trail: 0,
            lights: Vec::new(),
            emitter: None,
            num_emitted: 0,
            num_splits: 0,
            colors: Vec::new(),
            palette: Palette::new(),
            visible: true,
            editable: false,
            blend_mode: BlendMode::Normal,
            duration: 1000,
            kind: ListKind::Normal,
        }
    }

    /// The always-present background fill list.
    pub fn new_background(id: u16, pixel_count: u16) -> Self {
        let mut list = Self::new(id);
        list.kind = ListKind::Background {
            offset: 0.0,
            position: 0.0,
            internal_time: 0.0,
        };
        list.speed = 0.0;
        list.length = pixel_count;
        list.life_ms = INFINITE_DURATION;
        list.editable = true;
        list
    }

    pub fn is_background(&self) -> bool {
        matches!(self.kind, ListKind::Background { .. })
    }

    pub fn num_lights(&self) -> u16 {
        self.lights.len() as u16
    }

    /// The list-shared parameter view particles consult.
    pub fn view(&self) -> ListView {
        ListView {
            id: self.id,
            speed: self.speed,
            ease: self.ease,
            fade_speed: self.fade_speed,
            fade_thresh: self.fade_thresh,
            fade_ease: self.fade_ease,
            min_bri: self.min_bri,
            life_ms: self.life_ms,
            behaviour: self.behaviour,
        }
    }

    // ── Parameter setters ─────────────────────────────────────

    pub fn set_speed(&mut self, speed: f32, ease_index: u8) {
        self.speed = speed;
        self.ease_index = ease_index;
        self.ease = Ease::from_index(ease_index);
    }

    pub fn set_fade(&mut self, fade_speed: u8, fade_thresh: u8, fade_ease_index: u8) {
        self.fade_speed = fade_speed;
        self.fade_thresh = fade_thresh;
        self.fade_ease_index = fade_ease_index;
        self.fade_ease = Ease::from_index(fade_ease_index);
    }

    /// Distribute the trail reservation around the chain head.
    pub fn set_lead_trail(&mut self, trail: u16) {
        match self.head {
            ListHead::Front => {
                let mut trail = trail;
                if trail > 0 {
                    self.lead = 1;
                    trail -= 1;
                }
                self.trail = trail;
            }
            ListHead::Back => {
                self.lead = trail;
            }
            ListHead::Middle => {
                self.lead = trail / 2;
                self.trail = trail.div_ceil(2);
            }
        }
    }

    /// Set the remaining lifetime, converting to an absolute deadline
    /// for the list and every live particle.
    pub fn set_duration(&mut self, duration_ms: u32, now_ms: u32) {
        self.duration = duration_ms;
        let deadline = now_ms.saturating_add(duration_ms).min(INFINITE_DURATION);
        self.life_ms = deadline;
        for light in self.lights.iter_mut().flatten() {
            light.life_ms = deadline;
        }
    }

    /// Replace the palette and re-rasterise the per-light color ramp.
    pub fn set_palette(&mut self, palette: Palette, rng: &mut SmallRng, ranges: &RandomRanges) {
        self.palette = palette;
        let count = if self.is_background() {
            self.length
        } else {
            self.num_lights()
        };
        self.colors = self.palette.interpolate(count, rng, ranges);
        self.apply_light_colors();
    }

    /// Color for chain slot `i`, honouring wrap and segmentation.
    pub fn light_color(&self, i: usize) -> ColorRgb {
        let total = if self.is_background() {
            usize::from(self.length)
        } else {
            self.lights.len()
        };
        Palette::wrap_colors(
            i,
            total,
            &self.colors,
            self.palette.wrap_mode(),
            self.palette.segmentation(),
        )
    }

    fn apply_light_colors(&mut self) {
        if self.lights.is_empty() {
            return;
        }
        for i in 0..self.lights.len() {
            let color = self.light_color(i);
            if let Some(light) = &mut self.lights[i] {
                light.color = color;
            }
        }
    }

    // ── Allocation ────────────────────────────────────────────

    /// Brightness multiplier ramping over the lead-in and trail-out.
    pub fn bri_mult(&self, i: u16, total: u16) -> f32 {
        let body = total - self.lead - self.trail;
        if i < self.lead {
            (255.0 / f32::from(self.lead + 1)) * f32::from(i + 1) / 255.0
        } else if i >= self.lead + body {
            let j = i - (self.lead + body);
            (255.0 - (255.0 / f32::from(self.trail + 1)) * f32::from(j + 1)) / 255.0
        } else {
            1.0
        }
    }

    /// Allocate `lead + body + trail` particle slots with the envelope
    /// multiplier applied to each particle's peak brightness.
    pub fn setup(&mut self, body: u16, max_bri: u8) {
        if self.is_background() {
            self.length = body;
            self.max_bri = max_bri;
            return;
        }
        self.max_bri = max_bri;
        let total = self.lead + body + self.trail;
        self.lights.clear();
        self.num_emitted = 0;
        self.lights.reserve(usize::from(total));
        for i in 0..total {
            let mult = self.bri_mult(i, total);
            let idx = if self.linked { i } else { 0 };
            let bri = (f32::from(max_bri) * mult) as u8;
            self.lights.push(Some(Light::new(idx, bri, self.speed, self.life_ms)));
        }
    }

    /// Configure from an emission request. `length` must already hold
    /// the resolved chain length.
    pub fn setup_from(
        &mut self,
        params: &crate::emit::EmitParams,
        now_ms: u32,
        rng: &mut SmallRng,
        ranges: &RandomRanges,
    ) {
        self.order = params.order;
        self.head = params.head;
        self.linked = params.linked;
        self.min_bri = params.min_bri;

        let speed = params.resolved_speed(rng, ranges);
        self.set_speed(speed, params.ease);
        self.set_fade(params.fade_speed, params.fade_thresh, params.fade_ease);
        self.note_id = params.note_id;

        let num_trail = if params.speed == 0.0 {
            params.trail
        } else {
            params.speed_trail(self.speed, self.length, ranges)
        };
        let max_bri = params.resolved_max_bri();
        let body = (i32::from(self.length) - i32::from(num_trail)).max(1) as u16;
        self.set_lead_trail(num_trail);

        self.duration = params.resolved_duration(rng, ranges);
        let palette = params.palette.clone();

        // Full re-seed: fresh particles, deadline, color ramp.
        self.num_splits = 0;
        self.setup(body, max_bri);
        self.set_duration(self.duration, now_ms);
        self.set_palette(palette, rng, ranges);
    }

    /// Seed per-particle position, brightness and life offsets.
    pub fn init_emit(
        &mut self,
        pos_offset: u8,
        max_length: u16,
        frame_ms: u16,
        rng: &mut SmallRng,
        noise: &Noise2,
    ) {
        let total = self.num_lights();
        for i in 0..usize::from(total) {
            let speed = self.speed;
            let order = self.order;
            let fade_thresh = self.fade_thresh;
            let id = self.id;
            let Some(light) = &mut self.lights[i] else {
                continue;
            };

            // Position: staggered behind the head, or scattered.
            let mut position = if speed != 0.0 {
                -(i as f32)
            } else {
                f32::from(total) - 1.0 - i as f32
            };
            if order == ListOrder::Random {
                position = rng.gen_range(0..max_length.max(1)) as f32;
            }
            light.position = position + f32::from(pos_offset);

            match order {
                ListOrder::Random => {
                    if fade_thresh > 0 {
                        light.bri = rng.gen_range(0..u16::from(fade_thresh) * 3);
                    }
                }
                ListOrder::Noise => {
                    light.bri =
                        (noise.get(f32::from(id) * 10.0, i as f32 * 100.0) * 255.0) as u16;
                }
                _ => {}
            }

            // Sequential chains stagger their deadlines so the tail
            // expires in emission order.
            if order == ListOrder::Sequential && light.speed > 0.0 {
                let offset = (1.0 / light.speed * i as f32).ceil() * f32::from(frame_ms);
                light.life_ms = light.life_ms.saturating_add(offset as u32).min(INFINITE_DURATION);
            }
        }
    }

    /// Release pending particles onto the emitter, stopping at the
    /// first particle whose staggered start has not arrived. Bounds the
    /// per-frame routing-graph entry cost.
    fn do_emit(&mut self, object: &Topology, frame: &mut FrameCtx<'_>) {
        let Some(emitter) = self.emitter else {
            log::warn!("list {} emit skipped: no emitter", self.id);
            return;
        };
        let view = self.view();
        let model = self.model.and_then(|m| object.model(usize::from(m)));
        let max_length = model
            .map(|m| m.max_length(object.pixel_count))
            .unwrap_or(object.pixel_count);

        while usize::from(self.num_emitted) < self.lights.len() {
            let slot = usize::from(self.num_emitted);
            let Some(mut light) = self.lights[slot].take() else {
                break;
            };
            if light.position < 0.0 {
                self.lights[slot] = Some(light);
                break;
            }
            self.num_emitted += 1;
            let prev = self.prev_snapshot(&light);
            let mut ctx = UpdateCtx {
                view: &view,
                model,
                max_length,
                prev,
                now_ms: frame.now_ms,
                rng: &mut *frame.rng,
                ranges: &frame.config.ranges,
                transport: &mut *frame.transport,
            };
            object.emit_at(emitter, &mut light, &mut ctx);
            self.lights[slot] = Some(light);
        }
    }

    fn prev_snapshot(&self, light: &Light) -> Option<crate::light::PrevLight> {
        if light.idx == 0 {
            return None;
        }
        self.lights
            .get(usize::from(light.idx) - 1)
            .and_then(Option::as_ref)
            .map(Light::snapshot)
    }

    /// One frame of lifecycle + routing. Returns `true` when every slot
    /// is empty or expired.
    pub fn update(&mut self, object: &Topology, frame: &mut FrameCtx<'_>) -> bool {
        if let ListKind::Background { .. } = self.kind {
            return self.update_background(frame.now_ms);
        }

        self.do_emit(object, frame);

        let view = self.view();
        let model = self.model.and_then(|m| object.model(usize::from(m)));
        let max_length = model
            .map(|m| m.max_length(object.pixel_count))
            .unwrap_or(object.pixel_count);

        let mut all_expired = true;
        for j in 0..self.lights.len() {
            let Some(mut light) = self.lights[j].take() else {
                continue;
            };
            if light.expired {
                // Retire: the successor becomes the new chain head so
                // its predecessor lookups stay valid.
                let next = usize::from(light.idx) + 1;
                if next < self.lights.len() {
                    if let Some(next_light) = &mut self.lights[next] {
                        next_light.idx = 0;
                    }
                }
                continue;
            }
            all_expired = false;
            let prev = self.prev_snapshot(&light);
            let mut ctx = UpdateCtx {
                view: &view,
                model,
                max_length,
                prev,
                now_ms: frame.now_ms,
                rng: &mut *frame.rng,
                ranges: &frame.config.ranges,
                transport: &mut *frame.transport,
            };
            object.update_light(&mut light, &mut ctx);
            self.lights[j] = Some(light);
        }
        all_expired
    }

    fn update_background(&mut self, now_ms: u32) -> bool {
        if self.life_ms > 0 && now_ms > self.life_ms {
            return true;
        }
        let speed = self.speed;
        let length = self.length;
        let ease = self.ease;
        let ease_index = self.ease_index;
        let ListKind::Background {
            offset,
            position,
            internal_time,
        } = &mut self.kind
        else {
            return false;
        };

        *internal_time += speed;
        while *internal_time > 1000.0 {
            *internal_time -= 1000.0;
        }
        while *internal_time < 0.0 {
            *internal_time += 1000.0;
        }

        if ease_index == 0 {
            *position = *offset + *internal_time % f32::from(length.max(1));
        } else {
            let cycle = (*internal_time % 100.0) / 100.0;
            let eased = ease.map(cycle, 0.0, 1.0, 0.0, 1.0);
            *position = *offset + eased * f32::from(length);
        }
        false
    }

    /// Direct per-pixel color for the background fill.
    pub fn background_color(
        &self,
        pixel: u16,
        rng: &mut SmallRng,
        ranges: &RandomRanges,
    ) -> ColorRgb {
        if self
            .behaviour
            .is_some_and(|b| b.random_color())
        {
            return ColorRgb::random(rng, ranges);
        }
        if self.colors.is_empty() {
            return BLACK;
        }
        let ListKind::Background { position, .. } = self.kind else {
            return BLACK;
        };
        let length = self.length.max(1);
        let index = (position + f32::from(pixel)).max(0.0) as u32 % u32::from(length);
        let color = self.light_color(index as usize);
        if self.max_bri < 255 {
            color.dim(self.max_bri)
        } else {
            color
        }
    }

    // ── Note / offset / split surface ─────────────────────────

    /// Break the linked chain into `num_splits + 1` visually distinct
    /// runs by resetting chain heads at even spacing.
    pub fn split(&mut self) {
        self.num_splits += 1;
        let total = self.num_lights();
        if u16::from(self.num_splits) >= total {
            return;
        }
        for i in 0..self.num_splits {
            let at = u16::from(i + 1) * (total / (u16::from(self.num_splits) + 1));
            if let Some(Some(light)) = self.lights.get_mut(usize::from(at)) {
                light.idx = 0;
            }
        }
    }

    /// Position of the list (the first particle, or the background
    /// scroll offset).
    pub fn offset(&self) -> f32 {
        if let ListKind::Background { offset, .. } = self.kind {
            return offset;
        }
        self.lights
            .first()
            .and_then(Option::as_ref)
            .map(|l| l.position)
            .unwrap_or(0.0)
    }

    /// Move every particle so the first sits at `new_position`.
    pub fn set_offset(&mut self, new_position: f32) {
        if let ListKind::Background { offset, .. } = &mut self.kind {
            *offset = new_position;
            return;
        }
        let Some(first) = self.lights.first().and_then(Option::as_ref) else {
            return;
        };
        let delta = new_position - first.position;
        for light in self.lights.iter_mut().flatten() {
            light.position += delta;
        }
    }

    /// Adopt a light received from a peer device into the first free
    /// slot. Returns the slot index, or `None` when the list is full.
    pub fn add_light_from_msg(&mut self, msg: &LightMessage, now_ms: u32) -> Option<usize> {
        let mut light = Light::new(msg.light_idx, msg.brightness, msg.speed, 0);
        light.life_ms = now_ms.saturating_add(msg.life).min(INFINITE_DURATION);
        light.color = msg.color();
        light.bri = u16::from(msg.brightness);
        let slot = self.lights.iter().position(Option::is_none);
        match slot {
            Some(slot) => {
                self.lights[slot] = Some(light);
                Some(slot)
            }
            None => {
                self.lights.push(Some(light));
                Some(self.lights.len() - 1)
            }
        }
    }

    /// Take a light out for routing, returning it afterwards with
    /// [`Self::return_light`]. Used by the remote receive path.
    pub(crate) fn take_light(&mut self, slot: usize) -> Option<Light> {
        self.lights.get_mut(slot).and_then(Option::take)
    }

    pub(crate) fn return_light(&mut self, slot: usize, light: Light) {
        if let Some(entry) = self.lights.get_mut(slot) {
            *entry = Some(light);
        }
    }
}
