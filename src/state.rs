//! Simulation root: emission, per-frame update and compositing.
//!
//! ```text
//!  emit(params) ──▶ slot array of LightLists ──▶ update() each frame
//!                                │                    │
//!                                ▼                    ▼
//!                        routing via Topology   PixelAccumulator
//!                                                     │
//!                              LED driver ◀── get_pixel(i, max_bri)
//! ```
//!
//! `update()` is called once per frame from one logical thread; all
//! routing, lifecycle and compositing work happens inline. Hardware,
//! transport and the shape geometry are injected at the call sites.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::behaviour::Behaviour;
use crate::color::ColorRgb;
use crate::config::{
    BlendMode, INFINITE_DURATION, MAX_LIGHT_LISTS, MAX_TOTAL_LIGHTS, SimConfig,
};
use crate::emit::EmitParams;
use crate::error::EmitError;
use crate::graph::{Model, NodeRef, Topology, UpdateCtx};
use crate::light::PixelSet;
use crate::list::{FrameCtx, LightList};
use crate::noise::Noise2;
use crate::palette::Palette;
use crate::palettes;
use crate::shapes::Shape;
use crate::transport::{
    InboundMessage, LightMessage, LightTransport, MAX_MESSAGES_PER_TICK, MessageRing,
};

/// Remote-list id remapping cache: bounded, oldest evicted first.
const REMOTE_MAP_CAP: usize = 8;

// ───────────────────────────────────────────────────────────────
// Pixel accumulation
// ───────────────────────────────────────────────────────────────

/// Per-pixel channel sums plus contribution counts.
///
/// NORMAL contributions increment the count and are averaged at
/// read-back; ADD and REPLACE leave the count alone; the formula modes
/// read the current average, apply their per-channel formula and
/// re-encode `value * 255 * count` so later NORMAL contributors still
/// average correctly. This asymmetry is load-bearing — downstream blend
/// math depends on it.
pub struct PixelAccumulator {
    r: Vec<u16>,
    g: Vec<u16>,
    b: Vec<u16>,
    div: Vec<u8>,
}

impl PixelAccumulator {
    pub fn new(pixel_count: u16) -> Self {
        let n = usize::from(pixel_count);
        Self {
            r: vec![0; n],
            g: vec![0; n],
            b: vec![0; n],
            div: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.div.len()
    }

    pub fn is_empty(&self) -> bool {
        self.div.is_empty()
    }

    pub fn clear(&mut self) {
        self.r.fill(0);
        self.g.fill(0);
        self.b.fill(0);
        self.div.fill(0);
    }

    /// Resolve a pixel to its final color, scaled into `[0, max_brightness]`.
    pub fn get(&self, pixel: u16, max_brightness: u8) -> ColorRgb {
        let i = usize::from(pixel);
        if i >= self.div.len() || self.div[i] == 0 {
            return ColorRgb::new(0, 0, 0);
        }
        let div = f32::from(self.div[i]);
        let scale = |sum: u16| -> u8 {
            ((f32::from(sum) / div / 255.0).min(1.0) * f32::from(max_brightness)) as u8
        };
        ColorRgb::new(scale(self.r[i]), scale(self.g[i]), scale(self.b[i]))
    }

    /// Composite one contribution under the given blend mode.
    pub fn set(&mut self, pixel: u16, color: ColorRgb, mode: BlendMode) {
        let i = usize::from(pixel);
        if i >= self.div.len() {
            return;
        }

        match mode {
            BlendMode::Normal => {
                self.r[i] = self.r[i].saturating_add(u16::from(color.r));
                self.g[i] = self.g[i].saturating_add(u16::from(color.g));
                self.b[i] = self.b[i].saturating_add(u16::from(color.b));
                self.div[i] = self.div[i].saturating_add(1);
                return;
            }
            BlendMode::Replace => {
                let count = u16::from(self.div[i]);
                self.r[i] = u16::from(color.r) * count;
                self.g[i] = u16::from(color.g) * count;
                self.b[i] = u16::from(color.b) * count;
                return;
            }
            BlendMode::Add => {
                self.r[i] = self.r[i].saturating_add(u16::from(color.r));
                self.g[i] = self.g[i].saturating_add(u16::from(color.g));
                self.b[i] = self.b[i].saturating_add(u16::from(color.b));
                return;
            }
            _ => {}
        }

        // Formula modes need the current averaged base.
        if self.div[i] == 0 {
            // Nothing underneath: the new color becomes the base.
            self.r[i] = u16::from(color.r);
            self.g[i] = u16::from(color.g);
            self.b[i] = u16::from(color.b);
            self.div[i] = 1;
            return;
        }

        let div = f32::from(self.div[i]);
        let base = [
            f32::from(self.r[i]) / div / 255.0,
            f32::from(self.g[i]) / div / 255.0,
            f32::from(self.b[i]) / div / 255.0,
        ];
        let new = [
            f32::from(color.r) / 255.0,
            f32::from(color.g) / 255.0,
            f32::from(color.b) / 255.0,
        ];

        let mut out = [0.0f32; 3];
        for c in 0..3 {
            out[c] = blend_channel(mode, base[c], new[c]);
        }

        self.r[i] = (out[0] * 255.0 * div) as u16;
        self.g[i] = (out[1] * 255.0 * div) as u16;
        self.b[i] = (out[2] * 255.0 * div) as u16;
    }
}

/// The per-channel formula for the non-accumulating blend modes, both
/// operands normalised to [0,1].
fn blend_channel(mode: BlendMode, base: f32, new: f32) -> f32 {
    match mode {
        BlendMode::Multiply => base * new,
        BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - new),
        BlendMode::Overlay => {
            if base < 0.5 {
                2.0 * base * new
            } else {
                1.0 - 2.0 * (1.0 - base) * (1.0 - new)
            }
        }
        BlendMode::Subtract => (base - new).max(0.0),
        BlendMode::Difference => (base - new).abs(),
        BlendMode::Exclusion => base + new - 2.0 * base * new,
        BlendMode::Dodge => {
            if new == 1.0 {
                1.0
            } else {
                (base / (1.0 - new)).min(1.0)
            }
        }
        BlendMode::Burn => {
            if new == 0.0 {
                0.0
            } else {
                (1.0 - (1.0 - base) / new).max(0.0)
            }
        }
        BlendMode::HardLight => {
            if new < 0.5 {
                2.0 * new * base
            } else {
                1.0 - 2.0 * (1.0 - new) * (1.0 - base)
            }
        }
        BlendMode::SoftLight => {
            if new < 0.5 {
                base - (1.0 - 2.0 * new) * base * (1.0 - base)
            } else {
                base + (2.0 * new - 1.0) * (base.sqrt() - base)
            }
        }
        BlendMode::LinearLight => {
            if new < 0.5 {
                (base + 2.0 * new - 1.0).max(0.0)
            } else {
                (base + 2.0 * (new - 0.5)).min(1.0)
            }
        }
        BlendMode::VividLight => {
            if new < 0.5 {
                if new == 0.0 {
                    0.0
                } else {
                    (1.0 - (1.0 - base) / (2.0 * new)).max(0.0)
                }
            } else if new == 1.0 {
                1.0
            } else {
                (base / (2.0 * (1.0 - new))).min(1.0)
            }
        }
        BlendMode::PinLight => {
            if new < 0.5 {
                base.min(2.0 * new)
            } else {
                base.max(2.0 * (new - 0.5))
            }
        }
        // Accumulating modes never reach here.
        BlendMode::Normal | BlendMode::Add | BlendMode::Replace => new,
    }
}

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

/// Owns all active light lists and the per-pixel compositing buffers
/// for one topology object.
pub struct State {
    config: SimConfig,
    rng: SmallRng,
    noise: Noise2,
    pixels: PixelAccumulator,
    lists: Vec<Option<Box<LightList>>>,
    next_list_id: u16,
    pub total_lights: u32,
    pub total_light_lists: u8,
    pub auto_enabled: bool,
    pub auto_params: EmitParams,
    next_emit_ms: u32,
    pub current_palette: u8,
    pub show_intersections: bool,
    pub show_connections: bool,
    /// Remote list id → local list id, oldest first.
    remote_lists: Vec<(u16, u16)>,
}

impl State {
    pub fn new(object: &Topology, config: SimConfig, seed: u64) -> Self {
        let mut auto_params = EmitParams::default();
        auto_params.speed = crate::config::RANDOM_SPEED;

        let mut state = Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
            noise: Noise2::new(seed as u32),
            pixels: PixelAccumulator::new(object.pixel_count),
            lists: (0..MAX_LIGHT_LISTS).map(|_| None).collect(),
            next_list_id: 0,
            total_lights: 0,
            total_light_lists: 0,
            auto_enabled: false,
            auto_params,
            next_emit_ms: 0,
            current_palette: 0,
            show_intersections: false,
            show_connections: false,
            remote_lists: Vec::new(),
        };
        state.setup_background(object);
        state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn list(&self, index: usize) -> Option<&LightList> {
        self.lists.get(index).and_then(|slot| slot.as_deref())
    }

    pub fn list_mut(&mut self, index: usize) -> Option<&mut LightList> {
        self.lists.get_mut(index).and_then(|slot| slot.as_deref_mut())
    }

    /// Slot 0 always holds the background fill; it is hidden rather
    /// than freed when it expires.
    fn setup_background(&mut self, object: &Topology) {
        let id = self.alloc_list_id();
        let mut bg = LightList::new_background(id, object.pixel_count);
        bg.model = Some(0);
        bg.set_duration(INFINITE_DURATION, 0);
        let palette = Palette::from_stops(&[0xFF0000], &[0.0]);
        bg.set_palette(palette, &mut self.rng, &self.config.ranges);
        self.lists[0] = Some(Box::new(bg));
        self.total_light_lists += 1;
    }

    fn alloc_list_id(&mut self) -> u16 {
        let id = self.next_list_id;
        self.next_list_id = self.next_list_id.wrapping_add(1);
        id
    }

    // ── Emission ──────────────────────────────────────────────

    /// Emit a new list (or re-seed the note's existing one). Returns
    /// the slot index; every failure leaves all slots untouched.
    pub fn emit(
        &mut self,
        object: &Topology,
        params: &EmitParams,
        now_ms: u32,
    ) -> Result<usize, EmitError> {
        let model_index = if params.model >= 0 {
            params.model as u8
        } else {
            object.random_model(&mut self.rng)
        };
        let Some(model) = object.model(usize::from(model_index)) else {
            log::warn!("emit failed, model {model_index} not found");
            return Err(EmitError::ModelNotFound(model_index));
        };

        // Validate the emit root before touching any slot.
        let behaviour = Behaviour::from_params(params);
        let emitter = self.resolve_emitter(object, model, &behaviour, params)?;

        let index = self.get_or_create_list(params, now_ms)?;
        let max_length = model.max_length(object.pixel_count);
        if let Some(list) = self.lists[index].as_deref_mut() {
            list.model = Some(model_index);
        }
        self.do_emit(emitter, index, params.emit_offset, max_length);
        Ok(index)
    }

    /// Periodic self-emission using the shared auto parameters.
    pub fn auto_emit(&mut self, object: &Topology, now_ms: u32) {
        if self.auto_enabled && self.next_emit_ms <= now_ms {
            let params = self.auto_params.clone();
            let _ = self.emit(object, &params, now_ms);
            self.next_emit_ms =
                now_ms + u32::from(self.config.ranges.random_next_emit(&mut self.rng));
        }
    }

    fn resolve_emitter(
        &mut self,
        object: &Topology,
        model: &Model,
        behaviour: &Behaviour,
        params: &EmitParams,
    ) -> Result<NodeRef, EmitError> {
        if behaviour.emit_from_connection() {
            let groups = params.emit_groups;
            let count = object.count_connections(groups);
            if count == 0 {
                log::warn!("emit failed, no connections for groups {groups}");
                return Err(EmitError::NoConnectionsForGroups(groups));
            }
            let index = params
                .emit_index()
                .unwrap_or_else(|| self.rng.gen_range(0..count));
            let conn = object
                .connection_in_groups(index % count, groups)
                .expect("count was checked above");
            Ok(NodeRef::Connection(conn))
        } else {
            let groups = params.emit_groups_or(model.emit_groups);
            let count = object.count_intersections(groups);
            if count == 0 {
                log::warn!("emit failed, no intersections for groups {groups}");
                return Err(EmitError::NoIntersectionsForGroups(groups));
            }
            let index = params
                .emit_index()
                .unwrap_or_else(|| self.rng.gen_range(0..count));
            let inter = object
                .intersection_in_groups(index % count, groups)
                .expect("count was checked above");
            Ok(NodeRef::Intersection(inter))
        }
    }

    /// Note reuse: a nonzero note id re-seeds its existing slot instead
    /// of claiming a new one.
    fn get_or_create_list(
        &mut self,
        params: &EmitParams,
        now_ms: u32,
    ) -> Result<usize, EmitError> {
        if params.note_id > 0 {
            if let Some(index) = self.find_list(params.note_id) {
                return self.setup_list_from(index, params, now_ms);
            }
        }
        for index in 0..MAX_LIGHT_LISTS {
            if self.lists[index].is_none() {
                return self.setup_list_from(index, params, now_ms);
            }
        }
        log::warn!("emit failed: no free light lists ({MAX_LIGHT_LISTS})");
        Err(EmitError::NoFreeLightLists)
    }

    fn setup_list_from(
        &mut self,
        index: usize,
        params: &EmitParams,
        now_ms: u32,
    ) -> Result<usize, EmitError> {
        let (old_len, old_lights) = match self.lists[index].as_deref() {
            Some(list) => (list.length, u32::from(list.num_lights())),
            None => (0, 0),
        };

        let mut new_len = params.resolved_length(&mut self.rng, &self.config.ranges);
        let behaviour = Behaviour::from_params(params);
        if old_len > 0 && behaviour.smooth_changes() {
            // Gradual resize: step 10% toward the requested width.
            let step = (f32::from(new_len) - f32::from(old_len)) * 0.1;
            new_len = (f32::from(old_len) + step.round()) as u16;
        }

        if self.total_lights - old_lights + u32::from(new_len) > MAX_TOTAL_LIGHTS {
            log::warn!(
                "emit failed, {} is over max {MAX_TOTAL_LIGHTS} lights",
                self.total_lights + u32::from(new_len)
            );
            return Err(EmitError::TooManyLights {
                requested: self.total_lights + u32::from(new_len),
                cap: MAX_TOTAL_LIGHTS,
            });
        }

        if self.lists[index].is_none() {
            let id = self.alloc_list_id();
            self.lists[index] = Some(Box::new(LightList::new(id)));
        }
        let Self {
            lists, rng, config, ..
        } = self;
        let list = lists[index].as_deref_mut().expect("slot was just filled");
        list.length = new_len;
        list.behaviour = Some(behaviour);
        list.setup_from(params, now_ms, rng, &config.ranges);

        if old_lights > 0 {
            self.total_lights -= old_lights;
            self.total_light_lists -= 1;
        }
        Ok(index)
    }

    fn do_emit(&mut self, emitter: NodeRef, index: usize, emit_offset: u8, max_length: u16) {
        let frame_ms = self.config.frame_ms();
        let Self {
            lists, rng, noise, ..
        } = self;
        let Some(list) = lists[index].as_deref_mut() else {
            return;
        };
        list.init_emit(emit_offset, max_length, frame_ms, rng, noise);
        list.emitter = Some(emitter);
        self.total_lights += u32::from(list.num_lights());
        self.total_light_lists += 1;
    }

    // ── Simulation ────────────────────────────────────────────

    /// One frame: advance every list, then composite all visible
    /// contributions into the pixel buffers.
    pub fn update(
        &mut self,
        shape: &dyn Shape,
        transport: &mut dyn LightTransport,
        now_ms: u32,
    ) {
        let object = shape.object();
        self.pixels.clear();

        for index in 0..MAX_LIGHT_LISTS {
            let Some(mut list) = self.lists[index].take() else {
                continue;
            };

            let all_expired = {
                let mut frame = FrameCtx {
                    now_ms,
                    rng: &mut self.rng,
                    noise: &self.noise,
                    transport: &mut *transport,
                    config: &self.config,
                };
                list.update(object, &mut frame)
            };

            if all_expired {
                if index == 0 {
                    // The background slot is hidden, never freed.
                    list.visible = false;
                    self.lists[0] = Some(list);
                    continue;
                }
                self.total_lights = self
                    .total_lights
                    .saturating_sub(u32::from(list.num_lights()));
                if self.total_light_lists > 0 {
                    self.total_light_lists -= 1;
                }
                self.remote_lists.retain(|&(_, local)| local != list.id);
                continue;
            }

            if list.visible {
                if list.is_background() {
                    for pixel in 0..object.pixel_count {
                        let color =
                            list.background_color(pixel, &mut self.rng, &self.config.ranges);
                        self.pixels.set(pixel, color, list.blend_mode);
                    }
                } else {
                    self.composite_list(shape, object, &mut list, now_ms);
                }
            }

            self.lists[index] = Some(list);
        }
    }

    /// Composite one list's live particles and advance them a frame.
    fn composite_list(
        &mut self,
        shape: &dyn Shape,
        object: &Topology,
        list: &mut LightList,
        _now_ms: u32,
    ) {
        let view = list.view();
        let model = list.model.and_then(|m| object.model(usize::from(m)));
        let max_length = model
            .map(|m| m.max_length(object.pixel_count))
            .unwrap_or(object.pixel_count);
        let behaviour = list.behaviour;
        let expand = behaviour
            .is_some_and(|b| b.render_segment() || b.fill_ease());
        let mirror = behaviour
            .is_some_and(|b| b.mirror_flip() || b.mirror_rotate());
        let mut pixel_buf = PixelSet::new();

        for j in 0..list.lights.len() {
            let Some(mut light) = list.lights[j].take() else {
                continue;
            };
            let color = light.pixel_color();

            if expand {
                let prev = if light.idx > 0 {
                    list.lights
                        .get(usize::from(light.idx) - 1)
                        .and_then(Option::as_ref)
                        .map(crate::light::Light::snapshot)
                } else {
                    None
                };
                light.collect_pixels(&view, prev.as_ref(), object, &mut pixel_buf);
                for k in 0..pixel_buf.len() {
                    self.set_pixels(shape, pixel_buf[k], color, list, behaviour, mirror);
                }
            } else if light.pixel >= 0 {
                self.set_pixels(shape, light.pixel as u16, color, list, behaviour, mirror);
            }

            light.next_frame(&view, &self.noise, &mut self.rng, max_length);
            list.lights[j] = Some(light);
        }
    }

    /// Composite one pixel plus its mirror images.
    fn set_pixels(
        &mut self,
        shape: &dyn Shape,
        pixel: u16,
        color: ColorRgb,
        list: &LightList,
        behaviour: Option<Behaviour>,
        mirror: bool,
    ) {
        self.pixels.set(pixel, color, list.blend_mode);
        if !mirror {
            return;
        }
        let Some(behaviour) = behaviour else {
            return;
        };
        let flip_emitter = if behaviour.mirror_flip() {
            list.emitter
        } else {
            None
        };
        let mirrored = shape.mirrored_pixels(pixel, flip_emitter, behaviour.mirror_rotate());
        for m in mirrored {
            self.pixels.set(m, color, list.blend_mode);
        }
    }

    /// Final per-pixel read-back for the LED driver.
    pub fn get_pixel(&self, pixel: u16, max_brightness: u8) -> ColorRgb {
        self.pixels.get(pixel, max_brightness)
    }

    // ── Note / global control ─────────────────────────────────

    pub fn find_list(&self, note_id: u16) -> Option<usize> {
        (0..MAX_LIGHT_LISTS).find(|&i| {
            self.lists[i]
                .as_deref()
                .is_some_and(|list| list.note_id == note_id)
        })
    }

    pub fn find_list_by_id(&mut self, id: u16) -> Option<&mut LightList> {
        self.lists
            .iter_mut()
            .filter_map(|slot| slot.as_deref_mut())
            .find(|list| list.id == id)
    }

    /// Note-off: the matching list fades out over the coming frames.
    pub fn stop_note(&mut self, note_id: u16, now_ms: u32) {
        if let Some(index) = self.find_list(note_id) {
            if let Some(list) = self.lists[index].as_deref_mut() {
                list.set_duration(0, now_ms);
            }
        }
    }

    pub fn stop_all(&mut self, now_ms: u32) {
        for list in self.lists.iter_mut().filter_map(|s| s.as_deref_mut()) {
            list.set_duration(0, now_ms);
        }
    }

    /// Re-color every list's palette with one random color.
    pub fn color_all(&mut self) {
        let color = i64::from(ColorRgb::random(&mut self.rng, &self.config.ranges).packed());
        for list in self.lists.iter_mut().filter_map(|s| s.as_deref_mut()) {
            list.palette.set_colors(&[color]);
        }
    }

    pub fn split_all(&mut self) {
        for list in self.lists.iter_mut().filter_map(|s| s.as_deref_mut()) {
            list.split();
        }
    }

    pub fn is_on(&self) -> bool {
        self.lists
            .iter()
            .filter_map(|s| s.as_deref())
            .any(|list| list.visible)
    }

    pub fn set_on(&mut self, on: bool) {
        if let Some(bg) = self.lists[0].as_deref_mut() {
            bg.visible = on;
        }
        if !on {
            self.auto_enabled = false;
        }
    }

    /// Resolve a command letter to the shape's emission preset.
    pub fn shape_command_params(
        &mut self,
        shape: &dyn Shape,
        command: char,
    ) -> Option<EmitParams> {
        let Self { rng, config, .. } = self;
        shape.command_params(command, rng, &config.ranges, config)
    }

    /// A color from the currently selected debug palette.
    pub fn palette_color(&mut self, index: u8, _max_brightness: u8) -> ColorRgb {
        let palette = palettes::preset(self.current_palette);
        let colors = palette.rgb_colors(&mut self.rng, &self.config.ranges);
        Palette::wrap_colors(usize::from(index), 60, &colors, palette.wrap_mode(), 0.0)
    }

    /// Log the live particle layout of every occupied slot.
    pub fn debug(&self) {
        for (i, list) in self.lists.iter().enumerate() {
            let Some(list) = list.as_deref() else { continue };
            let mut lights = String::new();
            for (j, light) in list.lights.iter().enumerate() {
                if let Some(light) = light {
                    if !light.expired {
                        lights.push_str(&format!("{j}({}), ", light.pixel));
                    }
                }
            }
            log::info!(
                "LightList {i} ({}) active lights: {lights}",
                list.num_lights()
            );
        }
    }

    // ── Remote receive path ───────────────────────────────────

    /// Drain a bounded batch of inbound remote messages.
    pub fn drain_messages(
        &mut self,
        object: &Topology,
        ring: &mut MessageRing,
        transport: &mut dyn LightTransport,
        now_ms: u32,
    ) {
        for _ in 0..MAX_MESSAGES_PER_TICK {
            let Some(message) = ring.pop() else { break };
            match message {
                InboundMessage::Light(msg) => {
                    self.receive_light(object, &msg, None, transport, now_ms);
                }
                InboundMessage::LightList(msg) => {
                    self.receive_light(object, &msg.light, Some(msg.id), transport, now_ms);
                }
            }
        }
    }

    /// Inject a light received from a peer into the target port.
    ///
    /// A list-tagged message reconstructs (or reuses) a local list for
    /// the remote list id; a plain light message requires that mapping
    /// to exist already.
    pub fn receive_light(
        &mut self,
        object: &Topology,
        msg: &LightMessage,
        remote_list_id: Option<u16>,
        transport: &mut dyn LightTransport,
        now_ms: u32,
    ) {
        let Some(port) = object.find_port(msg.port_id) else {
            log::warn!("remote light for unknown port {}", msg.port_id);
            return;
        };
        if port.is_external() {
            log::warn!("remote light targeted external port {}", msg.port_id);
            return;
        }
        let port_id = port.id;

        if self.total_lights + 1 > MAX_TOTAL_LIGHTS {
            log::warn!("remote light dropped, over max {MAX_TOTAL_LIGHTS} lights");
            return;
        }

        let index = match remote_list_id {
            Some(remote_id) => match self.adopt_remote_list(remote_id) {
                Some(index) => index,
                None => return,
            },
            None => {
                let local_id = self
                    .remote_lists
                    .iter()
                    .find(|(remote, _)| *remote == msg.list_id)
                    .map(|(_, local)| *local);
                let Some(local_id) = local_id else {
                    log::warn!("remote light for unmapped list {}", msg.list_id);
                    return;
                };
                let Some(index) = (0..MAX_LIGHT_LISTS).find(|&i| {
                    self.lists[i].as_deref().is_some_and(|l| l.id == local_id)
                }) else {
                    log::warn!("remote list {local_id} vanished");
                    return;
                };
                index
            }
        };

        let Self {
            lists,
            rng,
            noise: _,
            config,
            ..
        } = self;
        let Some(list) = lists[index].as_deref_mut() else {
            return;
        };
        let Some(slot) = list.add_light_from_msg(msg, now_ms) else {
            return;
        };
        self.total_lights += 1;

        // Route the adopted light straight into the target port.
        let view = list.view();
        let model = list.model.and_then(|m| object.model(usize::from(m)));
        let max_length = model
            .map(|m| m.max_length(object.pixel_count))
            .unwrap_or(object.pixel_count);
        if let Some(mut light) = list.take_light(slot) {
            let mut ctx = UpdateCtx {
                view: &view,
                model,
                max_length,
                prev: None,
                now_ms,
                rng,
                ranges: &config.ranges,
                transport,
            };
            object.send_out(port_id, &mut light, &mut ctx, false);
            list.return_light(slot, light);
        }
    }

    /// Create (or reuse) the local list mapped to a remote list id.
    fn adopt_remote_list(&mut self, remote_id: u16) -> Option<usize> {
        if let Some(&(_, local_id)) = self
            .remote_lists
            .iter()
            .find(|(remote, _)| *remote == remote_id)
        {
            if let Some(index) =
                (0..MAX_LIGHT_LISTS).find(|&i| {
                    self.lists[i].as_deref().is_some_and(|l| l.id == local_id)
                })
            {
                return Some(index);
            }
        }

        let index = (1..MAX_LIGHT_LISTS).find(|&i| self.lists[i].is_none())?;
        let id = self.alloc_list_id();
        let list = LightList::new(id);
        self.lists[index] = Some(Box::new(list));
        self.total_light_lists += 1;

        if self.remote_lists.len() >= REMOTE_MAP_CAP {
            self.remote_lists.remove(0);
        }
        self.remote_lists.push((remote_id, id));
        log::debug!("mapped remote list {remote_id} -> local {id}");
        Some(index)
    }
}
