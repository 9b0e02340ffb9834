//! Introspection helpers for the visualizer and serial console.
//!
//! Precomputes per-pixel classification maps (intersection pixels,
//! connection end pixels, model-weighted pixels) at construction and
//! keeps rolling frame-rate / emits-per-frame averages over a fixed
//! window.

use crate::graph::Topology;

/// Rolling-average window, in frames.
pub const AVG_FPS_FRAMES: usize = 120;

pub struct Debugger {
    inter_pixels: Vec<bool>,
    conn_pixels: Vec<bool>,
    /// One map per model: pixels of intersections carrying explicit
    /// weights.
    weight_pixels: Vec<Vec<bool>>,
    fps: [f32; AVG_FPS_FRAMES],
    num_emits: [u16; AVG_FPS_FRAMES],
    fps_index: usize,
    emits_index: usize,
    prev_ms: u32,
}

impl Debugger {
    pub fn new(object: &Topology) -> Self {
        let n = usize::from(object.pixel_count);
        let mut inter_pixels = vec![false; n];
        let mut conn_pixels = vec![false; n];

        for inter in object.intersections() {
            inter_pixels[usize::from(inter.top_pixel)] = true;
            if inter.bottom_pixel >= 0 {
                inter_pixels[inter.bottom_pixel as usize] = true;
            }
        }
        for conn in object.connections() {
            conn_pixels[usize::from(conn.from_pixel)] = true;
            conn_pixels[usize::from(conn.to_pixel)] = true;
        }

        let mut weight_pixels = Vec::with_capacity(object.model_count());
        for m in 0..object.model_count() {
            let mut map = vec![false; n];
            if let Some(model) = object.model(m) {
                for port_id in model.weighted_ports() {
                    let inter = object.port(port_id).intersection;
                    map[usize::from(object.intersection(inter).top_pixel)] = true;
                }
            }
            weight_pixels.push(map);
        }

        Self {
            inter_pixels,
            conn_pixels,
            weight_pixels,
            fps: [0.0; AVG_FPS_FRAMES],
            num_emits: [0; AVG_FPS_FRAMES],
            fps_index: 0,
            emits_index: 0,
            prev_ms: 0,
        }
    }

    /// Record a frame boundary.
    pub fn update(&mut self, now_ms: u32) {
        let dt = now_ms.saturating_sub(self.prev_ms).max(1);
        self.fps[self.fps_index] = 1000.0 / dt as f32;
        self.fps_index = (self.fps_index + 1) % AVG_FPS_FRAMES;
        self.emits_index = (self.emits_index + 1) % AVG_FPS_FRAMES;
        self.num_emits[self.emits_index] = 0;
        self.prev_ms = now_ms;
    }

    /// Record one emission in the current frame.
    pub fn count_emit(&mut self) {
        self.num_emits[self.emits_index] += 1;
    }

    /// Average frame rate over the window.
    pub fn fps(&self) -> f32 {
        self.fps.iter().sum::<f32>() / AVG_FPS_FRAMES as f32
    }

    /// Average emissions per frame over the window.
    pub fn emits_per_frame(&self) -> f32 {
        f32::from(self.num_emits.iter().sum::<u16>()) / AVG_FPS_FRAMES as f32
    }

    pub fn is_intersection(&self, pixel: u16) -> bool {
        self.inter_pixels
            .get(usize::from(pixel))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_connection(&self, pixel: u16) -> bool {
        self.conn_pixels
            .get(usize::from(pixel))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_model_weight(&self, model: u8, pixel: u16) -> bool {
        self.weight_pixels
            .get(usize::from(model))
            .and_then(|map| map.get(usize::from(pixel)))
            .copied()
            .unwrap_or(false)
    }

    pub fn dump_connections(&self, object: &Topology) {
        log::info!("--- CONNECTIONS ---");
        for conn in object.connections() {
            log::info!(
                "Connection{} {} - {} ({} leds)",
                conn.id,
                conn.from_pixel,
                conn.to_pixel,
                conn.num_leds
            );
        }
    }

    pub fn dump_intersections(&self, object: &Topology) {
        log::info!("--- INTERSECTIONS ---");
        for inter in object.intersections() {
            log::info!("Intersection{} pixel {}", inter.id, inter.top_pixel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Line, Shape};

    #[test]
    fn classifies_line_pixels() {
        let line = Line::default();
        let debugger = Debugger::new(line.object());
        // Bridge intersections sit at the strip ends.
        assert!(debugger.is_intersection(299));
        assert!(debugger.is_intersection(0));
        assert!(!debugger.is_intersection(150));
        // Connection bounds flank the ends.
        assert!(debugger.is_connection(1));
        assert!(debugger.is_connection(298));
    }

    #[test]
    fn model_weight_pixels_follow_weighted_ports() {
        let line = Line::default();
        let debugger = Debugger::new(line.object());
        // The bounce model weights both connections, whose ports sit on
        // the two end intersections.
        assert!(debugger.is_model_weight(1, 299));
        assert!(debugger.is_model_weight(1, 0));
        // The default model has no explicit weights.
        assert!(!debugger.is_model_weight(0, 299));
    }

    #[test]
    fn fps_averages_over_window() {
        let line = Line::default();
        let mut debugger = Debugger::new(line.object());
        let mut now = 0;
        for _ in 0..AVG_FPS_FRAMES {
            now += 20;
            debugger.update(now);
        }
        // 20 ms per frame is 50 fps.
        assert!((debugger.fps() - 50.0).abs() < 1.0);
    }

    #[test]
    fn emit_counter_rolls_with_window() {
        let line = Line::default();
        let mut debugger = Debugger::new(line.object());
        debugger.update(16);
        debugger.count_emit();
        debugger.count_emit();
        assert!(debugger.emits_per_frame() > 0.0);
    }
}
