//! A single traversing light particle.
//!
//! The particle itself is plain data; which brightness/expiry formulas
//! apply depends on whether its list carries a behaviour. Lists created
//! by `emit()` always do; background and remote-adopted lists do not
//! and use the eased min/max brightness mapping instead.

use heapless::Vec as HVec;
use rand::Rng;
use rand::rngs::SmallRng;

use crate::behaviour::Behaviour;
use crate::color::ColorRgb;
use crate::config::{CONNECTION_MAX_LEDS, INFINITE_DURATION, OUT_PORTS_MEMORY};
use crate::ease::Ease;
use crate::graph::{NodeRef, PortId, Topology};
use crate::noise::Noise2;

/// Scratch capacity for one particle's resolved pixels: a full segment
/// render plus its two end intersections.
pub const MAX_LIGHT_PIXELS: usize = CONNECTION_MAX_LEDS + 2;

pub type PixelSet = HVec<u16, MAX_LIGHT_PIXELS>;

/// Immutable view of the list-shared parameters a particle consults
/// every frame.
#[derive(Debug, Clone)]
pub struct ListView {
    pub id: u16,
    pub speed: f32,
    pub ease: Ease,
    pub fade_speed: u8,
    pub fade_thresh: u8,
    pub fade_ease: Ease,
    pub min_bri: u8,
    pub life_ms: u32,
    pub behaviour: Option<Behaviour>,
}

/// Snapshot of a chain predecessor, taken before the successor updates.
#[derive(Debug, Clone, Copy)]
pub struct PrevLight {
    pub out_ports: [Option<(u8, PortId)>; OUT_PORTS_MEMORY],
    pub color: ColorRgb,
    pub pixel: i32,
    pub owner: Option<NodeRef>,
}

impl PrevLight {
    /// The out-port this predecessor took at the given intersection, if
    /// it is still remembered.
    pub fn out_port_for(&self, intersection_id: u8) -> Option<PortId> {
        self.out_ports
            .iter()
            .flatten()
            .find(|(id, _)| *id == intersection_id)
            .map(|(_, port)| *port)
    }
}

/// One light particle.
#[derive(Debug, Clone)]
pub struct Light {
    /// Chain index; reset to 0 when the predecessor retires.
    pub idx: u16,
    pub max_bri: u8,
    pub in_port: Option<PortId>,
    pub out_port: Option<PortId>,
    /// Last out-ports taken, keyed by intersection id, newest first.
    pub out_ports: [Option<(u8, PortId)>; OUT_PORTS_MEMORY],
    /// Pixel rendered this frame, -1 when off-strip.
    pub pixel: i32,
    pub expired: bool,
    /// Position along the current owner's span.
    pub position: f32,
    /// Raw brightness phase, folded modulo 511 at read time.
    pub bri: u16,
    /// Tone-mapped brightness, 0–255.
    pub brightness: u8,
    pub owner: Option<NodeRef>,
    /// Absolute expiry deadline in milliseconds.
    pub life_ms: u32,
    pub speed: f32,
    pub color: ColorRgb,
}

impl Light {
    pub fn new(idx: u16, max_bri: u8, speed: f32, life_ms: u32) -> Self {
        Self {
            idx,
            max_bri,
            in_port: None,
            out_port: None,
            out_ports: [None; OUT_PORTS_MEMORY],
            pixel: -1,
            expired: false,
            position: -1.0,
            bri: 255,
            brightness: 0,
            owner: None,
            life_ms,
            speed,
            color: ColorRgb::new(255, 255, 255),
        }
    }

    pub fn reset_pixels(&mut self) {
        self.pixel = -1;
    }

    /// Effective speed: behaviour-bound lists freeze each particle's
    /// speed at creation, behaviour-less lists track the list value.
    pub fn speed(&self, view: &ListView) -> f32 {
        if view.behaviour.is_some() {
            self.speed
        } else {
            view.speed
        }
    }

    /// Record the chosen out-port, remembering it per intersection so a
    /// linked successor can repeat the choice.
    pub fn set_out_port(&mut self, port: Option<PortId>, remember_for: Option<u8>) {
        self.out_port = port;
        if let (Some(intersection_id), Some(port_id)) = (remember_for, port) {
            for i in (1..OUT_PORTS_MEMORY).rev() {
                self.out_ports[i] = self.out_ports[i - 1];
            }
            self.out_ports[0] = Some((intersection_id, port_id));
        }
    }

    pub fn out_port_for(&self, intersection_id: u8) -> Option<PortId> {
        self.out_ports
            .iter()
            .flatten()
            .find(|(id, _)| *id == intersection_id)
            .map(|(_, port)| *port)
    }

    pub fn snapshot(&self) -> PrevLight {
        PrevLight {
            out_ports: self.out_ports,
            color: self.color,
            pixel: self.pixel,
            owner: self.owner,
        }
    }

    /// Whether the particle's lifetime is up. Fading particles hold on
    /// until they have dimmed to black.
    pub fn should_expire(&self, view: &ListView, now_ms: u32) -> bool {
        if self.life_ms >= INFINITE_DURATION {
            return false;
        }
        now_ms >= self.life_ms && (view.fade_speed == 0 || self.brightness == 0)
    }

    /// Tone-map the raw brightness phase into 0–255.
    ///
    /// The phase folds over a 511-step triangle so a steadily advancing
    /// `bri` pulses instead of sawtoothing. Values under the fade
    /// threshold render dark.
    pub fn compute_brightness(&self, view: &ListView) -> u8 {
        let folded = self.bri % 511;
        let folded = if folded > 255 { 511 - folded } else { folded };
        let denom = 255.0 - f32::from(view.fade_thresh);
        if denom <= 0.0 {
            return 0;
        }
        if view.behaviour.is_some() {
            let value =
                (f32::from(folded) - f32::from(view.fade_thresh)) / denom * f32::from(self.max_bri);
            value.clamp(0.0, 255.0) as u8
        } else {
            let value = (f32::from(folded) - f32::from(view.fade_thresh)) / denom * 511.0;
            if value > 0.0 {
                view.fade_ease_map(value, self.max_bri)
            } else {
                0
            }
        }
    }

    /// The color this particle contributes to its pixel this frame.
    pub fn pixel_color(&self) -> ColorRgb {
        if self.brightness == 255 {
            self.color
        } else {
            self.color.dim(self.brightness)
        }
    }

    /// Advance brightness phase and position by one frame.
    pub fn next_frame(
        &mut self,
        view: &ListView,
        noise: &Noise2,
        rng: &mut SmallRng,
        max_length: u16,
    ) {
        self.bri = match view.behaviour {
            Some(b) if b.bri_const_noise() => {
                let v = noise.get(f32::from(view.id) * 10.0, self.pixel as f32 * 100.0);
                (v * 255.0) as u16
            }
            _ => self.bri.wrapping_add(u16::from(view.fade_speed)),
        };
        self.brightness = self.compute_brightness(view);

        let refresh_position = match view.behaviour {
            Some(b) if b.pos_change_fade() => self.bri >= 511,
            _ => false,
        };
        if refresh_position {
            self.bri -= 511;
            self.position = rng.gen_range(0..max_length.max(1)) as f32;
        } else {
            self.position += self.speed(view);
        }
    }

    /// Resolve the set of pixels this particle lights this frame.
    ///
    /// Segment-render paints the whole connection the particle sits on
    /// (ends included); fill-ease paints the span back to the chain
    /// predecessor when both share an owner.
    pub fn collect_pixels(
        &self,
        view: &ListView,
        prev: Option<&PrevLight>,
        object: &Topology,
        out: &mut PixelSet,
    ) {
        out.clear();
        if self.pixel < 0 {
            return;
        }
        let behaviour = view.behaviour.as_ref();
        if behaviour.is_some_and(Behaviour::render_segment) {
            if let Some(port_id) = self.out_port {
                let port = object.port(port_id);
                let conn = object.connection(port.connection);
                let _ = out.push(object.intersection(conn.from).top_pixel);
                let _ = out.push(object.intersection(conn.to).top_pixel);
                for i in 0..conn.num_leds {
                    if out.push(conn.pixel_at(i32::from(i))).is_err() {
                        break;
                    }
                }
                return;
            }
        } else if behaviour.is_some_and(Behaviour::fill_ease) {
            if let Some(prev) = prev {
                if prev.owner == self.owner && prev.pixel >= 0 {
                    let span = (self.pixel - prev.pixel).unsigned_abs() as u16;
                    let step = if self.pixel < prev.pixel { 1 } else { -1 };
                    for i in 0..span {
                        if out.push((self.pixel + i32::from(i) * step) as u16).is_err() {
                            break;
                        }
                    }
                    return;
                }
            }
        }
        let _ = out.push(self.pixel as u16);
    }
}

impl ListView {
    /// Eased brightness mapping used by behaviour-less lists.
    fn fade_ease_map(&self, value: f32, max_bri: u8) -> u8 {
        let mapped = self
            .fade_ease
            .map(value, 0.0, 511.0, f32::from(self.min_bri), f32::from(max_bri));
        mapped.clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(behaviour: Option<Behaviour>) -> ListView {
        ListView {
            id: 1,
            speed: 1.0,
            ease: Ease::NONE,
            fade_speed: 0,
            fade_thresh: 0,
            min_bri: 0,
            fade_ease: Ease::NONE,
            life_ms: INFINITE_DURATION,
            behaviour,
        }
    }

    #[test]
    fn out_port_memory_is_newest_first() {
        let mut light = Light::new(0, 255, 1.0, INFINITE_DURATION);
        light.set_out_port(Some(3), Some(10));
        light.set_out_port(Some(4), Some(11));
        light.set_out_port(Some(5), Some(12));
        light.set_out_port(Some(6), Some(13));
        // Oldest entry (intersection 10) fell off the 3-slot memory.
        assert_eq!(light.out_port_for(10), None);
        assert_eq!(light.out_port_for(11), Some(4));
        assert_eq!(light.out_port_for(13), Some(6));
    }

    #[test]
    fn unremembered_out_port_does_not_touch_memory() {
        let mut light = Light::new(0, 255, 1.0, INFINITE_DURATION);
        light.set_out_port(Some(3), Some(10));
        light.set_out_port(Some(9), None);
        assert_eq!(light.out_port_for(10), Some(3));
        assert_eq!(light.out_port, Some(9));
    }

    #[test]
    fn infinite_life_never_expires() {
        let light = Light::new(0, 255, 1.0, INFINITE_DURATION);
        assert!(!light.should_expire(&view(Some(Behaviour::default())), u32::MAX / 2));
    }

    #[test]
    fn expiry_waits_for_fade_to_black() {
        let mut v = view(Some(Behaviour::default()));
        v.fade_speed = 1;
        let mut light = Light::new(0, 255, 1.0, 1000);
        light.brightness = 100;
        assert!(!light.should_expire(&v, 2000));
        light.brightness = 0;
        assert!(light.should_expire(&v, 2000));
    }

    #[test]
    fn expiry_is_immediate_without_fade() {
        let v = view(Some(Behaviour::default()));
        let mut light = Light::new(0, 255, 1.0, 1000);
        light.brightness = 100;
        assert!(light.should_expire(&v, 1000));
        assert!(!light.should_expire(&v, 999));
    }

    #[test]
    fn brightness_folds_over_triangle() {
        let v = view(Some(Behaviour::default()));
        let mut light = Light::new(0, 255, 1.0, INFINITE_DURATION);
        light.bri = 255;
        assert_eq!(light.compute_brightness(&v), 255);
        light.bri = 511;
        assert_eq!(light.compute_brightness(&v), 0);
        light.bri = 400;
        let rising = light.compute_brightness(&v);
        assert!(rising > 0 && rising < 255);
    }

    #[test]
    fn brightness_respects_max() {
        let v = view(Some(Behaviour::default()));
        let mut light = Light::new(0, 128, 1.0, INFINITE_DURATION);
        light.bri = 255;
        assert_eq!(light.compute_brightness(&v), 128);
    }

    #[test]
    fn pixel_color_dims_by_brightness() {
        let mut light = Light::new(0, 255, 1.0, INFINITE_DURATION);
        light.color = ColorRgb::new(200, 100, 50);
        light.brightness = 255;
        assert_eq!(light.pixel_color(), light.color);
        light.brightness = 127;
        let dimmed = light.pixel_color();
        assert!(dimmed.r < 200 && dimmed.r > 80);
    }

    #[test]
    fn next_frame_advances_position_by_speed() {
        let v = view(Some(Behaviour::default()));
        let noise = Noise2::new(1);
        let mut rng = <SmallRng as rand::SeedableRng>::seed_from_u64(4);
        let mut light = Light::new(0, 255, 2.0, INFINITE_DURATION);
        light.position = 0.0;
        light.next_frame(&v, &noise, &mut rng, 100);
        assert!((light.position - 2.0).abs() < 1e-6);
    }
}
