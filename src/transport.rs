//! Remote light transport.
//!
//! External ports marshal a light to a peer device over a lossy datagram
//! link (ESP-NOW on hardware). The core only sees the capability trait:
//! sends are fire-and-forget, failures are logged and dropped, retries
//! belong to the transport collaborator.
//!
//! ```text
//! ExternalPort ──▶ LightTransport::send_light ──▶ (datagram out)
//! (datagram in) ──▶ MessageRing ──▶ State::drain_messages ──▶ InternalPort
//! ```
//!
//! The inbound ring is drained cooperatively, a bounded number of
//! messages per tick. The interrupt-side producer guard lives in the
//! receiving adapter, not here — the core runs single-threaded.

use heapless::Deque;
use serde::{Deserialize, Serialize};

use crate::color::ColorRgb;
use crate::light::Light;

/// 6-byte device id (MAC address on hardware).
pub type DeviceId = [u8; 6];

pub const MSG_LIGHT: u8 = 0x10;
pub const MSG_LIGHT_LIST: u8 = 0x11;

/// Capacity of the inbound message ring.
pub const MESSAGE_RING_CAP: usize = 32;
/// Messages drained per simulation tick.
pub const MAX_MESSAGES_PER_TICK: usize = 8;

/// Snapshot of one light crossing to a peer device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightMessage {
    pub message_type: u8,
    /// Destination port id on the receiving device.
    pub port_id: u8,
    pub list_id: u16,
    pub light_idx: u16,
    pub brightness: u8,
    pub color_r: u8,
    pub color_g: u8,
    pub color_b: u8,
    pub speed: f32,
    /// Remaining life in milliseconds.
    pub life: u32,
}

impl LightMessage {
    pub fn from_light(light: &Light, target_port: u8, list_id: u16, speed: f32, now_ms: u32) -> Self {
        Self {
            message_type: MSG_LIGHT,
            port_id: target_port,
            list_id,
            light_idx: light.idx,
            brightness: light.brightness,
            color_r: light.color.r,
            color_g: light.color.g,
            color_b: light.color.b,
            speed,
            life: light.life_ms.saturating_sub(now_ms),
        }
    }

    pub fn color(&self) -> ColorRgb {
        ColorRgb::new(self.color_r, self.color_g, self.color_b)
    }
}

/// List-tagged variant carrying the originating list id so the receiver
/// can reconstruct or reuse a matching local list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightListMessage {
    pub message_type: u8,
    pub id: u16,
    pub light: LightMessage,
}

/// A decoded inbound message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundMessage {
    Light(LightMessage),
    LightList(LightListMessage),
}

/// Encode a message for the wire, prefixed with the sender's device id.
pub fn encode_light(msg: &LightMessage, device: &DeviceId) -> Option<Vec<u8>> {
    let mut out = device.to_vec();
    match postcard::to_allocvec(msg) {
        Ok(body) => {
            out.extend_from_slice(&body);
            Some(out)
        }
        Err(err) => {
            log::warn!("light message encode failed: {err}");
            None
        }
    }
}

pub fn encode_light_list(msg: &LightListMessage, device: &DeviceId) -> Option<Vec<u8>> {
    let mut out = device.to_vec();
    match postcard::to_allocvec(msg) {
        Ok(body) => {
            out.extend_from_slice(&body);
            Some(out)
        }
        Err(err) => {
            log::warn!("light list message encode failed: {err}");
            None
        }
    }
}

/// Decode an inbound datagram. Returns the sender id and the message,
/// or `None` for malformed payloads (logged and dropped).
pub fn decode_message(bytes: &[u8]) -> Option<(DeviceId, InboundMessage)> {
    if bytes.len() < 7 {
        log::warn!("datagram too short: {} bytes", bytes.len());
        return None;
    }
    let mut device = [0u8; 6];
    device.copy_from_slice(&bytes[..6]);
    let body = &bytes[6..];
    let decoded = match body[0] {
        MSG_LIGHT => postcard::from_bytes::<LightMessage>(body)
            .map(InboundMessage::Light)
            .map_err(|e| e.to_string()),
        MSG_LIGHT_LIST => postcard::from_bytes::<LightListMessage>(body)
            .map(InboundMessage::LightList)
            .map_err(|e| e.to_string()),
        other => Err(format!("unknown message type {other}")),
    }
    .map_err(|err| {
        log::warn!("datagram decode failed: {err}");
    })
    .ok()?;
    Some((device, decoded))
}

// ───────────────────────────────────────────────────────────────
// Outbound capability
// ───────────────────────────────────────────────────────────────

/// Injected send capability. `send_as_list` asks the peer to
/// reconstruct list-level metadata before injecting the light.
pub trait LightTransport {
    fn send_light(
        &mut self,
        destination: &DeviceId,
        target_port: u8,
        msg: &LightMessage,
        send_as_list: bool,
    ) -> bool;
}

/// Default transport: drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl LightTransport for NullTransport {
    fn send_light(
        &mut self,
        _destination: &DeviceId,
        _target_port: u8,
        _msg: &LightMessage,
        _send_as_list: bool,
    ) -> bool {
        false
    }
}

// ───────────────────────────────────────────────────────────────
// Inbound ring
// ───────────────────────────────────────────────────────────────

/// Fixed-capacity inbound queue. The receive adapter pushes decoded
/// messages; the simulation drains a bounded batch per tick.
#[derive(Default)]
pub struct MessageRing {
    queue: Deque<InboundMessage, MESSAGE_RING_CAP>,
}

impl MessageRing {
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Push a message. Returns `false` (message dropped) when full.
    pub fn push(&mut self, msg: InboundMessage) -> bool {
        self.queue.push_back(msg).is_ok()
    }

    pub fn pop(&mut self) -> Option<InboundMessage> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INFINITE_DURATION;

    fn sample() -> LightMessage {
        LightMessage {
            message_type: MSG_LIGHT,
            port_id: 7,
            list_id: 3,
            light_idx: 2,
            brightness: 200,
            color_r: 10,
            color_g: 20,
            color_b: 30,
            speed: 1.5,
            life: 4000,
        }
    }

    #[test]
    fn light_message_roundtrip() {
        let device = [1, 2, 3, 4, 5, 6];
        let bytes = encode_light(&sample(), &device).unwrap();
        let (from, decoded) = decode_message(&bytes).unwrap();
        assert_eq!(from, device);
        assert_eq!(decoded, InboundMessage::Light(sample()));
    }

    #[test]
    fn list_message_roundtrip() {
        let msg = LightListMessage {
            message_type: MSG_LIGHT_LIST,
            id: 99,
            light: sample(),
        };
        let bytes = encode_light_list(&msg, &[0; 6]).unwrap();
        let (_, decoded) = decode_message(&bytes).unwrap();
        assert_eq!(decoded, InboundMessage::LightList(msg));
    }

    #[test]
    fn malformed_datagrams_drop() {
        assert!(decode_message(&[1, 2, 3]).is_none());
        assert!(decode_message(&[0, 0, 0, 0, 0, 0, 0xEE, 1, 2]).is_none());
    }

    #[test]
    fn from_light_snapshots_remaining_life() {
        let mut light = Light::new(4, 255, 2.0, 10_000);
        light.color = ColorRgb::new(9, 8, 7);
        light.brightness = 99;
        let msg = LightMessage::from_light(&light, 12, 5, 2.0, 4_000);
        assert_eq!(msg.life, 6_000);
        assert_eq!(msg.port_id, 12);
        assert_eq!(msg.color(), light.color);

        let infinite = Light::new(0, 255, 1.0, INFINITE_DURATION);
        let msg = LightMessage::from_light(&infinite, 0, 0, 1.0, 500);
        assert_eq!(msg.life, INFINITE_DURATION - 500);
    }

    #[test]
    fn ring_bounds_capacity() {
        let mut ring = MessageRing::new();
        for _ in 0..MESSAGE_RING_CAP {
            assert!(ring.push(InboundMessage::Light(sample())));
        }
        assert!(!ring.push(InboundMessage::Light(sample())));
        assert_eq!(ring.len(), MESSAGE_RING_CAP);
        let _ = ring.pop();
        assert!(ring.push(InboundMessage::Light(sample())));
    }
}
