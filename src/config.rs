//! Simulation configuration and shared constants.
//!
//! The hard caps mirror the memory budget of the ESP32 build the engine
//! ships on. They bound every runtime allocation the simulation makes:
//! exceeding a cap is a routine, recoverable emission failure, never a
//! panic.

use serde::{Deserialize, Serialize};

use crate::rnd::RandomRanges;

/// Maximum number of topology group layers (bitmask bits actually wired).
pub const MAX_GROUPS: usize = 5;
/// Maximum concurrently active light lists, background slot included.
pub const MAX_LIGHT_LISTS: usize = 20;
/// Maximum sparse conditional weights per outgoing port.
pub const MAX_CONDITIONAL_WEIGHTS: usize = 10;
/// Hard cap on live particles across every list.
pub const MAX_TOTAL_LIGHTS: u32 = 1500;
/// Maximum visible pixels a single connection can span.
pub const CONNECTION_MAX_LEDS: usize = 48;
/// How many (intersection, out-port) pairs a particle remembers.
pub const OUT_PORTS_MEMORY: usize = 3;

/// Sentinel: pick a model uniformly at random.
pub const RANDOM_MODEL: i8 = -1;
/// Sentinel: pick a speed from the configured random range.
pub const RANDOM_SPEED: f32 = -1.0;
/// Sentinel: pick a duration from the configured random range.
pub const RANDOM_DURATION: u32 = 0;
/// Sentinel: generate a random color for this palette entry.
pub const RANDOM_COLOR: i64 = -1;
/// Duration value meaning "never expires".
pub const INFINITE_DURATION: u32 = 0x7FFF_FFFF;

pub const DEFAULT_SPEED: f32 = 1.0;
pub const FULL_BRIGHTNESS: u8 = 255;

// ---------------------------------------------------------------------------
// Topology groups
// ---------------------------------------------------------------------------

/// Topology layer bitmask. A group mask of 0 means "all groups".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Group {
    Group1 = 1,
    Group2 = 2,
    Group3 = 4,
    Group4 = 8,
    Group5 = 16,
}

impl Group {
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// List enums
// ---------------------------------------------------------------------------

/// How a list seeds its particles at emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ListOrder {
    /// Staggered chain, one particle per slot behind the previous.
    #[default]
    Sequential = 0,
    /// Uniform random position within the model's maximum length.
    Random = 1,
    /// Brightness seeded from coherent noise keyed by list id and index.
    Noise = 2,
    /// Sequential with a caller-supplied position offset.
    Offset = 3,
}

impl ListOrder {
    pub const LAST: ListOrder = ListOrder::Offset;

    pub fn from_index(idx: u8) -> Self {
        match idx {
            1 => Self::Random,
            2 => Self::Noise,
            3 => Self::Offset,
            _ => Self::Sequential,
        }
    }
}

/// Where the bright head of a chain sits relative to its trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ListHead {
    #[default]
    Front = 0,
    Middle = 1,
    Back = 2,
}

impl ListHead {
    pub fn from_index(idx: u8) -> Self {
        match idx {
            1 => Self::Middle,
            2 => Self::Back,
            _ => Self::Front,
        }
    }
}

// ---------------------------------------------------------------------------
// Blend modes
// ---------------------------------------------------------------------------

/// Per-list compositing mode. The numeric values are part of the wire
/// contract with the OSC/HTTP collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlendMode {
    /// Add channel sums and divide by contribution count at read-back.
    #[default]
    Normal = 0,
    /// Add without incrementing the divisor.
    Add = 1,
    Multiply = 2,
    Screen = 3,
    Overlay = 4,
    /// Overwrite the accumulated sums, keeping the divisor.
    Replace = 5,
    Subtract = 6,
    Difference = 7,
    Exclusion = 8,
    Dodge = 9,
    Burn = 10,
    HardLight = 11,
    SoftLight = 12,
    LinearLight = 13,
    VividLight = 14,
    PinLight = 15,
}

impl BlendMode {
    pub const COUNT: usize = 16;

    pub fn from_index(idx: u8) -> Self {
        match idx {
            1 => Self::Add,
            2 => Self::Multiply,
            3 => Self::Screen,
            4 => Self::Overlay,
            5 => Self::Replace,
            6 => Self::Subtract,
            7 => Self::Difference,
            8 => Self::Exclusion,
            9 => Self::Dodge,
            10 => Self::Burn,
            11 => Self::HardLight,
            12 => Self::SoftLight,
            13 => Self::LinearLight,
            14 => Self::VividLight,
            15 => Self::PinLight,
            _ => Self::Normal,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation config
// ---------------------------------------------------------------------------

/// Tunable simulation parameters.
///
/// `duration_fps` is the frame rate assumed when converting frame-count
/// durations to milliseconds and when staggering sequential chain life
/// offsets. It must match the rate the driver calls `State::update` at,
/// or frame-based durations will drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Assumed frame rate for duration-in-frames conversion.
    pub duration_fps: f32,
    /// Random parameter bounds used when emission fields are left unset.
    pub ranges: RandomRanges,
}

impl SimConfig {
    /// Milliseconds per frame at the configured rate.
    pub fn frame_ms(&self) -> u16 {
        (1000.0 / self.duration_fps) as u16
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration_fps: 62.5,
            ranges: RandomRanges::default(),
        }
    }
}
