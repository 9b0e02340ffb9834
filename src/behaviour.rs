//! Flags-driven particle behaviour.
//!
//! A `Behaviour` is owned by its light list and replaced wholesale when
//! the list is re-emitted with a different flag set. The flag bits are
//! part of the emission wire contract.

use crate::emit::EmitParams;

pub const B_POS_CHANGE_FADE: u16 = 1;
pub const B_BRI_CONST_NOISE: u16 = 2;
pub const B_RENDER_SEGMENT: u16 = 4;
pub const B_ALLOW_BOUNCE: u16 = 8;
pub const B_FORCE_BOUNCE: u16 = 16;
pub const B_EXPIRE_IMMEDIATE: u16 = 32;
pub const B_EMIT_FROM_CONN: u16 = 64;
pub const B_FILL_EASE: u16 = 128;
pub const B_RANDOM_COLOR: u16 = 256;
pub const B_MIRROR_FLIP: u16 = 512;
pub const B_MIRROR_ROTATE: u16 = 1024;
pub const B_SMOOTH_CHANGES: u16 = 2048;

/// Bitmask strategy object modifying a light's brightness, position and
/// color computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Behaviour {
    pub flags: u16,
    pub color_change_groups: u8,
}

impl Behaviour {
    pub const fn new(flags: u16, color_change_groups: u8) -> Self {
        Self {
            flags,
            color_change_groups,
        }
    }

    pub fn from_params(params: &EmitParams) -> Self {
        Self {
            flags: params.behaviour_flags,
            color_change_groups: params.color_change_groups,
        }
    }

    pub fn pos_change_fade(&self) -> bool {
        self.flags & B_POS_CHANGE_FADE != 0
    }

    pub fn bri_const_noise(&self) -> bool {
        self.flags & B_BRI_CONST_NOISE != 0
    }

    pub fn render_segment(&self) -> bool {
        self.flags & B_RENDER_SEGMENT != 0
    }

    pub fn allow_bounce(&self) -> bool {
        self.flags & B_ALLOW_BOUNCE != 0
    }

    pub fn force_bounce(&self) -> bool {
        self.flags & B_FORCE_BOUNCE != 0
    }

    pub fn expire_immediately(&self) -> bool {
        self.flags & B_EXPIRE_IMMEDIATE != 0
    }

    pub fn emit_from_connection(&self) -> bool {
        self.flags & B_EMIT_FROM_CONN != 0
    }

    pub fn fill_ease(&self) -> bool {
        self.flags & B_FILL_EASE != 0
    }

    pub fn random_color(&self) -> bool {
        self.flags & B_RANDOM_COLOR != 0
    }

    pub fn mirror_flip(&self) -> bool {
        self.flags & B_MIRROR_FLIP != 0
    }

    pub fn mirror_rotate(&self) -> bool {
        self.flags & B_MIRROR_ROTATE != 0
    }

    pub fn smooth_changes(&self) -> bool {
        self.flags & B_SMOOTH_CHANGES != 0
    }
}
