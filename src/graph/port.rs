//! Directional attachment points between intersections and connections.
//!
//! Every port is owned by the topology arena; its id is its arena index,
//! which doubles as the reverse-lookup key remote messages use. Internal
//! ports forward a light into their connection; external ports marshal
//! it to a peer device and expire it locally.

use crate::graph::{ConnId, InterId};
use crate::transport::DeviceId;

pub type PortId = u8;

/// What happens when a light is sent out through this port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    /// Forward into the owning connection.
    Internal,
    /// Hand off to a remote peer's port over the datagram transport.
    External {
        device: DeviceId,
        target_id: PortId,
    },
}

/// One directional port.
#[derive(Debug, Clone, Copy)]
pub struct Port {
    pub id: PortId,
    pub connection: ConnId,
    pub intersection: InterId,
    /// `true` for a connection's `to` end.
    pub direction: bool,
    pub group: u8,
    pub kind: PortKind,
}

impl Port {
    pub fn is_external(&self) -> bool {
        matches!(self.kind, PortKind::External { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_flag_tracks_kind() {
        let internal = Port {
            id: 0,
            connection: 0,
            intersection: 0,
            direction: false,
            group: 1,
            kind: PortKind::Internal,
        };
        assert!(!internal.is_external());

        let external = Port {
            kind: PortKind::External {
                device: [1; 6],
                target_id: 9,
            },
            ..internal
        };
        assert!(external.is_external());
    }
}
