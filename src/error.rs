//! Emission error types.
//!
//! Every `emit()` failure is returned, not thrown: the caller (auto
//! emitter, OSC handler, note trigger) simply drops the emission and the
//! engine state is untouched. All variants are `Copy` so they can pass
//! through command dispatch without allocation.

use core::fmt;

/// Why an emission request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// The requested model index does not exist on this topology.
    ModelNotFound(u8),
    /// Every light-list slot is occupied.
    NoFreeLightLists,
    /// Granting the request would exceed the total-particle cap.
    TooManyLights { requested: u32, cap: u32 },
    /// No intersection matches the requested emit group mask.
    NoIntersectionsForGroups(u8),
    /// No connection matches the requested emit group mask.
    NoConnectionsForGroups(u8),
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelNotFound(m) => write!(f, "model {m} not found"),
            Self::NoFreeLightLists => write!(f, "no free light lists"),
            Self::TooManyLights { requested, cap } => {
                write!(f, "{requested} is over max {cap} lights")
            }
            Self::NoIntersectionsForGroups(g) => {
                write!(f, "no intersections for groups {g}")
            }
            Self::NoConnectionsForGroups(g) => {
                write!(f, "no connections for groups {g}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_reason() {
        let e = EmitError::TooManyLights {
            requested: 1600,
            cap: 1500,
        };
        assert_eq!(e.to_string(), "1600 is over max 1500 lights");
        assert_eq!(EmitError::ModelNotFound(9).to_string(), "model 9 not found");
    }
}
