//! Single-letter command protocol.
//!
//! Each letter maps 1:1 to one core operation with no parameters.
//! Letters that are not control commands fall through to the shape's
//! emission presets (`1`..`7`, `/`, `?` and shape extras).

use crate::debugger::Debugger;
use crate::palettes;
use crate::shapes::Shape;
use crate::state::State;

/// Control commands addressable by one letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleAutoEmit,
    StopAll,
    ColorAll,
    SplitAll,
    ToggleIntersections,
    ToggleConnections,
    NextPalette,
    PrevPalette,
    LogTotals,
    DumpLists,
    DumpConnections,
    DumpIntersections,
}

impl Command {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'e' => Some(Self::ToggleAutoEmit),
            '.' => Some(Self::StopAll),
            '!' => Some(Self::ColorAll),
            's' => Some(Self::SplitAll),
            'i' => Some(Self::ToggleIntersections),
            'c' => Some(Self::ToggleConnections),
            '>' => Some(Self::NextPalette),
            '<' => Some(Self::PrevPalette),
            'l' => Some(Self::LogTotals),
            'L' => Some(Self::DumpLists),
            'C' => Some(Self::DumpConnections),
            'I' => Some(Self::DumpIntersections),
            _ => None,
        }
    }
}

/// Execute one command letter. Returns `false` when the letter maps to
/// neither a control command nor an emission preset.
pub fn dispatch(
    state: &mut State,
    shape: &dyn Shape,
    debugger: Option<&Debugger>,
    command: char,
    now_ms: u32,
) -> bool {
    match Command::from_char(command) {
        Some(Command::ToggleAutoEmit) => {
            state.auto_enabled = !state.auto_enabled;
            log::info!(
                "auto emitter is {}",
                if state.auto_enabled { "enabled" } else { "disabled" }
            );
        }
        Some(Command::StopAll) => state.stop_all(now_ms),
        Some(Command::ColorAll) => state.color_all(),
        Some(Command::SplitAll) => state.split_all(),
        Some(Command::ToggleIntersections) => {
            state.show_intersections = !state.show_intersections;
        }
        Some(Command::ToggleConnections) => {
            state.show_connections = !state.show_connections;
        }
        Some(Command::NextPalette) => {
            if state.current_palette < palettes::palette_count() - 1 {
                state.current_palette += 1;
            }
        }
        Some(Command::PrevPalette) => {
            if state.current_palette > 0 {
                state.current_palette -= 1;
            }
        }
        Some(Command::LogTotals) => {
            log::info!("total {} lights", state.total_lights);
        }
        Some(Command::DumpLists) => state.debug(),
        Some(Command::DumpConnections) => {
            if let Some(debugger) = debugger {
                debugger.dump_connections(shape.object());
            }
        }
        Some(Command::DumpIntersections) => {
            if let Some(debugger) = debugger {
                debugger.dump_intersections(shape.object());
            }
        }
        None => {
            let Some(params) = state.shape_command_params(shape, command) else {
                return false;
            };
            let _ = state.emit(shape.object(), &params, now_ms);
        }
    }
    true
}
