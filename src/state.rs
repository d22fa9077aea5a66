//! Steam application state as shown on the Stream Deck button
//!
//! The button has three visual states, indexed in the plugin manifest in the
//! same order as the variants below. The wire value sent with `setState` is
//! that index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed state of the target application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationState {
    /// Steam is not running
    Off,
    /// Steam is running with its normal desktop UI
    Running,
    /// Steam is running in Big Picture mode
    PresentationMode,
}

impl ApplicationState {
    /// Button state index sent in `setState` payloads
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Running => 1,
            Self::PresentationMode => 2,
        }
    }

    /// Inverse of [`wire_value`](Self::wire_value)
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Running),
            2 => Some(Self::PresentationMode),
            _ => None,
        }
    }

    /// State reached by a short press from `self`
    ///
    /// `Off` launches (straight into Big Picture when `direct_to_presentation`
    /// is set), `Running` enters Big Picture, `PresentationMode` leaves it.
    /// The cycle never returns to `Off`.
    pub fn after_short_press(self, direct_to_presentation: bool) -> Self {
        match self {
            Self::Off if direct_to_presentation => Self::PresentationMode,
            Self::Off => Self::Running,
            Self::Running => Self::PresentationMode,
            Self::PresentationMode => Self::Running,
        }
    }

    pub fn is_off(self) -> bool {
        self == Self::Off
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Running => "running",
            Self::PresentationMode => "big-picture",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_match_manifest_order() {
        assert_eq!(ApplicationState::Off.wire_value(), 0);
        assert_eq!(ApplicationState::Running.wire_value(), 1);
        assert_eq!(ApplicationState::PresentationMode.wire_value(), 2);
        assert_eq!(ApplicationState::from_wire(2), Some(ApplicationState::PresentationMode));
        assert_eq!(ApplicationState::from_wire(3), None);
    }

    #[test]
    fn test_short_press_cycle() {
        use ApplicationState::*;

        assert_eq!(Off.after_short_press(false), Running);
        assert_eq!(Off.after_short_press(true), PresentationMode);
        assert_eq!(Running.after_short_press(false), PresentationMode);
        assert_eq!(PresentationMode.after_short_press(false), Running);
    }

    #[test]
    fn test_cycle_never_returns_to_off() {
        let mut state = ApplicationState::Off;
        for _ in 0..3 {
            state = state.after_short_press(false);
        }
        assert_eq!(state, ApplicationState::Running);

        for _ in 0..10 {
            state = state.after_short_press(true);
            assert!(!state.is_off());
        }
    }
}
