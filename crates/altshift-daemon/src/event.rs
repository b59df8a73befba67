//! Decoded key events

use altshift_config::KeyCode;
use evdev::{EventType, InputEvent};

/// Event value constants for key events.
pub mod event_value {
    /// Key release event value
    pub const RELEASE: i32 = 0;
    /// Key press event value
    pub const PRESS: i32 = 1;
    /// Key repeat event value (autorepeat)
    #[allow(dead_code)]
    pub const REPEAT: i32 = 2;
}

/// A key going down or up.
///
/// Only plain presses and releases become a `KeyEvent`; autorepeat and any
/// other value never reach the chord detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(code: KeyCode) -> Self {
        Self {
            code,
            pressed: true,
        }
    }

    pub fn release(code: KeyCode) -> Self {
        Self {
            code,
            pressed: false,
        }
    }

    /// Decode a raw input event, dropping everything that is not a key
    /// press or release.
    pub fn from_input_event(event: &InputEvent) -> Option<Self> {
        if event.event_type() != EventType::KEY {
            return None;
        }

        match event.value() {
            event_value::PRESS => Some(Self::press(event.code())),
            event_value::RELEASE => Some(Self::release(event.code())),
            _ => None,
        }
    }
}
