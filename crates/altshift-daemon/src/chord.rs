//! Two-key chord detection
//!
//! # Chord State Machine
//!
//! A chord is "press both keys, then release both keys" with nothing else
//! happening on the keyboard in between. Each [`ChordDetector`] watches one
//! [`KeyCombo`] and is advanced on *every* key event, together with the number
//! of keys currently held on the whole keyboard ([`PressCounter`]).
//!
//! ```text
//!                 count=1, down, chord key        count=2, down, chord key
//!  ┌──────┐ ─────────────────────────► ┌────────────┐ ──────────────────► ┌─────────────┐
//!  │ IDLE │                            │ ONE_KEY    │                     │ TWO_KEYS    │
//!  └──────┘ ◄──────┐                   │ DOWN       │                     │ DOWN        │
//!     ▲            │                   └────────────┘                     └──────┬──────┘
//!     │            │ count=0                                                     │
//!     │            │ (no trigger)                            count=1, up, chord key
//!     │      ┌─────┴──┐                                                           ▼
//!     │      │ JAMMED │ ◄──── any other event with count 1 or 2,         ┌──────────────┐
//!     │      └────────┘       or any event with count >= 3               │ ONE_KEY      │
//!     │                                                                  │ RELEASED     │
//!     └──────────────────────── count=0 (TRIGGER) ───────────────────────└──────────────┘
//! ```
//!
//! ## Shared Press Count
//!
//! The count covers every key on the keyboard, not only the chord keys. A
//! third key pressed while a chord is being formed pushes the count to 3 and
//! jams *every* detector at once; they stay jammed until all keys are up.
//!
//! | count | state           | condition             | next            | fires |
//! |-------|-----------------|-----------------------|-----------------|-------|
//! | 0     | OneKeyReleased  |                       | Idle            | yes   |
//! | 0     | other           |                       | Idle            | no    |
//! | 1     | Idle            | down, chord key       | OneKeyDown      | no    |
//! | 1     | TwoKeysDown     | up, chord key         | OneKeyReleased  | no    |
//! | 1     | other           |                       | Jammed          | no    |
//! | 2     | OneKeyDown      | down, chord key       | TwoKeysDown     | no    |
//! | 2     | other           |                       | Jammed          | no    |
//! | >= 3  | any             |                       | Jammed          | no    |

use altshift_config::{KeyCode, KeyCombo};

/// Number of keys currently held down on the input device.
///
/// Updated for every key press and release before any detector runs.
/// Releases never take it below zero, so a release for a key that was
/// already down when the daemon started is absorbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressCounter(u32);

impl PressCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn on_key_event(&mut self, pressed: bool) {
        if pressed {
            self.0 = self.0.saturating_add(1);
        } else {
            self.0 = self.0.saturating_sub(1);
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// State of a single chord detector.
///
/// See module-level documentation for the full transition table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChordState {
    /// Nothing held, waiting for the first chord key
    #[default]
    Idle,
    /// One chord key is the only key held
    OneKeyDown,
    /// Both chord keys are the only keys held
    TwoKeysDown,
    /// One chord key was released, the other is the only key held
    OneKeyReleased,
    /// The sequence stopped looking like a chord; waiting for full release
    Jammed,
}

/// Detects one two-key chord.
#[derive(Debug, Clone)]
pub struct ChordDetector {
    combo: KeyCombo,
    state: ChordState,
}

impl ChordDetector {
    pub fn new(combo: KeyCombo) -> Self {
        Self {
            combo,
            state: ChordState::Idle,
        }
    }

    pub fn combo(&self) -> KeyCombo {
        self.combo
    }

    #[cfg(test)]
    pub fn state(&self) -> ChordState {
        self.state
    }

    /// Advance the state machine by one key event.
    ///
    /// `press_count` must already include this event. Returns `true` exactly
    /// when the event completes the chord.
    pub fn advance(&mut self, press_count: u32, code: KeyCode, pressed: bool) -> bool {
        let is_chord_key = self.combo.contains(code);

        let (next, fired) = match (press_count, self.state) {
            (0, ChordState::OneKeyReleased) => (ChordState::Idle, true),
            (0, _) => (ChordState::Idle, false),
            (1, ChordState::Idle) if pressed && is_chord_key => (ChordState::OneKeyDown, false),
            (1, ChordState::TwoKeysDown) if !pressed && is_chord_key => {
                (ChordState::OneKeyReleased, false)
            }
            (2, ChordState::OneKeyDown) if pressed && is_chord_key => {
                (ChordState::TwoKeysDown, false)
            }
            _ => (ChordState::Jammed, false),
        };

        if next == ChordState::Jammed && self.state != ChordState::Jammed {
            tracing::debug!(
                "Chord {} jammed by key {} (pressed: {}, held: {})",
                self.combo,
                code,
                pressed,
                press_count
            );
        }

        self.state = next;
        fired
    }
}
