//! Mode dispatch
//!
//! The [`ModeDispatcher`] owns all per-process chord state: the shared press
//! counter, one detector per combo and the two mode flags. For each key event
//! it decides whether a layout command must run, and which one.
//!
//! ## Command Selection
//!
//! - Lang chord completes: the lang flag flips and a command is selected from
//!   the *new* flags: default when lang turned off, alternate or
//!   alternate-variant when it turned on.
//! - Variant chord completes: the variant flag flips, and a command runs only
//!   if lang is currently on. With lang off the flip is silent, so the next
//!   lang toggle lands directly on the remembered variant.
//! - Both complete on the same event (only possible when the combos are
//!   identical): the variant step has the last word, so a command runs only
//!   if lang ended up on.

use altshift_config::{CommandIndex, KeyCombo};

use crate::chord::{ChordDetector, PressCounter};
use crate::event::KeyEvent;

/// Current layout selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    /// Alternate layout active
    pub lang: bool,
    /// Alternate variant selected (only meaningful while `lang` is set)
    pub variant: bool,
}

/// Turns key events into layout command selections
#[derive(Debug, Clone)]
pub struct ModeDispatcher {
    press_counter: PressCounter,
    lang: ChordDetector,
    variant: ChordDetector,
    /// Variant toggles are ignored when there is no alternate-variant command
    variant_enabled: bool,
    modes: ModeFlags,
}

impl ModeDispatcher {
    pub fn new(lang_keys: KeyCombo, variant_keys: KeyCombo, variant_enabled: bool) -> Self {
        Self {
            press_counter: PressCounter::new(),
            lang: ChordDetector::new(lang_keys),
            variant: ChordDetector::new(variant_keys),
            variant_enabled,
            modes: ModeFlags::default(),
        }
    }

    pub fn modes(&self) -> ModeFlags {
        self.modes
    }

    #[cfg(test)]
    pub fn press_count(&self) -> u32 {
        self.press_counter.get()
    }

    #[cfg(test)]
    pub fn lang_detector(&self) -> &ChordDetector {
        &self.lang
    }

    #[cfg(test)]
    pub fn variant_detector(&self) -> &ChordDetector {
        &self.variant
    }

    /// Process one key event and return the command to run, if any.
    pub fn handle(&mut self, event: KeyEvent) -> Option<CommandIndex> {
        self.press_counter.on_key_event(event.pressed);
        let count = self.press_counter.get();

        tracing::trace!(
            "Key {} {} (held: {})",
            event.code,
            if event.pressed { "down" } else { "up" },
            count
        );

        let mut fire = false;

        if self.lang.advance(count, event.code, event.pressed) {
            self.modes.lang = !self.modes.lang;
            fire = true;
            tracing::info!(
                "Layout chord {}: alternate layout {}",
                self.lang.combo(),
                if self.modes.lang { "on" } else { "off" }
            );
        }

        // The detector always advances to keep its state consistent with the
        // counter, even when its trigger is ignored.
        let variant_fired = self.variant.advance(count, event.code, event.pressed);
        if variant_fired && self.variant_enabled {
            self.modes.variant = !self.modes.variant;
            fire = self.modes.lang;
            tracing::info!(
                "Variant chord {}: alternate variant {}{}",
                self.variant.combo(),
                if self.modes.variant { "on" } else { "off" },
                if self.modes.lang { "" } else { " (applies with alternate layout)" }
            );
        }

        fire.then(|| CommandIndex::for_modes(self.modes.lang, self.modes.variant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALT: u16 = 56;
    const SHIFT: u16 = 42;
    const CTRL: u16 = 29;
    const KEY_A: u16 = 30;

    fn dispatcher(variant_enabled: bool) -> ModeDispatcher {
        ModeDispatcher::new(
            KeyCombo::new(ALT, SHIFT),
            KeyCombo::new(CTRL, SHIFT),
            variant_enabled,
        )
    }

    fn chord(a: u16, b: u16) -> Vec<KeyEvent> {
        vec![
            KeyEvent::press(a),
            KeyEvent::press(b),
            KeyEvent::release(a),
            KeyEvent::release(b),
        ]
    }

    /// Run events through the dispatcher and collect every selection.
    fn run(dispatcher: &mut ModeDispatcher, events: &[KeyEvent]) -> Vec<CommandIndex> {
        events
            .iter()
            .filter_map(|&event| dispatcher.handle(event))
            .collect()
    }

    #[test]
    fn test_lang_chord_toggles_alternate_and_back() {
        let mut d = dispatcher(true);

        assert_eq!(run(&mut d, &chord(ALT, SHIFT)), vec![CommandIndex::Alternate]);
        assert!(d.modes().lang);

        assert_eq!(run(&mut d, &chord(ALT, SHIFT)), vec![CommandIndex::Default]);
        assert!(!d.modes().lang);
    }

    #[test]
    fn test_command_fires_on_final_release_only() {
        let mut d = dispatcher(true);
        let events = chord(ALT, SHIFT);

        assert_eq!(d.handle(events[0]), None);
        assert_eq!(d.handle(events[1]), None);
        assert_eq!(d.handle(events[2]), None);
        assert_eq!(d.handle(events[3]), Some(CommandIndex::Alternate));
    }

    #[test]
    fn test_variant_selects_alternate_variant_while_lang_on() {
        let mut d = dispatcher(true);
        run(&mut d, &chord(ALT, SHIFT));

        assert_eq!(
            run(&mut d, &chord(CTRL, SHIFT)),
            vec![CommandIndex::AlternateVariant]
        );
        assert_eq!(run(&mut d, &chord(CTRL, SHIFT)), vec![CommandIndex::Alternate]);
        assert_eq!(d.modes(), ModeFlags { lang: true, variant: false });
    }

    #[test]
    fn test_variant_while_lang_off_flips_silently() {
        let mut d = dispatcher(true);

        assert!(run(&mut d, &chord(CTRL, SHIFT)).is_empty());
        assert_eq!(d.modes(), ModeFlags { lang: false, variant: true });

        // Turning lang on now lands on the remembered variant.
        assert_eq!(
            run(&mut d, &chord(SHIFT, ALT)),
            vec![CommandIndex::AlternateVariant]
        );

        // And turning it off selects the default layout regardless.
        assert_eq!(run(&mut d, &chord(ALT, SHIFT)), vec![CommandIndex::Default]);
    }

    #[test]
    fn test_disabled_variant_never_selects_a_command() {
        let mut d = dispatcher(false);

        assert!(run(&mut d, &chord(CTRL, SHIFT)).is_empty());
        assert_eq!(d.modes(), ModeFlags::default());

        assert_eq!(run(&mut d, &chord(ALT, SHIFT)), vec![CommandIndex::Alternate]);
        assert!(run(&mut d, &chord(CTRL, SHIFT)).is_empty());
        assert_eq!(d.modes(), ModeFlags { lang: true, variant: false });
    }

    #[test]
    fn test_disabled_variant_detector_still_advances() {
        let mut d = dispatcher(false);

        d.handle(KeyEvent::press(CTRL));
        assert_eq!(
            d.variant_detector().state(),
            crate::chord::ChordState::OneKeyDown
        );
    }

    #[test]
    fn test_unrelated_key_jams_both_detectors() {
        let mut d = dispatcher(true);
        let events = [
            KeyEvent::press(ALT),
            KeyEvent::press(KEY_A),
            KeyEvent::press(SHIFT),
            KeyEvent::release(ALT),
            KeyEvent::release(SHIFT),
        ];

        assert!(run(&mut d, &events).is_empty());
        assert_eq!(d.lang_detector().state(), crate::chord::ChordState::Jammed);
        assert_eq!(d.variant_detector().state(), crate::chord::ChordState::Jammed);
        assert_eq!(d.press_count(), 1);

        assert!(run(&mut d, &[KeyEvent::release(KEY_A)]).is_empty());
        assert_eq!(d.press_count(), 0);
        assert_eq!(d.modes(), ModeFlags::default());

        assert_eq!(run(&mut d, &chord(ALT, SHIFT)), vec![CommandIndex::Alternate]);
    }

    #[test]
    fn test_identical_combos_let_variant_decide() {
        let mut d = ModeDispatcher::new(KeyCombo::new(ALT, SHIFT), KeyCombo::new(ALT, SHIFT), true);

        // Both fire: lang on, variant on -> alternate variant
        assert_eq!(
            run(&mut d, &chord(ALT, SHIFT)),
            vec![CommandIndex::AlternateVariant]
        );
        // Both fire: lang off, variant off -> variant step suppresses the command
        assert!(run(&mut d, &chord(ALT, SHIFT)).is_empty());
        assert_eq!(d.modes(), ModeFlags::default());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let mut log = Vec::new();
        log.extend(chord(ALT, SHIFT));
        log.extend(chord(CTRL, SHIFT));
        log.extend([KeyEvent::press(KEY_A), KeyEvent::release(KEY_A)]);
        log.extend(chord(CTRL, SHIFT));
        log.extend(chord(ALT, SHIFT));
        log.extend(chord(CTRL, SHIFT));
        log.extend(chord(ALT, SHIFT));

        let first = run(&mut dispatcher(true), &log);
        let second = run(&mut dispatcher(true), &log);

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                CommandIndex::Alternate,
                CommandIndex::AlternateVariant,
                CommandIndex::Alternate,
                CommandIndex::Default,
                CommandIndex::AlternateVariant,
            ]
        );
    }
}
