//! Configuration data model

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use evdev::Key;
use serde::Serialize;

use crate::error::ConfigError;

/// Raw Linux key code as carried in `input_event.code`.
pub type KeyCode = u16;

/// Root configuration structure
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Where raw input events are read from
    pub input: InputSource,
    /// Chord that toggles between the default and alternate layout
    pub lang_keys: KeyCombo,
    /// Chord that toggles the alternate layout's variant
    pub variant_keys: KeyCombo,
    pub commands: CommandTable,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputSource::Stdin,
            lang_keys: KeyCombo::new(Key::KEY_LEFTALT.code(), Key::KEY_LEFTSHIFT.code()),
            variant_keys: KeyCombo::new(Key::KEY_LEFTCTRL.code(), Key::KEY_LEFTSHIFT.code()),
            commands: CommandTable::default(),
            log_level: LogLevel::Info,
        }
    }
}

/// Source of raw `input_event` records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Stdin,
    Path(PathBuf),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => write!(f, "<stdin>"),
            InputSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive usable with `tracing_subscriber::EnvFilter::new`
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// An unordered pair of keys that form one chord.
///
/// Either key may be pressed first; the combo only cares that both are held
/// together and then both released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyCombo {
    pub key1: KeyCode,
    pub key2: KeyCode,
}

impl KeyCombo {
    pub fn new(key1: KeyCode, key2: KeyCode) -> Self {
        Self { key1, key2 }
    }

    /// Whether `code` is one of the two chord keys
    pub fn contains(&self, code: KeyCode) -> bool {
        code == self.key1 || code == self.key2
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}+{:?} ({},{})",
            Key::new(self.key1),
            Key::new(self.key2),
            self.key1,
            self.key2
        )
    }
}

/// Parses `<key1>,<key2>`, e.g. `56,42` or `KEY_LEFTALT,leftshift`.
impl FromStr for KeyCombo {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [first, second] => Ok(Self::new(parse_key_code(first)?, parse_key_code(second)?)),
            _ => Err(ConfigError::InvalidCombo {
                value: s.to_string(),
                reason: format!("expected exactly two keys separated by ',', got {}", parts.len()),
            }),
        }
    }
}

/// Resolve a single key given as a decimal code or an evdev key name.
///
/// Names are matched case-insensitively and the `KEY_` prefix is optional,
/// so `42`, `KEY_LEFTSHIFT` and `leftshift` all yield the same code.
pub fn parse_key_code(name: &str) -> Result<KeyCode, ConfigError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::UnknownKey {
            key: name.to_string(),
        });
    }

    if name.bytes().all(|b| b.is_ascii_digit()) {
        return name.parse::<KeyCode>().map_err(|_| ConfigError::UnknownKey {
            key: name.to_string(),
        });
    }

    let upper = name.to_uppercase();
    let full = if upper.starts_with("KEY_") {
        upper
    } else {
        format!("KEY_{}", upper)
    };

    Key::from_str(&full)
        .map(|key| key.code())
        .map_err(|_| ConfigError::UnknownKey {
            key: name.to_string(),
        })
}

/// Position of a command inside the [`CommandTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandIndex {
    Default = 0,
    Alternate = 1,
    AlternateVariant = 2,
}

impl CommandIndex {
    /// Command that matches the given mode flags.
    ///
    /// The variant flag only matters while the alternate layout is active.
    pub fn for_modes(lang: bool, variant: bool) -> Self {
        match (lang, variant) {
            (false, _) => CommandIndex::Default,
            (true, false) => CommandIndex::Alternate,
            (true, true) => CommandIndex::AlternateVariant,
        }
    }
}

impl fmt::Display for CommandIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandIndex::Default => write!(f, "default"),
            CommandIndex::Alternate => write!(f, "alternate"),
            CommandIndex::AlternateVariant => write!(f, "alternate-variant"),
        }
    }
}

/// The three layout switching commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTable {
    pub default: String,
    pub alternate: String,
    /// Empty disables variant toggling
    pub alternate_variant: String,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            default: r#"setxkbmap "us""#.to_string(),
            alternate: r#"setxkbmap "bg,us" "phonetic,""#.to_string(),
            alternate_variant: r#"setxkbmap "bg,us" ",""#.to_string(),
        }
    }
}

impl CommandTable {
    pub fn get(&self, index: CommandIndex) -> &str {
        match index {
            CommandIndex::Default => &self.default,
            CommandIndex::Alternate => &self.alternate,
            CommandIndex::AlternateVariant => &self.alternate_variant,
        }
    }

    pub fn variant_enabled(&self) -> bool {
        !self.alternate_variant.is_empty()
    }

    /// Only the alternate-variant slot may be left empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default.trim().is_empty() || self.alternate.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "the default and alternate commands must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
