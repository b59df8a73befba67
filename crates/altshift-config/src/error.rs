use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(altshift::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid key combination '{value}': {reason}")]
    #[diagnostic(
        code(altshift::config::invalid_combo),
        help("use two keys separated by a comma, e.g. `56,42` or `KEY_LEFTALT,KEY_LEFTSHIFT`")
    )]
    InvalidCombo { value: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(altshift::config::invalid))]
    Invalid { message: String },

    #[error("Unknown key: '{key}'")]
    #[diagnostic(
        code(altshift::config::unknown_key),
        help("keys are decimal codes or evdev names such as KEY_LEFTSHIFT")
    )]
    UnknownKey { key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
