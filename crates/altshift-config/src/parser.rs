//! KDL configuration parser
//!
//! Every node is optional; anything not mentioned keeps its built-in default.
//!
//! ```kdl
//! input "/dev/input/event3"
//! lang-keys 56 42
//! variant-keys "KEY_LEFTCTRL" "KEY_LEFTSHIFT"
//! commands {
//!     default "setxkbmap us"
//!     alternate "setxkbmap bg,us phonetic,"
//!     alternate-variant ""
//! }
//! log-level "debug"
//! ```

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Format the position of a node for error messages
fn node_position(node: &kdl::KdlNode, source: &str) -> String {
    let (line, col) = offset_to_line_col(source, node.name().span().offset());
    format!("line {}, column {}", line, col)
}

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl is built against an older miette, so rebuild the span by hand
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "input" => {
                config.input = parse_input(node, content)?;
            }
            "lang-keys" => {
                config.lang_keys = parse_combo_node(node, content)?;
            }
            "variant-keys" => {
                config.variant_keys = parse_combo_node(node, content)?;
            }
            "commands" => {
                config.commands = parse_commands(node, content)?;
            }
            "log-level" => {
                let val = first_string(node, content)?;
                config.log_level = val.parse().map_err(|e| ConfigError::Invalid { message: e })?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn first_string<'a>(node: &'a kdl::KdlNode, source: &str) -> Result<&'a str, ConfigError> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!(
                "'{}' at {} expects a string value",
                node.name().value(),
                node_position(node, source)
            ),
        })
}

fn parse_input(node: &kdl::KdlNode, source: &str) -> Result<InputSource, ConfigError> {
    let val = first_string(node, source)?;
    if val == "-" {
        return Ok(InputSource::Stdin);
    }
    Ok(InputSource::Path(shellexpand::tilde(val).into_owned().into()))
}

/// Accepts `lang-keys 56 42`, `lang-keys "KEY_LEFTALT" "KEY_LEFTSHIFT"`
/// or the command-line form `lang-keys "56,42"`.
fn parse_combo_node(node: &kdl::KdlNode, source: &str) -> Result<KeyCombo, ConfigError> {
    let entries = node.entries();

    if let [single] = entries {
        if let Some(val) = single.value().as_string() {
            return val.parse();
        }
    }

    let mut codes = Vec::with_capacity(2);
    for entry in entries {
        let value = entry.value();
        let code = if let Some(num) = value.as_i64() {
            KeyCode::try_from(num).map_err(|_| ConfigError::UnknownKey {
                key: num.to_string(),
            })?
        } else if let Some(name) = value.as_string() {
            parse_key_code(name)?
        } else {
            return Err(ConfigError::Invalid {
                message: format!(
                    "'{}' at {} expects key codes or key names",
                    node.name().value(),
                    node_position(node, source)
                ),
            });
        };
        codes.push(code);
    }

    match codes.as_slice() {
        [key1, key2] => Ok(KeyCombo::new(*key1, *key2)),
        _ => Err(ConfigError::InvalidCombo {
            value: node.to_string().trim().to_string(),
            reason: format!(
                "expected exactly two keys at {}, got {}",
                node_position(node, source),
                codes.len()
            ),
        }),
    }
}

fn parse_commands(node: &kdl::KdlNode, source: &str) -> Result<CommandTable, ConfigError> {
    let mut commands = CommandTable::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "default" => {
                    commands.default = first_string(child, source)?.to_string();
                }
                "alternate" => {
                    commands.alternate = first_string(child, source)?.to_string();
                }
                "alternate-variant" => {
                    commands.alternate_variant = first_string(child, source)?.to_string();
                }
                name => {
                    tracing::warn!("Unknown command slot: {}", name);
                }
            }
        }
    }

    commands.validate()?;
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_parse_full_config() {
        let config = r#"
            input "/dev/input/event3"
            lang-keys 56 42
            variant-keys "KEY_LEFTCTRL" "KEY_LEFTSHIFT"
            commands {
                default "echo D"
                alternate "echo A"
                alternate-variant "echo A2"
            }
            log-level "debug"
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(
            result.input,
            InputSource::Path(PathBuf::from("/dev/input/event3"))
        );
        assert_eq!(result.lang_keys, KeyCombo::new(56, 42));
        assert_eq!(result.variant_keys, KeyCombo::new(29, 42));
        assert_eq!(result.commands.default, "echo D");
        assert_eq!(result.commands.alternate, "echo A");
        assert_eq!(result.commands.alternate_variant, "echo A2");
        assert_eq!(result.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_empty_config_keeps_defaults() {
        let result = parse_config_str("").unwrap();
        assert_eq!(result.lang_keys, KeyCombo::new(56, 42));
        assert_eq!(result.variant_keys, KeyCombo::new(29, 42));
        assert_eq!(result.commands, CommandTable::default());
        assert_eq!(result.input, InputSource::Stdin);
    }

    #[test]
    fn test_combo_in_command_line_form() {
        let result = parse_config_str(r#"lang-keys "100,54""#).unwrap();
        assert_eq!(result.lang_keys, KeyCombo::new(100, 54));
    }

    #[test]
    fn test_empty_alternate_variant_disables_variants() {
        let config = r#"
            commands {
                alternate-variant ""
            }
        "#;
        let result = parse_config_str(config).unwrap();
        assert!(!result.commands.variant_enabled());
        assert_eq!(result.commands.default, CommandTable::default().default);
    }

    #[test]
    fn test_empty_default_command_rejected() {
        let config = r#"
            commands {
                default ""
            }
        "#;
        assert!(matches!(
            parse_config_str(config),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_combo_with_three_keys_rejected() {
        let result = parse_config_str("lang-keys 56 42 29");
        assert!(matches!(result, Err(ConfigError::InvalidCombo { .. })));
    }

    #[test]
    fn test_combo_with_out_of_range_code_rejected() {
        let result = parse_config_str("lang-keys 56 70000");
        assert!(matches!(result, Err(ConfigError::UnknownKey { .. })));
    }

    #[test]
    fn test_invalid_log_level() {
        let result = parse_config_str(r#"log-level "loud""#);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_stdin_input() {
        let result = parse_config_str(r#"input "-""#).unwrap();
        assert_eq!(result.input, InputSource::Stdin);
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        let config = r#"
            grab true
            lang-keys 56 42
        "#;
        assert!(parse_config_str(config).is_ok());
    }

    #[test]
    fn test_kdl_syntax_error() {
        let result = parse_config_str("commands {");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_parse_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "variant-keys 97 54").unwrap();

        let result = parse_config(file.path()).unwrap();
        assert_eq!(result.variant_keys, KeyCombo::new(97, 54));
    }

    #[test]
    fn test_parse_config_missing_file() {
        let result = parse_config(Path::new("/nonexistent/altshift.kdl"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
