//! altshift daemon
//!
//! Watches raw keyboard events and runs layout switching commands when a
//! two-key chord (by default Alt+Shift and Ctrl+Shift) is pressed and
//! released on its own.

mod chord;
mod device;
mod dispatcher;
mod error;
mod event;
mod event_loop;
mod runner;
mod wordexp;

use std::path::PathBuf;

use altshift_config::{Config, ConfigError, InputSource, KeyCombo};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use crate::device::EventReader;
use crate::dispatcher::ModeDispatcher;
use crate::error::{exit_code, DaemonError};
use crate::event_loop::EventLoop;
use crate::runner::ProcessRunner;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Parser, Debug)]
#[command(name = "altshiftd")]
#[command(about = "Switch keyboard layouts with two-key chords")]
#[command(version)]
struct Args {
    /// Path to an optional KDL configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Input event device file, `-` for stdin [default: stdin]
    #[arg(short, long)]
    input: Option<String>,

    /// Chord that switches layout [default: 56,42 (left Alt + left Shift)]
    #[arg(long, value_name = "KEY1,KEY2")]
    lang_keys: Option<KeyCombo>,

    /// Chord that switches layout variant [default: 29,42 (left Ctrl + left Shift)]
    #[arg(long, value_name = "KEY1,KEY2")]
    variant_keys: Option<KeyCombo>,

    /// Command that switches to the default layout
    #[arg(long, value_name = "CMD")]
    cmd_default: Option<String>,

    /// Command that switches to the alternate layout
    #[arg(long, value_name = "CMD")]
    cmd_alternate: Option<String>,

    /// Command that switches to the alternate layout variant; empty disables variants
    #[arg(long, value_name = "CMD")]
    cmd_alternate_variant: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // clap uses 2 for usage errors, which is taken by open failures
            let code = if e.use_stderr() { exit_code::CONFIG } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let filter_handle = init_tracing();

    let code = match run(args, filter_handle).await {
        Ok(()) => 0,
        Err(err) => {
            let code = err.exit_code();
            match err {
                DaemonError::Config(e) => eprintln!("{:?}", miette::Report::new(e)),
                other => tracing::error!("{}", other),
            }
            code
        }
    };

    std::process::exit(code);
}

/// Install the subscriber. Unless `RUST_LOG` is set, the filter can be
/// replaced once the configured log level is known.
fn init_tracing() -> Option<FilterHandle> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            None
        }
        Err(_) => {
            let (filter, handle) = reload::Layer::new(EnvFilter::new("info"));
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            Some(handle)
        }
    }
}

async fn run(args: Args, filter_handle: Option<FilterHandle>) -> Result<(), DaemonError> {
    let config = resolve_config(&args)?;

    if let Some(handle) = filter_handle {
        if let Err(e) = handle.reload(EnvFilter::new(config.log_level.as_filter())) {
            tracing::warn!("Could not apply log level {:?}: {}", config.log_level, e);
        }
    }

    tracing::info!("Reading key events from {}", config.input);
    tracing::info!("Layout chord: {}", config.lang_keys);
    if config.commands.variant_enabled() {
        tracing::info!("Variant chord: {}", config.variant_keys);
    } else {
        tracing::info!("Variant switching disabled");
    }

    let input = device::open_input(&config.input).await?;
    let dispatcher = ModeDispatcher::new(
        config.lang_keys,
        config.variant_keys,
        config.commands.variant_enabled(),
    );
    let mut event_loop = EventLoop::new(
        EventReader::new(input),
        dispatcher,
        config.commands,
        ProcessRunner,
    );

    tracing::info!("altshift daemon started");

    tokio::select! {
        result = event_loop.run() => match result {
            Ok(never) => match never {},
            Err(e) => Err(e),
        },
        signal = shutdown_signal() => {
            tracing::info!("Received {}, shutting down...", signal);
            Ok(())
        }
    }
}

/// Layer the configuration: built-in defaults, then the config file, then
/// command-line flags.
fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = match &args.config {
        Some(path) => {
            // Expand tilde in config path
            let path: PathBuf = shellexpand::tilde(path).into_owned().into();
            tracing::info!("Loading configuration from {}", path.display());
            altshift_config::parse_config(&path)?
        }
        None => Config::default(),
    };

    if let Some(input) = &args.input {
        config.input = if input == "-" {
            InputSource::Stdin
        } else {
            InputSource::Path(shellexpand::tilde(input).into_owned().into())
        };
    }
    if let Some(keys) = args.lang_keys {
        config.lang_keys = keys;
    }
    if let Some(keys) = args.variant_keys {
        config.variant_keys = keys;
    }
    if let Some(cmd) = &args.cmd_default {
        config.commands.default = cmd.clone();
    }
    if let Some(cmd) = &args.cmd_alternate {
        config.commands.alternate = cmd.clone();
    }
    if let Some(cmd) = &args.cmd_alternate_variant {
        config.commands.alternate_variant = cmd.clone();
    }

    config.commands.validate()?;
    Ok(config)
}

/// Resolves on SIGINT or SIGTERM with the signal's name.
async fn shutdown_signal() -> &'static str {
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Cannot listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
            "SIGINT"
        }
        _ = terminate => "SIGTERM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["altshiftd"]).unwrap();
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.input, InputSource::Stdin);
        assert_eq!(config.lang_keys, KeyCombo::new(56, 42));
        assert_eq!(config.variant_keys, KeyCombo::new(29, 42));
        assert!(config.commands.variant_enabled());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "altshiftd",
            "--input",
            "/dev/input/event0",
            "--lang-keys",
            "100,54",
            "--cmd-default",
            "echo D",
            "--cmd-alternate",
            "echo A",
            "--cmd-alternate-variant",
            "",
        ])
        .unwrap();
        let config = resolve_config(&args).unwrap();

        assert_eq!(
            config.input,
            InputSource::Path(PathBuf::from("/dev/input/event0"))
        );
        assert_eq!(config.lang_keys, KeyCombo::new(100, 54));
        assert_eq!(config.commands.default, "echo D");
        assert_eq!(config.commands.alternate, "echo A");
        assert!(!config.commands.variant_enabled());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "lang-keys 97 54").unwrap();
        writeln!(file, "variant-keys 29 54").unwrap();
        writeln!(file, r#"input "/dev/input/event5""#).unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let args = Args::try_parse_from([
            "altshiftd",
            "--config",
            path.as_str(),
            "--variant-keys",
            "KEY_LEFTCTRL,KEY_RIGHTSHIFT",
            "-i",
            "-",
        ])
        .unwrap();
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.lang_keys, KeyCombo::new(97, 54));
        assert_eq!(config.variant_keys, KeyCombo::new(29, 54));
        assert_eq!(config.input, InputSource::Stdin);
    }

    #[test]
    fn test_malformed_combo_is_a_usage_error() {
        let result = Args::try_parse_from(["altshiftd", "--lang-keys", "56"]);
        assert!(result.is_err());

        let result = Args::try_parse_from(["altshiftd", "--variant-keys", "29;42"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_default_command_rejected() {
        let args = Args::try_parse_from(["altshiftd", "--cmd-default", ""]).unwrap();
        let err = resolve_config(&args).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(DaemonError::from(err).exit_code(), exit_code::CONFIG);
    }

    #[test]
    fn test_missing_config_file() {
        let args =
            Args::try_parse_from(["altshiftd", "--config", "/nonexistent/altshift.kdl"]).unwrap();
        assert!(matches!(resolve_config(&args), Err(ConfigError::Io(_))));
    }
}
