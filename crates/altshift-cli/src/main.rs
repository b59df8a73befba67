//! altshift CLI
//!
//! Helper tool for setting up the altshift daemon.

use std::path::{Path, PathBuf};

use altshift_config::Config;
use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;

#[derive(Parser, Debug)]
#[command(name = "altshift")]
#[command(about = "Configuration helper for the altshift layout switcher")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/altshift/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file and show the resolved settings
    Validate {
        /// Print the resolved configuration as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available input devices
    Devices,
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate { json } => cmd_validate(&config_path, json),
        Commands::Devices => cmd_devices(),
    }
}

fn cmd_validate(config_path: &Path, json: bool) -> miette::Result<()> {
    let config = altshift_config::parse_config(config_path)?;

    if json {
        let out = serde_json::to_string_pretty(&config).into_diagnostic()?;
        println!("{}", out);
        return Ok(());
    }

    println!("Validating configuration: {}", config_path.display());
    println!("Configuration is valid!");
    print_summary(&config);
    Ok(())
}

fn print_summary(config: &Config) {
    println!("  Input:          {}", config.input);
    println!("  Layout chord:   {}", config.lang_keys);
    if config.commands.variant_enabled() {
        println!("  Variant chord:  {}", config.variant_keys);
    } else {
        println!("  Variant chord:  disabled");
    }
    println!("  Commands:");
    println!("    default:           {}", config.commands.default);
    println!("    alternate:         {}", config.commands.alternate);
    if config.commands.variant_enabled() {
        println!("    alternate-variant: {}", config.commands.alternate_variant);
    }
    println!("  Log level:      {}", config.log_level.as_filter());
}

fn cmd_devices() -> miette::Result<()> {
    println!("Available input devices:\n");

    let mut paths = Vec::new();
    for entry in std::fs::read_dir("/dev/input").into_diagnostic()? {
        let path = entry.into_diagnostic()?.path();

        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("event"))
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut unreadable = 0;
    for path in paths {
        match evdev::Device::open(&path) {
            Ok(device) => {
                let name = device.name().unwrap_or("Unknown");
                let id = device.input_id();
                let vendor_product = format!("{:04x}:{:04x}", id.vendor(), id.product());

                let device_type = if is_keyboard(&device) { "keyboard" } else { "other" };

                println!("  {} [{}]", name, device_type);
                println!("    Path: {}", path.display());
                println!("    ID: {}", vendor_product);
                println!();
            }
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
                unreadable += 1;
            }
        }
    }

    if unreadable > 0 {
        println!(
            "{} device(s) could not be opened; run as root or join the 'input' group.",
            unreadable
        );
    }
    println!("Pass a keyboard's path to altshiftd with --input.");

    Ok(())
}

/// A device counts as a keyboard if it reports letter keys.
fn is_keyboard(device: &evdev::Device) -> bool {
    device.supported_events().contains(evdev::EventType::KEY)
        && device
            .supported_keys()
            .is_some_and(|keys| keys.contains(evdev::Key::KEY_A))
}
