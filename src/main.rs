//! fp-shield - Main Entry Point
//!
//! Command-line companion for fingerprint-shield. It validates and hashes
//! fingerprint config files, shows the effective host settings, and lists the
//! loaded device profile and behavior pattern catalogs.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fingerprint_shield::{
    config::{CliArgs, FingerprintConfig, ShieldSettings},
    stealth::Shield,
    NAME, VERSION,
};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const BLUE: &str = "\x1b[34m";
}

/// Print the banner with version
fn print_banner() {
    println!(
        r#"
{cyan}{bold}  __                _     _      _     _
 / _|_ __       ___| |__ (_) ___| | __| |
| |_| '_ \ ____/ __| '_ \| |/ _ \ |/ _` |
|  _| |_) |____\__ \ | | | |  __/ | (_| |
|_| | .__/     |___/_| |_|_|\___|_|\__,_|
    |_|{reset}
{dim}  Fingerprint Spoofing & Detection{reset}
{dim}  Version: {version}{reset}
"#,
        cyan = colors::CYAN,
        bold = colors::BOLD,
        reset = colors::RESET,
        dim = colors::DIM,
        version = VERSION
    );
}

fn on_off(value: bool) -> String {
    if value {
        format!("{green}on{reset}", green = colors::GREEN, reset = colors::RESET)
    } else {
        format!("{yellow}off{reset}", yellow = colors::YELLOW, reset = colors::RESET)
    }
}

fn path_or_none(path: Option<&PathBuf>) -> String {
    path.map_or_else(|| "-".to_string(), |p| p.display().to_string())
}

/// Print the effective settings
fn print_settings_summary(settings: &ShieldSettings) {
    println!(
        "{bold}{blue}Settings:{reset}",
        bold = colors::BOLD,
        blue = colors::BLUE,
        reset = colors::RESET
    );
    println!(
        "  {dim}Protection:{reset}         {}",
        on_off(settings.enabled),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Config:{reset}             {}",
        path_or_none(settings.config_path.as_ref()),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Device profiles:{reset}    {}",
        path_or_none(settings.device_profiles_path.as_ref()),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Behavior patterns:{reset}  {}",
        path_or_none(settings.behavior_patterns_path.as_ref()),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Session key:{reset}        {}",
        if settings.session_key.is_some() { "fixed" } else { "random" },
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!();
}

/// Print the surfaces a config spoofs
fn print_config_summary(config: &FingerprintConfig) {
    println!(
        "{bold}{blue}Default config:{reset} {} {dim}({}){reset}",
        config.profile_name,
        config.hash(),
        bold = colors::BOLD,
        blue = colors::BLUE,
        dim = colors::DIM,
        reset = colors::RESET
    );

    let surfaces = [
        ("Canvas", config.canvas.enabled),
        ("WebGL", config.webgl.enabled),
        ("Navigator", config.navigator.enabled),
        ("Audio", config.audio.enabled),
        ("Fonts", config.font.enabled),
        ("WebRTC", config.webrtc.enabled),
        ("Geolocation", config.geolocation.enabled),
        ("Screen", config.screen.enabled),
        ("Timezone", config.timezone.enabled),
        ("Anti-detection", config.anti_detection.enabled),
    ];
    for (name, enabled) in surfaces {
        println!(
            "  {dim}{:<18}{reset} {}",
            format!("{}:", name),
            on_off(config.enabled && enabled),
            dim = colors::DIM,
            reset = colors::RESET
        );
    }
    println!(
        "  {dim}Canvas noise:{reset}       {}",
        config.canvas.noise_level,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}WebGL renderer:{reset}     {}",
        config.webgl.renderer,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!();
}

/// Build the CLI command parser
fn build_cli() -> Command {
    Command::new("fp-shield")
        .version(VERSION)
        .author("KI-Browser Team")
        .about("Fingerprint spoofing and fingerprinting detection toolkit")
        .long_about(
            "fp-shield inspects the inputs of a fingerprint-shield host:\n\
             - validates fingerprint config files and reports every issue\n\
             - prints config content hashes\n\
             - shows the effective host settings\n\
             - lists device profiles and behavior patterns",
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a fingerprint config file (JSON or TOML)")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("hash")
                .about("Print the content hash of a fingerprint config file")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(Command::new("show").about("Show effective settings and the default config"))
        .subcommand(Command::new("profiles").about("List device profiles and behavior patterns"))
        .arg(
            Arg::new("settings")
                .short('s')
                .long("settings")
                .value_name("FILE")
                .global(true)
                .help("Path to settings file (TOML or JSON)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Default fingerprint config file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("device-profiles")
                .long("device-profiles")
                .value_name("FILE")
                .global(true)
                .help("Device profile catalog (JSON)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("behavior-patterns")
                .long("behavior-patterns")
                .value_name("FILE")
                .global(true)
                .help("Behavior pattern catalog (JSON)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("session-key")
                .long("session-key")
                .value_name("KEY")
                .global(true)
                .help("Fixed session key for reproducible noise"),
        )
        .arg(
            Arg::new("disabled")
                .long("disabled")
                .global(true)
                .help("Start with protection switched off")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Enable verbose logging")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .help("Suppress output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
}

/// Parse CLI arguments into CliArgs struct
fn parse_cli_args(matches: &ArgMatches) -> CliArgs {
    CliArgs {
        settings_file: matches.get_one::<PathBuf>("settings").cloned(),
        enabled: matches.get_flag("disabled").then_some(false),
        config_path: matches.get_one::<PathBuf>("config").cloned(),
        device_profiles_path: matches.get_one::<PathBuf>("device-profiles").cloned(),
        behavior_patterns_path: matches.get_one::<PathBuf>("behavior-patterns").cloned(),
        session_key: matches.get_one::<String>("session-key").cloned(),
    }
}

/// Initialize the tracing/logging subsystem
fn init_tracing(verbosity: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

fn load_config(path: &Path) -> Result<FingerprintConfig> {
    FingerprintConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))
}

fn cmd_validate(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    match config.validate() {
        Ok(()) => {
            println!(
                "{green}valid{reset} {} ({})",
                path.display(),
                config.hash(),
                green = colors::GREEN,
                reset = colors::RESET
            );
            Ok(())
        }
        Err(err) => {
            println!(
                "{red}invalid{reset} {}",
                path.display(),
                red = colors::RED,
                reset = colors::RESET
            );
            for reason in err.reasons() {
                println!("  - {}", reason);
            }
            bail!("{} has {} issue(s)", path.display(), err.issues.len());
        }
    }
}

fn cmd_hash(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    println!("{}", config.hash());
    Ok(())
}

fn build_shield(settings: &ShieldSettings) -> Result<Shield> {
    Shield::from_settings(settings).context("Failed to initialize fingerprint shield")
}

fn cmd_show(settings: &ShieldSettings, quiet: bool) -> Result<()> {
    let shield = build_shield(settings)?;
    if !quiet {
        print_settings_summary(settings);
    }
    print_config_summary(shield.registry().default_config().config());
    Ok(())
}

fn cmd_profiles(settings: &ShieldSettings) -> Result<()> {
    let shield = build_shield(settings)?;
    let registry = shield.registry();

    println!(
        "{bold}{blue}Device profiles:{reset}",
        bold = colors::BOLD,
        blue = colors::BLUE,
        reset = colors::RESET
    );
    for name in registry.available_profiles() {
        let profile = registry.device_profile_or_default(&name);
        println!(
            "  {}  {dim}{}{reset}",
            name,
            profile.description,
            dim = colors::DIM,
            reset = colors::RESET
        );
    }

    println!(
        "{bold}{blue}Behavior patterns:{reset}",
        bold = colors::BOLD,
        blue = colors::BLUE,
        reset = colors::RESET
    );
    for name in registry.available_patterns() {
        let pattern = registry.behavior_pattern_or_default(&name);
        println!(
            "  {}  {dim}{} wpm{reset}",
            name,
            pattern.keyboard.typing_speed_wpm,
            dim = colors::DIM,
            reset = colors::RESET
        );
    }
    Ok(())
}

/// Main application entry point
fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let verbosity = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");
    init_tracing(verbosity, quiet);

    match matches.subcommand() {
        Some(("validate", sub)) => {
            let path = sub
                .get_one::<PathBuf>("file")
                .context("missing config file argument")?;
            cmd_validate(path)
        }
        Some(("hash", sub)) => {
            let path = sub
                .get_one::<PathBuf>("file")
                .context("missing config file argument")?;
            cmd_hash(path)
        }
        other => {
            let cli_args = parse_cli_args(&matches);
            let settings = cli_args
                .load_settings()
                .context("Failed to load configuration")?;
            debug!("Effective settings: {:?}", settings);

            if !quiet {
                print_banner();
            }
            let result = match other {
                Some(("profiles", _)) => cmd_profiles(&settings),
                _ => cmd_show(&settings, quiet),
            };
            result?;
            info!("{} done", NAME);
            Ok(())
        }
    }
}
