//! particle_scene — interactive entry point.

use std::process;

use anyhow::{Context, Result};
use gesture_control::ControlConfig;
use particle_scene::app::{run, AppConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    println!();
    println!("╔═══════════════════════════════════════════════════╗");
    println!("║   Starfir - a gesture-controlled particle scene   ║");
    println!("╚═══════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Input: LeapMotion hand tracking");
    #[cfg(not(feature = "leap"))]
    println!("  Input: keyboard/mouse simulation  (build with --features leap for hardware)");
    println!();
    println!("  Click the window three times to wake the scene.");
    println!();

    let cfg = match build_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e:#}");
            process::exit(2);
        }
    };

    if let Err(e) = run(cfg) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn build_config() -> Result<AppConfig> {
    let mut cfg = AppConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mouse" => cfg.start_in_gesture = false,
            "--no-audio" => cfg.audio = false,
            "--config" => {
                let path = args.next().context("--config needs a file path")?;
                cfg.control = load_control_config(&path)
                    .with_context(|| format!("loading control config from {path}"))?;
            }
            other => anyhow::bail!(
                "unknown argument: {other} (known: --mouse, --no-audio, --config <path>)"
            ),
        }
    }
    Ok(cfg)
}

fn load_control_config(path: &str) -> Result<ControlConfig> {
    let text = std::fs::read_to_string(path)?;
    let control: ControlConfig = toml::from_str(&text)?;
    control.validate()?;
    Ok(control)
}
