use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use hearken::app::{load_config, run_assistant};
use hearken::audio::{list_devices, suppress_audio_warnings};
use hearken::cli::{Cli, Commands};
use hearken::diagnostics::check_dependencies;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    suppress_audio_warnings();
    init_tracing(&cli);

    match &cli.command {
        None => {
            let config = load_config(&cli)?;
            run_assistant(config).await?;
        }
        Some(Commands::Devices) => {
            let devices = list_devices()?;
            if devices.is_empty() {
                println!("No audio input devices found");
            } else {
                println!("Available audio input devices:");
                for device in devices {
                    println!("  {}", device);
                }
            }
        }
        Some(Commands::Check) => {
            let config = load_config(&cli)?;
            if !check_dependencies(&config) {
                std::process::exit(1);
            }
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "hearken", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(cli: &Cli) {
    let default_directive = if cli.quiet {
        "hearken=error"
    } else {
        match cli.verbose {
            0 => "hearken=info",
            1 => "hearken=debug",
            _ => "hearken=trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
