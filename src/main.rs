//! sketchctl - command line front end for Arduino sketches.
//!
//! Writes sketch files, runs the Arduino toolchain to verify or upload
//! them, and plots numeric telemetry read back over serial.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};
use commands::{cmd_build, cmd_dir_list, cmd_list_ports, cmd_plot};
use sketchctl::config::Settings;
use sketchctl::redefine::MacroOverride;
use sketchctl::sketch::SketchRequest;
use sketchctl::toolchain::{ExitStatusPolicy, Toolchain};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let mut settings = Settings::load()?;
    if let Some(toolchain) = cli.toolchain.clone() {
        settings.toolchain = toolchain;
    }
    if let Some(tag) = cli.board_tag.clone() {
        settings.board_tag = tag;
    }

    match cli.command {
        Commands::Ports => {
            cmd_list_ports(&settings.board_tag)?;
        }
        Commands::Dir { name } => {
            cmd_dir_list(&name)?;
        }
        Commands::Build {
            name,
            dir,
            board,
            check,
            quiet,
            redefine,
            source,
            platform,
            ignore_exit_status,
            timeout,
        } => {
            let request = SketchRequest {
                name,
                dir,
                board,
                port: cli.port.clone(),
                check_only: check,
                verbose: cli.verbose,
                quiet,
                redefines: MacroOverride::from_pairs(&redefine),
            };
            let toolchain = Toolchain::new(&settings.toolchain)
                .with_platform(platform.unwrap_or(settings.platform.clone()))
                .with_timeout(timeout.map(Duration::from_secs));
            let policy = if ignore_exit_status {
                ExitStatusPolicy::Ignore
            } else {
                settings.exit_status_policy()
            };
            cmd_build(&request, source.as_deref(), &toolchain, policy, &settings.board_tag).await?;
        }
        Commands::Plot {
            samples,
            layout,
            json,
            output,
            idle_timeout,
        } => {
            cmd_plot(
                cli.port.as_deref(),
                cli.baud,
                &settings.board_tag,
                samples,
                layout.into(),
                json,
                output.as_deref(),
                idle_timeout,
            )
            .await?;
        }
    }

    Ok(())
}
