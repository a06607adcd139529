//! Sketch build command

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use sketchctl::ports::PortSelector;
use sketchctl::sketch::{load_source, write_sketch, SketchRequest, SketchResolver, WriteOutcome};
use sketchctl::toolchain::{BuildMode, BuildOptions, ExitStatusPolicy, Toolchain};

/// Write the sketch, then verify or upload it with the toolchain
pub async fn cmd_build(
    request: &SketchRequest,
    source: Option<&Path>,
    toolchain: &Toolchain,
    policy: ExitStatusPolicy,
    board_tag: &str,
) -> Result<()> {
    let resolver = SketchResolver::from_current_dir()?;
    let sketch = resolver.resolve(&request.name, request.dir.as_deref())?;

    let text = match source {
        Some(path) if path == Path::new("-") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read sketch from stdin")?;
            text
        }
        other => load_source(&sketch, other)?,
    };

    match write_sketch(&sketch, &text, &request.redefines)? {
        WriteOutcome::Created => println!("Writing {}", sketch.path.display()),
        WriteOutcome::Overwritten => println!("Overwriting {}", sketch.path.display()),
    }

    match BuildMode::from_check_only(request.check_only) {
        BuildMode::Verify => println!("Check only: compile without uploading to the board"),
        BuildMode::Upload => println!("Build will upload to the board if compile succeeds"),
    }

    let resolved = PortSelector::host(board_tag).resolve(request.port.as_deref())?;
    let options = BuildOptions::new(request, resolved)?;
    if let Some(ref port) = options.port {
        println!("Using port {port}");
    }

    println!("Command: {}", toolchain.command_line(&sketch.path, &options));

    let spinner = if request.quiet || request.verbose {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
        pb.set_message(format!("Building {}", sketch.project_dir));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let result = toolchain.build(&sketch.path, &options).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = result?;

    if !request.quiet {
        std::io::stdout().write_all(&result.stdout)?;
        std::io::stdout().flush()?;
        std::io::stderr().write_all(&result.stderr)?;
    }

    result.check(policy)?;
    println!("Done");

    Ok(())
}
