//! Telemetry capture and plotting command

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use sketchctl::plot;
use sketchctl::ports::PortSelector;
use sketchctl::serial::SerialPort;
use sketchctl::telemetry::{self, Capture, Layout, StopReason};

const CHART_HEIGHT: u16 = 16;

#[derive(Serialize)]
struct CaptureReport<'a> {
    captured_at: String,
    port: &'a str,
    baud: u32,
    layout: Layout,
    #[serde(flatten)]
    capture: &'a Capture,
}

/// Read telemetry from the board, then print charts or JSON
#[allow(clippy::too_many_arguments)]
pub async fn cmd_plot(
    port: Option<&str>,
    baud: u32,
    board_tag: &str,
    samples: usize,
    layout: Layout,
    json: bool,
    output: Option<&Path>,
    idle_timeout: Option<u64>,
) -> Result<()> {
    let device = PortSelector::host(board_tag).resolve(port)?.into_device()?;
    println!("Reading {samples} samples from {device} at {baud} baud");

    let capture = {
        let mut serial = SerialPort::open(&device, baud)?
            .with_idle_timeout(idle_timeout.map(Duration::from_secs));

        let pb = ProgressBar::new(samples as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
                .progress_chars("#>-"),
        );
        let capture = telemetry::capture(&mut serial, samples, |n| pb.set_position(n as u64)).await;
        pb.finish_and_clear();
        capture?
    };

    match capture.reason {
        StopReason::Completed => {}
        StopReason::Malformed => println!(
            "Stopped after {} samples: unreadable line {:?}",
            capture.accepted,
            capture.rejected_line.as_deref().unwrap_or_default()
        ),
        StopReason::Idle => println!("Stopped after {} samples: no data from {device}", capture.accepted),
        StopReason::Closed => println!("Stopped after {} samples: {device} closed", capture.accepted),
        StopReason::NoSchema => {
            println!(
                "No numeric data from {device}: {:?}",
                capture.rejected_line.as_deref().unwrap_or_default()
            );
        }
    }

    if json || output.is_some() {
        let report = CaptureReport {
            captured_at: chrono::Local::now().to_rfc3339(),
            port: &device,
            baud,
            layout,
            capture: &capture,
        };
        let text = serde_json::to_string_pretty(&report)?;

        if let Some(path) = output {
            fs::write(path, &text).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        if json {
            println!("{text}");
            return Ok(());
        }
    }

    let width = crossterm::terminal::size().map(|(w, _)| w).unwrap_or(80);
    for columns in capture.plots(layout) {
        for line in plot::render(&capture.buffer, &columns, width, CHART_HEIGHT) {
            println!("{line}");
        }
    }

    Ok(())
}
