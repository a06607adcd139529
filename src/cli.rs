//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sketchctl::telemetry::{Layout, DEFAULT_BAUD};

#[derive(Parser)]
#[command(name = "sketchctl")]
#[command(author, version, about = "Write, build and upload Arduino sketches", long_about = None)]
pub struct Cli {
    /// Serial port device (e.g., /dev/ttyACM0 on Linux, COM3 on Windows)
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Baud rate for telemetry capture
    #[arg(long, default_value_t = DEFAULT_BAUD, global = true)]
    pub baud: u32,

    /// Enable verbose logging (also passed to the toolchain)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Toolchain binary (overrides ARDUINO_BIN and the settings file)
    #[arg(long, global = true)]
    pub toolchain: Option<PathBuf>,

    /// Substring that identifies boards in port descriptions
    #[arg(long, global = true)]
    pub board_tag: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List serial ports that look like boards
    Ports,

    /// List files in a sketch directory under sketches/
    Dir {
        /// Sketch directory name
        name: String,
    },

    /// Write a sketch, compile it and upload it to the board
    Build {
        /// Sketch name, with or without .ino
        name: String,

        /// Directory to hold the sketch instead of sketches/<name>
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Board id (uno, micro, ...) or fully qualified vendor:arch:board
        #[arg(short, long)]
        board: Option<String>,

        /// Compile only, do not upload
        #[arg(short, long)]
        check: bool,

        /// Do not print toolchain output
        #[arg(short, long)]
        quiet: bool,

        /// Re-define a #define constant (repeatable): --redefine FREQUENCY 300
        #[arg(long, num_args = 2, value_names = ["NAME", "VALUE"])]
        redefine: Vec<String>,

        /// Read the sketch text from a file ("-" for stdin) instead of the existing sketch
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// `<vendor>:<architecture>` for bare board ids
        #[arg(long)]
        platform: Option<String>,

        /// Report success even if the toolchain exits non-zero
        #[arg(long)]
        ignore_exit_status: bool,

        /// Kill the toolchain after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Capture numeric telemetry from the board and plot it
    Plot {
        /// Number of samples to collect
        #[arg(short = 'n', long, default_value = "100")]
        samples: usize,

        /// Plot layout
        #[arg(short, long, value_enum, default_value = "overlay")]
        layout: LayoutArg,

        /// Print the captured data as JSON instead of charts
        #[arg(long)]
        json: bool,

        /// Also write the captured data as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop if no line arrives for this many seconds
        #[arg(long)]
        idle_timeout: Option<u64>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum LayoutArg {
    /// All fields on one chart
    Overlay,
    /// One chart per field
    Stacked,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Overlay => Layout::Overlay,
            LayoutArg::Stacked => Layout::Stacked,
        }
    }
}
