//! sketchctl - write, compile and upload Arduino sketches, then plot what
//! they print over serial.
//!
//! The library exposes each stage on its own: [`sketch`] lays out sketch
//! files, [`redefine`] rewrites `#define`s, [`ports`] picks a serial device,
//! [`toolchain`] runs the Arduino command line and [`telemetry`] reads
//! numeric samples back.

pub mod config;
pub mod error;
pub mod plot;
pub mod ports;
pub mod redefine;
pub mod serial;
pub mod sketch;
pub mod telemetry;
pub mod toolchain;

pub use error::SketchError;
