//! Error taxonomy for sketch handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the sketch, port and toolchain layers.
#[derive(Debug, Error)]
pub enum SketchError {
    #[error("port {requested} not found. Available ports: [{}]", .available.join(", "))]
    PortNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("cannot upload: {reason}. Run with --check to compile without uploading")]
    UploadWithoutPort { reason: String },

    #[error("no serial port to read from: {reason}. Use --port to pick one")]
    NoPort { reason: String },

    #[error("failed to create directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read sketch source {}", .path.display())]
    ReadSketch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write sketch {}", .path.display())]
    WriteSketch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list directory {}", .path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch toolchain '{binary}' (is it installed and on PATH?)")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("toolchain '{binary}' did not finish within {secs}s")]
    Timeout { binary: String, secs: u64 },

    #[error("toolchain exited with {code}")]
    ToolchainFailed { code: String },

    #[error("failed to enumerate serial ports")]
    Enumerate(#[from] serialport::Error),

    #[error("failed to open serial port {port}")]
    OpenPort {
        port: String,
        #[source]
        source: serialport::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_names_port_and_candidates() {
        let err = SketchError::PortNotFound {
            requested: "COM9".into(),
            available: vec!["COM3".into(), "COM5".into()],
        };
        assert_eq!(
            err.to_string(),
            "port COM9 not found. Available ports: [COM3, COM5]"
        );
    }

    #[test]
    fn test_create_dir_names_path() {
        let err = SketchError::CreateDir {
            path: PathBuf::from("/tmp/sketches"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/sketches"));
    }
}
