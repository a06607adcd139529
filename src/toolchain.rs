//! Arduino toolchain invocation.
//!
//! Builds the argument list for the `arduino` command line, runs it to
//! completion and hands back whatever it printed.
//!
//! ```text
//! arduino --verify|--upload [--port <device>] [--verbose] [--board <vendor>:<arch>:<id>] <sketch>
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::SketchError;
use crate::ports::ResolvedPort;
use crate::sketch::SketchRequest;

/// Toolchain binary used when nothing else is configured.
pub const DEFAULT_TOOLCHAIN: &str = "arduino";

/// `<vendor>:<architecture>` prefix for bare board names.
pub const DEFAULT_PLATFORM: &str = "arduino:avr";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Compile only.
    Verify,
    /// Compile and upload.
    Upload,
}

impl BuildMode {
    pub fn from_check_only(check_only: bool) -> Self {
        if check_only {
            Self::Verify
        } else {
            Self::Upload
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            Self::Verify => "--verify",
            Self::Upload => "--upload",
        }
    }
}

/// Validated options for one toolchain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub mode: BuildMode,
    pub port: Option<String>,
    pub board: Option<String>,
    pub verbose: bool,
}

impl BuildOptions {
    /// Combine a request with its port resolution.
    ///
    /// Fails when uploading without a port, or when the requested port is
    /// missing; nothing is spawned in either case.
    pub fn new(request: &SketchRequest, port: ResolvedPort) -> Result<Self, SketchError> {
        let mode = BuildMode::from_check_only(request.check_only);
        let port = port.require(mode)?;
        Ok(Self {
            mode,
            port,
            board: request.board.clone(),
            verbose: request.verbose,
        })
    }
}

/// Whether a non-zero toolchain exit counts as failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitStatusPolicy {
    #[default]
    Enforce,
    Ignore,
}

/// Captured output of a toolchain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl BuildResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Apply `policy` to the exit status.
    pub fn check(&self, policy: ExitStatusPolicy) -> Result<(), SketchError> {
        if policy == ExitStatusPolicy::Ignore || self.success() {
            return Ok(());
        }
        let code = match self.exit_code {
            Some(c) => format!("status {c}"),
            None => "a signal".to_string(),
        };
        Err(SketchError::ToolchainFailed { code })
    }
}

/// The external compiler/uploader.
#[derive(Debug, Clone)]
pub struct Toolchain {
    binary: PathBuf,
    platform: String,
    timeout: Option<Duration>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new(DEFAULT_TOOLCHAIN)
    }
}

impl Toolchain {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            platform: DEFAULT_PLATFORM.to_string(),
            timeout: None,
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Fully qualified board id. Already-qualified ids pass through.
    pub fn board_id(&self, board: &str) -> String {
        if board.contains(':') {
            board.to_string()
        } else {
            format!("{}:{}", self.platform, board)
        }
    }

    /// Arguments in toolchain order; the sketch path is always last.
    pub fn args(&self, sketch: &Path, options: &BuildOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![options.mode.flag().into()];

        if let Some(ref port) = options.port {
            args.push("--port".into());
            args.push(port.into());
        }

        if options.verbose {
            args.push("--verbose".into());
        }

        if let Some(ref board) = options.board {
            args.push("--board".into());
            args.push(self.board_id(board).into());
        }

        args.push(sketch.as_os_str().to_os_string());
        args
    }

    /// Human-readable command line, for display only.
    pub fn command_line(&self, sketch: &Path, options: &BuildOptions) -> String {
        std::iter::once(self.binary.as_os_str().to_os_string())
            .chain(self.args(sketch, options))
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the toolchain and wait for it to exit.
    pub async fn build(&self, sketch: &Path, options: &BuildOptions) -> Result<BuildResult, SketchError> {
        let binary = self.binary.display().to_string();
        info!("Running {}", self.command_line(sketch, options));

        let mut command = Command::new(&self.binary);
        command
            .args(self.args(sketch, options))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let child = command.output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| SketchError::Timeout {
                    binary: binary.clone(),
                    secs: limit.as_secs(),
                })?,
            None => child.await,
        }
        .map_err(|source| SketchError::Spawn { binary, source })?;

        debug!("Toolchain exited with {:?}", output.status.code());
        Ok(BuildResult {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Unresolved;

    fn request(check_only: bool) -> SketchRequest {
        SketchRequest {
            name: "blink".into(),
            check_only,
            ..Default::default()
        }
    }

    fn options(mode: BuildMode, port: Option<&str>) -> BuildOptions {
        BuildOptions {
            mode,
            port: port.map(String::from),
            board: None,
            verbose: false,
        }
    }

    #[test]
    fn test_mode_from_check_only() {
        assert_eq!(BuildMode::from_check_only(true), BuildMode::Verify);
        assert_eq!(BuildMode::from_check_only(false), BuildMode::Upload);
    }

    #[test]
    fn test_verify_without_port_proceeds() {
        let opts = BuildOptions::new(&request(true), ResolvedPort::None(Unresolved::NoCandidates)).unwrap();
        assert_eq!(opts.mode, BuildMode::Verify);
        assert_eq!(opts.port, None);
    }

    #[test]
    fn test_upload_without_port_aborts() {
        let err = BuildOptions::new(&request(false), ResolvedPort::None(Unresolved::NoCandidates)).unwrap_err();
        assert!(matches!(err, SketchError::UploadWithoutPort { .. }));
    }

    #[test]
    fn test_argument_order() {
        let tc = Toolchain::default();
        let opts = BuildOptions {
            mode: BuildMode::Upload,
            port: Some("/dev/ttyACM0".into()),
            board: Some("uno".into()),
            verbose: true,
        };
        let args = tc.args(Path::new("/s/blink/blink.ino"), &opts);
        let expected: Vec<OsString> = [
            "--upload",
            "--port",
            "/dev/ttyACM0",
            "--verbose",
            "--board",
            "arduino:avr:uno",
            "/s/blink/blink.ino",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_minimal_arguments() {
        let tc = Toolchain::default();
        let args = tc.args(Path::new("a.ino"), &options(BuildMode::Verify, None));
        assert_eq!(args, vec![OsString::from("--verify"), OsString::from("a.ino")]);
    }

    #[test]
    fn test_board_id() {
        let tc = Toolchain::default().with_platform("esp32:esp32");
        assert_eq!(tc.board_id("esp32dev"), "esp32:esp32:esp32dev");
        assert_eq!(tc.board_id("arduino:samd:mkr1000"), "arduino:samd:mkr1000");
    }

    #[test]
    fn test_exit_status_policy() {
        let failed = BuildResult {
            exit_code: Some(1),
            stdout: Vec::new(),
            stderr: b"error".to_vec(),
        };
        assert!(failed.check(ExitStatusPolicy::Ignore).is_ok());
        assert!(matches!(
            failed.check(ExitStatusPolicy::Enforce),
            Err(SketchError::ToolchainFailed { .. })
        ));

        let killed = BuildResult { exit_code: None, ..failed };
        let err = killed.check(ExitStatusPolicy::Enforce).unwrap_err();
        assert_eq!(err.to_string(), "toolchain exited with a signal");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_passes_arguments_without_shell_splitting() {
        let tc = Toolchain::new("echo");
        let opts = options(BuildMode::Verify, Some("/dev/tty usb"));
        let result = tc.build(Path::new("/tmp/my sketch.ino"), &opts).await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout_lossy(), "--verify --port /dev/tty usb /tmp/my sketch.ino\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_reports_exit_status() {
        let result = Toolchain::new("false")
            .build(Path::new("x.ino"), &options(BuildMode::Verify, None))
            .await
            .unwrap();
        assert_eq!(result.exit_code, Some(1));
        assert!(result.check(ExitStatusPolicy::Enforce).is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let err = Toolchain::new("sketchctl-no-such-toolchain")
            .build(Path::new("x.ino"), &options(BuildMode::Verify, None))
            .await
            .unwrap_err();
        assert!(matches!(err, SketchError::Spawn { .. }));
        assert!(err.to_string().contains("sketchctl-no-such-toolchain"));
    }
}
