//! Serial port discovery and selection.
//!
//! Ports are re-enumerated on every resolution. How a board is recognized
//! depends on the host: Windows and Linux report the board name in the USB
//! product string, macOS does not.

use std::fmt;

use serialport::SerialPortType;
use tracing::{info, warn};

use crate::error::SketchError;
use crate::toolchain::BuildMode;

/// Substring that marks a board in a port description.
pub const BOARD_TAG: &str = "Arduino";

/// One enumerated serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub device: String,
    pub description: String,
}

impl PortCandidate {
    pub fn new(device: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            description: description.into(),
        }
    }
}

/// Source of serial devices.
pub trait PortEnumerator {
    fn enumerate(&self) -> Result<Vec<PortCandidate>, SketchError>;
}

/// Enumerates the serial ports of this host.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPorts;

impl PortEnumerator for HostPorts {
    fn enumerate(&self) -> Result<Vec<PortCandidate>, SketchError> {
        let ports = serialport::available_ports()?;
        Ok(ports
            .into_iter()
            .map(|port| {
                let description = describe(&port.port_type);
                PortCandidate::new(port.port_name, description)
            })
            .collect())
    }
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(info) => {
            let parts: Vec<&str> = [info.manufacturer.as_deref(), info.product.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if parts.is_empty() {
                format!("USB (VID:{:04x} PID:{:04x})", info.vid, info.pid)
            } else {
                parts.join(" ")
            }
        }
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

/// How boards are told apart from other serial devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortPolicy {
    /// Only devices whose description contains `tag` are candidates.
    DescriptionFiltered { tag: String },
    /// Descriptions say nothing about the board; only an explicit port is trusted.
    Unfiltered,
}

impl PortPolicy {
    /// Policy for the host this binary was built for.
    pub fn for_host(tag: &str) -> Self {
        if cfg!(target_os = "macos") {
            Self::Unfiltered
        } else {
            Self::DescriptionFiltered {
                tag: tag.to_string(),
            }
        }
    }

    /// Narrow enumerated ports down to board candidates.
    pub fn candidates(&self, ports: Vec<PortCandidate>) -> Vec<PortCandidate> {
        match self {
            Self::DescriptionFiltered { tag } => ports
                .into_iter()
                .filter(|p| p.description.contains(tag.as_str()))
                .collect(),
            Self::Unfiltered => ports,
        }
    }
}

/// Why no port was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    NoCandidates,
    RequestedAbsent {
        requested: String,
        available: Vec<String>,
    },
    /// Devices exist but none can be identified as a board without an explicit port.
    Unidentified { available: Vec<String> },
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no board ports found"),
            Self::RequestedAbsent { requested, available } => {
                write!(f, "port {requested} not found among [{}]", available.join(", "))
            }
            Self::Unidentified { available } => write!(
                f,
                "boards cannot be identified on this host and no port was given (ports: [{}])",
                available.join(", ")
            ),
        }
    }
}

/// Outcome of port resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPort {
    /// `ambiguous` lists every candidate when more than one matched.
    Device { device: String, ambiguous: Vec<String> },
    None(Unresolved),
}

impl ResolvedPort {
    pub fn device(&self) -> Option<&str> {
        match self {
            Self::Device { device, .. } => Some(device),
            Self::None(_) => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Device { ambiguous, .. } if !ambiguous.is_empty())
    }

    /// The chosen device, for callers that cannot proceed without one.
    pub fn into_device(self) -> Result<String, SketchError> {
        match self {
            Self::Device { device, .. } => Ok(device),
            Self::None(Unresolved::RequestedAbsent { requested, available }) => {
                Err(SketchError::PortNotFound { requested, available })
            }
            Self::None(reason) => Err(SketchError::NoPort {
                reason: reason.to_string(),
            }),
        }
    }

    /// Turn the outcome into a port for `mode`.
    ///
    /// A requested port that was not found is always an error. Other
    /// failures are only errors when uploading.
    pub fn require(self, mode: BuildMode) -> Result<Option<String>, SketchError> {
        match self {
            Self::Device { device, .. } => Ok(Some(device)),
            Self::None(Unresolved::RequestedAbsent { requested, available }) => {
                Err(SketchError::PortNotFound { requested, available })
            }
            Self::None(reason) => match mode {
                BuildMode::Verify => Ok(None),
                BuildMode::Upload => Err(SketchError::UploadWithoutPort {
                    reason: reason.to_string(),
                }),
            },
        }
    }
}

/// Picks the serial device to talk to.
#[derive(Debug, Clone)]
pub struct PortSelector<E = HostPorts> {
    policy: PortPolicy,
    enumerator: E,
}

impl PortSelector<HostPorts> {
    pub fn host(tag: &str) -> Self {
        Self::new(PortPolicy::for_host(tag), HostPorts)
    }
}

impl<E: PortEnumerator> PortSelector<E> {
    pub fn new(policy: PortPolicy, enumerator: E) -> Self {
        Self { policy, enumerator }
    }

    pub fn policy(&self) -> &PortPolicy {
        &self.policy
    }

    /// Candidates under the current policy.
    pub fn candidates(&self) -> Result<Vec<PortCandidate>, SketchError> {
        Ok(self.policy.candidates(self.enumerator.enumerate()?))
    }

    /// Every enumerated device, unfiltered.
    pub fn all_ports(&self) -> Result<Vec<PortCandidate>, SketchError> {
        self.enumerator.enumerate()
    }

    /// Resolve `requested` (or pick a default) against the devices present now.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ResolvedPort, SketchError> {
        let candidates: Vec<String> = self
            .candidates()?
            .into_iter()
            .map(|p| p.device)
            .collect();

        if let Some(requested) = requested {
            if candidates.iter().any(|d| d == requested) {
                info!("Using port {requested}");
                return Ok(ResolvedPort::Device {
                    device: requested.to_string(),
                    ambiguous: Vec::new(),
                });
            }
            return Ok(ResolvedPort::None(Unresolved::RequestedAbsent {
                requested: requested.to_string(),
                available: candidates,
            }));
        }

        if candidates.is_empty() {
            return Ok(ResolvedPort::None(Unresolved::NoCandidates));
        }

        if self.policy == PortPolicy::Unfiltered {
            return Ok(ResolvedPort::None(Unresolved::Unidentified {
                available: candidates,
            }));
        }

        let device = candidates[0].clone();
        let ambiguous = if candidates.len() > 1 {
            warn!("Multiple board ports found: [{}]", candidates.join(", "));
            candidates
        } else {
            Vec::new()
        };
        info!("Using port {device}");
        Ok(ResolvedPort::Device { device, ambiguous })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPorts(Vec<PortCandidate>);

    impl PortEnumerator for FixedPorts {
        fn enumerate(&self) -> Result<Vec<PortCandidate>, SketchError> {
            Ok(self.0.clone())
        }
    }

    fn filtered(ports: &[(&str, &str)]) -> PortSelector<FixedPorts> {
        selector(PortPolicy::DescriptionFiltered { tag: BOARD_TAG.into() }, ports)
    }

    fn selector(policy: PortPolicy, ports: &[(&str, &str)]) -> PortSelector<FixedPorts> {
        let ports = ports.iter().map(|(d, desc)| PortCandidate::new(*d, *desc)).collect();
        PortSelector::new(policy, FixedPorts(ports))
    }

    fn two_boards() -> PortSelector<FixedPorts> {
        filtered(&[
            ("COM1", "Communications Port"),
            ("COM3", "Arduino Uno (COM3)"),
            ("COM5", "Arduino Mega 2560 (COM5)"),
        ])
    }

    #[test]
    fn test_requested_absent_is_fatal_in_both_modes() {
        let resolved = two_boards().resolve(Some("COM9")).unwrap();
        assert_eq!(
            resolved,
            ResolvedPort::None(Unresolved::RequestedAbsent {
                requested: "COM9".into(),
                available: vec!["COM3".into(), "COM5".into()],
            })
        );
        for mode in [BuildMode::Verify, BuildMode::Upload] {
            let err = resolved.clone().require(mode).unwrap_err();
            assert!(matches!(err, SketchError::PortNotFound { .. }));
        }
    }

    #[test]
    fn test_requested_non_board_port_is_absent() {
        let resolved = two_boards().resolve(Some("COM1")).unwrap();
        assert!(resolved.device().is_none());
    }

    #[test]
    fn test_ambiguous_picks_first_and_names_all() {
        let resolved = two_boards().resolve(None).unwrap();
        assert_eq!(resolved.device(), Some("COM3"));
        assert!(resolved.is_ambiguous());
        assert_eq!(
            resolved,
            ResolvedPort::Device {
                device: "COM3".into(),
                ambiguous: vec!["COM3".into(), "COM5".into()],
            }
        );
    }

    #[test]
    fn test_requested_candidate_is_used() {
        let resolved = two_boards().resolve(Some("COM5")).unwrap();
        assert_eq!(resolved.device(), Some("COM5"));
        assert!(!resolved.is_ambiguous());
    }

    #[test]
    fn test_no_candidates_fatal_only_for_upload() {
        let resolved = filtered(&[("/dev/ttyS0", "n/a")]).resolve(None).unwrap();
        assert_eq!(resolved, ResolvedPort::None(Unresolved::NoCandidates));
        assert_eq!(resolved.clone().require(BuildMode::Verify).unwrap(), None);
        assert!(matches!(
            resolved.require(BuildMode::Upload),
            Err(SketchError::UploadWithoutPort { .. })
        ));
    }

    #[test]
    fn test_into_device() {
        assert_eq!(two_boards().resolve(None).unwrap().into_device().unwrap(), "COM3");
        assert!(matches!(
            ResolvedPort::None(Unresolved::NoCandidates).into_device(),
            Err(SketchError::NoPort { .. })
        ));
        assert!(matches!(
            two_boards().resolve(Some("COM9")).unwrap().into_device(),
            Err(SketchError::PortNotFound { .. })
        ));
    }

    #[test]
    fn test_unfiltered_accepts_any_requested_device() {
        let sel = selector(
            PortPolicy::Unfiltered,
            &[("/dev/cu.Bluetooth", "n/a"), ("/dev/cu.usbmodem1401", "n/a")],
        );
        let resolved = sel.resolve(Some("/dev/cu.usbmodem1401")).unwrap();
        assert_eq!(resolved.device(), Some("/dev/cu.usbmodem1401"));

        let resolved = sel.resolve(Some("/dev/cu.usbmodem9")).unwrap();
        assert!(matches!(
            resolved,
            ResolvedPort::None(Unresolved::RequestedAbsent { .. })
        ));
    }

    #[test]
    fn test_unfiltered_without_request_is_unidentified() {
        let sel = selector(PortPolicy::Unfiltered, &[("/dev/cu.usbmodem1401", "n/a")]);
        let resolved = sel.resolve(None).unwrap();
        assert!(matches!(
            resolved,
            ResolvedPort::None(Unresolved::Unidentified { .. })
        ));
        assert_eq!(resolved.clone().require(BuildMode::Verify).unwrap(), None);
        assert!(matches!(
            resolved.require(BuildMode::Upload),
            Err(SketchError::UploadWithoutPort { .. })
        ));
    }

    #[test]
    fn test_describe_usb_port() {
        let info = serialport::UsbPortInfo {
            vid: 0x2341,
            pid: 0x0043,
            serial_number: None,
            manufacturer: Some("Arduino (www.arduino.cc)".into()),
            product: Some("Uno".into()),
        };
        assert_eq!(
            describe(&SerialPortType::UsbPort(info)),
            "Arduino (www.arduino.cc) Uno"
        );
        assert_eq!(describe(&SerialPortType::Unknown), "n/a");
    }

    #[test]
    fn test_host_enumeration_no_panic() {
        let _ = HostPorts.enumerate();
    }
}
