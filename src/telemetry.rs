//! Numeric telemetry capture.
//!
//! A running sketch prints one sample per line as whitespace-separated
//! numbers. The number of fields is learned from the first full line; a
//! line that does not fit that shape ends the capture.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

/// Baud rate used when none is given.
pub const DEFAULT_BAUD: u32 = 9600;

/// One read from a line-oriented source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Line(String),
    /// Nothing arrived within the idle timeout.
    Idle,
    /// The device went away.
    Closed,
}

/// Anything that yields text lines, such as an open serial port.
#[allow(async_fn_in_trait)]
pub trait LineSource {
    async fn next_line(&mut self) -> Result<Incoming>;
}

/// Why a capture stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The requested number of samples was collected.
    Completed,
    /// A line did not parse into the session's field count.
    Malformed,
    Idle,
    Closed,
    /// No usable line to learn the field count from.
    NoSchema,
}

/// How captured columns are grouped into plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// All columns on one plot.
    #[default]
    Overlay,
    /// One plot per column.
    Stacked,
}

/// Column-major sample storage. All columns always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryBuffer {
    columns: Vec<Vec<f64>>,
}

impl TelemetryBuffer {
    pub fn with_width(width: usize) -> Self {
        Self {
            columns: vec![Vec::new(); width],
        }
    }

    /// Number of fields per sample.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    fn push(&mut self, sample: &[f64]) {
        debug_assert_eq!(sample.len(), self.columns.len());
        for (column, value) in self.columns.iter_mut().zip(sample) {
            column.push(*value);
        }
    }
}

/// Result of one capture session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capture {
    pub buffer: TelemetryBuffer,
    /// Samples accepted after the bootstrap sample.
    pub accepted: usize,
    pub reason: StopReason,
    /// The line that ended the session, if it was malformed.
    pub rejected_line: Option<String>,
}

impl Capture {
    fn empty(reason: StopReason, rejected_line: Option<String>) -> Self {
        Self {
            buffer: TelemetryBuffer::default(),
            accepted: 0,
            reason,
            rejected_line,
        }
    }

    /// Column indices for each plot, in drawing order.
    pub fn plots(&self, layout: Layout) -> Vec<Vec<usize>> {
        let width = self.buffer.width();
        if width == 0 {
            return Vec::new();
        }
        match layout {
            Layout::Overlay => vec![(0..width).collect()],
            Layout::Stacked => (0..width).map(|i| vec![i]).collect(),
        }
    }
}

/// Parse exactly `width` leading floats from `line`.
pub fn parse_sample(line: &str, width: usize) -> Option<Vec<f64>> {
    let values: Vec<f64> = line
        .split_whitespace()
        .take(width)
        .map(|token| token.parse::<f64>().ok())
        .collect::<Option<_>>()?;
    (values.len() == width).then_some(values)
}

/// Read samples from `source` until `sample_count` are accepted or the
/// stream stops making sense.
///
/// The first line is discarded since the device may have been mid-line.
/// The second fixes the field count and is kept as the bootstrap sample.
/// `progress` is called with the accepted count after each sample.
pub async fn capture<S, F>(source: &mut S, sample_count: usize, mut progress: F) -> Result<Capture>
where
    S: LineSource,
    F: FnMut(usize),
{
    match source.next_line().await? {
        Incoming::Line(partial) => debug!("Discarding first line: {partial:?}"),
        other => return Ok(Capture::empty(early_stop(other), None)),
    }

    let first = match source.next_line().await? {
        Incoming::Line(line) => line,
        other => return Ok(Capture::empty(early_stop(other), None)),
    };

    let width = first.split_whitespace().count();
    let bootstrap = match parse_sample(&first, width) {
        Some(values) if width > 0 => values,
        _ => return Ok(Capture::empty(StopReason::NoSchema, Some(first))),
    };
    info!("Telemetry has {width} field(s) per line");

    let mut buffer = TelemetryBuffer::with_width(width);
    buffer.push(&bootstrap);

    let mut accepted = 0;
    let mut rejected_line = None;
    let reason = loop {
        if accepted >= sample_count {
            break StopReason::Completed;
        }
        match source.next_line().await? {
            Incoming::Line(line) => match parse_sample(&line, width) {
                Some(values) => {
                    buffer.push(&values);
                    accepted += 1;
                    progress(accepted);
                }
                None => {
                    rejected_line = Some(line);
                    break StopReason::Malformed;
                }
            },
            Incoming::Idle => break StopReason::Idle,
            Incoming::Closed => break StopReason::Closed,
        }
    };
    debug!("Capture stopped ({reason:?}) after {accepted} sample(s)");

    Ok(Capture {
        buffer,
        accepted,
        reason,
        rejected_line,
    })
}

fn early_stop(incoming: Incoming) -> StopReason {
    match incoming {
        Incoming::Idle => StopReason::Idle,
        Incoming::Closed => StopReason::Closed,
        Incoming::Line(_) => StopReason::NoSchema,
    }
}
