//! Terminal plots for captured telemetry.
//!
//! Charts are drawn into an off-screen ratatui buffer and printed as plain
//! text, so no alternate screen or raw mode is needed.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    symbols::Marker,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Widget},
};

use crate::telemetry::TelemetryBuffer;

const MARKERS: [Marker; 3] = [Marker::Braille, Marker::Dot, Marker::Block];

/// Render one chart holding `columns` of `buffer` as text lines.
pub fn render(buffer: &TelemetryBuffer, columns: &[usize], width: u16, height: u16) -> Vec<String> {
    let series: Vec<(usize, Vec<(f64, f64)>)> = columns
        .iter()
        .filter_map(|&i| {
            let column = buffer.column(i)?;
            let points = column.iter().enumerate().map(|(x, &y)| (x as f64, y)).collect();
            Some((i, points))
        })
        .collect();

    let (y_min, y_max) = bounds(series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.1)));
    let x_max = buffer.len().saturating_sub(1).max(1) as f64;

    let names: Vec<String> = series.iter().map(|(i, _)| format!("field {i}")).collect();
    let datasets = series
        .iter()
        .zip(&names)
        .enumerate()
        .map(|(n, ((_, points), name))| {
            Dataset::default()
                .name(name.as_str())
                .marker(MARKERS[n % MARKERS.len()])
                .graph_type(GraphType::Line)
                .data(points)
        })
        .collect();

    let title = match columns {
        [single] => format!(" field {single} "),
        _ => " telemetry ".to_string(),
    };

    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(vec!["0".into(), format!("{x_max}").into()]),
        )
        .y_axis(
            Axis::default()
                .bounds([y_min, y_max])
                .labels(vec![format!("{y_min:.2}").into(), format!("{y_max:.2}").into()]),
        );

    let area = Rect::new(0, 0, width.max(20), height.max(8));
    let mut canvas = Buffer::empty(area);
    chart.render(area, &mut canvas);

    (0..area.height)
        .map(|y| {
            (0..area.width)
                .map(|x| canvas.get(x, y).symbol())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(bounds([1.0, 5.0, -2.0].into_iter()), (-2.0, 5.0));
        assert_eq!(bounds([3.0, 3.0].into_iter()), (2.0, 4.0));
        assert_eq!(bounds(std::iter::empty()), (0.0, 1.0));
        assert_eq!(bounds([f64::NAN, 2.0, 4.0].into_iter()), (2.0, 4.0));
    }

    #[test]
    fn test_render_has_requested_size() {
        let lines = render(&TelemetryBuffer::default(), &[], 40, 10);
        assert_eq!(lines.len(), 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
    }
}
