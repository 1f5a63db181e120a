use ghostkeys::chart::{ChartFrame, SeriesPoint};

/// Axis bounds for the latency chart: x over character index, y over ms.
/// Degenerate spans are widened so the chart always has room to draw.
pub fn latency_bounds(frame: &ChartFrame) -> ([f64; 2], [f64; 2]) {
    let x_max = if frame.x_max > 1.0 { frame.x_max } else { 2.0 };
    let y_max = if frame.y_max > 0.0 {
        frame.y_max.ceil()
    } else {
        1.0
    };
    ([1.0, x_max], [0.0, y_max])
}

pub fn to_tuples(points: &[SeriesPoint]) -> Vec<(f64, f64)> {
    points.iter().map(|p| (*p).into()).collect()
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_bounds_empty() {
        let (x, y) = latency_bounds(&ChartFrame::from_series(&[], &[]));
        assert_eq!(x, [1.0, 2.0]);
        assert_eq!(y, [0.0, 1.0]);
    }

    #[test]
    fn test_latency_bounds_cover_both_series() {
        let frame = ChartFrame::from_series(&[120.0, 180.5], &[90.0, 210.2, 150.0]);
        let (x, y) = latency_bounds(&frame);
        assert_eq!(x, [1.0, 3.0]);
        assert_eq!(y, [0.0, 211.0]);
    }

    #[test]
    fn test_to_tuples() {
        let frame = ChartFrame::from_series(&[120.0, 80.0], &[]);
        assert_eq!(to_tuples(&frame.real), vec![(1.0, 120.0), (2.0, 80.0)]);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }
}
