/// Arithmetic mean, `None` for an empty series
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Largest finite value, or 0 when there is none. Chart axes start at zero.
pub fn peak(values: impl IntoIterator<Item = f64>) -> f64 {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}

/// Latency statistics shown once a race is done
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub std_dev_ms: f64,
}

impl LatencySummary {
    pub fn of(latencies: &[f64]) -> Option<Self> {
        Some(Self {
            mean_ms: mean(latencies)?,
            std_dev_ms: std_dev(latencies)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_latencies() {
        assert_eq!(mean(&[100., 200., 300.]), Some(200.));
        assert_eq!(mean(&[175.8]), Some(175.8));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn std_dev_is_population() {
        assert_eq!(std_dev(&[15., 7., 55.]), Some(20.997354330698162));
        assert_eq!(std_dev(&[120., 120., 120.]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn peak_skips_non_finite() {
        assert_eq!(peak([120.0, f64::NAN, 340.0, f64::INFINITY]), 340.0);
        assert_eq!(peak(Vec::<f64>::new()), 0.0);
        assert_eq!(peak([-5.0]), 0.0);
    }

    #[test]
    fn summary_needs_data() {
        assert_eq!(LatencySummary::of(&[]), None);
        let s = LatencySummary::of(&[100., 300.]).unwrap();
        assert_eq!(s.mean_ms, 200.);
        assert_eq!(s.std_dev_ms, 100.);
    }
}
