use crate::util::peak;

/// One plotted point: 1-based character index against a latency in ms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub index: usize,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(index: usize, value: f64) -> Self {
        Self { index, value }
    }
}

impl From<SeriesPoint> for (f64, f64) {
    fn from(p: SeriesPoint) -> Self {
        (p.index as f64, p.value)
    }
}

/// Real and ghost latency series sharing one x and one y axis
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartFrame {
    pub real: Vec<SeriesPoint>,
    pub ghost: Vec<SeriesPoint>,
    /// Upper bound of the index axis; the lower bound is 1
    pub x_max: f64,
    /// Upper bound of the latency axis, taken over both series
    pub y_max: f64,
}

impl ChartFrame {
    pub fn from_series(real: &[f64], ghost: &[f64]) -> Self {
        let to_points = |values: &[f64]| -> Vec<SeriesPoint> {
            values
                .iter()
                .enumerate()
                .map(|(i, v)| SeriesPoint::new(i + 1, *v))
                .collect()
        };
        let y_max = peak(real.iter().chain(ghost).copied());
        let x_max = real.len().max(ghost.len()).max(1) as f64;

        Self {
            real: to_points(real),
            ghost: to_points(ghost),
            x_max,
            y_max,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty() && self.ghost.is_empty()
    }
}

/// Anything that can draw a chart frame
pub trait ChartSeriesSink {
    fn publish(&mut self, frame: &ChartFrame);
}

/// Sink that just keeps the latest frame; the TUI renders from it
#[derive(Debug, Default)]
pub struct LatestFrame {
    frame: Option<ChartFrame>,
    publishes: usize,
}

impl LatestFrame {
    pub fn frame(&self) -> Option<&ChartFrame> {
        self.frame.as_ref()
    }

    pub fn publishes(&self) -> usize {
        self.publishes
    }

    pub fn clear(&mut self) {
        self.frame = None;
    }
}

impl ChartSeriesSink for LatestFrame {
    fn publish(&mut self, frame: &ChartFrame) {
        self.frame = Some(frame.clone());
        self.publishes += 1;
    }
}
