use crate::chart::buffer::SlidingChartBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Ph,
    Ppm,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Ph, Metric::Ppm];

    pub fn title(self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature (°C)",
            Metric::Ph => "Water pH",
            Metric::Ppm => "Nutrient level (PPM)",
        }
    }

    pub fn range_policy(self) -> RangePolicy {
        match self {
            Metric::Temperature => RangePolicy::Auto,
            Metric::Ph => RangePolicy::Clamped { min: 0.0, max: 14.0 },
            Metric::Ppm => RangePolicy::ZeroBaseline,
        }
    }
}

/// How a chart picks its y-axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangePolicy {
    /// Fit the data
    Auto,
    /// Always the same window
    Clamped { min: f64, max: f64 },
    /// Start at zero, grow with the data
    ZeroBaseline,
}

impl RangePolicy {
    /// The y-axis for `values`. `NaN` points are ignored; `None` when nothing is left to
    /// fit an automatic range to.
    pub fn bounds(&self, values: &[f64]) -> Option<(f64, f64)> {
        let finite = values.iter().copied().filter(|v| v.is_finite());
        match *self {
            RangePolicy::Clamped { min, max } => Some((min, max)),
            RangePolicy::ZeroBaseline => {
                let max = finite.fold(0.0_f64, f64::max);
                Some((0.0, if max > 0.0 { max } else { 1.0 }))
            }
            RangePolicy::Auto => {
                let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
                if min > max {
                    None
                } else if min == max {
                    Some((min - 1.0, max + 1.0))
                } else {
                    Some((min, max))
                }
            }
        }
    }
}

/// Draws one metric's line chart. Redraws jump straight to the new data, no animation.
pub trait ChartRenderer {
    fn redraw(&mut self, metric: Metric, labels: &[String], values: &[f64]);
}

/// The three charts, redrawn together whenever the buffer changes
pub struct ChartSet<R: ChartRenderer> {
    temperature: R,
    ph: R,
    ppm: R,
}

impl<R: ChartRenderer> ChartSet<R> {
    pub fn new(temperature: R, ph: R, ppm: R) -> Self {
        Self {
            temperature,
            ph,
            ppm,
        }
    }

    /// Builds all three charts with the same constructor
    pub fn build(mut make: impl FnMut(Metric) -> R) -> Self {
        Self::new(make(Metric::Temperature), make(Metric::Ph), make(Metric::Ppm))
    }

    pub fn refresh(&mut self, buffer: &SlidingChartBuffer) {
        for metric in Metric::ALL {
            let values = buffer.values(metric);
            self.renderer_mut(metric)
                .redraw(metric, buffer.labels(), values);
        }
    }

    pub fn renderer(&self, metric: Metric) -> &R {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Ph => &self.ph,
            Metric::Ppm => &self.ppm,
        }
    }

    fn renderer_mut(&mut self, metric: Metric) -> &mut R {
        match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Ph => &mut self.ph,
            Metric::Ppm => &mut self.ppm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingChart {
        redraws: usize,
        last_len: usize,
    }

    impl ChartRenderer for CountingChart {
        fn redraw(&mut self, _metric: Metric, labels: &[String], values: &[f64]) {
            assert_eq!(labels.len(), values.len());
            self.redraws += 1;
            self.last_len = values.len();
        }
    }

    #[test]
    fn test_refresh_redraws_every_chart() {
        let mut buffer = SlidingChartBuffer::default();
        buffer.append("10.00.00", 25.0, 6.5, 900.0);

        let mut charts = ChartSet::build(|_| CountingChart::default());
        charts.refresh(&buffer);
        charts.refresh(&buffer);

        for metric in Metric::ALL {
            let chart = charts.renderer(metric);
            assert_eq!(chart.redraws, 2);
            assert_eq!(chart.last_len, 1);
        }
    }

    #[test]
    fn test_range_policies() {
        let values = [6.2, f64::NAN, 7.4];
        assert_eq!(Metric::Ph.range_policy().bounds(&values), Some((0.0, 14.0)));
        assert_eq!(Metric::Temperature.range_policy().bounds(&values), Some((6.2, 7.4)));
        assert_eq!(Metric::Ppm.range_policy().bounds(&[850.0, 1200.0]), Some((0.0, 1200.0)));
        assert_eq!(Metric::Ppm.range_policy().bounds(&[]), Some((0.0, 1.0)));
        assert_eq!(RangePolicy::Auto.bounds(&[f64::NAN]), None);
        assert_eq!(RangePolicy::Auto.bounds(&[25.0]), Some((24.0, 26.0)));
    }
}
