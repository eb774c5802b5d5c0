use crate::error::{ChartError, ChartResult};

/// Linear mapping from a value domain onto a pixel range.
///
/// The pixel range may be descending (value axes grow upwards on screen).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    range_start: f64,
    range_end: f64,
}

impl LinearScale {
    pub fn new(
        domain_start: f64,
        domain_end: f64,
        range_start: f64,
        range_end: f64,
    ) -> ChartResult<Self> {
        if !domain_start.is_finite()
            || !domain_end.is_finite()
            || half_span(domain_start, domain_end) == 0.0
        {
            return Err(ChartError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }
        if !range_start.is_finite() || !range_end.is_finite() {
            return Err(ChartError::InvalidData(
                "scale range must be finite".to_owned(),
            ));
        }

        Ok(Self {
            domain_start,
            domain_end,
            range_start,
            range_end,
        })
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    #[must_use]
    pub fn range(self) -> (f64, f64) {
        (self.range_start, self.range_end)
    }

    pub fn to_pixel(self, value: f64) -> ChartResult<f64> {
        if !value.is_finite() {
            return Err(ChartError::InvalidData("value must be finite".to_owned()));
        }

        // Halved operands keep spans near f64::MAX finite.
        let normalized =
            half_span(self.domain_start, value) / half_span(self.domain_start, self.domain_end);
        Ok(self.range_start + normalized * (self.range_end - self.range_start))
    }

    pub fn to_domain(self, pixel: f64) -> ChartResult<f64> {
        if !pixel.is_finite() {
            return Err(ChartError::InvalidData("pixel must be finite".to_owned()));
        }
        let span = self.range_end - self.range_start;
        if span == 0.0 {
            return Ok(self.domain_start);
        }

        let normalized = (pixel - self.range_start) / span;
        let offset = normalized * half_span(self.domain_start, self.domain_end);
        Ok(self.domain_start + offset + offset)
    }
}

fn half_span(start: f64, end: f64) -> f64 {
    end / 2.0 - start / 2.0
}

/// Nice-number value extent and tick ladder for a value axis.
#[derive(Debug, Clone, PartialEq)]
pub struct NiceExtent {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub ticks: Vec<f64>,
}

/// Expands `[min, max]` to nice round bounds with roughly `target_ticks` steps.
///
/// A degenerate extent (`min == max`) is widened so the axis always has span.
pub fn nice_extent(min: f64, max: f64, target_ticks: usize) -> ChartResult<NiceExtent> {
    if !min.is_finite() || !max.is_finite() {
        return Err(ChartError::InvalidData(
            "axis extent must be finite".to_owned(),
        ));
    }

    let (mut low, mut high) = if min <= max { (min, max) } else { (max, min) };
    if low == high {
        if low == 0.0 {
            high = 1.0;
        } else {
            let pad = low.abs() * 0.5;
            low = (low - pad).max(f64::MIN);
            high = (high + pad).min(f64::MAX);
        }
    }
    // Subnormal extents collapse when halved.
    if half_span(low, high) <= 0.0 {
        low -= 1.0;
        high += 1.0;
    }

    let intervals = target_ticks.max(2) - 1;
    let step = nice_step(half_span(low, high) / intervals as f64 * 2.0);
    if step.is_finite() && step > 0.0 {
        let nice_min = (low / step).floor() * step;
        let nice_max = (high / step).ceil() * step;
        let count = (nice_max / step - nice_min / step).round();
        if nice_min.is_finite()
            && nice_max.is_finite()
            && half_span(nice_min, nice_max) > 0.0
            && count >= 1.0
            && count <= MAX_TICKS
        {
            let ticks = (0..=count as usize)
                .map(|index| snap_to_step(nice_min + step * index as f64, step))
                .collect();
            return Ok(NiceExtent {
                min: nice_min,
                max: nice_max,
                step,
                ticks,
            });
        }
    }

    Ok(linear_extent(low, high, intervals))
}

const MAX_TICKS: f64 = 64.0;

/// Evenly spaced ticks over the raw bounds, for extents too wide to round.
fn linear_extent(low: f64, high: f64, intervals: usize) -> NiceExtent {
    let half_step = half_span(low, high) / intervals as f64;
    if half_step <= 0.0 {
        // Subnormal span: a single interval is the finest representable step.
        return NiceExtent {
            min: low,
            max: high,
            step: high - low,
            ticks: vec![low, high],
        };
    }

    let ticks = (0..=intervals)
        .map(|index| {
            let offset = half_step * index as f64;
            if index == intervals {
                high
            } else {
                low + offset + offset
            }
        })
        .collect();

    NiceExtent {
        min: low,
        max: high,
        step: (half_step * 2.0).min(f64::MAX),
        ticks,
    }
}

fn nice_step(raw_step: f64) -> f64 {
    let exponent = raw_step.log10().floor();
    let magnitude = 10f64.powf(exponent);
    let fraction = raw_step / magnitude;
    let nice_fraction = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice_fraction * magnitude
}

/// Rounds decimal noise off `value`, falling back to the nearest step
/// multiple when the decimal factor is out of `f64` range.
fn snap_to_step(value: f64, step: f64) -> f64 {
    let precision = (-step.log10().floor()).max(0.0) as i32 + 1;
    let factor = 10f64.powi(precision.min(308));
    let scaled = value * factor;
    if precision <= 308 && scaled.is_finite() {
        let snapped = scaled.round() / factor;
        if snapped.is_finite() {
            return snapped;
        }
    }
    let multiple = (value / step).round() * step;
    if multiple.is_finite() { multiple } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_extent_rounds_bounds_outwards() {
        let extent = nice_extent(0.0, 3.0, 5).expect("extent");
        assert_eq!(extent.min, 0.0);
        assert!(extent.max >= 3.0);
        assert_eq!(extent.ticks.first().copied(), Some(extent.min));
        assert_eq!(extent.ticks.last().copied(), Some(extent.max));
    }

    #[test]
    fn degenerate_zero_extent_is_widened() {
        let extent = nice_extent(0.0, 0.0, 5).expect("extent");
        assert_eq!(extent.min, 0.0);
        assert_eq!(extent.max, 1.0);
    }

    #[test]
    fn descending_range_maps_upwards() {
        let scale = LinearScale::new(0.0, 10.0, 100.0, 0.0).expect("scale");
        assert_eq!(scale.to_pixel(0.0).expect("pixel"), 100.0);
        assert_eq!(scale.to_pixel(10.0).expect("pixel"), 0.0);
        assert_eq!(scale.to_domain(50.0).expect("domain"), 5.0);
    }

    #[test]
    fn extent_spanning_the_whole_f64_range_stays_finite() {
        let extent = nice_extent(-1.7e308, 1.7e308, 5).expect("extent");
        assert!(extent.min.is_finite() && extent.max.is_finite());
        assert!(extent.ticks.iter().all(|tick| tick.is_finite()));

        let scale = LinearScale::new(extent.min, extent.max, 300.0, 0.0).expect("scale");
        assert!((scale.to_pixel(-1.7e308).expect("low") - 300.0).abs() < 1e-6);
        assert!(scale.to_pixel(1.7e308).expect("high").is_finite());
    }

    #[test]
    fn subnormal_extent_produces_finite_ticks() {
        let extent = nice_extent(0.0, 1e-320, 5).expect("extent");
        assert!(extent.max > extent.min);
        assert!(extent.ticks.iter().all(|tick| tick.is_finite()));

        let extent = nice_extent(5e-324, 5e-324, 5).expect("extent");
        assert!(extent.max > extent.min);
    }
}
