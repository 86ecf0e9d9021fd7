/// A quantile reported by histograms and timers, along with the name it is printed under.
///
/// The name is the quantile's decimal digits after a `q`, padded to at least two digits: `0.5`
/// prints as `q50`, `0.05` as `q05` and `0.999` as `q999`.  The extremes print as `min` and `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantile {
    value: f64,
    label: String,
}

impl Quantile {
    /// Creates a [`Quantile`], clamping `value` into `[0, 1]`.
    ///
    /// NaN is treated as zero.
    pub fn new(value: f64) -> Quantile {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Quantile { value, label: label_for(value) }
    }

    /// Gets the name this quantile is printed under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Gets the quantile itself, between 0 and 1.
    pub fn value(&self) -> f64 {
        self.value
    }
}

fn label_for(value: f64) -> String {
    if value <= 0.0 {
        return "min".to_string();
    }
    if value >= 1.0 {
        return "max".to_string();
    }

    let formatted = value.to_string();
    let digits = formatted.strip_prefix("0.").unwrap_or(&formatted);
    format!("q{:0<2}", digits)
}

/// Turns raw values into [`Quantile`]s, in ascending order and without duplicates.
pub fn parse_quantiles(values: &[f64]) -> Vec<Quantile> {
    let mut quantiles = values.iter().copied().map(Quantile::new).collect::<Vec<_>>();
    quantiles.sort_by(|a, b| a.value.total_cmp(&b.value));
    quantiles.dedup();
    quantiles
}

#[cfg(test)]
mod tests {
    use super::{parse_quantiles, Quantile};

    #[test]
    fn test_labels() {
        let cases = [
            (0.0, "min"),
            (0.05, "q05"),
            (0.5, "q50"),
            (0.8, "q80"),
            (0.95, "q95"),
            (0.99, "q99"),
            (0.999, "q999"),
            (1.0, "max"),
        ];
        for (value, label) in cases {
            let quantile = Quantile::new(value);
            assert_eq!(quantile.value(), value);
            assert_eq!(quantile.label(), label);
        }
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        assert_eq!(Quantile::new(-1.0), Quantile::new(0.0));
        assert_eq!(Quantile::new(1.2), Quantile::new(1.0));
        assert_eq!(Quantile::new(f64::NAN).label(), "min");
    }

    #[test]
    fn test_parse_quantiles() {
        assert!(parse_quantiles(&[]).is_empty());

        let parsed = parse_quantiles(&[0.99, 0.5, 1.0, 0.0, 0.5, 0.9]);
        let labels = parsed.iter().map(Quantile::label).collect::<Vec<_>>();
        assert_eq!(labels, ["min", "q50", "q90", "q99", "max"]);
    }
}
