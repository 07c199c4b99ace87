use qber_lens_common::MetricConvention;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::window::PartitionSums;

/// A ratio that is either measured or undefined for lack of counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    Undefined,
}

impl Metric {
    fn ratio(numerator: f64, denominator: u64) -> Self {
        if denominator == 0 {
            return Metric::Undefined;
        }
        let v = numerator / denominator as f64;
        if v.is_finite() { Metric::Value(v) } else { Metric::Undefined }
    }

    pub fn value(&self) -> Option<f64> {
        match *self {
            Metric::Value(v) => Some(v),
            Metric::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Value(_))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v:.6}"),
            Metric::Undefined => f.write_str("undefined"),
        }
    }
}

// null in JSON
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub ber: Metric,
    pub visibility: Metric,
}

impl Metrics {
    pub fn compute(sums: &PartitionSums, convention: MetricConvention) -> Self {
        let total = sums.total();
        let signal = sums.c1 + sums.c2;
        let d = sums.d1 as f64;
        match convention {
            MetricConvention::ErrorFraction => Self {
                ber: Metric::ratio(d, total),
                visibility: Metric::ratio(signal as f64, sums.d1),
            },
            MetricConvention::Complementary => Self {
                ber: match Metric::ratio(d, total) {
                    Metric::Value(v) => Metric::Value(1.0 - v),
                    Metric::Undefined => Metric::Undefined,
                },
                visibility: Metric::ratio(d, signal),
            },
        }
    }

    pub fn is_defined(&self) -> bool {
        self.ber.is_defined() && self.visibility.is_defined()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums(c1: u64, d1: u64, c2: u64) -> PartitionSums {
        PartitionSums { c1, d1, c2 }
    }

    #[test]
    fn error_fraction_formulas() {
        let m = Metrics::compute(&sums(40, 20, 40), MetricConvention::ErrorFraction);
        assert_eq!(m.ber, Metric::Value(0.2));
        assert_eq!(m.visibility, Metric::Value(4.0));
    }

    #[test]
    fn complementary_formulas() {
        let m = Metrics::compute(&sums(40, 20, 40), MetricConvention::Complementary);
        assert!((m.ber.value().unwrap() - 0.8).abs() < 1e-12);
        assert_eq!(m.visibility, Metric::Value(0.25));
    }

    #[test]
    fn all_zero_is_undefined_under_both_conventions() {
        for conv in [MetricConvention::ErrorFraction, MetricConvention::Complementary] {
            let m = Metrics::compute(&sums(0, 0, 0), conv);
            assert_eq!(m.ber, Metric::Undefined);
            assert_eq!(m.visibility, Metric::Undefined);
            assert!(!m.is_defined());
        }
    }

    #[test]
    fn zero_error_bin_only_breaks_visibility() {
        let m = Metrics::compute(&sums(10, 0, 10), MetricConvention::ErrorFraction);
        assert_eq!(m.ber, Metric::Value(0.0));
        assert_eq!(m.visibility, Metric::Undefined);
        let m = Metrics::compute(&sums(0, 5, 0), MetricConvention::Complementary);
        assert_eq!(m.ber, Metric::Value(0.0));
        assert_eq!(m.visibility, Metric::Undefined);
    }

    #[test]
    fn display_and_json() {
        assert_eq!(Metric::Value(0.25).to_string(), "0.250000");
        assert_eq!(Metric::Undefined.to_string(), "undefined");
        assert_eq!(serde_json::to_string(&Metric::Undefined).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Metric::Value(0.5)).unwrap(), "0.5");
    }
}
