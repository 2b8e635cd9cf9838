//! Computed profile values.
//!
//! Values are immutable once built. Composite TAU statistics expose their
//! components through an explicit `TauPivot` argument; no value carries a
//! "currently selected" component, so several readers may interpret the same
//! value concurrently with different pivots.

use crate::models::{Aggregation, DataType};
use std::fmt;

/// Component of a TAU atomic statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TauPivot {
    Count,
    Minimum,
    Maximum,
    Average,
    Deviation,
    Sum,
    SumOfSquares,
}

impl TauPivot {
    /// Order used by the extended info dump
    pub fn all() -> &'static [TauPivot] {
        &[
            TauPivot::Count,
            TauPivot::Minimum,
            TauPivot::Maximum,
            TauPivot::Average,
            TauPivot::Deviation,
            TauPivot::Sum,
            TauPivot::SumOfSquares,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            TauPivot::Count => "N",
            TauPivot::Minimum => "Minimum",
            TauPivot::Maximum => "Maximum",
            TauPivot::Average => "Average",
            TauPivot::Deviation => "Standard deviation",
            TauPivot::Sum => "Sum",
            TauPivot::SumOfSquares => "Sum of squares",
        }
    }
}

/// Composite statistic over `n` measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct TauAtomicValue {
    n: u32,
    min: f64,
    max: f64,
    sum: f64,
    sum2: f64,
}

impl TauAtomicValue {
    pub fn new(n: u32, min: f64, max: f64, sum: f64, sum2: f64) -> Self {
        TauAtomicValue { n, min, max, sum, sum2 }
    }

    /// Builds the statistic from raw measurements.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return TauAtomicValue::new(0, 0.0, 0.0, 0.0, 0.0);
        }
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum = samples.iter().sum();
        let sum2 = samples.iter().map(|v| v * v).sum();
        TauAtomicValue::new(samples.len() as u32, min, max, sum, sum2)
    }

    pub fn count(&self) -> u32 {
        self.n
    }

    pub fn average(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum / self.n as f64
        }
    }

    pub fn deviation(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let avg = self.average();
        (self.sum2 / self.n as f64 - avg * avg).max(0.0).sqrt()
    }

    /// Reads one component of the statistic.
    pub fn get(&self, pivot: TauPivot) -> f64 {
        match pivot {
            TauPivot::Count => self.n as f64,
            TauPivot::Minimum => self.min,
            TauPivot::Maximum => self.max,
            TauPivot::Average => self.average(),
            TauPivot::Deviation => self.deviation(),
            TauPivot::Sum => self.sum,
            TauPivot::SumOfSquares => self.sum2,
        }
    }

    /// Statistic over the union of two disjoint measurement sets.
    pub fn merge(&self, other: &TauAtomicValue) -> Self {
        if self.n == 0 {
            return other.clone();
        }
        if other.n == 0 {
            return self.clone();
        }
        TauAtomicValue::new(
            self.n + other.n,
            self.min.min(other.min),
            self.max.max(other.max),
            self.sum + other.sum,
            self.sum2 + other.sum2,
        )
    }
}

/// Distribution of a metric over a fixed number of buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramValue {
    buckets: Vec<f64>,
    range_min: f64,
    range_max: f64,
}

impl HistogramValue {
    pub fn new(buckets: Vec<f64>, range_min: f64, range_max: f64) -> Self {
        HistogramValue {
            buckets,
            range_min,
            range_max,
        }
    }

    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    pub fn range(&self) -> (f64, f64) {
        (self.range_min, self.range_max)
    }

    /// Largest bucket, or `None` for degenerate histograms (no buckets, or no
    /// positive finite maximum to scale against).
    pub fn max_bucket(&self) -> Option<f64> {
        let max = self
            .buckets
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if max.is_finite() && max > 0.0 {
            Some(max)
        } else {
            None
        }
    }

    pub fn total(&self) -> f64 {
        self.buckets.iter().sum()
    }
}

/// A computed value as delivered by the profile library.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    Integer(i64),
    Histogram(HistogramValue),
    TauAtomic(TauAtomicValue),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Double(_) => DataType::Double,
            Value::Integer(_) => DataType::Integer,
            Value::Histogram(_) => DataType::Histogram,
            Value::TauAtomic(_) => DataType::TauAtomic,
        }
    }

    /// Representative scalar without any view configuration applied.
    pub fn get_double(&self) -> f64 {
        match self {
            Value::Double(v) => *v,
            Value::Integer(v) => *v as f64,
            Value::Histogram(h) => h.total(),
            Value::TauAtomic(t) => t.average(),
        }
    }

    pub fn get_string(&self) -> String {
        self.to_string()
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Double(v) => *v == 0.0,
            Value::Integer(v) => *v == 0,
            Value::Histogram(h) => h.buckets.iter().all(|b| *b == 0.0),
            Value::TauAtomic(t) => t.n == 0,
        }
    }

    /// Folds `other` into this value. Values of different types, or
    /// histograms with different bucket counts, leave `self` unchanged.
    pub fn aggregate(&self, other: &Value, aggregation: Aggregation) -> Value {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => Value::Double(aggregation.combine(*a, *b)),
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(match aggregation {
                Aggregation::Sum => a.saturating_add(*b),
                Aggregation::Minimum => (*a).min(*b),
                Aggregation::Maximum => (*a).max(*b),
            }),
            (Value::TauAtomic(a), Value::TauAtomic(b)) => Value::TauAtomic(a.merge(b)),
            (Value::Histogram(a), Value::Histogram(b)) if a.buckets.len() == b.buckets.len() => {
                let buckets = a
                    .buckets
                    .iter()
                    .zip(&b.buckets)
                    .map(|(x, y)| aggregation.combine(*x, *y))
                    .collect();
                Value::Histogram(HistogramValue::new(
                    buckets,
                    a.range_min.min(b.range_min),
                    a.range_max.max(b.range_max),
                ))
            }
            _ => self.clone(),
        }
    }

    /// Whether the value stands for one measurement rather than an aggregate of several.
    pub fn single_value(&self) -> bool {
        match self {
            Value::Double(_) | Value::Integer(_) => true,
            Value::Histogram(_) => false,
            Value::TauAtomic(t) => t.n <= 1,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Histogram(h) => {
                let parts: Vec<String> = h.buckets.iter().map(|b| b.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::TauAtomic(t) => write!(
                f,
                "(N={}, min={}, avg={}, max={})",
                t.n,
                t.min,
                t.average(),
                t.max
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tau_from_samples() {
        let tau = TauAtomicValue::from_samples(&[1.0, 2.0, 3.0]);
        assert_eq!(tau.count(), 3);
        assert_eq!(tau.get(TauPivot::Minimum), 1.0);
        assert_eq!(tau.get(TauPivot::Maximum), 3.0);
        assert_eq!(tau.get(TauPivot::Average), 2.0);
        assert_eq!(tau.get(TauPivot::Sum), 6.0);
        assert_eq!(tau.get(TauPivot::SumOfSquares), 14.0);
        assert!((tau.get(TauPivot::Deviation) - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_tau_is_zero() {
        let value = Value::TauAtomic(TauAtomicValue::from_samples(&[]));
        assert!(value.is_zero());
        assert_eq!(value.get_double(), 0.0);
        assert!(value.single_value());
    }

    #[test]
    fn test_histogram_degenerate_max() {
        assert_eq!(HistogramValue::new(vec![], 0.0, 1.0).max_bucket(), None);
        assert_eq!(HistogramValue::new(vec![0.0, 0.0], 0.0, 1.0).max_bucket(), None);
        assert_eq!(
            HistogramValue::new(vec![1.0, 3.0, 2.0], 0.0, 1.0).max_bucket(),
            Some(3.0)
        );
    }

    #[test]
    fn test_aggregate_values() {
        let sum = Value::Double(1.5).aggregate(&Value::Double(2.0), Aggregation::Sum);
        assert_eq!(sum, Value::Double(3.5));
        let max = Value::Integer(4).aggregate(&Value::Integer(9), Aggregation::Maximum);
        assert_eq!(max, Value::Integer(9));

        let a = Value::TauAtomic(TauAtomicValue::from_samples(&[1.0, 5.0]));
        let b = Value::TauAtomic(TauAtomicValue::from_samples(&[3.0]));
        let Value::TauAtomic(merged) = a.aggregate(&b, Aggregation::Sum) else {
            panic!("expected a TAU value");
        };
        assert_eq!(merged, TauAtomicValue::from_samples(&[1.0, 5.0, 3.0]));

        // mismatched types keep the left side
        assert_eq!(Value::Double(1.0).aggregate(&Value::Integer(2), Aggregation::Sum), Value::Double(1.0));
    }

    #[test]
    fn test_value_data_types() {
        assert_eq!(Value::Double(1.0).data_type(), DataType::Double);
        assert_eq!(Value::Integer(1).data_type(), DataType::Integer);
        assert!(Value::Integer(0).is_zero());
        assert!(!Value::Histogram(HistogramValue::new(vec![1.0], 0.0, 1.0)).single_value());
    }
}
