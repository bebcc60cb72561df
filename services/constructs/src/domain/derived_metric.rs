//! Derived Lambda percentage metrics
//!
//! Both are metric math over `Sum` counters with a fixed 5-minute window.

use std::time::Duration;

use super::metric::{MathExpression, Statistic};
use super::metric_source::FunctionMetrics;

/// Aggregation window of the derived metrics
pub const DERIVED_METRIC_PERIOD: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedMetric {
    /// errors / invocations * 100
    ErrorRate,
    /// throttles / (invocations + throttles) * 100
    ///
    /// Throttled calls are not counted as invocations, so they are added
    /// back into the denominator.
    ThrottleRate,
}

/// Counter sums over one window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterSums {
    pub invocations: f64,
    pub errors: f64,
    pub throttles: f64,
}

impl DerivedMetric {
    pub fn expression(self) -> &'static str {
        match self {
            DerivedMetric::ErrorRate => "e / i * 100",
            DerivedMetric::ThrottleRate => "t / (i + t) * 100",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DerivedMetric::ErrorRate => "% of invocations that errored, last 5 mins",
            DerivedMetric::ThrottleRate => "% of throttled requests, last 5 mins",
        }
    }

    /// Evaluate the expression locally
    ///
    /// Returns `None` when the denominator is zero (CloudWatch shows no
    /// datapoint in that case).
    pub fn evaluate(self, sums: &CounterSums) -> Option<f64> {
        let (numerator, denominator) = match self {
            DerivedMetric::ErrorRate => (sums.errors, sums.invocations),
            DerivedMetric::ThrottleRate => (sums.throttles, sums.invocations + sums.throttles),
        };
        if denominator == 0.0 {
            return None;
        }
        Some(numerator / denominator * 100.0)
    }

    /// Build the CloudWatch math expression against a function's counters
    pub fn math_expression(self, function: &dyn FunctionMetrics) -> MathExpression {
        let counter = |name: &str| function.function_metric(name, Statistic::Sum);
        let using_metrics = match self {
            DerivedMetric::ErrorRate => vec![
                ("i".to_string(), counter("Invocations")),
                ("e".to_string(), counter("Errors")),
            ],
            DerivedMetric::ThrottleRate => vec![
                ("i".to_string(), counter("Invocations")),
                ("t".to_string(), counter("Throttles")),
            ],
        };

        MathExpression {
            expression: self.expression().to_string(),
            label: self.label().to_string(),
            using_metrics,
            period: DERIVED_METRIC_PERIOD,
        }
    }
}
