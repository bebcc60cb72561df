/// CloudWatch metric model
///
/// Metrics are references to existing CloudWatch series; nothing here
/// aggregates data. Only the derived math expressions carry a formula.
use std::fmt;
use std::time::Duration;

use serde_json::{json, Map, Value};

/// Default period for metrics that don't specify one
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(300);

/// Aggregation statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statistic {
    Average,
    Sum,
    Minimum,
    Maximum,
    SampleCount,
    /// Percentile, e.g. `Percentile(99.0)` renders as `p99`
    Percentile(f64),
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Average => f.write_str("Average"),
            Statistic::Sum => f.write_str("Sum"),
            Statistic::Minimum => f.write_str("Minimum"),
            Statistic::Maximum => f.write_str("Maximum"),
            Statistic::SampleCount => f.write_str("SampleCount"),
            Statistic::Percentile(p) => write!(f, "p{}", p),
        }
    }
}

/// Reference to a single CloudWatch metric series
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub namespace: String,
    pub metric_name: String,
    /// Dimension name/value pairs, in declaration order
    pub dimensions: Vec<(String, String)>,
    pub statistic: Statistic,
    pub period: Duration,
    pub label: Option<String>,
}

impl Metric {
    pub fn new(namespace: impl Into<String>, metric_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimensions: Vec::new(),
            statistic: Statistic::Average,
            period: DEFAULT_PERIOD,
            label: None,
        }
    }

    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.push((name.into(), value.into()));
        self
    }

    pub fn with_statistic(mut self, statistic: Statistic) -> Self {
        self.statistic = statistic;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Render as a dashboard `metrics` row:
    /// `[namespace, name, dim, value, ..., {options}]`
    pub fn render_row(&self, extra: Map<String, Value>) -> Value {
        let mut row = vec![
            Value::String(self.namespace.clone()),
            Value::String(self.metric_name.clone()),
        ];
        for (name, value) in &self.dimensions {
            row.push(Value::String(name.clone()));
            row.push(Value::String(value.clone()));
        }

        let mut options = Map::new();
        options.insert("stat".to_string(), json!(self.statistic.to_string()));
        options.insert("period".to_string(), json!(self.period.as_secs()));
        if let Some(label) = &self.label {
            options.insert("label".to_string(), json!(label));
        }
        options.extend(extra);
        row.push(Value::Object(options));

        Value::Array(row)
    }
}

/// Metric math expression over named metrics
#[derive(Debug, Clone, PartialEq)]
pub struct MathExpression {
    pub expression: String,
    pub label: String,
    /// Variable name and the metric bound to it
    pub using_metrics: Vec<(String, Metric)>,
    pub period: Duration,
}

impl MathExpression {
    /// Render the expression row plus one hidden row per bound metric
    pub fn render_rows(&self, expression_id: &str) -> Vec<Value> {
        let mut rows = vec![json!([{
            "expression": self.expression,
            "label": self.label,
            "period": self.period.as_secs(),
            "id": expression_id,
        }])];

        for (id, metric) in &self.using_metrics {
            let mut extra = Map::new();
            extra.insert("id".to_string(), json!(id));
            extra.insert("visible".to_string(), json!(false));
            // Bound metrics share the expression period
            let metric = metric.clone().with_period(self.period);
            rows.push(metric.render_row(extra));
        }

        rows
    }
}

/// Anything that can be placed on a graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphMetric {
    Metric(Metric),
    Expression(MathExpression),
}

impl From<Metric> for GraphMetric {
    fn from(metric: Metric) -> Self {
        GraphMetric::Metric(metric)
    }
}

impl From<MathExpression> for GraphMetric {
    fn from(expression: MathExpression) -> Self {
        GraphMetric::Expression(expression)
    }
}
