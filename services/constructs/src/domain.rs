// Domain layer modules
pub mod cdn_policy;
pub mod dashboard;
pub mod derived_metric;
pub mod intrinsic;
pub mod metric;
pub mod metric_source;
pub mod queue_spec;
pub mod site_spec;
pub mod table_spec;
pub mod template;
pub mod validation;

// Re-exports
pub use cdn_policy::{AllowedMethods, DistributionPriceClass, ViewerProtocol};
pub use dashboard::{DashboardBody, DashboardSpec, GraphWidget, DEFAULT_DASHBOARD_NAME};
pub use derived_metric::{CounterSums, DerivedMetric};
pub use metric::{GraphMetric, MathExpression, Metric, Statistic};
pub use metric_source::{ApiMetrics, FunctionMetrics, FunctionRef, RestApiRef, TableMetrics, TableRef};
pub use queue_spec::QueueSpec;
pub use site_spec::SiteSpec;
pub use table_spec::{
    AttributeKind, CapacityBounds, IndexProjection, KeyAttribute, TableBillingMode, TableSpec,
};
pub use template::{DeletionPolicy, LogicalId, Output, Resource, Template, TemplateError};
pub use validation::{Selector, SelectorError, SpecViolation, ValidationMode};
