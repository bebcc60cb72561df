// メトリクスソース
//
// ダッシュボードが参照するAPI・関数・テーブルを、メトリクス生成に必要な
// 操作だけを持つ狭いインターフェースとして表現する。

use std::time::Duration;

use super::metric::{Metric, Statistic};

/// API Gatewayメトリクスの名前空間
pub const API_GATEWAY_NAMESPACE: &str = "AWS/ApiGateway";

/// Lambdaメトリクスの名前空間
pub const LAMBDA_NAMESPACE: &str = "AWS/Lambda";

/// DynamoDBメトリクスの名前空間
pub const DYNAMODB_NAMESPACE: &str = "AWS/DynamoDB";

/// API Gatewayメトリクスの集計期間（15分）
pub const API_METRIC_PERIOD: Duration = Duration::from_secs(900);

/// APIのメトリクスを提供する
pub trait ApiMetrics {
    /// 指定メトリクスを取得（ラベルと統計量を指定）
    fn api_metric(&self, metric_name: &str, label: &str, statistic: Statistic) -> Metric;
}

/// 関数（Lambda）のメトリクスを提供する
pub trait FunctionMetrics {
    /// 指定メトリクスを取得
    fn function_metric(&self, metric_name: &str, statistic: Statistic) -> Metric;

    /// 実行時間メトリクスを取得
    fn duration_metric(&self, statistic: Statistic) -> Metric {
        self.function_metric("Duration", statistic)
    }
}

/// テーブルのメトリクスを提供する
pub trait TableMetrics {
    /// 指定メトリクスを取得（統計量未指定時はAverage）
    fn table_metric(&self, metric_name: &str, statistic: Option<Statistic>) -> Metric;

    /// 操作ごとの成功リクエストレイテンシを取得
    fn successful_request_latency(&self, operation: &str) -> Metric;
}

/// 既存REST APIへの参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestApiRef {
    pub api_name: String,
    pub stage: String,
}

impl RestApiRef {
    pub fn new(api_name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            stage: stage.into(),
        }
    }
}

impl ApiMetrics for RestApiRef {
    fn api_metric(&self, metric_name: &str, label: &str, statistic: Statistic) -> Metric {
        Metric::new(API_GATEWAY_NAMESPACE, metric_name)
            .with_dimension("ApiName", &self.api_name)
            .with_dimension("Stage", &self.stage)
            .with_statistic(statistic)
            .with_period(API_METRIC_PERIOD)
            .with_label(label)
    }
}

/// 既存Lambda関数への参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    pub function_name: String,
}

impl FunctionRef {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
        }
    }
}

impl FunctionMetrics for FunctionRef {
    fn function_metric(&self, metric_name: &str, statistic: Statistic) -> Metric {
        Metric::new(LAMBDA_NAMESPACE, metric_name)
            .with_dimension("FunctionName", &self.function_name)
            .with_statistic(statistic)
    }
}

/// テーブル名のみで参照するDynamoDBテーブル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table_name: String,
}

impl TableRef {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }
}

impl TableMetrics for TableRef {
    fn table_metric(&self, metric_name: &str, statistic: Option<Statistic>) -> Metric {
        table_metric(&self.table_name, metric_name, statistic)
    }

    fn successful_request_latency(&self, operation: &str) -> Metric {
        successful_request_latency(&self.table_name, operation)
    }
}

/// テーブル名からテーブルメトリクスを生成（TableMetrics実装の共通部分）
pub fn table_metric(table_name: &str, metric_name: &str, statistic: Option<Statistic>) -> Metric {
    Metric::new(DYNAMODB_NAMESPACE, metric_name)
        .with_dimension("TableName", table_name)
        .with_statistic(statistic.unwrap_or(Statistic::Average))
}

/// テーブル名から操作別レイテンシメトリクスを生成
pub fn successful_request_latency(table_name: &str, operation: &str) -> Metric {
    Metric::new(DYNAMODB_NAMESPACE, "SuccessfulRequestLatency")
        .with_dimension("TableName", table_name)
        .with_dimension("Operation", operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_metric_dimensions_and_period() {
        let api = RestApiRef::new("orders-api", "prod");
        let metric = api.api_metric("Latency", "API Latency p50", Statistic::Percentile(50.0));

        assert_eq!(metric.namespace, "AWS/ApiGateway");
        assert_eq!(
            metric.dimensions,
            vec![
                ("ApiName".to_string(), "orders-api".to_string()),
                ("Stage".to_string(), "prod".to_string()),
            ]
        );
        assert_eq!(metric.period.as_secs(), 900);
        assert_eq!(metric.label.as_deref(), Some("API Latency p50"));
    }

    #[test]
    fn test_function_duration_metric() {
        let function = FunctionRef::new("orders-handler");
        let metric = function.duration_metric(Statistic::Percentile(99.0));

        assert_eq!(metric.namespace, "AWS/Lambda");
        assert_eq!(metric.metric_name, "Duration");
        assert_eq!(metric.statistic, Statistic::Percentile(99.0));
        assert_eq!(metric.period.as_secs(), 300);
    }

    #[test]
    fn test_table_metric_default_statistic() {
        let table = TableRef::new("orders");

        let consumed = table.table_metric("ConsumedReadCapacityUnits", None);
        assert_eq!(consumed.statistic, Statistic::Average);

        let throttles = table.table_metric("ReadThrottleEvents", Some(Statistic::Sum));
        assert_eq!(throttles.statistic, Statistic::Sum);
    }

    #[test]
    fn test_successful_request_latency_dimensions() {
        let table = TableRef::new("orders");
        let metric = table.successful_request_latency("GetItem");

        assert_eq!(metric.metric_name, "SuccessfulRequestLatency");
        assert_eq!(metric.dimensions[0], ("TableName".to_string(), "orders".to_string()));
        assert_eq!(metric.dimensions[1], ("Operation".to_string(), "GetItem".to_string()));
    }
}
