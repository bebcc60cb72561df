//! CloudWatchダッシュボードマッパー
//!
//! API・関数・テーブルのメトリクスから9つのグラフウィジェットを組み立て、
//! `AWS::CloudWatch::Dashboard` リソースとして宣言する。
//! メトリクスの取得元は狭いトレイト（ApiMetrics / FunctionMetrics / TableMetrics）越しに受け取る。

use serde_json::Value;
use tracing::info;

use crate::domain::dashboard::REGION_PLACEHOLDER;
use crate::domain::intrinsic::{escape_sub, sub};
use crate::domain::{
    ApiMetrics, DashboardBody, DashboardSpec, DerivedMetric, FunctionMetrics, GraphWidget,
    LogicalId, Resource, Statistic, TableMetrics, Template, TemplateError,
};

/// テーブルレイテンシを表示する操作
pub const LATENCY_OPERATIONS: &[&str] = &["GetItem", "UpdateItem", "PutItem", "DeleteItem", "Query"];

const LATENCY_PERCENTILES: [f64; 3] = [50.0, 90.0, 99.0];

/// ダッシュボードが参照するメトリクスソース
#[derive(Clone, Copy)]
pub struct DashboardSources<'a> {
    pub api: &'a dyn ApiMetrics,
    pub function: &'a dyn FunctionMetrics,
    pub table: &'a dyn TableMetrics,
}

/// ダッシュボードマッパーの出力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConstruct {
    pub logical_id: LogicalId,
    pub dashboard_name: String,
    pub widget_count: usize,
}

/// CloudWatchダッシュボードマッパー
pub struct DashboardMapper {
    scope: String,
}

impl DashboardMapper {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    /// ダッシュボード仕様をテンプレートへ展開する
    pub fn map(
        &self,
        spec: &DashboardSpec,
        sources: DashboardSources<'_>,
        template: &mut Template,
    ) -> Result<DashboardConstruct, TemplateError> {
        let body = build_body(sources);
        info!(
            dashboard = %spec.dashboard_name,
            api = %spec.api_name,
            stage = %spec.stage,
            function = %spec.function_name,
            widgets = body.widgets().len(),
            "ダッシュボード宣言開始"
        );

        // ユーザー由来の文字列はエスケープし、ウィジェットのリージョンだけを置換対象に残す
        let mut rendered = body.render();
        escape_literals(&mut rendered);
        let escaped = rendered.to_string();

        let logical_id = LogicalId::new(&[&self.scope, "CloudWatchDashBoard"]);
        let dashboard = Resource::new("AWS::CloudWatch::Dashboard")
            .property("DashboardName", spec.dashboard_name.as_str())
            .property("DashboardBody", sub(escaped));
        template.add_resource(logical_id.clone(), dashboard)?;

        Ok(DashboardConstruct {
            logical_id,
            dashboard_name: spec.dashboard_name.clone(),
            widget_count: body.widgets().len(),
        })
    }
}

/// `Fn::Sub` で置換されないよう文字列値をエスケープする
///
/// マッパー自身が埋め込む `region` のプレースホルダーのみ対象外。
fn escape_literals(value: &mut Value) {
    match value {
        Value::String(text) => *text = escape_sub(text),
        Value::Array(items) => items.iter_mut().for_each(escape_literals),
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if key == "region" && *entry == REGION_PLACEHOLDER {
                    continue;
                }
                escape_literals(entry);
            }
        }
        _ => {}
    }
}

/// 9つのウィジェットを表示順に組み立てる
pub fn build_body(sources: DashboardSources<'_>) -> DashboardBody {
    let DashboardSources { api, function, table } = sources;
    let mut body = DashboardBody::new();

    body.add_widget(GraphWidget::new("Requests").left(api.api_metric(
        "Count",
        "# Requests",
        Statistic::Sum,
    )));

    let mut latency = GraphWidget::new("API GW Latency").stacked();
    for p in LATENCY_PERCENTILES {
        latency = latency.left(api.api_metric(
            "Latency",
            &format!("API Latency p{}", p),
            Statistic::Percentile(p),
        ));
    }
    body.add_widget(latency);

    body.add_widget(
        GraphWidget::new("API GW Errors")
            .stacked()
            .left(api.api_metric("4XXError", "4XX Errors", Statistic::Sum))
            .left(api.api_metric("5XXError", "5XX Errors", Statistic::Sum)),
    );

    body.add_widget(
        GraphWidget::new("Dynamo Lambda Error %")
            .left(DerivedMetric::ErrorRate.math_expression(function)),
    );

    let mut duration = GraphWidget::new("Dynamo Lambda Duration").stacked();
    for p in LATENCY_PERCENTILES {
        duration = duration.left(function.duration_metric(Statistic::Percentile(p)));
    }
    body.add_widget(duration);

    body.add_widget(
        GraphWidget::new("Dynamo Lambda Throttle %")
            .left(DerivedMetric::ThrottleRate.math_expression(function)),
    );

    let mut table_latency = GraphWidget::new("DynamoDB Latency").stacked();
    for operation in LATENCY_OPERATIONS {
        table_latency = table_latency.left(table.successful_request_latency(operation));
    }
    body.add_widget(table_latency);

    body.add_widget(
        GraphWidget::new("DynamoDB Consumed Read/Write Units")
            .left(table.table_metric("ConsumedReadCapacityUnits", None))
            .left(table.table_metric("ConsumedWriteCapacityUnits", None)),
    );

    body.add_widget(
        GraphWidget::new("DynamoDB Throttles")
            .stacked()
            .left(table.table_metric("ReadThrottleEvents", Some(Statistic::Sum)))
            .left(table.table_metric("WriteThrottleEvents", Some(Statistic::Sum))),
    );

    body
}
