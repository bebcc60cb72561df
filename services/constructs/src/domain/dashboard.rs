// CloudWatchダッシュボード
//
// ダッシュボード仕様とグラフウィジェット、およびダッシュボード本体JSONの生成を扱う。

use serde_json::{json, Map, Value};

use super::metric::GraphMetric;
use super::metric_source::{FunctionRef, RestApiRef};

/// ダッシュボード名のデフォルト値
pub const DEFAULT_DASHBOARD_NAME: &str = "Serverlesslens";

/// ダッシュボードグリッドの列数
pub const GRID_COLUMNS: u32 = 24;

/// ウィジェットのデフォルト幅・高さ
pub const DEFAULT_WIDGET_WIDTH: u32 = 8;
pub const DEFAULT_WIDGET_HEIGHT: u32 = 6;

/// リージョン指定（テンプレートのFn::Subで置換される）
pub const REGION_PLACEHOLDER: &str = "${AWS::Region}";

/// ダッシュボード仕様
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSpec {
    /// ダッシュボード名
    pub dashboard_name: String,
    /// API Gatewayの名前
    pub api_name: String,
    /// デプロイステージ
    pub stage: String,
    /// 監視対象Lambda関数名
    pub function_name: String,
}

impl DashboardSpec {
    /// API参照を作成
    pub fn api(&self) -> RestApiRef {
        RestApiRef::new(&self.api_name, &self.stage)
    }

    /// 関数参照を作成
    pub fn function(&self) -> FunctionRef {
        FunctionRef::new(&self.function_name)
    }
}

/// 折れ線グラフウィジェット
#[derive(Debug, Clone, PartialEq)]
pub struct GraphWidget {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub stacked: bool,
    /// 左軸に表示するメトリクス
    pub left: Vec<GraphMetric>,
}

impl GraphWidget {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: DEFAULT_WIDGET_WIDTH,
            height: DEFAULT_WIDGET_HEIGHT,
            stacked: false,
            left: Vec::new(),
        }
    }

    pub fn stacked(mut self) -> Self {
        self.stacked = true;
        self
    }

    pub fn left(mut self, metric: impl Into<GraphMetric>) -> Self {
        self.left.push(metric.into());
        self
    }

    /// 指定位置に配置したウィジェットJSONを生成
    fn render(&self, x: u32, y: u32) -> Value {
        let mut metrics = Vec::new();
        let mut expression_count = 0;
        for metric in &self.left {
            match metric {
                GraphMetric::Metric(metric) => metrics.push(metric.render_row(Map::new())),
                GraphMetric::Expression(expression) => {
                    expression_count += 1;
                    let id = format!("expr{}", expression_count);
                    metrics.extend(expression.render_rows(&id));
                }
            }
        }

        json!({
            "type": "metric",
            "width": self.width,
            "height": self.height,
            "x": x,
            "y": y,
            "properties": {
                "view": "timeSeries",
                "title": self.title,
                "region": REGION_PLACEHOLDER,
                "stacked": self.stacked,
                "metrics": metrics,
                "yAxis": {},
            },
        })
    }
}

/// ダッシュボード本体
///
/// ウィジェットは追加順に左から右へ並べ、グリッド幅を超える場合は次の行へ折り返す。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardBody {
    widgets: Vec<GraphWidget>,
}

impl DashboardBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_widget(&mut self, widget: GraphWidget) {
        self.widgets.push(widget);
    }

    pub fn widgets(&self) -> &[GraphWidget] {
        &self.widgets
    }

    /// 各ウィジェットの(x, y)座標を計算
    pub fn layout(&self) -> Vec<(u32, u32)> {
        let mut positions = Vec::with_capacity(self.widgets.len());
        let (mut x, mut y, mut row_height) = (0, 0, 0);
        for widget in &self.widgets {
            if x > 0 && x + widget.width > GRID_COLUMNS {
                x = 0;
                y += row_height;
                row_height = 0;
            }
            positions.push((x, y));
            x += widget.width;
            row_height = row_height.max(widget.height);
        }
        positions
    }

    /// ダッシュボード本体JSONを生成
    pub fn render(&self) -> Value {
        let widgets: Vec<Value> = self
            .widgets
            .iter()
            .zip(self.layout())
            .map(|(widget, (x, y))| widget.render(x, y))
            .collect();
        json!({ "widgets": widgets })
    }
}
