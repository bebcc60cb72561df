//! スタック合成
//!
//! 有効化されたマッパーを テーブル → キュー → 静的サイト → ダッシュボード の順に
//! 一度ずつ実行し、単一のテンプレートにまとめる。

use thiserror::Error;
use tracing::info;

use super::dashboard_mapper::{DashboardConstruct, DashboardMapper, DashboardSources};
use super::queue_mapper::{QueueConstruct, QueueMapper};
use super::static_site_mapper::{StaticSiteConstruct, StaticSiteMapper};
use super::table_mapper::{TableConstruct, TableMapper};
use crate::domain::{DashboardSpec, QueueSpec, SiteSpec, TableSpec, Template, TemplateError};

/// 各マッパーのスコープ（論理IDの接頭辞）
pub const TABLE_SCOPE: &str = "Db";
pub const QUEUE_SCOPE: &str = "Queue";
pub const SITE_SCOPE: &str = "Site";
pub const DASHBOARD_SCOPE: &str = "Dashboard";

/// 合成エラー
#[derive(Debug, Error, PartialEq)]
pub enum SynthError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// ダッシュボードに必要なテーブルが無効化されている
    #[error("{construct} requires {dependency}, which is not enabled")]
    MissingDependency {
        construct: &'static str,
        dependency: &'static str,
    },
}

/// 合成対象のスタック構成
///
/// `None` の構成要素は宣言されない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackSpec {
    pub description: Option<String>,
    pub table: Option<TableSpec>,
    pub queue: Option<QueueSpec>,
    pub site: Option<SiteSpec>,
    pub dashboard: Option<DashboardSpec>,
}

/// 合成結果
#[derive(Debug)]
pub struct SynthesizedStack {
    pub template: Template,
    pub table: Option<TableConstruct>,
    pub queue: Option<QueueConstruct>,
    pub site: Option<StaticSiteConstruct>,
    pub dashboard: Option<DashboardConstruct>,
}

/// スタック合成器
#[derive(Debug, Default)]
pub struct StackSynthesizer;

impl StackSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(&self, spec: &StackSpec) -> Result<SynthesizedStack, SynthError> {
        // テーブルなしではダッシュボードのメトリクスを組み立てられない
        if spec.dashboard.is_some() && spec.table.is_none() {
            return Err(SynthError::MissingDependency {
                construct: "dashboard",
                dependency: "table",
            });
        }

        let mut template = match &spec.description {
            Some(description) => Template::new().with_description(description.clone()),
            None => Template::new(),
        };

        let table = spec
            .table
            .as_ref()
            .map(|table| TableMapper::new(TABLE_SCOPE).map(table, &mut template))
            .transpose()?;
        let queue = spec
            .queue
            .as_ref()
            .map(|queue| QueueMapper::new(QUEUE_SCOPE).map(queue, &mut template))
            .transpose()?;
        let site = spec
            .site
            .as_ref()
            .map(|site| StaticSiteMapper::new(SITE_SCOPE).map(site, &mut template))
            .transpose()?;

        let dashboard = match (&spec.dashboard, &table) {
            (Some(dashboard), Some(table)) => {
                let (api, function) = (dashboard.api(), dashboard.function());
                let sources = DashboardSources {
                    api: &api,
                    function: &function,
                    table: &table.table,
                };
                Some(DashboardMapper::new(DASHBOARD_SCOPE).map(dashboard, sources, &mut template)?)
            }
            _ => None,
        };

        info!(
            resources = template.resource_count(),
            outputs = template.outputs().count(),
            "スタック合成完了"
        );

        Ok(SynthesizedStack {
            template,
            table,
            queue,
            site,
            dashboard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table_spec::tests::full_spec;
    use crate::domain::{queue_spec, site_spec, DEFAULT_DASHBOARD_NAME};

    fn dashboard_spec() -> DashboardSpec {
        DashboardSpec {
            dashboard_name: DEFAULT_DASHBOARD_NAME.to_string(),
            api_name: "orders-api".to_string(),
            stage: "prod".to_string(),
            function_name: "orders-handler".to_string(),
        }
    }

    fn full_stack() -> StackSpec {
        StackSpec {
            description: Some("serverless stack".to_string()),
            table: Some(full_spec()),
            queue: Some(queue_spec::tests::spec()),
            site: Some(site_spec::tests::spec()),
            dashboard: Some(dashboard_spec()),
        }
    }

    #[test]
    fn test_empty_stack() {
        let stack = StackSynthesizer::new().synthesize(&StackSpec::default()).unwrap();

        assert_eq!(stack.template.resource_count(), 0);
        assert!(stack.table.is_none());
        assert!(stack.dashboard.is_none());
    }

    #[test]
    fn test_full_stack_declares_in_order() {
        let stack = StackSynthesizer::new().synthesize(&full_stack()).unwrap();
        let template = &stack.template;

        let table = template.position_of("DbTable").unwrap();
        let dlq = template.position_of("QueueDeadLetterQueue").unwrap();
        let distribution = template.position_of("SiteDistribution").unwrap();
        let dashboard = template.position_of("DashboardCloudWatchDashBoard").unwrap();
        assert!(table < dlq);
        assert!(dlq < distribution);
        assert!(distribution < dashboard);

        let outputs: Vec<&str> = template.outputs().map(|(id, _)| id.as_str()).collect();
        assert_eq!(
            outputs,
            vec![
                "QueueQueueUrl",
                "SiteCloudfrontDistribution",
                "SiteBucketArn",
                "SiteLoggingBucketArn",
            ]
        );
        assert_eq!(stack.dashboard.unwrap().widget_count, 9);
    }

    #[test]
    fn test_description_is_carried() {
        let stack = StackSynthesizer::new().synthesize(&full_stack()).unwrap();
        assert_eq!(stack.template.to_value()["Description"], "serverless stack");
    }

    #[test]
    fn test_dashboard_uses_table_name() {
        let stack = StackSynthesizer::new().synthesize(&full_stack()).unwrap();
        let dashboard = stack
            .template
            .resource("DashboardCloudWatchDashBoard")
            .unwrap();
        let body = dashboard.get("DashboardBody").unwrap()["Fn::Sub"]
            .as_str()
            .unwrap();

        assert!(body.contains("\"TableName\",\"orders\""));
    }

    #[test]
    fn test_dashboard_without_table_is_rejected() {
        let spec = StackSpec {
            table: None,
            ..full_stack()
        };

        let result = StackSynthesizer::new().synthesize(&spec);
        assert_eq!(
            result.unwrap_err(),
            SynthError::MissingDependency {
                construct: "dashboard",
                dependency: "table",
            }
        );
    }

    #[test]
    fn test_queue_only_stack() {
        let spec = StackSpec {
            queue: Some(queue_spec::tests::spec()),
            ..StackSpec::default()
        };

        let stack = StackSynthesizer::new().synthesize(&spec).unwrap();
        assert_eq!(stack.template.resource_count(), 2);
        assert!(stack.queue.is_some());
        assert!(stack.site.is_none());
    }
}
