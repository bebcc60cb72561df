//! DynamoDBテーブルマッパー
//!
//! テーブル仕様からテーブルリソースと、必要に応じて
//! Application Auto Scalingのスケーラブルターゲット・スケーリングポリシーを宣言する。
//!
//! - ソートキーの有無でキースキーマ（HASH / HASH+RANGE）を切り替える
//! - 課金モードでプロビジョンドスループットの有無を切り替える
//! - リバースインデックス（パーティションキーとソートキーを入れ替えたGSI）
//! - 固定名のLSI

use aws_sdk_dynamodb::types::{KeyType, ScalarAttributeType};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::domain::intrinsic::{get_att, ref_to, sub};
use crate::domain::metric_source::{successful_request_latency, table_metric};
use crate::domain::table_spec::{
    CapacityBounds, IndexProjection, KeyAttribute, LOCAL_INDEX_NAME, LOCAL_INDEX_SORT_KEY,
    REVERSE_INDEX_NAME,
};
use crate::domain::{
    AttributeKind, DeletionPolicy, LogicalId, Metric, Resource, Statistic, TableMetrics,
    TableSpec, Template, TemplateError,
};

/// DynamoDBテーブル用のApplication Auto Scalingサービスリンクロール
const AUTOSCALING_ROLE_ARN: &str = "arn:${AWS::Partition}:iam::${AWS::AccountId}:role/aws-service-role/dynamodb.application-autoscaling.amazonaws.com/AWSServiceRoleForApplicationAutoScaling_DynamoDBTable";

/// 構成内のテーブル論理ID（物理名に依存しない）
const TABLE_ID: &str = "Table";

/// 宣言されたテーブルへのハンドル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    /// テンプレート内の論理ID
    pub logical_id: LogicalId,
    /// 物理テーブル名
    pub table_name: String,
}

impl TableMetrics for TableHandle {
    fn table_metric(&self, metric_name: &str, statistic: Option<Statistic>) -> Metric {
        table_metric(&self.table_name, metric_name, statistic)
    }

    fn successful_request_latency(&self, operation: &str) -> Metric {
        successful_request_latency(&self.table_name, operation)
    }
}

impl TableHandle {
    /// テーブルARN（`Fn::GetAtt`）
    pub fn arn(&self) -> Value {
        get_att(self.logical_id.as_str(), "Arn")
    }
}

/// テーブルマッパーの出力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConstruct {
    pub table: TableHandle,
    /// 作成したセカンダリインデックス名
    pub index_names: Vec<String>,
    /// 作成したスケーラブルターゲットの論理ID
    pub scalable_targets: Vec<LogicalId>,
}

/// スケーリング対象の容量種別
#[derive(Debug, Clone, Copy)]
enum CapacityDimension {
    Read,
    Write,
}

impl CapacityDimension {
    fn label(self) -> &'static str {
        match self {
            CapacityDimension::Read => "Read",
            CapacityDimension::Write => "Write",
        }
    }

    fn predefined_metric(self) -> &'static str {
        match self {
            CapacityDimension::Read => "DynamoDBReadCapacityUtilization",
            CapacityDimension::Write => "DynamoDBWriteCapacityUtilization",
        }
    }
}

/// DynamoDBテーブルマッパー
pub struct TableMapper {
    scope: String,
}

impl TableMapper {
    /// 構成スコープ名（論理IDの接頭辞）を指定して作成
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    /// テーブル仕様をテンプレートへ展開する
    ///
    /// リバースインデックス・LSIがソートキーなしで要求された場合は作成をスキップし、
    /// その旨をログに残す（エラーにはしない）。
    pub fn map(&self, spec: &TableSpec, template: &mut Template) -> Result<TableConstruct, TemplateError> {
        let table_id = LogicalId::new(&[&self.scope, TABLE_ID]);
        let provisioned = spec.billing_mode.is_provisioned();

        info!(
            table = %spec.table_name,
            logical_id = %table_id,
            billing_mode = spec.billing_mode.to_sdk().as_str(),
            has_sort_key = spec.sort_key.is_some(),
            "テーブル宣言開始"
        );

        let lsi_sort_key = KeyAttribute::new(LOCAL_INDEX_SORT_KEY, AttributeKind::String);
        let mut attributes: Vec<&KeyAttribute> = vec![&spec.partition_key];
        let mut index_names = Vec::new();
        let mut global_indexes = Vec::new();
        let mut local_indexes = Vec::new();

        if let Some(sort_key) = &spec.sort_key {
            attributes.push(sort_key);
        }

        // リバースインデックス: パーティションキーとソートキーを入れ替えたGSI
        match &spec.sort_key {
            Some(sort_key) if spec.reverse_index => {
                let mut index = json!({
                    "IndexName": REVERSE_INDEX_NAME,
                    "KeySchema": key_schema(sort_key, Some(&spec.partition_key)),
                    "Projection": projection(spec.gsi_projection),
                });
                if provisioned {
                    index["ProvisionedThroughput"] =
                        throughput(spec.read_capacity, spec.write_capacity);
                }
                global_indexes.push(index);
                index_names.push(REVERSE_INDEX_NAME.to_string());
            }
            None if spec.reverse_index => {
                info!(table = %spec.table_name, "No reverse index created: table has no sort key");
            }
            _ => {
                info!(table = %spec.table_name, "No reverse index created");
            }
        }

        // LSI: テーブルのパーティションキー + 固定名の文字列ソートキー
        if spec.local_index_applies() {
            local_indexes.push(json!({
                "IndexName": LOCAL_INDEX_NAME,
                "KeySchema": key_schema(&spec.partition_key, Some(&lsi_sort_key)),
                "Projection": projection(spec.lsi_projection),
            }));
            attributes.push(&lsi_sort_key);
            index_names.push(LOCAL_INDEX_NAME.to_string());
        } else if spec.add_lsi {
            info!(table = %spec.table_name, "No local secondary index created: table has no sort key");
        }

        let table = Resource::new("AWS::DynamoDB::Table")
            .property("TableName", spec.table_name.as_str())
            .property(
                "KeySchema",
                key_schema(&spec.partition_key, spec.sort_key.as_ref()),
            )
            .property("AttributeDefinitions", attribute_definitions(&attributes))
            .property("BillingMode", spec.billing_mode.to_sdk().as_str())
            .optional_property(
                "ProvisionedThroughput",
                provisioned.then(|| throughput(spec.read_capacity, spec.write_capacity)),
            )
            .optional_property(
                "GlobalSecondaryIndexes",
                (!global_indexes.is_empty()).then(|| Value::Array(global_indexes)),
            )
            .optional_property(
                "LocalSecondaryIndexes",
                (!local_indexes.is_empty()).then(|| Value::Array(local_indexes)),
            )
            .property("SSESpecification", json!({ "SSEEnabled": true }))
            .property(
                "PointInTimeRecoverySpecification",
                json!({ "PointInTimeRecoveryEnabled": true }),
            )
            .removal_policy(DeletionPolicy::Delete);

        template.add_resource(table_id.clone(), table)?;

        let mut scalable_targets = Vec::new();

        // テーブル本体の読み書き容量オートスケーリング（使用率ターゲット追跡）
        if spec.autoscaling_applies() {
            for (dimension, bounds) in [
                (CapacityDimension::Read, spec.read_capacity),
                (CapacityDimension::Write, spec.write_capacity),
            ] {
                let target_id = self.declare_scalable_target(
                    template,
                    &table_id,
                    None,
                    dimension,
                    bounds,
                )?;
                let policy_id = LogicalId::new(&[
                    target_id.as_str(),
                    "UtilizationPolicy",
                ]);
                let policy = Resource::new("AWS::ApplicationAutoScaling::ScalingPolicy")
                    .property("PolicyName", policy_id.as_str())
                    .property("PolicyType", "TargetTrackingScaling")
                    .property("ScalingTargetId", ref_to(target_id.as_str()))
                    .property(
                        "TargetTrackingScalingPolicyConfiguration",
                        json!({
                            "PredefinedMetricSpecification": {
                                "PredefinedMetricType": dimension.predefined_metric(),
                            },
                            "TargetValue": spec.target_utilization,
                        }),
                    );
                template.add_resource(policy_id, policy)?;
                scalable_targets.push(target_id);
            }
        } else if spec.autoscaling_enabled {
            info!(table = %spec.table_name, "Autoscaling skipped: table is not provisioned");
        }

        // リバースインデックスの読み書き容量（最小・最大のみ）
        if spec.reverse_index_applies() && provisioned {
            for (dimension, bounds) in [
                (CapacityDimension::Read, spec.read_capacity),
                (CapacityDimension::Write, spec.write_capacity),
            ] {
                let target_id = self.declare_scalable_target(
                    template,
                    &table_id,
                    Some(REVERSE_INDEX_NAME),
                    dimension,
                    bounds,
                )?;
                scalable_targets.push(target_id);
            }
        }

        debug!(
            table = %spec.table_name,
            indexes = ?index_names,
            scalable_targets = scalable_targets.len(),
            "テーブル宣言完了"
        );

        Ok(TableConstruct {
            table: TableHandle {
                logical_id: table_id,
                table_name: spec.table_name.clone(),
            },
            index_names,
            scalable_targets,
        })
    }

    fn declare_scalable_target(
        &self,
        template: &mut Template,
        table_id: &LogicalId,
        index_name: Option<&str>,
        dimension: CapacityDimension,
        bounds: CapacityBounds,
    ) -> Result<LogicalId, TemplateError> {
        let (resource_id, scalable_dimension, target_id) = match index_name {
            Some(index) => (
                format!("table/${{{}}}/index/{}", table_id, index),
                format!("dynamodb:index:{}CapacityUnits", dimension.label()),
                LogicalId::new(&[table_id.as_str(), index, dimension.label(), "Scaling"]),
            ),
            None => (
                format!("table/${{{}}}", table_id),
                format!("dynamodb:table:{}CapacityUnits", dimension.label()),
                LogicalId::new(&[table_id.as_str(), dimension.label(), "Scaling"]),
            ),
        };

        let target = Resource::new("AWS::ApplicationAutoScaling::ScalableTarget")
            .property("MinCapacity", bounds.min)
            .property("MaxCapacity", bounds.max)
            .property("ResourceId", sub(resource_id))
            .property("RoleARN", sub(AUTOSCALING_ROLE_ARN))
            .property("ScalableDimension", scalable_dimension)
            .property("ServiceNamespace", "dynamodb");

        template.add_resource(target_id.clone(), target)?;
        Ok(target_id)
    }
}

/// キースキーマを生成
fn key_schema(partition: &KeyAttribute, sort: Option<&KeyAttribute>) -> Value {
    let mut schema = vec![json!({
        "AttributeName": partition.name,
        "KeyType": KeyType::Hash.as_str(),
    })];
    if let Some(sort) = sort {
        schema.push(json!({
            "AttributeName": sort.name,
            "KeyType": KeyType::Range.as_str(),
        }));
    }
    Value::Array(schema)
}

/// 属性定義を生成（同名属性は最初の定義のみ残す）
fn attribute_definitions(attributes: &[&KeyAttribute]) -> Value {
    let mut seen: Vec<&str> = Vec::new();
    let mut definitions = Vec::new();
    for attribute in attributes {
        if seen.contains(&attribute.name.as_str()) {
            continue;
        }
        seen.push(&attribute.name);
        let attribute_type: ScalarAttributeType = attribute.kind.to_sdk();
        definitions.push(json!({
            "AttributeName": attribute.name,
            "AttributeType": attribute_type.as_str(),
        }));
    }
    Value::Array(definitions)
}

fn projection(projection: IndexProjection) -> Value {
    json!({ "ProjectionType": projection.to_sdk().as_str() })
}

fn throughput(read: CapacityBounds, write: CapacityBounds) -> Value {
    json!({
        "ReadCapacityUnits": read.min,
        "WriteCapacityUnits": write.min,
    })
}
