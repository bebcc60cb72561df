//! SQSキューマッパー
//!
//! デッドレターキューと、それを参照するプライマリキューを宣言し、
//! プライマリキューのURLを出力値として公開する。
//! デッドレターキューは必ずプライマリキューより先に宣言される。

use aws_sdk_sqs::types::QueueAttributeName;
use serde_json::{json, Value};
use tracing::info;

use crate::domain::intrinsic::{get_att, ref_to};
use crate::domain::queue_spec::{
    DELIVERY_DELAY, RETENTION_PERIOD, SQS_MANAGED_KEY_ALIAS, VISIBILITY_TIMEOUT,
};
use crate::domain::{DeletionPolicy, LogicalId, Output, QueueSpec, Resource, Template, TemplateError};

/// キューURLの出力名
pub const QUEUE_URL_OUTPUT: &str = "QueueUrl";

/// 構成内の論理ID（物理名に依存しない）
const DEAD_LETTER_QUEUE_ID: &str = "DeadLetterQueue";
const QUEUE_ID: &str = "Queue";

/// 宣言されたキューへのハンドル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub logical_id: LogicalId,
    pub queue_name: String,
}

impl QueueHandle {
    /// キューURL（`Ref`）
    pub fn url(&self) -> Value {
        ref_to(self.logical_id.as_str())
    }

    /// キューARN（`Fn::GetAtt`）
    pub fn arn(&self) -> Value {
        get_att(self.logical_id.as_str(), "Arn")
    }
}

/// キューマッパーの出力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConstruct {
    pub queue: QueueHandle,
    pub dead_letter_queue: QueueHandle,
    /// キューURL出力の論理ID
    pub url_output: LogicalId,
}

/// SQSキューマッパー
pub struct QueueMapper {
    scope: String,
}

impl QueueMapper {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    /// キュー仕様をテンプレートへ展開する
    pub fn map(&self, spec: &QueueSpec, template: &mut Template) -> Result<QueueConstruct, TemplateError> {
        info!(
            queue = %spec.queue_name,
            dead_letter_queue = %spec.dead_letter_queue_name,
            max_receive_count = spec.max_receive_count,
            "キュー宣言開始"
        );

        // デッドレターキューを先に宣言（プライマリキューから参照される）
        let dlq_id = LogicalId::new(&[&self.scope, DEAD_LETTER_QUEUE_ID]);
        let dlq = Resource::new("AWS::SQS::Queue")
            .property("QueueName", spec.dead_letter_queue_name.as_str())
            .removal_policy(DeletionPolicy::Delete);
        template.add_resource(dlq_id.clone(), dlq)?;

        let dead_letter_queue = QueueHandle {
            logical_id: dlq_id,
            queue_name: spec.dead_letter_queue_name.clone(),
        };

        let queue_id = LogicalId::new(&[&self.scope, QUEUE_ID]);
        let queue = Resource::new("AWS::SQS::Queue")
            .property("QueueName", spec.queue_name.as_str())
            .property(
                QueueAttributeName::RedrivePolicy.as_str(),
                json!({
                    "deadLetterTargetArn": dead_letter_queue.arn(),
                    "maxReceiveCount": spec.max_receive_count,
                }),
            )
            .property(
                QueueAttributeName::KmsMasterKeyId.as_str(),
                SQS_MANAGED_KEY_ALIAS,
            )
            .property(
                QueueAttributeName::VisibilityTimeout.as_str(),
                VISIBILITY_TIMEOUT.as_secs(),
            )
            .property(
                QueueAttributeName::DelaySeconds.as_str(),
                DELIVERY_DELAY.as_secs(),
            )
            .property(
                QueueAttributeName::MessageRetentionPeriod.as_str(),
                RETENTION_PERIOD.as_secs(),
            )
            .removal_policy(DeletionPolicy::Delete);
        template.add_resource(queue_id.clone(), queue)?;

        let queue = QueueHandle {
            logical_id: queue_id,
            queue_name: spec.queue_name.clone(),
        };

        let url_output = LogicalId::new(&[&self.scope, QUEUE_URL_OUTPUT]);
        template.add_output(
            url_output.clone(),
            Output::new(queue.url()).with_description(format!("URL of {}", spec.queue_name)),
        )?;

        Ok(QueueConstruct {
            queue,
            dead_letter_queue,
            url_output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::queue_spec::tests::spec;

    fn map() -> (QueueConstruct, Template) {
        let mut template = Template::new();
        let construct = QueueMapper::new("Queue").map(&spec(), &mut template).unwrap();
        (construct, template)
    }

    #[test]
    fn test_declares_dead_letter_queue_first() {
        let (construct, template) = map();

        let dlq = template
            .position_of(construct.dead_letter_queue.logical_id.as_str())
            .unwrap();
        let queue = template
            .position_of(construct.queue.logical_id.as_str())
            .unwrap();
        assert!(dlq < queue);
    }

    #[test]
    fn test_redrive_policy_references_dead_letter_queue() {
        let (construct, template) = map();
        let queue = template.resource(construct.queue.logical_id.as_str()).unwrap();

        assert_eq!(
            queue.get("RedrivePolicy"),
            Some(&json!({
                "deadLetterTargetArn": { "Fn::GetAtt": ["QueueDeadLetterQueue", "Arn"] },
                "maxReceiveCount": 5,
            }))
        );
    }

    #[test]
    fn test_fixed_timing_and_encryption() {
        let (construct, template) = map();
        let queue = template.resource(construct.queue.logical_id.as_str()).unwrap();

        assert_eq!(queue.get("QueueName"), Some(&json!("jobs")));
        assert_eq!(queue.get("VisibilityTimeout"), Some(&json!(30)));
        assert_eq!(queue.get("DelaySeconds"), Some(&json!(15)));
        assert_eq!(queue.get("MessageRetentionPeriod"), Some(&json!(50400)));
        assert_eq!(queue.get("KmsMasterKeyId"), Some(&json!("alias/aws/sqs")));
        assert_eq!(queue.deletion_policy, Some(DeletionPolicy::Delete));
    }

    #[test]
    fn test_dead_letter_queue_is_plain() {
        let (construct, template) = map();
        let dlq = template
            .resource(construct.dead_letter_queue.logical_id.as_str())
            .unwrap();

        assert_eq!(dlq.get("QueueName"), Some(&json!("jobs-dlq")));
        assert!(dlq.get("RedrivePolicy").is_none());
    }

    #[test]
    fn test_queue_url_output() {
        let (construct, template) = map();

        assert_eq!(construct.url_output.as_str(), "QueueQueueUrl");
        let output = template.output("QueueQueueUrl").unwrap();
        assert_eq!(output.value, json!({ "Ref": "QueueQueue" }));
    }

    #[test]
    fn test_mapping_twice_into_same_template_conflicts() {
        let mut template = Template::new();
        let mapper = QueueMapper::new("Queue");
        mapper.map(&spec(), &mut template).unwrap();

        let result = mapper.map(&spec(), &mut template);
        assert_eq!(
            result,
            Err(TemplateError::DuplicateLogicalId("QueueDeadLetterQueue".to_string()))
        );
    }

    #[test]
    fn test_names_differing_only_in_punctuation() {
        let spec = QueueSpec {
            queue_name: "orders_events".to_string(),
            dead_letter_queue_name: "orders-events".to_string(),
            ..spec()
        };
        let mut template = Template::new();
        let construct = QueueMapper::new("Queue").map(&spec, &mut template).unwrap();

        assert_eq!(construct.dead_letter_queue.logical_id.as_str(), "QueueDeadLetterQueue");
        assert_eq!(construct.queue.logical_id.as_str(), "QueueQueue");
        assert_eq!(
            template.resource("QueueQueue").unwrap().get("QueueName"),
            Some(&json!("orders_events"))
        );
    }
}
