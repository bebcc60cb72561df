/// SQS queue pair with dead-letter policy
use std::time::Duration;

use super::validation::SpecViolation;

/// Visibility timeout of the primary queue
pub const VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivery delay of the primary queue
pub const DELIVERY_DELAY: Duration = Duration::from_secs(15);

/// Message retention of the primary queue (14 hours)
pub const RETENTION_PERIOD: Duration = Duration::from_secs(14 * 60 * 60);

/// AWS-managed KMS key used for queue encryption
pub const SQS_MANAGED_KEY_ALIAS: &str = "alias/aws/sqs";

/// SQS accepts a redrive maxReceiveCount between 1 and 1000
pub const MAX_RECEIVE_COUNT_LIMIT: u32 = 1000;

/// Queue names: up to 80 characters of alphanumerics, hyphens and underscores
const MAX_QUEUE_NAME_LENGTH: usize = 80;

/// Validated queue specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub queue_name: String,
    pub dead_letter_queue_name: String,
    /// Deliveries before a message is moved to the dead-letter queue
    pub max_receive_count: u32,
}

impl QueueSpec {
    pub fn violations(&self) -> Vec<SpecViolation> {
        let mut violations = Vec::new();

        if let Some(reason) = queue_name_problem(&self.queue_name) {
            violations.push(SpecViolation::new("queue_name", reason));
        }
        if let Some(reason) = queue_name_problem(&self.dead_letter_queue_name) {
            violations.push(SpecViolation::new("queue_dlq_name", reason));
        }
        if self.queue_name == self.dead_letter_queue_name {
            violations.push(SpecViolation::new(
                "queue_dlq_name",
                "dead-letter queue must differ from the primary queue",
            ));
        }
        if !(1..=MAX_RECEIVE_COUNT_LIMIT).contains(&self.max_receive_count) {
            violations.push(SpecViolation::new(
                "queue_dlq_max_receive_count",
                format!(
                    "max receive count {} is outside 1..={}",
                    self.max_receive_count, MAX_RECEIVE_COUNT_LIMIT
                ),
            ));
        }

        violations
    }
}

fn queue_name_problem(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("queue name must not be empty".to_string());
    }
    if name.len() > MAX_QUEUE_NAME_LENGTH {
        return Some(format!(
            "queue name is longer than {} characters",
            MAX_QUEUE_NAME_LENGTH
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Some(format!("queue name {:?} contains invalid characters", name));
    }
    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn spec() -> QueueSpec {
        QueueSpec {
            queue_name: "jobs".to_string(),
            dead_letter_queue_name: "jobs-dlq".to_string(),
            max_receive_count: 5,
        }
    }

    #[test]
    fn test_fixed_timing() {
        assert_eq!(VISIBILITY_TIMEOUT.as_secs(), 30);
        assert_eq!(DELIVERY_DELAY.as_secs(), 15);
        assert_eq!(RETENTION_PERIOD.as_secs(), 50400);
    }

    #[test]
    fn test_valid_spec() {
        assert!(spec().violations().is_empty());
    }

    #[test]
    fn test_same_name_rejected() {
        let spec = QueueSpec {
            dead_letter_queue_name: "jobs".to_string(),
            ..spec()
        };
        assert_eq!(spec.violations()[0].key, "queue_dlq_name");
    }

    #[test]
    fn test_max_receive_count_bounds() {
        let zero = QueueSpec {
            max_receive_count: 0,
            ..spec()
        };
        assert_eq!(zero.violations()[0].key, "queue_dlq_max_receive_count");

        let limit = QueueSpec {
            max_receive_count: MAX_RECEIVE_COUNT_LIMIT,
            ..spec()
        };
        assert!(limit.violations().is_empty());
    }

    #[test]
    fn test_invalid_characters() {
        let spec = QueueSpec {
            queue_name: "jobs.fifo!".to_string(),
            ..spec()
        };
        let violations = spec.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].key, "queue_name");
        assert!(violations[0].reason.contains("invalid characters"));
    }
}
