/// DynamoDB table shape
///
/// Validated description of a single table: key schema, billing, capacity
/// bounds and the optional secondary indexes.
use aws_sdk_dynamodb::types::{BillingMode, ProjectionType, ScalarAttributeType};

use super::validation::{Selector, SpecViolation};

/// Name of the global secondary index that swaps partition and sort key
pub const REVERSE_INDEX_NAME: &str = "reverseIndex";

/// Name of the local secondary index
pub const LOCAL_INDEX_NAME: &str = "LSI1";

/// Sort attribute of the local secondary index (always a string)
pub const LOCAL_INDEX_SORT_KEY: &str = "LSISK";

/// Target tracking accepts utilization between these bounds (percent)
pub const MIN_TARGET_UTILIZATION: f64 = 10.0;
pub const MAX_TARGET_UTILIZATION: f64 = 90.0;

/// Key attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Number,
}

impl AttributeKind {
    pub fn to_sdk(self) -> ScalarAttributeType {
        match self {
            AttributeKind::String => ScalarAttributeType::S,
            AttributeKind::Number => ScalarAttributeType::N,
        }
    }
}

impl Selector for AttributeKind {
    const KIND: &'static str = "key type";
    const ACCEPTED: &'static [&'static str] = &["string", "number"];

    fn recognize(value: &str) -> Option<Self> {
        match value {
            "string" => Some(AttributeKind::String),
            "number" => Some(AttributeKind::Number),
            _ => None,
        }
    }

    // Anything that is not "string" is treated as a number key
    fn fallback() -> Self {
        AttributeKind::Number
    }
}

/// Table billing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableBillingMode {
    Provisioned,
    OnDemand,
}

impl TableBillingMode {
    pub fn to_sdk(self) -> BillingMode {
        match self {
            TableBillingMode::Provisioned => BillingMode::Provisioned,
            TableBillingMode::OnDemand => BillingMode::PayPerRequest,
        }
    }

    pub fn is_provisioned(self) -> bool {
        matches!(self, TableBillingMode::Provisioned)
    }
}

impl Selector for TableBillingMode {
    const KIND: &'static str = "billing mode";
    const ACCEPTED: &'static [&'static str] = &["provisioned", "on_demand", "pay_per_request"];

    fn recognize(value: &str) -> Option<Self> {
        match value {
            "provisioned" => Some(TableBillingMode::Provisioned),
            "on_demand" | "pay_per_request" => Some(TableBillingMode::OnDemand),
            _ => None,
        }
    }

    fn fallback() -> Self {
        TableBillingMode::OnDemand
    }
}

/// Secondary index projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexProjection {
    All,
    KeysOnly,
}

impl IndexProjection {
    pub fn to_sdk(self) -> ProjectionType {
        match self {
            IndexProjection::All => ProjectionType::All,
            IndexProjection::KeysOnly => ProjectionType::KeysOnly,
        }
    }
}

impl Selector for IndexProjection {
    const KIND: &'static str = "projection";
    const ACCEPTED: &'static [&'static str] = &["all", "keys_only"];

    fn recognize(value: &str) -> Option<Self> {
        match value {
            "all" => Some(IndexProjection::All),
            "keys_only" => Some(IndexProjection::KeysOnly),
            _ => None,
        }
    }

    fn fallback() -> Self {
        IndexProjection::KeysOnly
    }
}

/// Named key attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Minimum / maximum capacity units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityBounds {
    pub min: u32,
    pub max: u32,
}

impl CapacityBounds {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// Validated table specification
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub table_name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub billing_mode: TableBillingMode,
    pub read_capacity: CapacityBounds,
    pub write_capacity: CapacityBounds,
    pub autoscaling_enabled: bool,
    /// Target utilization for autoscaling, in percent
    pub target_utilization: f64,
    pub reverse_index: bool,
    pub gsi_projection: IndexProjection,
    pub add_lsi: bool,
    pub lsi_projection: IndexProjection,
}

impl TableSpec {
    /// Autoscaling only applies under provisioned billing
    pub fn autoscaling_applies(&self) -> bool {
        self.billing_mode.is_provisioned() && self.autoscaling_enabled
    }

    /// A reverse index needs a sort key to swap with
    pub fn reverse_index_applies(&self) -> bool {
        self.reverse_index && self.sort_key.is_some()
    }

    /// A local index needs a composite primary key
    pub fn local_index_applies(&self) -> bool {
        self.add_lsi && self.sort_key.is_some()
    }

    /// Check the cross-field invariants
    ///
    /// Returns every violation found, in key order. An empty list means the
    /// specification can be mapped without skipping anything.
    pub fn violations(&self) -> Vec<SpecViolation> {
        let mut violations = Vec::new();

        if self.table_name.trim().is_empty() {
            violations.push(SpecViolation::new("db_table", "table name must not be empty"));
        }
        if self.partition_key.name.trim().is_empty() {
            violations.push(SpecViolation::new(
                "db_table_pk",
                "partition key name must not be empty",
            ));
        }
        if self.read_capacity.min > self.read_capacity.max {
            violations.push(SpecViolation::new(
                "db_min_read_capacity",
                format!(
                    "minimum read capacity {} exceeds maximum {}",
                    self.read_capacity.min, self.read_capacity.max
                ),
            ));
        }
        if self.write_capacity.min > self.write_capacity.max {
            violations.push(SpecViolation::new(
                "db_min_write_capacity",
                format!(
                    "minimum write capacity {} exceeds maximum {}",
                    self.write_capacity.min, self.write_capacity.max
                ),
            ));
        }
        if self.billing_mode.is_provisioned()
            && (self.read_capacity.min == 0 || self.write_capacity.min == 0)
        {
            violations.push(SpecViolation::new(
                "db_billing_mode",
                "provisioned billing requires non-zero minimum capacity",
            ));
        }
        if self.autoscaling_enabled && !self.billing_mode.is_provisioned() {
            violations.push(SpecViolation::new(
                "db_enable_autoscaling",
                "autoscaling requires provisioned billing",
            ));
        }
        if self.autoscaling_applies()
            && !(MIN_TARGET_UTILIZATION..=MAX_TARGET_UTILIZATION).contains(&self.target_utilization)
        {
            violations.push(SpecViolation::new(
                "db_target_utilization",
                format!(
                    "target utilization {} is outside {}..={}",
                    self.target_utilization, MIN_TARGET_UTILIZATION, MAX_TARGET_UTILIZATION
                ),
            ));
        }
        if self.reverse_index && self.sort_key.is_none() {
            violations.push(SpecViolation::new(
                "db_reverse_index",
                "reverse index requires a sort key",
            ));
        }
        if self.add_lsi && self.sort_key.is_none() {
            violations.push(SpecViolation::new(
                "db_add_lsi",
                "local secondary index requires a sort key",
            ));
        }

        violations
    }
}
