/// コンテキストドキュメント読み込み
///
/// `cdk.json` の `context` セクション、またはブロック名をキーとする素のマップを読み込み、
/// ブロックごとに型付きの仕様（TableSpec / QueueSpec / SiteSpec / DashboardSpec）へ変換する。
/// 必須キーの欠落や型の不一致は常にエラー。値の意味的な不整合は検証モードに従う。
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::StackSpec;
use crate::domain::{
    AllowedMethods, AttributeKind, CapacityBounds, DashboardSpec, DistributionPriceClass,
    IndexProjection, KeyAttribute, QueueSpec, Selector, SiteSpec, SpecViolation, TableBillingMode,
    TableSpec, ValidationMode, ViewerProtocol, DEFAULT_DASHBOARD_NAME,
};

/// 各構成要素のデフォルトブロック名
pub const DEFAULT_TABLE_BLOCK: &str = "db";
pub const DEFAULT_QUEUE_BLOCK: &str = "queue";
pub const DEFAULT_SITE_BLOCK: &str = "site";
pub const DEFAULT_GATEWAY_BLOCK: &str = "gateway";

/// コンテキスト読み込みのエラー型
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read context file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse context document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Context document must be a JSON object")]
    NotAnObject,

    #[error("Context block not found: {0}")]
    MissingBlock(String),

    /// 必須キーの欠落や型の不一致
    #[error("Invalid context block {block}: {source}")]
    InvalidBlock {
        block: String,
        #[source]
        source: serde_json::Error,
    },

    /// strictモードで検出した値の不整合
    #[error("Invalid configuration {block}.{key}: {reason}")]
    InvalidConfiguration {
        block: String,
        key: String,
        reason: String,
    },
}

/// テーブルブロック
#[derive(Debug, Deserialize)]
struct RawTableBlock {
    db_table: String,
    db_table_pk: String,
    db_table_pk_type: String,
    /// 空文字列はソートキーなし
    db_table_sk: String,
    db_table_sk_type: String,
    db_billing_mode: String,
    db_min_read_capacity: u32,
    db_max_read_capacity: u32,
    db_min_write_capacity: u32,
    db_max_write_capacity: u32,
    db_target_utilization: f64,
    db_enable_autoscaling: bool,
    db_reverse_index: bool,
    db_gsi_projection: String,
    db_lsi_projection: String,
    db_add_lsi: bool,
}

/// キューブロック
#[derive(Debug, Deserialize)]
struct RawQueueBlock {
    queue_name: String,
    queue_dlq_name: String,
    queue_dlq_max_receive_count: u32,
}

/// 静的サイトブロック
#[derive(Debug, Deserialize)]
struct RawSiteBlock {
    static_site_bucket_name: String,
    access_logs_bucket_name: String,
    website_index_document: String,
    cfront_origins_comment: String,
    cfront_distribution_name: String,
    cfront_allowed_methods: String,
    cfront_viewer_policy: String,
    cfront_price_class: String,
    cfront_root_object: String,
    cfront_dist_comment: String,
    cfront_log_file_prefix: String,
    geo_whitelist: Vec<String>,
}

/// API Gatewayブロック
#[derive(Debug, Deserialize)]
struct RawGatewayBlock {
    gw_name: String,
    fn_name: String,
    #[serde(default)]
    dashboard_name: Option<String>,
}

/// 合成対象として選択されたブロック名
///
/// `None` の構成要素は合成しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSelection {
    pub table: Option<String>,
    pub queue: Option<String>,
    pub site: Option<String>,
    pub gateway: Option<String>,
}

impl BlockSelection {
    /// どの構成要素も選択されていないか
    pub fn is_empty(&self) -> bool {
        self == &BlockSelection::default()
    }
}

/// 読み込み済みのコンテキストドキュメント
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDocument {
    blocks: Map<String, Value>,
}

impl ContextDocument {
    /// ファイルから読み込む
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = text.len(), "コンテキストファイル読み込み");
        Self::parse(&text)
    }

    /// JSON文字列から読み込む
    ///
    /// トップレベルにオブジェクトの `context` キーがあれば `cdk.json` とみなしてその中身を使う。
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut root) = value else {
            return Err(ConfigError::NotAnObject);
        };

        let blocks = match root.remove("context") {
            Some(Value::Object(context)) => context,
            Some(other) => {
                // `context` という名前のブロック以外の値は元に戻す
                root.insert("context".to_string(), other);
                root
            }
            None => root,
        };

        Ok(Self { blocks })
    }

    /// ブロックが存在するか
    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// 明示されていない構成要素について、デフォルト名のブロックが存在すれば選択する
    ///
    /// テーブルブロックがない場合、ダッシュボードは参照先がないため選択しない。
    pub fn default_selection(&self) -> BlockSelection {
        let pick = |name: &str| self.has_block(name).then(|| name.to_string());
        let table = pick(DEFAULT_TABLE_BLOCK);
        let gateway = pick(DEFAULT_GATEWAY_BLOCK).filter(|block| {
            if table.is_none() {
                info!(gateway = %block, "No dashboard created: context has no table block");
            }
            table.is_some()
        });

        BlockSelection {
            table,
            queue: pick(DEFAULT_QUEUE_BLOCK),
            site: pick(DEFAULT_SITE_BLOCK),
            gateway,
        }
    }

    /// 合成対象を決定する
    ///
    /// ブロック名が1つでも明示されていればその指定のみを使い、なければデフォルト選択。
    pub fn selection(&self, explicit: BlockSelection) -> BlockSelection {
        if explicit.is_empty() {
            self.default_selection()
        } else {
            explicit
        }
    }

    fn block<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        let value = self
            .blocks
            .get(name)
            .ok_or_else(|| ConfigError::MissingBlock(name.to_string()))?;
        T::deserialize(value).map_err(|source| ConfigError::InvalidBlock {
            block: name.to_string(),
            source,
        })
    }

    /// テーブル仕様を読み込む
    pub fn table_spec(&self, block: &str, mode: ValidationMode) -> Result<TableSpec, ConfigError> {
        let raw: RawTableBlock = self.block(block)?;
        let selector = SelectorContext { block, mode };

        let partition_key = KeyAttribute::new(
            raw.db_table_pk,
            selector.parse::<AttributeKind>("db_table_pk_type", &raw.db_table_pk_type)?,
        );
        let sort_key = if raw.db_table_sk.is_empty() {
            None
        } else {
            Some(KeyAttribute::new(
                raw.db_table_sk,
                selector.parse::<AttributeKind>("db_table_sk_type", &raw.db_table_sk_type)?,
            ))
        };

        let spec = TableSpec {
            table_name: raw.db_table,
            partition_key,
            sort_key,
            billing_mode: selector.parse::<TableBillingMode>("db_billing_mode", &raw.db_billing_mode)?,
            read_capacity: CapacityBounds::new(raw.db_min_read_capacity, raw.db_max_read_capacity),
            write_capacity: CapacityBounds::new(raw.db_min_write_capacity, raw.db_max_write_capacity),
            autoscaling_enabled: raw.db_enable_autoscaling,
            target_utilization: raw.db_target_utilization,
            reverse_index: raw.db_reverse_index,
            gsi_projection: selector.parse::<IndexProjection>("db_gsi_projection", &raw.db_gsi_projection)?,
            add_lsi: raw.db_add_lsi,
            lsi_projection: selector.parse::<IndexProjection>("db_lsi_projection", &raw.db_lsi_projection)?,
        };

        check_violations(block, mode, spec.violations())?;
        Ok(spec)
    }

    /// キュー仕様を読み込む
    pub fn queue_spec(&self, block: &str, mode: ValidationMode) -> Result<QueueSpec, ConfigError> {
        let raw: RawQueueBlock = self.block(block)?;
        let spec = QueueSpec {
            queue_name: raw.queue_name,
            dead_letter_queue_name: raw.queue_dlq_name,
            max_receive_count: raw.queue_dlq_max_receive_count,
        };

        check_violations(block, mode, spec.violations())?;
        Ok(spec)
    }

    /// 静的サイト仕様を読み込む
    pub fn site_spec(&self, block: &str, mode: ValidationMode) -> Result<SiteSpec, ConfigError> {
        let raw: RawSiteBlock = self.block(block)?;
        let selector = SelectorContext { block, mode };

        let spec = SiteSpec {
            allowed_methods: selector
                .parse::<AllowedMethods>("cfront_allowed_methods", &raw.cfront_allowed_methods)?,
            viewer_protocol: selector
                .parse::<ViewerProtocol>("cfront_viewer_policy", &raw.cfront_viewer_policy)?,
            price_class: selector
                .parse::<DistributionPriceClass>("cfront_price_class", &raw.cfront_price_class)?,
            site_bucket_name: raw.static_site_bucket_name,
            access_logs_bucket_name: raw.access_logs_bucket_name,
            index_document: raw.website_index_document,
            origin_access_comment: raw.cfront_origins_comment,
            distribution_name: raw.cfront_distribution_name,
            root_object: raw.cfront_root_object,
            distribution_comment: raw.cfront_dist_comment,
            log_file_prefix: raw.cfront_log_file_prefix,
            geo_whitelist: raw.geo_whitelist,
        };

        check_violations(block, mode, spec.violations())?;
        Ok(spec)
    }

    /// ダッシュボード仕様を読み込む（ステージは呼び出し側が指定）
    pub fn dashboard_spec(
        &self,
        block: &str,
        stage: &str,
        mode: ValidationMode,
    ) -> Result<DashboardSpec, ConfigError> {
        let raw: RawGatewayBlock = self.block(block)?;

        let mut violations = Vec::new();
        if raw.gw_name.trim().is_empty() {
            violations.push(SpecViolation::new("gw_name", "API name must not be empty"));
        }
        if raw.fn_name.trim().is_empty() {
            violations.push(SpecViolation::new("fn_name", "function name must not be empty"));
        }
        if stage.trim().is_empty() {
            violations.push(SpecViolation::new("stage", "stage must not be empty"));
        }
        check_violations(block, mode, violations)?;

        Ok(DashboardSpec {
            dashboard_name: raw
                .dashboard_name
                .unwrap_or_else(|| DEFAULT_DASHBOARD_NAME.to_string()),
            api_name: raw.gw_name,
            stage: stage.to_string(),
            function_name: raw.fn_name,
        })
    }

    /// 選択されたブロックからスタック構成を組み立てる
    pub fn stack_spec(
        &self,
        selection: &BlockSelection,
        stage: &str,
        mode: ValidationMode,
    ) -> Result<StackSpec, ConfigError> {
        Ok(StackSpec {
            description: None,
            table: selection
                .table
                .as_deref()
                .map(|block| self.table_spec(block, mode))
                .transpose()?,
            queue: selection
                .queue
                .as_deref()
                .map(|block| self.queue_spec(block, mode))
                .transpose()?,
            site: selection
                .site
                .as_deref()
                .map(|block| self.site_spec(block, mode))
                .transpose()?,
            dashboard: selection
                .gateway
                .as_deref()
                .map(|block| self.dashboard_spec(block, stage, mode))
                .transpose()?,
        })
    }
}

/// セレクター解決時のブロック名と検証モード
struct SelectorContext<'a> {
    block: &'a str,
    mode: ValidationMode,
}

impl SelectorContext<'_> {
    fn parse<S: Selector>(&self, key: &str, value: &str) -> Result<S, ConfigError> {
        S::parse(value, self.mode).map_err(|e| ConfigError::InvalidConfiguration {
            block: self.block.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// 整合性違反を検証モードに従って処理する
///
/// Lenientでは警告ログのみ、Strictでは最初の違反をエラーとして返す。
fn check_violations(
    block: &str,
    mode: ValidationMode,
    violations: Vec<SpecViolation>,
) -> Result<(), ConfigError> {
    if mode.is_strict() {
        if let Some(violation) = violations.into_iter().next() {
            return Err(ConfigError::InvalidConfiguration {
                block: block.to_string(),
                key: violation.key.to_string(),
                reason: violation.reason,
            });
        }
        return Ok(());
    }

    for violation in violations {
        warn!(
            block = %block,
            key = violation.key,
            reason = %violation.reason,
            "設定値の不整合を検出（lenientモードのため続行）"
        );
    }
    Ok(())
}
