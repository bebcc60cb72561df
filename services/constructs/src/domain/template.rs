// CloudFormationテンプレートモデル
//
// マッパーが宣言したリソースと出力値を保持し、
// JSONテンプレートとしてシリアライズするドメイン層コンポーネント。

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::intrinsic::collect_references;

/// テンプレートフォーマットバージョン（固定値）
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// テンプレート組み立て時のエラー型
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// 同じ論理IDのリソースまたは出力が既に宣言されている
    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(String),
    /// 未宣言のリソースを参照している
    #[error("{source_id} references undeclared resource: {target}")]
    UnresolvedReference { source_id: String, target: String },
}

/// テンプレート内でリソースを識別する論理ID
///
/// 英数字のみで構成される。構成要素を連結し、
/// 各要素の先頭を大文字にして生成する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalId(String);

impl LogicalId {
    /// 構成要素から論理IDを生成
    ///
    /// 英数字以外の文字は区切りとして扱い、区切り直後の文字を大文字にする。
    /// 例: `["site", "my-bucket.logs"]` → `SiteMyBucketLogs`
    pub fn new(parts: &[&str]) -> Self {
        let mut id = String::new();
        for part in parts {
            let mut upper_next = true;
            for c in part.chars() {
                if c.is_ascii_alphanumeric() {
                    if upper_next {
                        id.push(c.to_ascii_uppercase());
                        upper_next = false;
                    } else {
                        id.push(c);
                    }
                } else {
                    upper_next = true;
                }
            }
        }
        Self(id)
    }

    /// 論理IDの文字列表現を取得
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LogicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// リソース削除・置換時のポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeletionPolicy {
    Delete,
}

/// テンプレートに宣言される単一リソース
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    /// リソースタイプ（例: `AWS::SQS::Queue`）
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// リソースプロパティ
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl Resource {
    /// 指定タイプの空リソースを作成
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    /// プロパティを設定
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// 値がある場合のみプロパティを設定
    pub fn optional_property(self, name: impl Into<String>, value: Option<Value>) -> Self {
        match value {
            Some(value) => self.property(name, value),
            None => self,
        }
    }

    /// 削除ポリシーと置換ポリシーを同時に設定
    pub fn removal_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }

    /// プロパティ値を取得
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        for value in self.properties.values() {
            collect_references(value, &mut out);
        }
        out
    }
}

/// テンプレートの出力値
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Output {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// CloudFormationテンプレート
///
/// リソースと出力値は宣言順に保持される。
/// 宣言時点で参照先リソースが存在することを検証するため、
/// 参照される側のリソースは必ず先に宣言しなければならない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    description: Option<String>,
    resources: Vec<(LogicalId, Resource)>,
    outputs: Vec<(LogicalId, Output)>,
}

impl Template {
    /// 空のテンプレートを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// テンプレートの説明を設定
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// リソースを宣言
    ///
    /// # Errors
    /// - 論理IDが重複している場合は`DuplicateLogicalId`
    /// - 未宣言のリソースを参照している場合は`UnresolvedReference`
    pub fn add_resource(
        &mut self,
        logical_id: LogicalId,
        resource: Resource,
    ) -> Result<(), TemplateError> {
        if self.contains(&logical_id) {
            return Err(TemplateError::DuplicateLogicalId(logical_id.to_string()));
        }
        for target in resource.references() {
            if !self.has_resource(&target) {
                return Err(TemplateError::UnresolvedReference {
                    source_id: logical_id.to_string(),
                    target,
                });
            }
        }
        self.resources.push((logical_id, resource));
        Ok(())
    }

    /// 出力値を宣言
    ///
    /// 出力値が参照するリソースも宣言済みである必要がある。
    pub fn add_output(&mut self, logical_id: LogicalId, output: Output) -> Result<(), TemplateError> {
        if self.outputs.iter().any(|(id, _)| *id == logical_id) {
            return Err(TemplateError::DuplicateLogicalId(logical_id.to_string()));
        }
        let mut targets = Vec::new();
        collect_references(&output.value, &mut targets);
        for target in targets {
            if !self.has_resource(&target) {
                return Err(TemplateError::UnresolvedReference {
                    source_id: logical_id.to_string(),
                    target,
                });
            }
        }
        self.outputs.push((logical_id, output));
        Ok(())
    }

    fn contains(&self, logical_id: &LogicalId) -> bool {
        self.resources.iter().any(|(id, _)| id == logical_id)
    }

    fn has_resource(&self, logical_id: &str) -> bool {
        self.resources.iter().any(|(id, _)| id.as_str() == logical_id)
    }

    /// 論理IDでリソースを取得
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|(id, _)| id.as_str() == logical_id)
            .map(|(_, resource)| resource)
    }

    /// 宣言順にリソースを列挙
    pub fn resources(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter().map(|(id, resource)| (id, resource))
    }

    /// 指定タイプのリソースを宣言順に列挙
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> + 'a {
        self.resources()
            .filter(move |(_, resource)| resource.resource_type == resource_type)
    }

    /// 宣言済みリソースの論理IDにおける位置を取得
    pub fn position_of(&self, logical_id: &str) -> Option<usize> {
        self.resources
            .iter()
            .position(|(id, _)| id.as_str() == logical_id)
    }

    /// 論理IDで出力値を取得
    pub fn output(&self, logical_id: &str) -> Option<&Output> {
        self.outputs
            .iter()
            .find(|(id, _)| id.as_str() == logical_id)
            .map(|(_, output)| output)
    }

    /// 宣言順に出力値を列挙
    pub fn outputs(&self) -> impl Iterator<Item = (&LogicalId, &Output)> {
        self.outputs.iter().map(|(id, output)| (id, output))
    }

    /// リソース数
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// JSON値に変換
    pub fn to_value(&self) -> Value {
        // Serializeの実装はmap/文字列のみを出力するため失敗しない
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// 整形済みJSON文字列に変換
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// 宣言順を保ったままmapとして出力するためのラッパー
struct OrderedEntries<'a, T>(&'a [(LogicalId, T)]);

impl<T: Serialize> Serialize for OrderedEntries<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, entry) in self.0 {
            map.serialize_entry(id.as_str(), entry)?;
        }
        map.end()
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut len = 2;
        if self.description.is_some() {
            len += 1;
        }
        if !self.outputs.is_empty() {
            len += 1;
        }

        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("AWSTemplateFormatVersion", TEMPLATE_FORMAT_VERSION)?;
        if let Some(description) = &self.description {
            map.serialize_entry("Description", description)?;
        }
        map.serialize_entry("Resources", &OrderedEntries(&self.resources))?;
        if !self.outputs.is_empty() {
            map.serialize_entry("Outputs", &OrderedEntries(&self.outputs))?;
        }
        map.end()
    }
}
