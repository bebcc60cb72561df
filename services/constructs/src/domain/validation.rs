// 設定値の検証
//
// コンテキストに文字列で書かれた選択値（課金モード、キー型、CloudFrontポリシー等）を
// 閉じた列挙型へ変換する仕組みと、仕様間の整合性違反の表現。

use thiserror::Error;
use tracing::warn;

/// 設定値検証モード
///
/// - `Lenient`: 未知の値はデフォルトへフォールバックし、不整合な指定は警告ログのみで無視する
/// - `Strict`: 未知の値や不整合な指定を`InvalidConfiguration`として拒否する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Lenient,
    Strict,
}

impl ValidationMode {
    /// strictフラグから検証モードを決定
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            ValidationMode::Strict
        } else {
            ValidationMode::Lenient
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, ValidationMode::Strict)
    }
}

/// セレクター値が認識できない場合のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported {kind} value: {value:?} (expected one of: {expected})")]
pub struct SelectorError {
    /// セレクターの種類（例: "allowed methods"）
    pub kind: &'static str,
    /// 指定された値
    pub value: String,
    /// 受け付ける値の一覧（カンマ区切り）
    pub expected: String,
}

/// 仕様の整合性違反
///
/// どのコンテキストキーに起因するかと理由を保持する。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{key}: {reason}")]
pub struct SpecViolation {
    pub key: &'static str,
    pub reason: String,
}

impl SpecViolation {
    pub fn new(key: &'static str, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
        }
    }
}

/// 文字列から閉じた列挙型への変換
///
/// `recognize`は名前付きの値すべてを認識する。`fallback`は認識できない値に
/// 対して使われるデフォルト値。
pub trait Selector: Sized + Copy {
    /// ログやエラーに使うセレクター名
    const KIND: &'static str;

    /// 受け付ける文字列の一覧
    const ACCEPTED: &'static [&'static str];

    /// 名前付きの値を認識
    fn recognize(value: &str) -> Option<Self>;

    /// 認識できない値に対するデフォルト
    fn fallback() -> Self;

    /// 検証モードに従って解決する
    ///
    /// `Strict`では認識できない値を`SelectorError`として返す。
    /// `Lenient`ではデフォルトへフォールバックし警告ログを出力する。
    fn parse(value: &str, mode: ValidationMode) -> Result<Self, SelectorError> {
        if let Some(selected) = Self::recognize(value) {
            return Ok(selected);
        }
        if mode.is_strict() {
            return Err(SelectorError {
                kind: Self::KIND,
                value: value.to_string(),
                expected: Self::ACCEPTED.join(", "),
            });
        }
        warn!(
            kind = Self::KIND,
            value = %value,
            "Unrecognized selector value, falling back to default"
        );
        Ok(Self::fallback())
    }
}
