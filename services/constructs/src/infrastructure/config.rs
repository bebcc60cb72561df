/// 合成ツール設定
///
/// 環境変数から読み込み、コマンドライン引数で上書きする。
use std::path::PathBuf;

use thiserror::Error;

use super::logging::LogFormat;
use crate::domain::ValidationMode;

/// 環境変数名
pub const CONTEXT_FILE_ENV: &str = "CONSTRUCTS_CONTEXT_FILE";
pub const STRICT_ENV: &str = "CONSTRUCTS_STRICT";
pub const STAGE_ENV: &str = "CONSTRUCTS_STAGE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// デフォルト値
pub const DEFAULT_CONTEXT_FILE: &str = "cdk.json";
pub const DEFAULT_STAGE: &str = "prod";

/// 設定のエラー型
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SynthConfigError {
    #[error("Invalid value for environment variable {name}: {value:?}")]
    InvalidEnvVar { name: String, value: String },
}

/// 合成ツール設定
///
/// 以下の環境変数から読み込む（いずれも任意）:
/// - CONSTRUCTS_CONTEXT_FILE: コンテキストファイルのパス（デフォルト: cdk.json）
/// - CONSTRUCTS_STRICT: strict検証モード（true/false/1/0）
/// - CONSTRUCTS_STAGE: API Gatewayのデプロイステージ（デフォルト: prod）
/// - LOG_FORMAT: ログ形式（json/compact）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    context_file: PathBuf,
    validation_mode: ValidationMode,
    stage: String,
    log_format: LogFormat,
}

impl SynthConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, SynthConfigError> {
        let context_file = std::env::var(CONTEXT_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONTEXT_FILE));

        let strict = match std::env::var(STRICT_ENV) {
            Ok(value) => parse_flag(STRICT_ENV, &value)?,
            Err(_) => false,
        };

        let stage = std::env::var(STAGE_ENV).unwrap_or_else(|_| DEFAULT_STAGE.to_string());

        let log_format = match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) => value.parse::<LogFormat>().map_err(|_| SynthConfigError::InvalidEnvVar {
                name: LOG_FORMAT_ENV.to_string(),
                value,
            })?,
            Err(_) => LogFormat::default(),
        };

        Ok(Self {
            context_file,
            validation_mode: ValidationMode::from_strict_flag(strict),
            stage,
            log_format,
        })
    }

    /// 明示的な値で設定を作成（テスト用）
    pub fn new(
        context_file: impl Into<PathBuf>,
        validation_mode: ValidationMode,
        stage: impl Into<String>,
        log_format: LogFormat,
    ) -> Self {
        Self {
            context_file: context_file.into(),
            validation_mode,
            stage: stage.into(),
            log_format,
        }
    }

    /// コンテキストファイルを上書き
    pub fn with_context_file(mut self, context_file: Option<PathBuf>) -> Self {
        if let Some(context_file) = context_file {
            self.context_file = context_file;
        }
        self
    }

    /// strictモードを有効化（無効化はしない）
    pub fn with_strict(mut self, strict: bool) -> Self {
        if strict {
            self.validation_mode = ValidationMode::Strict;
        }
        self
    }

    /// ステージを上書き
    pub fn with_stage(mut self, stage: Option<String>) -> Self {
        if let Some(stage) = stage {
            self.stage = stage;
        }
        self
    }

    /// ログ形式を上書き
    pub fn with_log_format(mut self, log_format: Option<LogFormat>) -> Self {
        if let Some(log_format) = log_format {
            self.log_format = log_format;
        }
        self
    }

    pub fn context_file(&self) -> &PathBuf {
        &self.context_file
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, SynthConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(SynthConfigError::InvalidEnvVar {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // テストで環境変数を設定/削除するヘルパー
    // 安全性: serial属性で環境変数を扱うテストを直列化している
    unsafe fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    unsafe fn cleanup() {
        unsafe {
            remove_env(CONTEXT_FILE_ENV);
            remove_env(STRICT_ENV);
            remove_env(STAGE_ENV);
            remove_env(LOG_FORMAT_ENV);
        }
    }

    // ==================== 環境変数読み込み ====================

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        unsafe { cleanup() };

        let config = SynthConfig::from_env().unwrap();
        assert_eq!(config.context_file(), &PathBuf::from("cdk.json"));
        assert_eq!(config.validation_mode(), ValidationMode::Lenient);
        assert_eq!(config.stage(), "prod");
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_from_env_values() {
        unsafe {
            cleanup();
            set_env(CONTEXT_FILE_ENV, "/tmp/context.json");
            set_env(STRICT_ENV, "true");
            set_env(STAGE_ENV, "dev");
            set_env(LOG_FORMAT_ENV, "compact");
        }

        let config = SynthConfig::from_env().unwrap();
        assert_eq!(config.context_file(), &PathBuf::from("/tmp/context.json"));
        assert_eq!(config.validation_mode(), ValidationMode::Strict);
        assert_eq!(config.stage(), "dev");
        assert_eq!(config.log_format(), LogFormat::Compact);

        unsafe { cleanup() };
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_strict_flag() {
        unsafe {
            cleanup();
            set_env(STRICT_ENV, "sometimes");
        }

        assert_eq!(
            SynthConfig::from_env(),
            Err(SynthConfigError::InvalidEnvVar {
                name: STRICT_ENV.to_string(),
                value: "sometimes".to_string(),
            })
        );

        unsafe { cleanup() };
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_log_format() {
        unsafe {
            cleanup();
            set_env(LOG_FORMAT_ENV, "xml");
        }

        assert!(matches!(
            SynthConfig::from_env(),
            Err(SynthConfigError::InvalidEnvVar { name, .. }) if name == LOG_FORMAT_ENV
        ));

        unsafe { cleanup() };
    }

    // ==================== 上書き ====================

    #[test]
    fn test_overrides() {
        let config = SynthConfig::new("cdk.json", ValidationMode::Lenient, "prod", LogFormat::Json)
            .with_context_file(Some(PathBuf::from("other.json")))
            .with_strict(true)
            .with_stage(Some("staging".to_string()))
            .with_log_format(Some(LogFormat::Compact));

        assert_eq!(config.context_file(), &PathBuf::from("other.json"));
        assert_eq!(config.validation_mode(), ValidationMode::Strict);
        assert_eq!(config.stage(), "staging");
        assert_eq!(config.log_format(), LogFormat::Compact);
    }

    #[test]
    fn test_absent_overrides_keep_values() {
        let config = SynthConfig::new("cdk.json", ValidationMode::Strict, "prod", LogFormat::Json)
            .with_context_file(None)
            .with_strict(false)
            .with_stage(None)
            .with_log_format(None);

        assert_eq!(config.context_file(), &PathBuf::from("cdk.json"));
        assert_eq!(config.validation_mode(), ValidationMode::Strict);
        assert_eq!(config.stage(), "prod");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("X", "1"), Ok(true));
        assert_eq!(parse_flag("X", "TRUE"), Ok(true));
        assert_eq!(parse_flag("X", "no"), Ok(false));
        assert!(parse_flag("X", "maybe").is_err());
    }
}
