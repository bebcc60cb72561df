/// ログ基盤モジュール
///
/// 合成ツール向けの構造化ログ設定を提供する。
/// テンプレートを標準出力へ書き出せるよう、ログは標準エラー出力へ出す。
use std::str::FromStr;
use std::sync::Once;

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// ログサブスクライバー初期化用の同期プリミティブ
static INIT: Once = Once::new();

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON形式（ログ収集基盤向け）
    #[default]
    Json,
    /// 人間が読みやすい1行形式
    Compact,
}

/// 未知のログ形式
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log format: {0} (expected json or compact)")]
pub struct UnknownLogFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "compact" | "text" => Ok(LogFormat::Compact),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

/// ログサブスクライバーを初期化する
///
/// 環境変数`RUST_LOG`またはデフォルトのログレベル（info）でフィルタリングを行う。
/// この関数は複数回呼び出しても安全で、最初の呼び出しのみ初期化を実行する。
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = build_subscriber(format, env_filter, std::io::stderr);

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Failed to install log subscriber: {}", e);
        }
    });
}

/// 出力形式とフィルタ、書き込み先からサブスクライバーを組み立てる
fn build_subscriber<W>(
    format: LogFormat,
    env_filter: EnvFilter,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .flatten_event(true)
                .with_current_span(false);

            Box::new(tracing_subscriber::registry().with(env_filter).with(json_layer))
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(false)
                .compact();

            Box::new(tracing_subscriber::registry().with(env_filter).with(fmt_layer))
        }
    }
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
#[cfg(test)]
pub fn init_test_logging() {
    use tracing_subscriber::util::SubscriberInitExt;

    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}
