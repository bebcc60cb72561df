/// CloudFormationテンプレート合成コマンド
///
/// コンテキストファイル（cdk.json形式）から有効なブロックを読み込み、
/// テーブル・キュー・静的サイト・ダッシュボードを含むテンプレートを出力する。
///
/// # 環境変数
/// - CONSTRUCTS_CONTEXT_FILE: コンテキストファイルのパス（デフォルト: cdk.json）
/// - CONSTRUCTS_STRICT: strict検証モード
/// - CONSTRUCTS_STAGE: API Gatewayのデプロイステージ（デフォルト: prod）
/// - LOG_FORMAT: ログ形式（json/compact）
/// - RUST_LOG: ログレベル
///
/// いずれもコマンドライン引数で上書き可能。
///
/// # 実行例
/// ```bash
/// # デフォルト名（db / queue / site / gateway）のブロックをすべて合成
/// cargo run --bin synth -- --context demos/cdk.json
///
/// # テーブルとキューだけをstrictモードで合成し、ファイルへ出力
/// cargo run --bin synth -- --db db --queue queue --strict --output cdk.out/stack.json
/// ```
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serverless_constructs::application::{StackSynthesizer, SynthError};
use serverless_constructs::infrastructure::{
    init_logging, write_template, BlockSelection, ConfigError, ContextDocument, LogFormat,
    SynthConfig, SynthConfigError, TemplateDestination, WriteError,
};
use thiserror::Error;
use tracing::{error, info};

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(name = "synth")]
#[command(about = "コンテキスト設定からCloudFormationテンプレートを合成")]
struct CliArgs {
    /// コンテキストファイルのパス
    /// 環境変数CONSTRUCTS_CONTEXT_FILEより優先される
    #[arg(long, short = 'c')]
    context: Option<PathBuf>,

    /// テーブルのブロック名
    #[arg(long)]
    db: Option<String>,

    /// キューのブロック名
    #[arg(long)]
    queue: Option<String>,

    /// 静的サイトのブロック名
    #[arg(long)]
    site: Option<String>,

    /// API Gateway（ダッシュボード）のブロック名
    /// ブロック名を1つも指定しない場合、dbブロックがなければダッシュボードは省略される
    #[arg(long)]
    gateway: Option<String>,

    /// API Gatewayのデプロイステージ
    #[arg(long)]
    stage: Option<String>,

    /// 不整合な設定値をエラーとして扱う
    #[arg(long)]
    strict: bool,

    /// テンプレートの説明
    #[arg(long)]
    description: Option<String>,

    /// 出力ファイル（省略時は標準出力）
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// ログ形式（json/compact）
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl CliArgs {
    /// コマンドラインで指定されたブロック名
    fn explicit_selection(&self) -> BlockSelection {
        BlockSelection {
            table: self.db.clone(),
            queue: self.queue.clone(),
            site: self.site.clone(),
            gateway: self.gateway.clone(),
        }
    }
}

/// コマンド全体のエラー型
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Settings(#[from] SynthConfigError),

    #[error(transparent)]
    Context(#[from] ConfigError),

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config = match SynthConfig::from_env() {
        Ok(config) => config
            .with_context_file(args.context.clone())
            .with_strict(args.strict)
            .with_stage(args.stage.clone())
            .with_log_format(args.log_format),
        Err(e) => {
            init_logging(args.log_format.unwrap_or_default());
            error!(error = %e, "設定の読み込みに失敗");
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.log_format());

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "テンプレート合成に失敗");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs, config: &SynthConfig) -> Result<(), CliError> {
    info!(
        context_file = %config.context_file().display(),
        validation_mode = ?config.validation_mode(),
        stage = %config.stage(),
        "テンプレート合成開始"
    );

    let document = ContextDocument::from_path(config.context_file())?;
    let selection = document.selection(args.explicit_selection());
    info!(selection = ?selection, "合成対象ブロック");

    let mut spec = document.stack_spec(&selection, config.stage(), config.validation_mode())?;
    spec.description = args.description.clone();

    let stack = StackSynthesizer::new().synthesize(&spec)?;
    write_template(
        &stack.template,
        &TemplateDestination::from_option(args.output.clone()),
    )?;

    Ok(())
}
