/// テンプレート出力
///
/// 合成したテンプレートを整形済みJSONとして標準出力またはファイルへ書き出す。
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::domain::Template;

/// 出力のエラー型
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to serialize template: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write template to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 出力先
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateDestination {
    Stdout,
    File(PathBuf),
}

impl TemplateDestination {
    /// パス指定があればファイル、なければ標準出力
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => TemplateDestination::File(path),
            None => TemplateDestination::Stdout,
        }
    }
}

/// テンプレートを書き出す
pub fn write_template(template: &Template, destination: &TemplateDestination) -> Result<(), WriteError> {
    let mut json = template.to_json_pretty()?;
    json.push('\n');

    match destination {
        TemplateDestination::Stdout => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(json.as_bytes())
                .and_then(|_| handle.flush())
                .map_err(|source| WriteError::Io {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
        TemplateDestination::File(path) => {
            write_file(path, &json)?;
            info!(
                path = %path.display(),
                bytes = json.len(),
                resources = template.resource_count(),
                "テンプレート書き出し完了"
            );
        }
    }

    Ok(())
}

fn write_file(path: &Path, json: &str) -> Result<(), WriteError> {
    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, json).map_err(io_error)
}
