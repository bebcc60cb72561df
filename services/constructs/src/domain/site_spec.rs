// 静的サイト構成
//
// S3コンテンツバケット・アクセスログバケット・CloudFrontディストリビューションの
// 設定値を保持するドメイン層コンポーネント。

use super::cdn_policy::{AllowedMethods, DistributionPriceClass, ViewerProtocol};
use super::validation::SpecViolation;

/// 静的サイト仕様
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSpec {
    /// コンテンツ配置用バケット名
    pub site_bucket_name: String,
    /// アクセスログ用バケット名
    pub access_logs_bucket_name: String,
    /// インデックスドキュメント（エラードキュメントとしても使用）
    pub index_document: String,
    /// オリジンアクセスアイデンティティのコメント
    pub origin_access_comment: String,
    /// ディストリビューション名（Nameタグ）
    pub distribution_name: String,
    pub allowed_methods: AllowedMethods,
    pub viewer_protocol: ViewerProtocol,
    pub price_class: DistributionPriceClass,
    /// ルートオブジェクト
    pub root_object: String,
    /// ディストリビューションのコメント
    pub distribution_comment: String,
    /// アクセスログのプレフィックス
    pub log_file_prefix: String,
    /// 配信を許可する国コード（ISO 3166-1 alpha-2）
    pub geo_whitelist: Vec<String>,
}

impl SiteSpec {
    /// 整合性違反を列挙
    pub fn violations(&self) -> Vec<SpecViolation> {
        let mut violations = Vec::new();

        if let Some(reason) = bucket_name_problem(&self.site_bucket_name) {
            violations.push(SpecViolation::new("static_site_bucket_name", reason));
        }
        if let Some(reason) = bucket_name_problem(&self.access_logs_bucket_name) {
            violations.push(SpecViolation::new("access_logs_bucket_name", reason));
        }
        if self.site_bucket_name == self.access_logs_bucket_name {
            violations.push(SpecViolation::new(
                "access_logs_bucket_name",
                "access log bucket must differ from the content bucket",
            ));
        }
        if self.index_document.trim().is_empty() {
            violations.push(SpecViolation::new(
                "website_index_document",
                "index document must not be empty",
            ));
        }
        if self.geo_whitelist.is_empty() {
            violations.push(SpecViolation::new(
                "geo_whitelist",
                "geo whitelist must name at least one country",
            ));
        }
        for code in &self.geo_whitelist {
            if !is_country_code(code) {
                violations.push(SpecViolation::new(
                    "geo_whitelist",
                    format!("{:?} is not a two-letter country code", code),
                ));
            }
        }

        violations
    }
}

/// 国コードが大文字2文字かどうか
pub fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// S3バケット名の命名規則違反を検出
///
/// 3-63文字、小文字英数字・ハイフン・ドットのみ、先頭末尾は英数字。
fn bucket_name_problem(name: &str) -> Option<String> {
    if !(3..=63).contains(&name.len()) {
        return Some(format!("bucket name {:?} must be 3-63 characters", name));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Some(format!("bucket name {:?} contains invalid characters", name));
    }
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Some(format!(
            "bucket name {:?} must start and end with a letter or digit",
            name
        ));
    }
    None
}
