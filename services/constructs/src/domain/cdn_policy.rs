// CloudFrontポリシー選択
//
// コンテキストで指定されるCloudFrontの許可メソッド・ビューアープロトコル・価格クラスを
// 閉じた列挙型として扱う。各セレクターは2つの名前付き特例と1つのデフォルトからなる。

use aws_sdk_cloudfront::types::{Method, PriceClass, ViewerProtocolPolicy};

use super::validation::Selector;

/// デフォルトキャッシュビヘイビアで許可するHTTPメソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedMethods {
    /// GET, HEAD
    GetHead,
    /// GET, HEAD, OPTIONS
    GetHeadOptions,
    /// 全メソッド（デフォルト）
    All,
}

impl AllowedMethods {
    /// 許可するメソッドの一覧
    pub fn methods(self) -> Vec<Method> {
        match self {
            AllowedMethods::GetHead => vec![Method::Get, Method::Head],
            AllowedMethods::GetHeadOptions => vec![Method::Get, Method::Head, Method::Options],
            AllowedMethods::All => vec![
                Method::Get,
                Method::Head,
                Method::Options,
                Method::Put,
                Method::Patch,
                Method::Post,
                Method::Delete,
            ],
        }
    }

    /// キャッシュ対象のメソッド（常にGET, HEAD）
    pub fn cached_methods(self) -> Vec<Method> {
        vec![Method::Get, Method::Head]
    }
}

impl Selector for AllowedMethods {
    const KIND: &'static str = "allowed methods";
    const ACCEPTED: &'static [&'static str] =
        &["ALLOW_GET_HEAD", "ALLOW_GET_HEAD_OPTIONS", "ALLOW_ALL"];

    fn recognize(value: &str) -> Option<Self> {
        match value {
            "ALLOW_GET_HEAD" => Some(AllowedMethods::GetHead),
            "ALLOW_GET_HEAD_OPTIONS" => Some(AllowedMethods::GetHeadOptions),
            "ALLOW_ALL" => Some(AllowedMethods::All),
            _ => None,
        }
    }

    fn fallback() -> Self {
        AllowedMethods::All
    }
}

/// ビューアープロトコルポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerProtocol {
    RedirectToHttps,
    HttpsOnly,
    /// HTTP/HTTPS両方を許可（デフォルト）
    AllowAll,
}

impl ViewerProtocol {
    pub fn to_sdk(self) -> ViewerProtocolPolicy {
        match self {
            ViewerProtocol::RedirectToHttps => ViewerProtocolPolicy::RedirectToHttps,
            ViewerProtocol::HttpsOnly => ViewerProtocolPolicy::HttpsOnly,
            ViewerProtocol::AllowAll => ViewerProtocolPolicy::AllowAll,
        }
    }
}

impl Selector for ViewerProtocol {
    const KIND: &'static str = "viewer protocol";
    const ACCEPTED: &'static [&'static str] = &["REDIRECT_TO_HTTPS", "HTTPS_ONLY", "ALLOW_ALL"];

    fn recognize(value: &str) -> Option<Self> {
        match value {
            "REDIRECT_TO_HTTPS" => Some(ViewerProtocol::RedirectToHttps),
            "HTTPS_ONLY" => Some(ViewerProtocol::HttpsOnly),
            "ALLOW_ALL" => Some(ViewerProtocol::AllowAll),
            _ => None,
        }
    }

    fn fallback() -> Self {
        ViewerProtocol::AllowAll
    }
}

/// ディストリビューションの価格クラス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionPriceClass {
    All,
    Class200,
    /// 北米・欧州のみ（デフォルト）
    Class100,
}

impl DistributionPriceClass {
    pub fn to_sdk(self) -> PriceClass {
        match self {
            DistributionPriceClass::All => PriceClass::PriceClassAll,
            DistributionPriceClass::Class200 => PriceClass::PriceClass200,
            DistributionPriceClass::Class100 => PriceClass::PriceClass100,
        }
    }
}

impl Selector for DistributionPriceClass {
    const KIND: &'static str = "price class";
    const ACCEPTED: &'static [&'static str] =
        &["PRICE_CLASS_ALL", "PRICE_CLASS_200", "PRICE_CLASS_100"];

    fn recognize(value: &str) -> Option<Self> {
        match value {
            "PRICE_CLASS_ALL" => Some(DistributionPriceClass::All),
            "PRICE_CLASS_200" => Some(DistributionPriceClass::Class200),
            "PRICE_CLASS_100" => Some(DistributionPriceClass::Class100),
            _ => None,
        }
    }

    fn fallback() -> Self {
        DistributionPriceClass::Class100
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::ValidationMode;

    fn method_names(methods: Vec<Method>) -> Vec<String> {
        methods.iter().map(|m| m.as_str().to_string()).collect()
    }

    // ==================== 許可メソッド ====================

    #[test]
    fn test_allowed_methods_named_cases() {
        assert_eq!(
            AllowedMethods::parse("ALLOW_GET_HEAD", ValidationMode::Lenient).unwrap(),
            AllowedMethods::GetHead
        );
        assert_eq!(
            AllowedMethods::parse("ALLOW_GET_HEAD_OPTIONS", ValidationMode::Lenient).unwrap(),
            AllowedMethods::GetHeadOptions
        );
    }

    #[test]
    fn test_allowed_methods_fallback() {
        assert_eq!(
            AllowedMethods::parse("ALLOW_SOME", ValidationMode::Lenient).unwrap(),
            AllowedMethods::All
        );
        assert_eq!(
            AllowedMethods::parse("", ValidationMode::Lenient).unwrap(),
            AllowedMethods::All
        );
        assert!(AllowedMethods::parse("ALLOW_SOME", ValidationMode::Strict).is_err());
    }

    #[test]
    fn test_allowed_methods_lists() {
        assert_eq!(method_names(AllowedMethods::GetHead.methods()), vec!["GET", "HEAD"]);
        assert_eq!(
            method_names(AllowedMethods::GetHeadOptions.methods()),
            vec!["GET", "HEAD", "OPTIONS"]
        );
        assert_eq!(AllowedMethods::All.methods().len(), 7);
        assert_eq!(
            method_names(AllowedMethods::All.cached_methods()),
            vec!["GET", "HEAD"]
        );
    }

    // ==================== ビューアープロトコル ====================

    #[test]
    fn test_viewer_protocol_selector() {
        assert_eq!(
            ViewerProtocol::parse("REDIRECT_TO_HTTPS", ValidationMode::Lenient).unwrap(),
            ViewerProtocol::RedirectToHttps
        );
        assert_eq!(
            ViewerProtocol::parse("HTTPS_ONLY", ValidationMode::Lenient).unwrap(),
            ViewerProtocol::HttpsOnly
        );
        assert_eq!(
            ViewerProtocol::parse("https-only", ValidationMode::Lenient).unwrap(),
            ViewerProtocol::AllowAll
        );
    }

    #[test]
    fn test_viewer_protocol_to_sdk() {
        assert_eq!(
            ViewerProtocol::RedirectToHttps.to_sdk().as_str(),
            "redirect-to-https"
        );
        assert_eq!(ViewerProtocol::HttpsOnly.to_sdk().as_str(), "https-only");
        assert_eq!(ViewerProtocol::AllowAll.to_sdk().as_str(), "allow-all");
    }

    // ==================== 価格クラス ====================

    #[test]
    fn test_price_class_selector() {
        assert_eq!(
            DistributionPriceClass::parse("PRICE_CLASS_ALL", ValidationMode::Lenient).unwrap(),
            DistributionPriceClass::All
        );
        assert_eq!(
            DistributionPriceClass::parse("PRICE_CLASS_200", ValidationMode::Lenient).unwrap(),
            DistributionPriceClass::Class200
        );
        assert_eq!(
            DistributionPriceClass::parse("PRICE_CLASS_300", ValidationMode::Lenient).unwrap(),
            DistributionPriceClass::Class100
        );
    }

    #[test]
    fn test_price_class_to_sdk() {
        assert_eq!(DistributionPriceClass::All.to_sdk().as_str(), "PriceClass_All");
        assert_eq!(DistributionPriceClass::Class200.to_sdk().as_str(), "PriceClass_200");
        assert_eq!(DistributionPriceClass::Class100.to_sdk().as_str(), "PriceClass_100");
    }
}
