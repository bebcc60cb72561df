//! 静的サイトマッパー
//!
//! S3コンテンツバケット・アクセスログバケット・CloudFrontディストリビューションを宣言する。
//! コンテンツバケットはオリジンアクセスアイデンティティ（OAI）経由でのみ読み取り可能とし、
//! 直接のパブリックアクセスはブロックする。
//!
//! 宣言順: ログバケット → コンテンツバケット → OAI → バケットポリシー → ディストリビューション

use aws_sdk_cloudfront::types::{GeoRestrictionType, HttpVersion, Method};
use aws_sdk_s3::types::{BucketVersioningStatus, ObjectOwnership, ServerSideEncryption};
use serde_json::{json, Value};
use tracing::info;

use crate::domain::intrinsic::{get_att, ref_to, sub};
use crate::domain::{DeletionPolicy, LogicalId, Output, Resource, SiteSpec, Template, TemplateError};

/// CloudFrontマネージドキャッシュポリシー「CachingOptimized」
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

/// OAIに許可するS3アクション
pub const OAI_READ_ACTIONS: &[&str] = &["s3:GetBucket*", "s3:GetObject*", "s3:List*"];

/// 出力名
pub const DISTRIBUTION_OUTPUT: &str = "CloudfrontDistribution";
pub const BUCKET_ARN_OUTPUT: &str = "BucketArn";
pub const LOGGING_BUCKET_ARN_OUTPUT: &str = "LoggingBucketArn";

/// 構成内の論理ID（物理名に依存しない）
const ACCESS_LOGS_BUCKET_ID: &str = "AccessLogsBucket";
const SOURCE_BUCKET_ID: &str = "SourceBucket";
const ORIGIN_ACCESS_IDENTITY_ID: &str = "AccessOriginOAI";
const SOURCE_BUCKET_POLICY_ID: &str = "SourceBucketPolicy";
const DISTRIBUTION_ID: &str = "Distribution";

/// 宣言されたバケットへのハンドル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketHandle {
    pub logical_id: LogicalId,
    pub bucket_name: String,
}

impl BucketHandle {
    pub fn arn(&self) -> Value {
        get_att(self.logical_id.as_str(), "Arn")
    }

    pub fn regional_domain_name(&self) -> Value {
        get_att(self.logical_id.as_str(), "RegionalDomainName")
    }
}

/// 宣言されたディストリビューションへのハンドル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionHandle {
    pub logical_id: LogicalId,
}

impl DistributionHandle {
    pub fn domain_name(&self) -> Value {
        get_att(self.logical_id.as_str(), "DomainName")
    }
}

/// 静的サイトマッパーの出力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSiteConstruct {
    pub source_bucket: BucketHandle,
    pub access_logs_bucket: BucketHandle,
    pub origin_access_identity: LogicalId,
    pub distribution: DistributionHandle,
}

/// 静的サイトマッパー
pub struct StaticSiteMapper {
    scope: String,
}

impl StaticSiteMapper {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    /// サイト仕様をテンプレートへ展開する
    pub fn map(&self, spec: &SiteSpec, template: &mut Template) -> Result<StaticSiteConstruct, TemplateError> {
        info!(
            bucket = %spec.site_bucket_name,
            access_logs_bucket = %spec.access_logs_bucket_name,
            allowed_methods = ?spec.allowed_methods,
            viewer_protocol = spec.viewer_protocol.to_sdk().as_str(),
            price_class = spec.price_class.to_sdk().as_str(),
            "静的サイト宣言開始"
        );

        // アクセスログ用バケット（CloudFrontのログ配信にはACLが必要）
        let logs_id = LogicalId::new(&[&self.scope, ACCESS_LOGS_BUCKET_ID]);
        let logs_bucket = base_bucket(&spec.access_logs_bucket_name).property(
            "OwnershipControls",
            json!({ "Rules": [{ "ObjectOwnership": ObjectOwnership::ObjectWriter.as_str() }] }),
        );
        template.add_resource(logs_id.clone(), logs_bucket)?;
        let access_logs_bucket = BucketHandle {
            logical_id: logs_id,
            bucket_name: spec.access_logs_bucket_name.clone(),
        };

        // コンテンツ用バケット（バージョニング有効、Webサイト設定付き）
        let source_id = LogicalId::new(&[&self.scope, SOURCE_BUCKET_ID]);
        let source_bucket = base_bucket(&spec.site_bucket_name)
            .property(
                "VersioningConfiguration",
                json!({ "Status": BucketVersioningStatus::Enabled.as_str() }),
            )
            .property(
                "WebsiteConfiguration",
                json!({
                    "IndexDocument": spec.index_document,
                    "ErrorDocument": spec.index_document,
                }),
            );
        template.add_resource(source_id.clone(), source_bucket)?;
        let source_bucket = BucketHandle {
            logical_id: source_id,
            bucket_name: spec.site_bucket_name.clone(),
        };

        // オリジンアクセスアイデンティティ
        let oai_id = LogicalId::new(&[&self.scope, ORIGIN_ACCESS_IDENTITY_ID]);
        let oai = Resource::new("AWS::CloudFront::CloudFrontOriginAccessIdentity").property(
            "CloudFrontOriginAccessIdentityConfig",
            json!({ "Comment": spec.origin_access_comment }),
        );
        template.add_resource(oai_id.clone(), oai)?;

        // バケットポリシー: OAIの正規ユーザーにのみ読み取りを許可
        let policy_id = LogicalId::new(&[&self.scope, SOURCE_BUCKET_POLICY_ID]);
        let policy = Resource::new("AWS::S3::BucketPolicy")
            .property("Bucket", ref_to(source_bucket.logical_id.as_str()))
            .property(
                "PolicyDocument",
                json!({
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": OAI_READ_ACTIONS,
                        "Resource": [
                            source_bucket.arn(),
                            sub(format!("${{{}.Arn}}/*", source_bucket.logical_id)),
                        ],
                        "Principal": {
                            "CanonicalUser": get_att(oai_id.as_str(), "S3CanonicalUserId"),
                        },
                    }],
                }),
            );
        template.add_resource(policy_id, policy)?;

        // ディストリビューション
        let origin_id = format!("{}Origin", source_bucket.logical_id);
        let distribution_id = LogicalId::new(&[&self.scope, DISTRIBUTION_ID]);
        let geo_restriction = if spec.geo_whitelist.is_empty() {
            json!({ "RestrictionType": GeoRestrictionType::None.as_str() })
        } else {
            json!({
                "RestrictionType": GeoRestrictionType::Whitelist.as_str(),
                "Locations": spec.geo_whitelist,
            })
        };
        let distribution = Resource::new("AWS::CloudFront::Distribution").property(
            "DistributionConfig",
            json!({
                "Enabled": true,
                "Comment": spec.distribution_comment,
                "DefaultRootObject": spec.root_object,
                "HttpVersion": HttpVersion::Http2.as_str(),
                "IPV6Enabled": true,
                "PriceClass": spec.price_class.to_sdk().as_str(),
                "Origins": [{
                    "Id": origin_id,
                    "DomainName": source_bucket.regional_domain_name(),
                    "S3OriginConfig": {
                        "OriginAccessIdentity": sub(format!(
                            "origin-access-identity/cloudfront/${{{}}}",
                            oai_id
                        )),
                    },
                }],
                "DefaultCacheBehavior": {
                    "TargetOriginId": origin_id,
                    "ViewerProtocolPolicy": spec.viewer_protocol.to_sdk().as_str(),
                    "AllowedMethods": method_names(&spec.allowed_methods.methods()),
                    "CachedMethods": method_names(&spec.allowed_methods.cached_methods()),
                    "CachePolicyId": CACHING_OPTIMIZED_POLICY_ID,
                    "Compress": true,
                },
                "Logging": {
                    "Bucket": access_logs_bucket.regional_domain_name(),
                    "IncludeCookies": false,
                    "Prefix": spec.log_file_prefix,
                },
                "Restrictions": { "GeoRestriction": geo_restriction },
            }),
        )
        .property("Tags", json!([{ "Key": "Name", "Value": spec.distribution_name }]));
        template.add_resource(distribution_id.clone(), distribution)?;
        let distribution = DistributionHandle {
            logical_id: distribution_id,
        };

        // 出力値
        template.add_output(
            LogicalId::new(&[&self.scope, DISTRIBUTION_OUTPUT]),
            Output::new(distribution.domain_name()),
        )?;
        template.add_output(
            LogicalId::new(&[&self.scope, BUCKET_ARN_OUTPUT]),
            Output::new(source_bucket.arn()),
        )?;
        template.add_output(
            LogicalId::new(&[&self.scope, LOGGING_BUCKET_ARN_OUTPUT]),
            Output::new(access_logs_bucket.arn()),
        )?;

        Ok(StaticSiteConstruct {
            source_bucket,
            access_logs_bucket,
            origin_access_identity: oai_id,
            distribution,
        })
    }
}

fn method_names(methods: &[Method]) -> Vec<String> {
    methods.iter().map(|m| m.as_str().to_string()).collect()
}

/// KMS暗号化・パブリックアクセスブロック付きのバケット
fn base_bucket(bucket_name: &str) -> Resource {
    Resource::new("AWS::S3::Bucket")
        .property("BucketName", bucket_name)
        .property(
            "BucketEncryption",
            json!({
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": {
                        "SSEAlgorithm": ServerSideEncryption::AwsKms.as_str(),
                    },
                }],
            }),
        )
        .property(
            "PublicAccessBlockConfiguration",
            json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            }),
        )
        .removal_policy(DeletionPolicy::Delete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::site_spec::tests::spec;
    use crate::domain::{AllowedMethods, DistributionPriceClass, ViewerProtocol};

    fn map_spec(spec: &SiteSpec) -> (StaticSiteConstruct, Template) {
        let mut template = Template::new();
        let construct = StaticSiteMapper::new("Site").map(spec, &mut template).unwrap();
        (construct, template)
    }

    fn distribution_config(construct: &StaticSiteConstruct, template: &Template) -> Value {
        template
            .resource(construct.distribution.logical_id.as_str())
            .unwrap()
            .get("DistributionConfig")
            .unwrap()
            .clone()
    }

    // ==================== バケット ====================

    #[test]
    fn test_buckets_are_encrypted_and_private() {
        let (construct, template) = map_spec(&spec());

        for handle in [&construct.source_bucket, &construct.access_logs_bucket] {
            let bucket = template.resource(handle.logical_id.as_str()).unwrap();
            assert_eq!(
                bucket.get("BucketEncryption").unwrap()["ServerSideEncryptionConfiguration"][0]
                    ["ServerSideEncryptionByDefault"]["SSEAlgorithm"],
                "aws:kms"
            );
            assert_eq!(
                bucket.get("PublicAccessBlockConfiguration").unwrap()["RestrictPublicBuckets"],
                true
            );
            assert_eq!(bucket.deletion_policy, Some(DeletionPolicy::Delete));
        }
    }

    #[test]
    fn test_source_bucket_website_and_versioning() {
        let (construct, template) = map_spec(&spec());
        let bucket = template
            .resource(construct.source_bucket.logical_id.as_str())
            .unwrap();

        assert_eq!(bucket.get("BucketName"), Some(&json!("example-site")));
        assert_eq!(
            bucket.get("VersioningConfiguration"),
            Some(&json!({ "Status": "Enabled" }))
        );
        assert_eq!(
            bucket.get("WebsiteConfiguration"),
            Some(&json!({ "IndexDocument": "index.html", "ErrorDocument": "index.html" }))
        );
    }

    // ==================== バケットポリシー ====================

    #[test]
    fn test_bucket_policy_grants_only_oai() {
        let (construct, template) = map_spec(&spec());
        let policies: Vec<_> = template.resources_of_type("AWS::S3::BucketPolicy").collect();
        assert_eq!(policies.len(), 1);

        let (_, policy) = policies[0];
        let statement = &policy.get("PolicyDocument").unwrap()["Statement"];
        assert_eq!(statement.as_array().unwrap().len(), 1);
        assert_eq!(statement[0]["Effect"], "Allow");
        assert_eq!(
            statement[0]["Action"],
            json!(["s3:GetBucket*", "s3:GetObject*", "s3:List*"])
        );
        assert_eq!(
            statement[0]["Resource"],
            json!([
                { "Fn::GetAtt": ["SiteSourceBucket", "Arn"] },
                { "Fn::Sub": "${SiteSourceBucket.Arn}/*" },
            ])
        );
        assert_eq!(
            statement[0]["Principal"],
            json!({
                "CanonicalUser": {
                    "Fn::GetAtt": [construct.origin_access_identity.as_str(), "S3CanonicalUserId"]
                }
            })
        );
    }

    // ==================== ディストリビューション ====================

    #[test]
    fn test_distribution_origin_uses_access_identity() {
        let (construct, template) = map_spec(&spec());
        let config = distribution_config(&construct, &template);

        let origin = &config["Origins"][0];
        assert_eq!(
            origin["DomainName"],
            json!({ "Fn::GetAtt": ["SiteSourceBucket", "RegionalDomainName"] })
        );
        assert_eq!(
            origin["S3OriginConfig"]["OriginAccessIdentity"],
            json!({ "Fn::Sub": "origin-access-identity/cloudfront/${SiteAccessOriginOAI}" })
        );
        assert_eq!(config["DefaultCacheBehavior"]["TargetOriginId"], origin["Id"]);
    }

    #[test]
    fn test_distribution_policies() {
        let (construct, template) = map_spec(&spec());
        let config = distribution_config(&construct, &template);

        assert_eq!(config["IPV6Enabled"], true);
        assert_eq!(config["PriceClass"], "PriceClass_100");
        assert_eq!(config["DefaultRootObject"], "index.html");
        assert_eq!(config["Comment"], "static site");

        let distribution = template
            .resource(construct.distribution.logical_id.as_str())
            .unwrap();
        assert_eq!(
            distribution.get("Tags"),
            Some(&json!([{ "Key": "Name", "Value": "siteDistribution" }]))
        );
        assert_eq!(
            config["DefaultCacheBehavior"]["ViewerProtocolPolicy"],
            "redirect-to-https"
        );
        assert_eq!(
            config["DefaultCacheBehavior"]["AllowedMethods"],
            json!(["GET", "HEAD"])
        );
    }

    #[test]
    fn test_distribution_selector_variants() {
        let spec = SiteSpec {
            allowed_methods: AllowedMethods::All,
            viewer_protocol: ViewerProtocol::AllowAll,
            price_class: DistributionPriceClass::All,
            ..spec()
        };
        let (construct, template) = map_spec(&spec);
        let config = distribution_config(&construct, &template);

        assert_eq!(config["PriceClass"], "PriceClass_All");
        assert_eq!(config["DefaultCacheBehavior"]["ViewerProtocolPolicy"], "allow-all");
        assert_eq!(
            config["DefaultCacheBehavior"]["AllowedMethods"]
                .as_array()
                .unwrap()
                .len(),
            7
        );
        assert_eq!(
            config["DefaultCacheBehavior"]["CachedMethods"],
            json!(["GET", "HEAD"])
        );
    }

    #[test]
    fn test_distribution_logging_and_geo_restriction() {
        let (construct, template) = map_spec(&spec());
        let config = distribution_config(&construct, &template);

        assert_eq!(
            config["Logging"],
            json!({
                "Bucket": { "Fn::GetAtt": ["SiteAccessLogsBucket", "RegionalDomainName"] },
                "IncludeCookies": false,
                "Prefix": "cdn/",
            })
        );
        assert_eq!(
            config["Restrictions"]["GeoRestriction"],
            json!({ "RestrictionType": "whitelist", "Locations": ["JP", "US"] })
        );
    }

    #[test]
    fn test_empty_geo_whitelist_means_no_restriction() {
        let spec = SiteSpec {
            geo_whitelist: vec![],
            ..spec()
        };
        let (construct, template) = map_spec(&spec);
        let config = distribution_config(&construct, &template);

        assert_eq!(
            config["Restrictions"]["GeoRestriction"],
            json!({ "RestrictionType": "none" })
        );
    }

    // ==================== 出力値 ====================

    #[test]
    fn test_outputs() {
        let (_, template) = map_spec(&spec());

        assert_eq!(
            template.output("SiteCloudfrontDistribution").unwrap().value,
            json!({ "Fn::GetAtt": ["SiteDistribution", "DomainName"] })
        );
        assert_eq!(
            template.output("SiteBucketArn").unwrap().value,
            json!({ "Fn::GetAtt": ["SiteSourceBucket", "Arn"] })
        );
        assert_eq!(
            template.output("SiteLoggingBucketArn").unwrap().value,
            json!({ "Fn::GetAtt": ["SiteAccessLogsBucket", "Arn"] })
        );
    }

    // ==================== 論理ID ====================

    #[test]
    fn test_logical_ids_do_not_depend_on_physical_names() {
        // 記号のみが異なる名前・ディストリビューション名とバケット名の一致
        let spec = SiteSpec {
            site_bucket_name: "orders-site".to_string(),
            access_logs_bucket_name: "orders.site".to_string(),
            distribution_name: "orders-site".to_string(),
            ..spec()
        };
        let (construct, template) = map_spec(&spec);

        assert_eq!(construct.source_bucket.logical_id.as_str(), "SiteSourceBucket");
        assert_eq!(construct.access_logs_bucket.logical_id.as_str(), "SiteAccessLogsBucket");
        assert_eq!(construct.distribution.logical_id.as_str(), "SiteDistribution");
        assert_eq!(template.resource_count(), 5);
    }

    #[test]
    fn test_logs_bucket_named_like_policy() {
        let spec = SiteSpec {
            site_bucket_name: "orders-site".to_string(),
            access_logs_bucket_name: "orders-site-policy".to_string(),
            ..spec()
        };
        let (_, template) = map_spec(&spec);

        assert!(template.resource("SiteSourceBucketPolicy").is_some());
        assert!(template.resource("SiteAccessLogsBucket").is_some());
        assert_eq!(template.resources_of_type("AWS::S3::Bucket").count(), 2);
    }
}
