//! Static-asset buckets and the optional content distribution.

use serde_json::{json, Value};

use crate::error::Result;
use crate::graph::policy::actions;
use crate::graph::tokens::{get_att, join, reference};
use crate::graph::{LogicalId, RemovalPolicy, ResourceArn, ResourceDescriptor, ResourceGraph, ResourceKind};
use crate::naming;
use crate::params::Environment;

pub const SOURCE_BUCKET_ID: &str = "SourceBucket";
pub const WEBSITE_BUCKET_ID: &str = "WebsiteBucket";
pub const ARTIFACTS_BUCKET_ID: &str = "ArtifactsBucket";
pub const WEBSITE_POLICY_ID: &str = "WebsiteBucketPolicy";
pub const SOURCE_DEPLOYMENT_ID: &str = "SourceAssetsDeployment";
pub const DISTRIBUTION_ID: &str = "WebsiteDistribution";

const WEBSITE_ORIGIN_ID: &str = "website";

/// What a bucket is for. Feeds the deterministic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPurpose {
    SourceAssets,
    Website,
    PipelineArtifacts,
}

impl BucketPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketPurpose::SourceAssets => "source-assets",
            BucketPurpose::Website => "website",
            BucketPurpose::PipelineArtifacts => "pipeline-artifacts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSettings {
    pub environment: Environment,
    pub website_index_document: String,
    pub website_error_document: String,
    /// Local path of the archive seeded into the source bucket.
    pub deploy_source: String,
    pub cdn_enabled: bool,
    pub cdn_index_document: String,
    pub cdn_comment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetOutputs {
    pub source_bucket: LogicalId,
    pub source_bucket_name: String,
    pub website_bucket: LogicalId,
    pub website_bucket_name: String,
    pub artifacts_bucket: LogicalId,
    pub artifacts_bucket_name: String,
    pub distribution: Option<LogicalId>,
    pub cdn_url: Option<Value>,
}

impl AssetOutputs {
    pub fn buckets(&self) -> [&LogicalId; 3] {
        [&self.source_bucket, &self.website_bucket, &self.artifacts_bucket]
    }
}

/// Adds the three buckets, the public-read policy on the website bucket,
/// the source seeding deployment, and the distribution when enabled.
pub fn build_assets(
    graph: &mut ResourceGraph,
    project_name: &str,
    settings: &AssetSettings,
) -> Result<AssetOutputs> {
    let name_for = |purpose: BucketPurpose| {
        naming::bucket_name(project_name, purpose.as_str(), settings.environment)
    };
    let source_bucket_name = name_for(BucketPurpose::SourceAssets)?;
    let website_bucket_name = name_for(BucketPurpose::Website)?;
    let artifacts_bucket_name = name_for(BucketPurpose::PipelineArtifacts)?;

    let source_bucket = graph.add(
        private_bucket(SOURCE_BUCKET_ID, &source_bucket_name)
            .property("VersioningConfiguration", json!({ "Status": "Enabled" })),
    )?;

    let website_bucket = graph.add(
        ResourceDescriptor::new(WEBSITE_BUCKET_ID, ResourceKind::Bucket)
            .property("BucketName", website_bucket_name.as_str())
            .property(
                "WebsiteConfiguration",
                json!({
                    "IndexDocument": settings.website_index_document,
                    "ErrorDocument": settings.website_error_document,
                }),
            )
            .property(
                "PublicAccessBlockConfiguration",
                json!({
                    "BlockPublicAcls": true,
                    "IgnorePublicAcls": true,
                    "BlockPublicPolicy": false,
                    "RestrictPublicBuckets": false,
                }),
            )
            .removal_policy(RemovalPolicy::Destroy),
    )?;

    let artifacts_bucket = graph.add(private_bucket(ARTIFACTS_BUCKET_ID, &artifacts_bucket_name))?;

    // Anonymous readers get object reads only. Writes stay with build principals.
    graph.add(
        ResourceDescriptor::new(WEBSITE_POLICY_ID, ResourceKind::BucketPolicy)
            .property("Bucket", reference(&website_bucket))
            .property(
                "PolicyDocument",
                json!({
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": "*",
                        "Action": actions::OBJECT_READ,
                        "Resource": ResourceArn::ObjectsIn(website_bucket.clone()).to_value(),
                    }],
                }),
            ),
    )?;

    graph.add(
        ResourceDescriptor::new(SOURCE_DEPLOYMENT_ID, ResourceKind::BucketDeployment)
            .property("SourcePath", settings.deploy_source.as_str())
            .property("DestinationBucketName", reference(&source_bucket))
            .property("Prune", false),
    )?;

    let (distribution, cdn_url) = if settings.cdn_enabled {
        let distribution = graph.add(
            ResourceDescriptor::new(DISTRIBUTION_ID, ResourceKind::Distribution).property(
                "DistributionConfig",
                json!({
                    "Comment": settings.cdn_comment,
                    "DefaultRootObject": settings.cdn_index_document,
                    "Enabled": true,
                    "Origins": [{
                        "Id": WEBSITE_ORIGIN_ID,
                        "DomainName": get_att(&website_bucket, "RegionalDomainName"),
                        "S3OriginConfig": {},
                    }],
                    "DefaultCacheBehavior": {
                        "TargetOriginId": WEBSITE_ORIGIN_ID,
                        "ViewerProtocolPolicy": "redirect-to-https",
                        "AllowedMethods": ["GET", "HEAD"],
                        "ForwardedValues": { "QueryString": false },
                    },
                }),
            ),
        )?;
        let url = join([json!("https://"), get_att(&distribution, "DomainName")]);
        (Some(distribution), Some(url))
    } else {
        (None, None)
    };

    tracing::debug!(
        %website_bucket_name,
        cdn_enabled = settings.cdn_enabled,
        "asset descriptors added"
    );

    Ok(AssetOutputs {
        source_bucket,
        source_bucket_name,
        website_bucket,
        website_bucket_name,
        artifacts_bucket,
        artifacts_bucket_name,
        distribution,
        cdn_url,
    })
}

fn private_bucket(id: &str, name: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(id, ResourceKind::Bucket)
        .property("BucketName", name)
        .property(
            "PublicAccessBlockConfiguration",
            json!({
                "BlockPublicAcls": true,
                "IgnorePublicAcls": true,
                "BlockPublicPolicy": true,
                "RestrictPublicBuckets": true,
            }),
        )
        .removal_policy(RemovalPolicy::Destroy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(cdn_enabled: bool) -> AssetSettings {
        AssetSettings {
            environment: Environment::Test,
            website_index_document: "index.html".to_string(),
            website_error_document: "error.html".to_string(),
            deploy_source: "../assets/archive".to_string(),
            cdn_enabled,
            cdn_index_document: "index.html".to_string(),
            cdn_comment: "CDN".to_string(),
        }
    }

    #[test]
    fn test_bucket_names_are_deterministic() {
        let mut first = ResourceGraph::new();
        let mut second = ResourceGraph::new();
        let a = build_assets(&mut first, "MyCDKGoals", &settings(true)).unwrap();
        let b = build_assets(&mut second, "MyCDKGoals", &settings(true)).unwrap();

        assert_eq!(a.website_bucket_name, b.website_bucket_name);
        assert_eq!(a.source_bucket_name, b.source_bucket_name);
        assert_ne!(a.source_bucket_name, a.artifacts_bucket_name);
    }

    #[test]
    fn test_public_grant_is_read_only() {
        let mut graph = ResourceGraph::new();
        build_assets(&mut graph, "MyCDKGoals", &settings(false)).unwrap();

        let policy = graph.get(&LogicalId::new(WEBSITE_POLICY_ID)).unwrap();
        let statements = policy.properties["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap();
        for statement in statements {
            assert_eq!(statement["Action"], json!(["s3:GetObject"]));
        }
    }

    #[test]
    fn test_only_website_bucket_allows_public_policy() {
        let mut graph = ResourceGraph::new();
        let out = build_assets(&mut graph, "MyCDKGoals", &settings(false)).unwrap();

        for (bucket, public) in [
            (&out.source_bucket, false),
            (&out.website_bucket, true),
            (&out.artifacts_bucket, false),
        ] {
            let block = &graph.get(bucket).unwrap().properties["PublicAccessBlockConfiguration"];
            assert_eq!(block["BlockPublicPolicy"], !public);
        }
    }

    #[test]
    fn test_cdn_is_optional() {
        let mut graph = ResourceGraph::new();
        let out = build_assets(&mut graph, "MyCDKGoals", &settings(false)).unwrap();
        assert!(out.distribution.is_none());
        assert!(out.cdn_url.is_none());
        assert_eq!(graph.of_kind(ResourceKind::Distribution).count(), 0);

        let mut graph = ResourceGraph::new();
        let out = build_assets(&mut graph, "MyCDKGoals", &settings(true)).unwrap();
        let distribution = graph.get(out.distribution.as_ref().unwrap()).unwrap();
        assert_eq!(
            distribution.properties["DistributionConfig"]["DefaultRootObject"],
            "index.html"
        );
        assert!(out.cdn_url.is_some());
    }

    #[test]
    fn test_buckets_are_destroyed_with_stack() {
        let mut graph = ResourceGraph::new();
        build_assets(&mut graph, "MyCDKGoals", &settings(false)).unwrap();
        assert!(graph
            .of_kind(ResourceKind::Bucket)
            .all(|b| b.removal_policy == Some(RemovalPolicy::Destroy)));
    }

    #[test]
    fn test_source_bucket_is_versioned() {
        let mut graph = ResourceGraph::new();
        let out = build_assets(&mut graph, "MyCDKGoals", &settings(false)).unwrap();
        assert_eq!(
            graph.get(&out.source_bucket).unwrap().properties["VersioningConfiguration"]["Status"],
            "Enabled"
        );
    }
}
