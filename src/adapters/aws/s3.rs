use crate::config::RunConfig;
use crate::ports::storage::StoragePort;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, StorageClass};
use aws_sdk_s3::Client;
use std::error::Error;
use std::path::Path;

/// S3Adapter implements StoragePort for AWS S3.
#[derive(Clone)]
pub struct S3Adapter {
    client: Client,
    bucket: String,
    acl: ObjectCannedAcl,
    storage_class: StorageClass,
}

impl S3Adapter {
    /// Build an S3 client from the run configuration's static credentials,
    /// region, ACL and storage class.
    pub async fn connect(config: &RunConfig) -> Self {
        let credentials = Credentials::new(
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
            None,
            None,
            "vidlift-config",
        );
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.upload_region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        Self {
            client: Client::new(&aws_config),
            bucket: config.upload_bucket.clone(),
            acl: ObjectCannedAcl::from(config.upload_acl.as_str()),
            storage_class: StorageClass::from(config.upload_storage_class.as_str()),
        }
    }
}

#[async_trait]
impl StoragePort for S3Adapter {
    async fn put(
        &self,
        local_path: &Path,
        key: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let body = tokio::fs::read(local_path).await?;
        let byte_stream = ByteStream::from(body);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(self.acl.clone())
            .storage_class(self.storage_class.clone())
            .body(byte_stream)
            .send()
            .await?;
        Ok(())
    }
}
