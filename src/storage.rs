//! Object storage for company logos. Speaks the S3 API; MinIO in development.

use std::time::Duration;

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::config::StorageConfig;

pub const LOGO_PREFIX: &str = "logos";

/// Image formats accepted as a company logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoFormat {
    Jpeg,
    Png,
    Gif,
}

impl LogoFormat {
    /// Recognizes the format from the uploaded file name's extension, case-insensitively.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

/// Fresh key for a user's logo. Every upload gets its own key so cached URLs never go stale.
pub fn logo_key(user_id: Uuid, format: LogoFormat) -> String {
    format!("{LOGO_PREFIX}/{user_id}/{}.{}", Uuid::new_v4(), format.extension())
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
    /// Time-limited GET url for `key`.
    async fn signed_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub async fn connect(cfg: &StorageConfig) -> Self {
        let credentials =
            Credentials::new(&cfg.access_key, &cfg.secret_key, None, None, "invoicegen-env");
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        // MinIO serves buckets by path, not by virtual host
        let s3 = S3ConfigBuilder::from(&shared).force_path_style(true).build();

        debug!(endpoint = %cfg.endpoint, bucket = %cfg.bucket, "object store configured");
        Self {
            client: Client::from_conf(s3),
            bucket: cfg.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("upload {key}"))?;
        debug!(%key, size, "object stored");
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("delete {key}"))?;
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> anyhow::Result<String> {
        let presigning = PresigningConfig::expires_in(ttl).context("presign ttl")?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .with_context(|| format!("presign {key}"))?;
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logo_formats_from_names() {
        assert_eq!(LogoFormat::from_file_name("Logo.JPEG"), Some(LogoFormat::Jpeg));
        assert_eq!(LogoFormat::from_file_name("a.b.png"), Some(LogoFormat::Png));
        assert_eq!(LogoFormat::from_file_name("x.gif"), Some(LogoFormat::Gif));
        assert_eq!(LogoFormat::from_file_name("x.svg"), None);
        assert_eq!(LogoFormat::from_file_name("png"), None);
        assert_eq!(LogoFormat::Jpeg.content_type(), "image/jpeg");
    }

    #[test]
    fn logo_keys_are_scoped_and_unique() {
        let user = Uuid::new_v4();
        let a = logo_key(user, LogoFormat::Png);
        let b = logo_key(user, LogoFormat::Png);
        assert!(a.starts_with(&format!("logos/{user}/")));
        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
    }
}
