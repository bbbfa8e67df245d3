use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::{StorageBackend, StorageError};

/// AWS S3 or any S3-compatible service (R2, MinIO, ...).
pub struct S3Storage {
    bucket: Box<Bucket>,
    public_url: String,
}

impl S3Storage {
    pub fn new(
        bucket_name: &str,
        region: Region,
        credentials: Credentials,
        path_style: bool,
        public_url: &str,
    ) -> Result<Self, StorageError> {
        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::NotConfigured(e.to_string()))?;
        let bucket = if path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Self {
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    /// Named AWS region, or a custom endpoint when one is given.
    pub fn region(region: &str, endpoint: Option<&str>) -> Result<Region, StorageError> {
        match endpoint {
            Some(endpoint) => Ok(Region::Custom {
                region: region.to_string(),
                endpoint: endpoint.to_string(),
            }),
            None => region
                .parse::<Region>()
                .map_err(|e| StorageError::NotConfigured(format!("{:?}", e))),
        }
    }

    /// Explicit keys when both are given, otherwise the default provider
    /// chain (environment, profile, instance metadata).
    pub fn credentials(
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> Result<Credentials, StorageError> {
        let credentials = match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => {
                Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            }
            _ => Credentials::default(),
        };

        credentials.map_err(|e| StorageError::NotConfigured(e.to_string()))
    }
}

fn is_not_found(error: &S3Error) -> bool {
    matches!(error, S3Error::HttpFailWithBody(404, _))
}

/// Interpret a HEAD status. Without `s3:ListBucket` AWS answers 403 rather
/// than 404 for a missing key, so both mean absent.
fn exists_from_status(key: &str, status: u16) -> Result<bool, StorageError> {
    match status {
        200..=299 => Ok(true),
        403 | 404 => Ok(false),
        status => Err(StorageError::DownloadFailed(format!(
            "HEAD {} returned {}",
            key, status
        ))),
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = match self.bucket.get_object(key).await {
            Ok(response) => response,
            Err(e) if is_not_found(&e) => return Err(StorageError::NotFound(key.to_string())),
            Err(e) => return Err(StorageError::DownloadFailed(e.to_string())),
        };

        match response.status_code() {
            200..=299 => Ok(response.bytes().to_vec()),
            404 => Err(StorageError::NotFound(key.to_string())),
            status => Err(StorageError::DownloadFailed(format!(
                "GET {} returned {}",
                key, status
            ))),
        }
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.bucket.head_object(key).await {
            Ok((_, status)) => exists_from_status(key, status),
            Err(S3Error::HttpFailWithBody(status, _)) => exists_from_status(key, status),
            Err(e) => Err(StorageError::DownloadFailed(e.to_string())),
        }
    }

    async fn write_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        if !(200..300).contains(&response.status_code()) {
            return Err(StorageError::UploadFailed(format!(
                "PUT {} returned {}",
                key,
                response.status_code()
            )));
        }

        Ok(())
    }

    async fn tag_object(&self, key: &str, tags: &[(&str, &str)]) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_tagging(key, tags)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        if !(200..300).contains(&response.status_code()) {
            return Err(StorageError::UploadFailed(format!(
                "tagging {} returned {}",
                key,
                response.status_code()
            )));
        }

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        if !(200..300).contains(&response.status_code()) {
            return Err(StorageError::DeleteFailed(format!(
                "DELETE {} returned {}",
                key,
                response.status_code()
            )));
        }

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}
