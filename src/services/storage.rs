use s3::creds::Credentials;
use s3::{Bucket, Region};

/// Client for the S3-compatible object store holding source videos and
/// chunk media (MinIO in the default deployment).
pub struct ObjectStore {
    bucket: Box<Bucket>,
}

impl ObjectStore {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        // MinIO serves buckets path-style.
        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?
            .with_path_style();

        Ok(Self { bucket })
    }

    /// Upload a media blob.
    pub async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(StorageError::S3)?;
        Ok(())
    }

    /// Download a whole object.
    pub async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.bucket.get_object(key).await.map_err(StorageError::S3)?;
        Ok(response.to_vec())
    }

    /// Download an inclusive byte range of an object.
    pub async fn download_range(
        &self,
        key: &str,
        start: u64,
        end: Option<u64>,
    ) -> Result<Vec<u8>, StorageError> {
        let response = self
            .bucket
            .get_object_range(key, start, end)
            .await
            .map_err(StorageError::S3)?;
        Ok(response.to_vec())
    }

    /// Object size in bytes, or `NotFound` if the key does not exist.
    pub async fn stat(&self, key: &str) -> Result<u64, StorageError> {
        let (head, code) = self.bucket.head_object(key).await.map_err(StorageError::S3)?;
        if code == 404 {
            return Err(StorageError::NotFound(key.to_string()));
        }
        head.content_length
            .map(|len| len as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    /// Delete an object.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.bucket.delete_object(key).await.map_err(StorageError::S3)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("storage configuration error: {0}")]
    Config(String),

    #[error("object not found: {0}")]
    NotFound(String),
}
