use s3::creds::Credentials;
use s3::{Bucket, Region};

/// Client for S3-compatible object storage holding uploaded room photos.
///
/// The service only ever uploads objects and hands out their public URLs;
/// file contents are never read back.
pub struct StorageClient {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl StorageClient {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        public_base_url: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upload image bytes under `key`.
    pub async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(StorageError::S3)?;
        Ok(())
    }

    /// Public URL for an uploaded object.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// Storage key for an upload: `{unix_millis}-{original_filename}`, with path
/// separators stripped from the client-supplied name.
pub fn object_key(uploaded_at_millis: i64, original_filename: &str) -> String {
    let safe_name: String = original_filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}-{}", uploaded_at_millis, safe_name)
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_prefixes_timestamp() {
        assert_eq!(object_key(1717243200123, "room.jpg"), "1717243200123-room.jpg");
    }

    #[test]
    fn object_key_strips_path_separators() {
        assert_eq!(object_key(1, "../etc/passwd"), "1-.._etc_passwd");
    }
}
