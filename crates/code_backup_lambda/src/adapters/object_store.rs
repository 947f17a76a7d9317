use std::collections::BTreeMap;
use std::path::Path;

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketVersioningStatus, VersioningConfiguration};

/// Read failure classification for the state record. Missing and denied are
/// handled separately from everything else by the caller: both degrade to
/// "no prior backup", other failures do not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreReadError {
    NotFound,
    AccessDenied(String),
    Other(String),
}

impl std::fmt::Display for StoreReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("object not found"),
            Self::AccessDenied(message) | Self::Other(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for StoreReadError {}

/// Versioned destination store for backup objects and state records.
/// Writes return the version identifier the store assigned, when it
/// assigned one.
pub trait BackupStore {
    fn ensure_versioning(&self) -> Result<(), String>;

    fn read_object(&self, key: &str) -> Result<Vec<u8>, StoreReadError>;

    fn write_object(
        &self,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<Option<String>, String>;

    fn write_object_from_path(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Option<String>, String>;
}

pub struct S3BackupStore {
    bucket: String,
    s3_client: aws_sdk_s3::Client,
}

impl S3BackupStore {
    pub fn new(bucket: String, s3_client: aws_sdk_s3::Client) -> Self {
        Self { bucket, s3_client }
    }
}

impl BackupStore for S3BackupStore {
    fn ensure_versioning(&self) -> Result<(), String> {
        let bucket = self.bucket.clone();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let current = client
                    .get_bucket_versioning()
                    .bucket(&bucket)
                    .send()
                    .await
                    .map_err(|error| {
                        format!("failed to read versioning status of {bucket}: {error}")
                    })?;

                if matches!(current.status(), Some(BucketVersioningStatus::Enabled)) {
                    return Ok(());
                }

                client
                    .put_bucket_versioning()
                    .bucket(&bucket)
                    .versioning_configuration(
                        VersioningConfiguration::builder()
                            .status(BucketVersioningStatus::Enabled)
                            .build(),
                    )
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to enable versioning on {bucket}: {error}"))
            })
        })
    }

    fn read_object(&self, key: &str) -> Result<Vec<u8>, StoreReadError> {
        let bucket = self.bucket.clone();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .get_object()
                    .bucket(&bucket)
                    .key(&object_key)
                    .send()
                    .await
                    .map_err(|error| classify_get_object_error(&object_key, &error))?;

                response
                    .body
                    .collect()
                    .await
                    .map(|data| data.into_bytes().to_vec())
                    .map_err(|error| {
                        StoreReadError::Other(format!(
                            "failed to read body of {object_key}: {error}"
                        ))
                    })
            })
        })
    }

    fn write_object(
        &self,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<Option<String>, String> {
        let bucket = self.bucket.clone();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();
        let object_content_type = content_type.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&object_key)
                    .content_type(object_content_type)
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map(|output| output.version_id().map(str::to_string))
                    .map_err(|error| format!("failed to write {object_key} to s3: {error}"))
            })
        })
    }

    fn write_object_from_path(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Option<String>, String> {
        let bucket = self.bucket.clone();
        let object_key = key.to_string();
        let object_content_type = content_type.to_string();
        let object_metadata = metadata.clone();
        let source_path = path.to_path_buf();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let body = ByteStream::from_path(&source_path).await.map_err(|error| {
                    format!(
                        "failed to open staged artifact {}: {error}",
                        source_path.display()
                    )
                })?;

                let mut request = client
                    .put_object()
                    .bucket(&bucket)
                    .key(&object_key)
                    .content_type(object_content_type)
                    .body(body);
                for (name, value) in object_metadata {
                    request = request.metadata(name, value);
                }

                request
                    .send()
                    .await
                    .map(|output| output.version_id().map(str::to_string))
                    .map_err(|error| format!("failed to write {object_key} to s3: {error}"))
            })
        })
    }
}

fn classify_get_object_error<R>(
    key: &str,
    error: &SdkError<GetObjectError, R>,
) -> StoreReadError {
    match error {
        SdkError::ServiceError(context) => {
            let service_error = context.err();
            if service_error.is_no_such_key()
                || matches!(service_error.code(), Some("NoSuchKey" | "NotFound" | "404"))
            {
                StoreReadError::NotFound
            } else if service_error.code() == Some("AccessDenied") {
                StoreReadError::AccessDenied(format!("read of {key} denied: {service_error}"))
            } else {
                StoreReadError::Other(format!("failed to read {key}: {service_error}"))
            }
        }
        other => StoreReadError::Other(format!("failed to read {key}: {other}")),
    }
}
