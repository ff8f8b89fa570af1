use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::time::Duration;
use tokio::io::AsyncReadExt;

// S3 requires every part except the last to be at least 5 MiB.
const PART_SIZE: usize = 8 * 1024 * 1024;
const DEFAULT_REGION: &str = "us-east-1";

/// S3 storage implementation
///
/// Also used for S3-compatible providers such as MinIO when an endpoint is given.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        if bucket.trim().is_empty() {
            return Err(StorageError::ConfigError(
                "S3 bucket name must not be empty".to_string(),
            ));
        }

        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let client = if let Some(ref endpoint) = endpoint_url {
            // Path-style addressing is required by MinIO and most S3-compatible providers
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .force_path_style(true);
            if let Some(provider) = config.credentials_provider() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        Ok(S3Storage {
            client,
            bucket,
            region,
        })
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
        {
            tracing::warn!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                upload_id = %upload_id,
                "Failed to abort multipart upload"
            );
        }
    }

    /// Upload every part of `reader`, returning the completed parts and total size.
    /// `first` is data already read from the reader.
    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        first: Vec<u8>,
        reader: &mut ByteReader,
    ) -> StorageResult<(Vec<CompletedPart>, u64)> {
        let mut parts = Vec::new();
        let mut total_size = 0u64;
        let mut part_number = 1i32;
        let mut chunk = first;

        loop {
            if chunk.is_empty() {
                break;
            }
            let at_eof = chunk.len() < PART_SIZE;
            total_size += chunk.len() as u64;

            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(Bytes::from(chunk)))
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        part_number = part_number,
                        "Failed to upload part"
                    );
                    StorageError::UploadFailed(e.to_string())
                })?;

            let etag = output.e_tag().ok_or_else(|| {
                StorageError::UploadFailed(format!("No ETag returned for part {}", part_number))
            })?;
            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(etag)
                    .build(),
            );
            part_number += 1;

            if at_eof {
                break;
            }
            chunk = read_part(reader).await?;
        }

        Ok((parts, total_size))
    }
}

/// Read up to `PART_SIZE` bytes; a short result means EOF.
async fn read_part(reader: &mut ByteReader) -> StorageResult<Vec<u8>> {
    let mut buffer = vec![0u8; PART_SIZE];
    let mut filled = 0usize;
    while filled < PART_SIZE {
        let n = reader
            .read(&mut buffer[filled..])
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Failed to read from stream: {}", e)))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buffer.truncate(filled);
    Ok(buffer)
}

#[async_trait]
impl Storage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    async fn bucket_exists(&self) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), HeadBucketError::NotFound(_))
                    || service_err.raw().status().as_u16() == 404 =>
            {
                Ok(false)
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn create_bucket(&self) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, region = %self.region, "S3 bucket created");
                Ok(())
            }
            Err(SdkError::ServiceError(service_err))
                if matches!(
                    service_err.err(),
                    CreateBucketError::BucketAlreadyOwnedByYou(_)
                        | CreateBucketError::BucketAlreadyExists(_)
                ) =>
            {
                Err(StorageError::BucketAlreadyExists(self.bucket.clone()))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    code = e.code().unwrap_or("unknown"),
                    bucket = %self.bucket,
                    "S3 create bucket failed"
                );
                Err(StorageError::BackendError(e.to_string()))
            }
        }
    }

    async fn put_stream(
        &self,
        storage_key: &str,
        content_type: &str,
        content_length: Option<u64>,
        mut reader: ByteReader,
    ) -> StorageResult<u64> {
        let start = std::time::Instant::now();

        let first = read_part(&mut reader).await?;

        // Objects that fit in one part go up with a single PUT
        if first.len() < PART_SIZE {
            let size = first.len() as u64;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(storage_key)
                .content_type(content_type)
                .content_length(size as i64)
                .body(ByteStream::from(Bytes::from(first)))
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %storage_key,
                        size_bytes = size,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 stream upload failed"
                    );
                    StorageError::UploadFailed(e.to_string())
                })?;

            tracing::info!(
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 stream upload successful"
            );
            return Ok(size);
        }

        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(storage_key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "Failed to create multipart upload"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::UploadFailed("No upload ID returned from S3".to_string()))?
            .to_string();

        let (parts, total_size) = match self
            .upload_parts(storage_key, &upload_id, first, &mut reader)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.abort_multipart(storage_key, &upload_id).await;
                return Err(e);
            }
        };
        let part_count = parts.len();

        let completed = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(storage_key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await;

        if let Err(e) = completed {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                "Failed to complete multipart upload"
            );
            self.abort_multipart(storage_key, &upload_id).await;
            return Err(StorageError::UploadFailed(e.to_string()));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = total_size,
            expected_bytes = content_length,
            parts = part_count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 multipart stream upload successful"
        );

        Ok(total_size)
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), GetObjectError::NoSuchKey(_)) =>
                {
                    StorageError::NotFound(storage_key.to_string())
                }
                _ => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %storage_key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 download failed"
                    );
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes();

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(data.to_vec())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(e.to_string())
            })?;

        tracing::info!(bucket = %self.bucket, key = %storage_key, "S3 delete successful");

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
            {
                Ok(false)
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigning_config = aws_sdk_s3::presigning::PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned_request.uri().to_string())
    }
}
